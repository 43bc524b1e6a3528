/// Known GIF block labels.
///
/// The encoder only ever produces these three top level blocks: the image descriptor introducing
/// a frame, the extension introducer, and the trailer that ends the stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Block {
    /// Image block.
    Image = 0x2C,
    /// Extension block.
    Extension = 0x21,
    /// Image trailer.
    Trailer = 0x3B,
}

/// Known GIF Extension labels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtensionLabel {
    /// Graphics control extension, carries delay and disposal.
    Graphics = 0xf9,
    /// Application extension, used for the NETSCAPE2.0 loop count.
    App = 0xff,
    /// Text extension.
    Text = 0x01,
    /// Comment extension
    Comment = 0xfe,
}

impl From<Block> for u8 {
    fn from(block: Block) -> Self {
        block as u8
    }
}

impl From<ExtensionLabel> for u8 {
    fn from(label: ExtensionLabel) -> Self {
        label as u8
    }
}

/// Process for displaying next image in the file
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DisposalMethod {
    NotSpecified = 0,
    DoNotDispose = 1,
    /// Restore the frame area to the background color.
    #[default]
    OverwriteWithBG = 2,
    OverwriteWithPrev = 3,
}

/// The growable sink refused to grow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// Reserving `requested` bytes of capacity failed.
    #[error("buffer growth to {requested} bytes refused")]
    Allocation { requested: usize },
}

/// Malformed writes reported by the gif syntax writer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// A block was written while the stream was in a state that doesn't allow it.
    #[error("{block} not allowed {state}")]
    OutOfOrder {
        block: &'static str,
        state: &'static str,
    },
    /// A single data sub-block can hold at most 255 bytes.
    #[error("sub-block of {0} bytes exceeds 255")]
    SubBlockTooLong(usize),
    /// Dimensions must fit the 16 bit fields of the format.
    #[error("dimension {0} does not fit a gif u16 field")]
    DimensionOverflow(u32),
    /// The image rectangle leaves the logical screen.
    #[error("image descriptor exceeds the logical screen")]
    ImageOutOfBounds,
    /// More pixels were handed over than the image descriptor declared.
    #[error("image data exceeds descriptor by {excess} pixels")]
    DataTooLarge { excess: usize },
    /// The stream was closed while an image still expected pixels.
    #[error("image incomplete, {remaining} pixels missing")]
    ImageIncomplete { remaining: usize },
    /// The lzw coder refused the pixel data, an index outside of the code range.
    #[error("lzw compression rejected a pixel index")]
    Compression,
    /// The lzw coder stopped making progress.
    #[error("lzw compression stalled")]
    CompressionStalled,
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Invalid encoder configuration, detected by `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("width and height must be non-zero (got {width}x{height})")]
    ZeroDimension { width: u32, height: u32 },
    #[error("dimension {0} exceeds the gif maximum of 65535")]
    DimensionTooLarge(u32),
    #[error("loop count {0} is out of range, expected -1..=65535")]
    LoopCount(i64),
    #[error("palette holds {0} colors, expected 1..=256")]
    PaletteSize(usize),
}

/// Errors surfaced by [`AnimatedGifEncoder`](crate::AnimatedGifEncoder).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Growing the output buffer failed.
    #[error("allocation failed: {0}")]
    Allocation(#[source] SinkError),
    /// The configuration was rejected, no session was created.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    /// The frame is smaller than the encoding size and was dropped.
    #[error("frame is smaller than encoding size ({stride}x{lines} -> {width}x{height})")]
    FrameRejected {
        stride: usize,
        lines: usize,
        width: u32,
        height: u32,
    },
    /// The syntax writer reported a malformed write.
    #[error("gif syntax error: {0}")]
    Syntax(#[source] SyntaxError),
    /// Closing the syntax stream failed. Chunks produced before remain valid.
    #[error("closing gif stream failed: {0}")]
    Close(#[source] SyntaxError),
    /// The session failed earlier and can't produce more output.
    #[error("encoder session failed earlier and is unusable")]
    SessionFailed,
}

impl EncodeError {
    /// Whether the output stream can't continue after this error.
    ///
    /// Dropped frames and frame-time allocation failures only cost the current frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EncodeError::FrameRejected { .. } | EncodeError::Allocation(_)
        )
    }
}

impl From<SyntaxError> for EncodeError {
    fn from(err: SyntaxError) -> Self {
        match err {
            SyntaxError::Sink(err) => EncodeError::Allocation(err),
            err => EncodeError::Syntax(err),
        }
    }
}
