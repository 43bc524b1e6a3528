use bytes::Bytes;
use embedded_graphics::prelude::Size;
use tracing::{debug, info, warn};

use crate::{
    common::{ConfigError, DisposalMethod, EncodeError, ExtensionLabel, SyntaxError},
    frame::{Frame, ImageDescriptor},
    header::{
        netscape_loop_block, ColorTable, GraphicsControl, Greyscale, LoopByteOrder, LoopCount,
        PaletteSource, NETSCAPE_ID,
    },
    sink::GrowableSink,
    writer::GifWriter,
};

/// Delay used when the source frame rate is unknown, 4 frames per second.
pub const DEFAULT_DELAY: u16 = 25;

/// Sink headroom on top of one uncompressed frame, covers header and block framing.
const HEADER_HEADROOM: usize = 800;

/// Source frame rate as `rate / base` frames per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRate {
    pub rate: u32,
    pub base: u32,
}

impl FrameRate {
    pub fn new(rate: u32, base: u32) -> Self {
        Self { rate, base }
    }

    /// Display duration of one frame in hundredths of a second, rounded to nearest.
    pub fn delay(&self) -> u16 {
        if self.rate == 0 || self.base == 0 {
            return DEFAULT_DELAY;
        }
        let rate = u64::from(self.rate);
        let delay = (100 * u64::from(self.base) + rate / 2) / rate;
        u16::try_from(delay).unwrap_or(u16::MAX)
    }
}

/// Everything `initialize` needs to start a session.
#[derive(Clone, Debug)]
pub struct EncoderConfig<P = Greyscale> {
    pub size: Size,
    pub palette: P,
    pub frame_rate: Option<FrameRate>,
    /// Repeat request: -1 writes no loop extension, 0 loops forever, 1..=65535 repeats.
    /// Larger values are capped at 65535.
    pub repeat: i64,
    pub loop_byte_order: LoopByteOrder,
    /// Largest output buffer the session may allocate.
    pub capacity_limit: Option<usize>,
}

impl EncoderConfig<Greyscale> {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            palette: Greyscale,
            frame_rate: None,
            repeat: -1,
            loop_byte_order: LoopByteOrder::default(),
            capacity_limit: None,
        }
    }
}

impl<P: PaletteSource> EncoderConfig<P> {
    pub fn with_palette<Q: PaletteSource>(self, palette: Q) -> EncoderConfig<Q> {
        EncoderConfig {
            size: self.size,
            palette,
            frame_rate: self.frame_rate,
            repeat: self.repeat,
            loop_byte_order: self.loop_byte_order,
            capacity_limit: self.capacity_limit,
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    pub fn with_repeat(mut self, repeat: i64) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_loop_byte_order(mut self, order: LoopByteOrder) -> Self {
        self.loop_byte_order = order;
        self
    }

    pub fn with_capacity_limit(mut self, limit: usize) -> Self {
        self.capacity_limit = Some(limit);
        self
    }

    fn check_size(&self) -> Result<(), ConfigError> {
        let Size { width, height } = self.size;
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroDimension { width, height });
        }
        for dim in [width, height] {
            if dim > u32::from(u16::MAX) {
                return Err(ConfigError::DimensionTooLarge(dim));
            }
        }
        Ok(())
    }
}

/// Bytes produced by one encoder call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputChunk {
    bytes: Bytes,
    header: bool,
    pts: Option<i64>,
}

impl OutputChunk {
    /// Whether the chunk starts with the stream header, true for the first chunk only.
    pub fn is_header(&self) -> bool {
        self.header
    }

    /// Timestamp of the frame in this chunk, `None` for the closing chunk.
    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl core::ops::Deref for OutputChunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Failed,
}

/// An animated gif output stream, one frame at a time.
///
/// `initialize` writes the header into an internal buffer, every `encode_frame` hands back the
/// bytes of one frame (the first one prefixed with the header), and `finalize` returns the
/// trailer. Concatenating every chunk in call order yields the gif file.
pub struct AnimatedGifEncoder {
    size: Size,
    color_table: ColorTable,
    delay: u16,
    loop_count: LoopCount,
    is_first_frame: bool,
    /// Graphics control body, identical for every frame of the stream.
    graphics_control: [u8; 4],
    writer: GifWriter<GrowableSink>,
    state: SessionState,
    frames_emitted: u64,
}

impl AnimatedGifEncoder {
    pub fn initialize<P: PaletteSource>(config: &EncoderConfig<P>) -> Result<Self, EncodeError> {
        config.check_size()?;
        let loop_count = LoopCount::from_repeat(config.repeat)?;
        if config.repeat >= i64::from(u16::MAX) {
            info!(
                requested = config.repeat,
                "loop count > maximum, capping to 65535"
            );
        }
        let color_table = config.palette.color_table()?;
        let delay = config
            .frame_rate
            .map_or(DEFAULT_DELAY, |frame_rate| frame_rate.delay());

        let size = config.size;
        let capacity = (size.width as usize)
            .checked_mul(size.height as usize)
            .and_then(|pixels| pixels.checked_add(HEADER_HEADROOM))
            .ok_or(ConfigError::DimensionTooLarge(size.width.max(size.height)))?;
        let sink = GrowableSink::with_limit(capacity, config.capacity_limit)
            .map_err(EncodeError::Allocation)?;

        let mut writer = GifWriter::new(sink);
        writer.put_screen_desc(size, &color_table, 0)?;
        if let Some(count) = loop_count.wire_value() {
            writer.put_extension_leader(ExtensionLabel::App)?;
            writer.put_extension_block(NETSCAPE_ID)?;
            writer.put_extension_block(&netscape_loop_block(count, config.loop_byte_order))?;
            writer.put_extension_trailer()?;
        }

        let graphics_control = GraphicsControl {
            disposal: DisposalMethod::OverwriteWithBG,
            user_input: false,
            delay_time: delay,
            transparent_idx: None,
        }
        .to_bytes();

        debug!(
            width = size.width,
            height = size.height,
            colors = color_table.len(),
            delay,
            ?loop_count,
            "anigif encoder initialized"
        );

        Ok(Self {
            size,
            color_table,
            delay,
            loop_count,
            is_first_frame: true,
            graphics_control,
            writer,
            state: SessionState::Ready,
            frames_emitted: 0,
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn color_table(&self) -> &ColorTable {
        &self.color_table
    }

    /// Display duration of every frame, in hundredths of a second.
    pub fn delay(&self) -> u16 {
        self.delay
    }

    pub fn loop_count(&self) -> LoopCount {
        self.loop_count
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Encodes one frame and returns its bytes.
    ///
    /// Frames smaller than the encoding size are dropped with [`EncodeError::FrameRejected`] and
    /// the session carries on. A syntax error leaves the session [`SessionState::Failed`].
    pub fn encode_frame(&mut self, frame: &Frame<'_>) -> Result<OutputChunk, EncodeError> {
        if self.state == SessionState::Failed {
            return Err(EncodeError::SessionFailed);
        }
        if !frame.covers(self.size) {
            warn!(
                stride = frame.stride(),
                lines = frame.lines(),
                width = self.size.width,
                height = self.size.height,
                "frame is smaller than encoding size -> dropping frame"
            );
            return Err(EncodeError::FrameRejected {
                stride: frame.stride(),
                lines: frame.lines(),
                width: self.size.width,
                height: self.size.height,
            });
        }

        let mark = self.writer.sink().len();
        if let Err(err) = self.write_frame(frame) {
            self.rollback(mark);
            let err = EncodeError::from(err);
            if err.is_fatal() {
                self.state = SessionState::Failed;
            }
            warn!(%err, pts = frame.pts(), "frame not encoded");
            return Err(err);
        }

        let bytes = match self.writer.sink_mut().drain() {
            Ok(bytes) => bytes,
            Err(err) => {
                self.rollback(mark);
                warn!(%err, pts = frame.pts(), "frame not encoded");
                return Err(EncodeError::Allocation(err));
            }
        };
        let chunk = OutputChunk {
            bytes,
            header: self.is_first_frame,
            pts: Some(frame.pts()),
        };
        self.is_first_frame = false;
        self.frames_emitted += 1;
        debug!(
            pts = frame.pts(),
            len = chunk.len(),
            header = chunk.is_header(),
            "frame encoded"
        );
        Ok(chunk)
    }

    fn write_frame(&mut self, frame: &Frame<'_>) -> Result<(), SyntaxError> {
        self.writer
            .put_extension(ExtensionLabel::Graphics, &self.graphics_control)?;
        self.writer
            .put_image_desc(&ImageDescriptor::full(self.size))?;

        let width = self.size.width as usize;
        for y in 0..self.size.height as usize {
            let row = frame.row(y, width).ok_or(SyntaxError::ImageIncomplete {
                remaining: (self.size.height as usize - y) * width,
            })?;
            self.writer.put_line(row)?;
        }
        Ok(())
    }

    /// Drops the bytes of a frame that didn't make it, bytes before `mark` stay.
    fn rollback(&mut self, mark: usize) {
        self.writer.abort_image();
        self.writer.sink_mut().truncate(mark);
    }

    /// Ends the stream and returns the remaining bytes: the trailer, preceded by the header if
    /// no frame was ever emitted.
    pub fn finalize(mut self) -> Result<OutputChunk, EncodeError> {
        if self.state == SessionState::Failed {
            return Err(EncodeError::SessionFailed);
        }
        let closed = self
            .writer
            .close()
            .and_then(|()| self.writer.sink_mut().drain().map_err(SyntaxError::from));
        match closed {
            Ok(bytes) => {
                debug!(frames = self.frames_emitted, "anigif stream closed");
                Ok(OutputChunk {
                    bytes,
                    header: self.is_first_frame,
                    pts: None,
                })
            }
            Err(err) => {
                warn!(%err, "closing gif stream failed");
                Err(EncodeError::Close(err))
            }
        }
    }
}
