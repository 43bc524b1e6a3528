use embedded_graphics::prelude::Size;

use crate::{
    common::{Block, ExtensionLabel, SyntaxError},
    frame::{ImageDescriptor, RowEncoder},
    header::{ColorTable, Header},
    sink::ByteSink,
};

enum WriterState {
    /// Nothing written yet, the screen descriptor comes first.
    Start,
    /// Between blocks.
    Blocks,
    /// Inside an extension opened with `put_extension_leader`.
    Extension,
    /// Pixel rows of the current image are expected.
    Image(RowEncoder),
    /// Trailer written.
    Closed,
}

impl WriterState {
    fn describe(&self) -> &'static str {
        match self {
            WriterState::Start => "before the screen descriptor",
            WriterState::Blocks => "between blocks",
            WriterState::Extension => "inside an extension",
            WriterState::Image(_) => "inside image data",
            WriterState::Closed => "after the trailer",
        }
    }
}

/// Serializes gif blocks in stream order into a [`ByteSink`].
///
/// The writer tracks where in the stream it is and refuses blocks that don't belong there, so
/// whatever reaches the sink is always a well formed prefix of a gif file.
pub struct GifWriter<S> {
    sink: S,
    state: WriterState,
    screen: Size,
    min_code_size: u8,
}

impl<S: ByteSink> GifWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: WriterState::Start,
            screen: Size::zero(),
            min_code_size: 2,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn expect_blocks(&self, block: &'static str) -> Result<(), SyntaxError> {
        match self.state {
            WriterState::Blocks => Ok(()),
            ref state => Err(SyntaxError::OutOfOrder {
                block,
                state: state.describe(),
            }),
        }
    }

    /// Writes the `GIF89a` signature, the logical screen descriptor and the global color table.
    pub fn put_screen_desc(
        &mut self,
        size: Size,
        color_table: &ColorTable,
        background_color: u8,
    ) -> Result<(), SyntaxError> {
        if !matches!(self.state, WriterState::Start) {
            return Err(SyntaxError::OutOfOrder {
                block: "screen descriptor",
                state: self.state.describe(),
            });
        }
        Header {
            image_size: size,
            global_table: color_table,
            background_color,
        }
        .write_to(&mut self.sink)?;
        self.screen = size;
        self.min_code_size = color_table.min_code_size();
        self.state = WriterState::Blocks;
        Ok(())
    }

    /// Writes a complete extension holding one data sub-block.
    pub fn put_extension(
        &mut self,
        label: ExtensionLabel,
        data: &[u8],
    ) -> Result<(), SyntaxError> {
        self.expect_blocks("extension")?;
        let len = sub_block_len(data)?;
        let mut raw = [0u8; 3 + 255 + 1];
        raw[0] = Block::Extension.into();
        raw[1] = label.into();
        raw[2] = len;
        raw[3..3 + data.len()].copy_from_slice(data);
        // block terminator stays 0
        self.sink.write(&raw[..4 + data.len()])?;
        Ok(())
    }

    /// Opens an extension whose sub-blocks follow through [`put_extension_block`].
    ///
    /// [`put_extension_block`]: GifWriter::put_extension_block
    pub fn put_extension_leader(&mut self, label: ExtensionLabel) -> Result<(), SyntaxError> {
        self.expect_blocks("extension leader")?;
        self.sink.write(&[Block::Extension.into(), label.into()])?;
        self.state = WriterState::Extension;
        Ok(())
    }

    pub fn put_extension_block(&mut self, data: &[u8]) -> Result<(), SyntaxError> {
        if !matches!(self.state, WriterState::Extension) {
            return Err(SyntaxError::OutOfOrder {
                block: "extension sub-block",
                state: self.state.describe(),
            });
        }
        let len = sub_block_len(data)?;
        if len == 0 {
            // a zero length block would terminate the extension early
            return Ok(());
        }
        let mut raw = [0u8; 256];
        raw[0] = len;
        raw[1..1 + data.len()].copy_from_slice(data);
        self.sink.write(&raw[..1 + data.len()])?;
        Ok(())
    }

    pub fn put_extension_trailer(&mut self) -> Result<(), SyntaxError> {
        if !matches!(self.state, WriterState::Extension) {
            return Err(SyntaxError::OutOfOrder {
                block: "extension trailer",
                state: self.state.describe(),
            });
        }
        self.sink.write(&[0])?;
        self.state = WriterState::Blocks;
        Ok(())
    }

    /// Writes an image descriptor; its pixels follow through [`put_line`](GifWriter::put_line).
    pub fn put_image_desc(&mut self, desc: &ImageDescriptor) -> Result<(), SyntaxError> {
        self.expect_blocks("image descriptor")?;
        let fits = |origin: i32, extent: u32, screen: u32| {
            origin >= 0 && (origin as u64 + u64::from(extent)) <= u64::from(screen)
        };
        if !fits(desc.origin.x, desc.size.width, self.screen.width)
            || !fits(desc.origin.y, desc.size.height, self.screen.height)
        {
            return Err(SyntaxError::ImageOutOfBounds);
        }
        desc.write_to(&mut self.sink)?;
        let mut rows = RowEncoder::start(self.min_code_size, desc.num_pixels(), &mut self.sink)?;
        self.state = if rows.remaining() == 0 {
            // an empty image still needs its end code and terminator
            rows.put_line(&[], &mut self.sink)?;
            WriterState::Blocks
        } else {
            WriterState::Image(rows)
        };
        Ok(())
    }

    /// Compresses a run of pixel indices into the current image.
    ///
    /// The image data is terminated as soon as the last declared pixel was written.
    pub fn put_line(&mut self, line: &[u8]) -> Result<(), SyntaxError> {
        let rows = match &mut self.state {
            WriterState::Image(rows) => rows,
            state => {
                return Err(SyntaxError::OutOfOrder {
                    block: "pixel data",
                    state: state.describe(),
                })
            }
        };
        rows.put_line(line, &mut self.sink)?;
        if rows.remaining() == 0 {
            self.state = WriterState::Blocks;
        }
        Ok(())
    }

    /// Whether the writer sits between blocks, no image or extension left open.
    pub fn at_block_boundary(&self) -> bool {
        matches!(self.state, WriterState::Blocks)
    }

    /// Forgets a half written image or extension.
    ///
    /// The bytes already handed to the sink are the caller's to discard.
    pub fn abort_image(&mut self) {
        if matches!(
            self.state,
            WriterState::Image(_) | WriterState::Extension
        ) {
            self.state = WriterState::Blocks;
        }
    }

    /// Writes the trailer; nothing can be written afterwards.
    pub fn close(&mut self) -> Result<(), SyntaxError> {
        match &self.state {
            WriterState::Blocks => {}
            WriterState::Image(rows) => {
                return Err(SyntaxError::ImageIncomplete {
                    remaining: rows.remaining(),
                })
            }
            state => {
                return Err(SyntaxError::OutOfOrder {
                    block: "trailer",
                    state: state.describe(),
                })
            }
        }
        self.sink.write(&[Block::Trailer.into()])?;
        self.state = WriterState::Closed;
        Ok(())
    }
}

fn sub_block_len(data: &[u8]) -> Result<u8, SyntaxError> {
    u8::try_from(data.len()).map_err(|_| SyntaxError::SubBlockTooLong(data.len()))
}
