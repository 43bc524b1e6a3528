use embedded_graphics::prelude::{Point, Size};
use weezl::{encode::Encoder, BitOrder, LzwStatus};

use crate::{
    common::{Block, SyntaxError},
    header::gif_u16,
    sink::ByteSink,
};

/// One picture handed to the encoder: palette indices, one byte per pixel, row-major.
///
/// Rows are `stride` bytes apart; anything past the encoding width is padding and is ignored.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pixels: &'a [u8],
    stride: usize,
    lines: usize,
    pts: i64,
}

impl<'a> Frame<'a> {
    pub fn new(pixels: &'a [u8], stride: usize, lines: usize, pts: i64) -> Self {
        Self {
            pixels,
            stride,
            lines,
            pts,
        }
    }

    /// A frame without row padding.
    pub fn packed(pixels: &'a [u8], size: Size, pts: i64) -> Self {
        Self::new(pixels, size.width as usize, size.height as usize, pts)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Presentation timestamp, passed through to the output chunk.
    pub fn pts(&self) -> i64 {
        self.pts
    }

    /// Whether the frame holds at least `size` visible pixels.
    pub fn covers(&self, size: Size) -> bool {
        let (width, height) = (size.width as usize, size.height as usize);
        if self.stride < width || self.lines < height {
            return false;
        }
        match height.checked_sub(1) {
            None => true,
            Some(last) => last
                .checked_mul(self.stride)
                .and_then(|start| start.checked_add(width))
                .is_some_and(|end| end <= self.pixels.len()),
        }
    }

    /// The first `width` indices of row `y`.
    pub fn row(&self, y: usize, width: usize) -> Option<&'a [u8]> {
        let start = y.checked_mul(self.stride)?;
        self.pixels.get(start..start.checked_add(width)?)
    }
}

/// Image descriptor, always without a local color table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub origin: Point,
    pub size: Size,
    pub interlaced: bool,
}

impl ImageDescriptor {
    /// A descriptor covering the whole screen from the top left corner.
    pub fn full(size: Size) -> Self {
        Self {
            origin: Point::zero(),
            size,
            interlaced: false,
        }
    }

    pub fn num_pixels(&self) -> usize {
        self.size.width as usize * self.size.height as usize
    }

    pub(crate) fn write_to<S: ByteSink>(&self, sink: &mut S) -> Result<(), SyntaxError> {
        let left = u32::try_from(self.origin.x).map_err(|_| SyntaxError::ImageOutOfBounds)?;
        let top = u32::try_from(self.origin.y).map_err(|_| SyntaxError::ImageOutOfBounds)?;

        let mut raw = [0u8; 10];
        raw[0] = Block::Image.into();
        raw[1..3].copy_from_slice(&gif_u16(left)?.to_le_bytes());
        raw[3..5].copy_from_slice(&gif_u16(top)?.to_le_bytes());
        raw[5..7].copy_from_slice(&gif_u16(self.size.width)?.to_le_bytes());
        raw[7..9].copy_from_slice(&gif_u16(self.size.height)?.to_le_bytes());
        raw[9] = if self.interlaced { 0x40 } else { 0 };
        sink.write(&raw)?;
        Ok(())
    }
}

/// A data sub-block being filled, flushed to the sink once it holds 255 bytes.
struct LilQ {
    buf: [u8; 256],
    size: usize,
}

impl LilQ {
    fn new() -> Self {
        Self {
            buf: [0; 256],
            size: 0,
        }
    }

    #[inline]
    fn full(&self) -> bool {
        self.size >= 255
    }

    fn spare(&mut self) -> &mut [u8] {
        &mut self.buf[1 + self.size..]
    }

    fn flush<S: ByteSink>(&mut self, sink: &mut S) -> Result<(), SyntaxError> {
        if self.size > 0 {
            self.buf[0] = self.size as u8;
            sink.write(&self.buf[..1 + self.size])?;
            self.size = 0;
        }
        Ok(())
    }
}

/// Compresses the rows of one image into LZW data sub-blocks.
///
/// Created right after the image descriptor has been written; writes the minimum code size up
/// front and the block terminator once the last pixel went through.
pub(crate) struct RowEncoder {
    lzw: Encoder,
    block: LilQ,
    remaining: usize,
}

impl RowEncoder {
    pub(crate) fn start<S: ByteSink>(
        min_code_size: u8,
        num_pixels: usize,
        sink: &mut S,
    ) -> Result<Self, SyntaxError> {
        sink.write(&[min_code_size])?;
        Ok(Self {
            lzw: Encoder::new(BitOrder::Lsb, min_code_size),
            block: LilQ::new(),
            remaining: num_pixels,
        })
    }

    /// Pixels still expected before the image is complete.
    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }

    pub(crate) fn put_line<S: ByteSink>(
        &mut self,
        mut line: &[u8],
        sink: &mut S,
    ) -> Result<(), SyntaxError> {
        if line.len() > self.remaining {
            return Err(SyntaxError::DataTooLarge {
                excess: line.len() - self.remaining,
            });
        }
        self.remaining -= line.len();

        while !line.is_empty() {
            if self.block.full() {
                self.block.flush(sink)?;
            }
            let out = self.lzw.encode_bytes(line, self.block.spare());
            self.block.size += out.consumed_out;
            line = &line[out.consumed_in..];
            match out.status {
                Err(_) => return Err(SyntaxError::Compression),
                Ok(LzwStatus::NoProgress) if out.consumed_in == 0 && out.consumed_out == 0 => {
                    return Err(SyntaxError::CompressionStalled)
                }
                Ok(_) => {}
            }
        }

        if self.remaining == 0 {
            self.finish(sink)?;
        }
        Ok(())
    }

    fn finish<S: ByteSink>(&mut self, sink: &mut S) -> Result<(), SyntaxError> {
        self.lzw.finish();
        loop {
            if self.block.full() {
                self.block.flush(sink)?;
            }
            let out = self.lzw.encode_bytes(&[], self.block.spare());
            self.block.size += out.consumed_out;
            match out.status {
                Ok(LzwStatus::Done) => break,
                Ok(_) if out.consumed_out == 0 && !self.block.full() => {
                    return Err(SyntaxError::CompressionStalled)
                }
                Ok(_) => {}
                Err(_) => return Err(SyntaxError::Compression),
            }
        }
        self.block.flush(sink)?;
        // block terminator
        sink.write(&[0])?;
        Ok(())
    }
}
