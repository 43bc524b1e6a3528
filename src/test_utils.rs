use embedded_graphics::{
    pixelcolor::{Gray8, GrayColor},
    prelude::*,
};
use std::{io::Cursor, vec, vec::Vec};

use crate::frame::Frame;

/// Palette index framebuffer; with the greyscale palette a pixel's luma is its index.
pub(crate) struct IndexedFramebuffer {
    size: Size,
    pixels: Vec<u8>,
}

impl IndexedFramebuffer {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![0; size.width as usize * size.height as usize],
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn frame(&self, pts: i64) -> Frame<'_> {
        Frame::packed(&self.pixels, self.size, pts)
    }
}

impl DrawTarget for IndexedFramebuffer {
    type Error = std::convert::Infallible;
    type Color = Gray8;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Gray8>>,
    {
        for Pixel(p, c) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(p.x), u32::try_from(p.y)) {
                if x < self.size.width && y < self.size.height {
                    self.pixels[(y * self.size.width + x) as usize] = c.luma();
                }
            }
        }

        Ok(())
    }
}

impl OriginDimensions for IndexedFramebuffer {
    fn size(&self) -> Size {
        self.size
    }
}

/// Deterministic xorshift noise, barely compressible.
pub(crate) fn noise(len: usize, mut seed: u32) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed >> 24) as u8
        })
        .collect()
}

pub(crate) struct DecodedFrame {
    pub delay: u16,
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<u8>,
}

/// Decodes a complete stream with the `gif` crate, as palette indices.
pub(crate) fn decode(stream: &[u8]) -> Vec<DecodedFrame> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(Cursor::new(stream)).unwrap();

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        frames.push(DecodedFrame {
            delay: frame.delay,
            width: frame.width,
            height: frame.height,
            pixels: frame.buffer.to_vec(),
        });
    }
    frames
}
