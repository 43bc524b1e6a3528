//! A small and opinionated animated gif encoder, primarily for embedded, no-std environments but
//! usable anywhere.
//!
//! Frames of palette indices go in one at a time and come back out as the bytes of that frame, so
//! a gif can be streamed while it is being produced instead of being assembled in memory. The
//! first chunk carries the stream header, [`AnimatedGifEncoder::finalize`] hands back the
//! trailer.
//!
//! ```
//! use anigif::{AnimatedGifEncoder, EncoderConfig, Frame, FrameRate};
//! use embedded_graphics::prelude::Size;
//!
//! let config = EncoderConfig::new(4, 2)
//!     .with_repeat(0)
//!     .with_frame_rate(FrameRate::new(10, 1));
//! let mut encoder = AnimatedGifEncoder::initialize(&config)?;
//!
//! let mut gif = Vec::new();
//! for step in 0..3u8 {
//!     let pixels = [step * 80; 8];
//!     let chunk = encoder.encode_frame(&Frame::packed(&pixels, Size::new(4, 2), step.into()))?;
//!     gif.extend_from_slice(&chunk);
//! }
//! gif.extend_from_slice(&encoder.finalize()?);
//! assert_eq!(gif.last(), Some(&0x3B));
//! # Ok::<(), anigif::EncodeError>(())
//! ```
//!
//! Colors come from a [`PaletteSource`]; the default [`Greyscale`] ramp maps index `i` to
//! `RGB(i, i, i)`, so 8 bit luma can be fed in unchanged. Drawing into frames with
//! [`embedded_graphics`] works through any `DrawTarget<Color = Gray8>` that stores luma bytes.
//!
//! Logging goes through [`tracing`]; dropped frames and a failed close are reported at warn level.

//#![deny(missing_docs)]
#![cfg_attr(not(test), no_std)]
extern crate alloc;

mod common;
mod encoder;
mod frame;
mod header;
mod sink;
#[cfg(test)]
mod test_utils;
mod writer;

pub use common::{
    Block, ConfigError, DisposalMethod, EncodeError, ExtensionLabel, SinkError, SyntaxError,
};
pub use encoder::{
    AnimatedGifEncoder, EncoderConfig, FrameRate, OutputChunk, SessionState, DEFAULT_DELAY,
};
pub use frame::{Frame, ImageDescriptor};
pub use header::{ColorTable, GraphicsControl, Greyscale, LoopByteOrder, LoopCount, PaletteSource};
pub use sink::{ByteSink, GrowableSink};
pub use writer::GifWriter;
