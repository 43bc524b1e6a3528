//! This example renders a bouncing disc with embedded-graphics and streams it into an animated GIF.
//!
//! Basic usage: `cargo run --example encode -- OUTPUT_FILE`
//!
//! More usage and arguments can be listed by running `cargo run --example encode -- --help`

use anigif::{AnimatedGifEncoder, EncoderConfig, FrameRate};
use clap::Parser;
use embedded_graphics::{
    pixelcolor::{Gray8, GrayColor},
    prelude::*,
    primitives::{Circle, PrimitiveStyle, Rectangle},
};
use std::{error::Error, fs::File, io::Write, num::NonZeroU32, path::PathBuf};

#[derive(Parser)]
struct Args {
    /// Canvas width
    #[clap(long, default_value = "96")]
    width: NonZeroU32,

    /// Canvas height
    #[clap(long, default_value = "64")]
    height: NonZeroU32,

    /// Number of frames to render
    #[clap(long, default_value = "40")]
    frames: u32,

    /// Frames per second, 0 for the default delay
    #[clap(long, default_value = "20")]
    fps: u32,

    /// How often to repeat the animation, up to 65535. 0 means infinite, -1 means no loop at all
    #[clap(long = "loop", default_value = "0", allow_hyphen_values = true)]
    repeat: i64,

    /// Output GIF file
    gif_file: PathBuf,
}

struct Canvas {
    size: Size,
    pixels: Vec<u8>,
}

impl DrawTarget for Canvas {
    type Error = std::convert::Infallible;
    type Color = Gray8;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Gray8>>,
    {
        for Pixel(p, c) in pixels {
            if self.bounding_box().contains(p) {
                self.pixels[p.y as usize * self.size.width as usize + p.x as usize] = c.luma();
            }
        }

        Ok(())
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        self.size
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let size = Size::new(args.width.get(), args.height.get());
    let config = EncoderConfig::new(size.width, size.height)
        .with_repeat(args.repeat)
        .with_frame_rate(FrameRate::new(args.fps, 1));
    let mut encoder = AnimatedGifEncoder::initialize(&config)?;
    let mut out = File::create(&args.gif_file)?;

    let diameter = size.height / 3;
    let travel = size.width.saturating_sub(diameter) as i32;
    let mut canvas = Canvas {
        size,
        pixels: vec![0; (size.width * size.height) as usize],
    };
    for step in 0..args.frames as i32 {
        // triangle wave across the canvas
        let phase = (step * 6) % (2 * travel.max(1));
        let x = if phase > travel { 2 * travel - phase } else { phase };

        canvas.clear(Gray8::new(24))?;
        Rectangle::new(Point::new(0, size.height.saturating_sub(4) as i32), Size::new(size.width, 4))
            .into_styled(PrimitiveStyle::with_fill(Gray8::new(120)))
            .draw(&mut canvas)?;
        Circle::new(Point::new(x, (size.height / 3) as i32), diameter)
            .into_styled(PrimitiveStyle::with_fill(Gray8::WHITE))
            .draw(&mut canvas)?;

        let frame = anigif::Frame::packed(&canvas.pixels, size, step.into());
        match encoder.encode_frame(&frame) {
            Ok(chunk) => out.write_all(&chunk)?,
            Err(err) if !err.is_fatal() => continue,
            Err(err) => return Err(err.into()),
        }
    }

    out.write_all(&encoder.finalize()?)?;
    Ok(())
}
