use embedded_graphics::{
    pixelcolor::{Rgb888, RgbColor},
    prelude::Size,
};
use smallvec::SmallVec;

use alloc::vec::Vec;

use crate::{
    common::{ConfigError, DisposalMethod, SyntaxError},
    sink::ByteSink,
};

/// Application identifier of the loop count extension.
pub(crate) const NETSCAPE_ID: &[u8; 11] = b"NETSCAPE2.0";

/// Up to 256 palette entries, addressed by pixel index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorTable {
    table: SmallVec<[Rgb888; 256]>,
}

impl ColorTable {
    pub fn new<I: IntoIterator<Item = Rgb888>>(colors: I) -> Result<Self, ConfigError> {
        let table: SmallVec<[Rgb888; 256]> = colors.into_iter().take(257).collect();
        if table.is_empty() || table.len() > 256 {
            return Err(ConfigError::PaletteSize(table.len()));
        }
        Ok(Self { table })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, idx: u8) -> Option<Rgb888> {
        self.table.get(usize::from(idx)).copied()
    }

    /// The 3 bit size field of the format: the table holds `2^(exponent + 1)` entries.
    pub fn size_exponent(&self) -> u8 {
        let mut exponent = 0;
        while (2usize << exponent) < self.table.len() {
            exponent += 1;
        }
        exponent
    }

    /// Number of entries written to the stream, the palette padded to a power of two.
    pub fn encoded_len(&self) -> usize {
        2 << self.size_exponent()
    }

    /// LZW minimum code size for pixel data indexing this table.
    pub fn min_code_size(&self) -> u8 {
        (self.size_exponent() + 1).max(2)
    }

    pub(crate) fn write_to<S: ByteSink>(&self, sink: &mut S) -> Result<(), SyntaxError> {
        let mut raw = [0u8; 256 * 3];
        for (entry, color) in raw.chunks_exact_mut(3).zip(&self.table) {
            entry.copy_from_slice(&[color.r(), color.g(), color.b()]);
        }
        sink.write(&raw[..self.encoded_len() * 3])?;
        Ok(())
    }
}

/// Anything that can hand the encoder its global palette.
///
/// The default is [`Greyscale`]; a quantizer producing a palette per stream plugs in here.
pub trait PaletteSource {
    fn color_table(&self) -> Result<ColorTable, ConfigError>;
}

/// 256 entry ramp where index `i` maps to `RGB(i, i, i)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Greyscale;

impl PaletteSource for Greyscale {
    fn color_table(&self) -> Result<ColorTable, ConfigError> {
        ColorTable::new((0..=255u8).map(|i| Rgb888::new(i, i, i)))
    }
}

impl PaletteSource for ColorTable {
    fn color_table(&self) -> Result<ColorTable, ConfigError> {
        Ok(self.clone())
    }
}

impl PaletteSource for Vec<Rgb888> {
    fn color_table(&self) -> Result<ColorTable, ConfigError> {
        ColorTable::new(self.iter().copied())
    }
}

impl<const N: usize> PaletteSource for [Rgb888; N] {
    fn color_table(&self) -> Result<ColorTable, ConfigError> {
        ColorTable::new(self.iter().copied())
    }
}

/// Signature plus logical screen descriptor plus global color table.
pub struct Header<'a> {
    /// Gif size in pixels.
    pub image_size: Size,

    /// Global color table
    pub global_table: &'a ColorTable,

    pub background_color: u8,
}

impl Header<'_> {
    pub(crate) fn write_to<S: ByteSink>(&self, sink: &mut S) -> Result<(), SyntaxError> {
        let width = gif_u16(self.image_size.width)?;
        let height = gif_u16(self.image_size.height)?;
        let exponent = self.global_table.size_exponent();
        // table present, color resolution and table size both derived from the table
        let packed = 0x80 | (exponent << 4) | exponent;

        let mut raw = [0u8; 13];
        raw[..6].copy_from_slice(b"GIF89a");
        raw[6..8].copy_from_slice(&width.to_le_bytes());
        raw[8..10].copy_from_slice(&height.to_le_bytes());
        raw[10] = packed;
        raw[11] = self.background_color;
        raw[12] = 0;
        sink.write(&raw)?;
        self.global_table.write_to(sink)
    }
}

pub(crate) fn gif_u16(value: u32) -> Result<u16, SyntaxError> {
    u16::try_from(value).map_err(|_| SyntaxError::DimensionOverflow(value))
}

/// Graphics control extension payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphicsControl {
    pub disposal: DisposalMethod,
    pub user_input: bool,
    ///Delay time, in hundredths of a second
    pub delay_time: u16,
    ///table index for a transparent color
    pub transparent_idx: Option<u8>,
}

impl GraphicsControl {
    /// The 4 byte sub-block body: flags, delay low, delay high, transparent index.
    pub fn to_bytes(&self) -> [u8; 4] {
        let delay = self.delay_time.to_le_bytes();
        let ctrl = ((self.disposal as u8) << 2)
            | (u8::from(self.user_input) << 1)
            | u8::from(self.transparent_idx.is_some());
        [
            ctrl,
            delay[0],
            delay[1],
            self.transparent_idx.unwrap_or(0),
        ]
    }
}

/// How often an animation repeats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopCount {
    /// No loop metadata at all, the animation plays once.
    Once,
    /// Loop forever, written as 0.
    Infinite,
    /// Repeat the given number of times.
    Repeat(u16),
}

impl LoopCount {
    /// Interprets a repeat request: -1 plays once, 0 loops forever, anything above 65535 is
    /// capped.
    pub fn from_repeat(repeat: i64) -> Result<Self, ConfigError> {
        match repeat {
            -1 => Ok(LoopCount::Once),
            0 => Ok(LoopCount::Infinite),
            n if n < 0 => Err(ConfigError::LoopCount(n)),
            n => Ok(LoopCount::Repeat(u16::try_from(n).unwrap_or(u16::MAX))),
        }
    }

    /// Value of the extension's loop field, `None` when no extension is written.
    pub fn wire_value(&self) -> Option<u16> {
        match *self {
            LoopCount::Once => None,
            LoopCount::Infinite => Some(0),
            LoopCount::Repeat(n) => Some(n),
        }
    }
}

/// Byte order of the loop field in the NETSCAPE2.0 sub-block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopByteOrder {
    /// High byte first.
    #[default]
    HighFirst,
    /// Little endian, the order most decoders read.
    LowFirst,
}

/// The 3 byte data sub-block of the NETSCAPE2.0 extension.
pub(crate) fn netscape_loop_block(count: u16, order: LoopByteOrder) -> [u8; 3] {
    let [hi, lo] = count.to_be_bytes();
    match order {
        LoopByteOrder::HighFirst => [0x1, hi, lo],
        LoopByteOrder::LowFirst => [0x1, lo, hi],
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn greyscale_ramp() {
        let table = Greyscale.color_table().unwrap();
        assert_eq!(table.len(), 256);
        assert_eq!(table.get(0), Some(Rgb888::new(0, 0, 0)));
        assert_eq!(table.get(200), Some(Rgb888::new(200, 200, 200)));
        assert_eq!(table.size_exponent(), 7);
        assert_eq!(table.min_code_size(), 8);
    }

    #[test]
    fn small_tables_pad_to_power_of_two() {
        let table = [Rgb888::RED, Rgb888::GREEN, Rgb888::BLUE].color_table().unwrap();
        assert_eq!(table.size_exponent(), 1);
        assert_eq!(table.encoded_len(), 4);
        assert_eq!(table.min_code_size(), 2);

        let mut raw = Vec::new();
        table.write_to(&mut raw).unwrap();
        assert_eq!(raw, [255, 0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0]);

        let single = ColorTable::new([Rgb888::WHITE]).unwrap();
        assert_eq!(single.encoded_len(), 2);
        assert_eq!(single.min_code_size(), 2);
    }

    #[test]
    fn palette_size_is_checked() {
        assert_eq!(
            ColorTable::new(core::iter::empty()),
            Err(ConfigError::PaletteSize(0))
        );
        assert_eq!(
            ColorTable::new(core::iter::repeat(Rgb888::BLACK).take(300)),
            Err(ConfigError::PaletteSize(257))
        );
    }

    #[test]
    fn header_parses_with_gif_crate() {
        let table = Greyscale.color_table().unwrap();
        let header = Header {
            image_size: Size::new(300, 17),
            global_table: &table,
            background_color: 0,
        };
        let mut raw = Vec::new();
        header.write_to(&mut raw).unwrap();
        raw.push(0x3B);
        assert_eq!(&raw[..6], b"GIF89a");
        assert_eq!(raw.len(), 13 + 768 + 1);

        let decoder = gif::DecodeOptions::new()
            .read_info(Cursor::new(raw))
            .unwrap();
        assert_eq!((decoder.width(), decoder.height()), (300, 17));
        let pal = decoder.global_palette().unwrap();
        assert_eq!(&pal[3 * 9..3 * 10], &[9, 9, 9]);
    }

    #[test]
    fn header_rejects_wide_screens() {
        let table = Greyscale.color_table().unwrap();
        let header = Header {
            image_size: Size::new(70_000, 1),
            global_table: &table,
            background_color: 0,
        };
        let mut raw = Vec::new();
        assert_eq!(
            header.write_to(&mut raw),
            Err(SyntaxError::DimensionOverflow(70_000))
        );
    }

    #[test]
    fn graphics_control_bytes() {
        let gcb = GraphicsControl {
            disposal: DisposalMethod::OverwriteWithBG,
            user_input: false,
            delay_time: 300,
            transparent_idx: None,
        };
        assert_eq!(gcb.to_bytes(), [0x08, 0x2C, 0x01, 0x00]);

        let gcb = GraphicsControl {
            transparent_idx: Some(5),
            ..gcb
        };
        assert_eq!(gcb.to_bytes(), [0x09, 0x2C, 0x01, 0x05]);
    }

    #[test]
    fn repeat_requests() {
        assert_eq!(LoopCount::from_repeat(-1), Ok(LoopCount::Once));
        assert_eq!(LoopCount::from_repeat(0), Ok(LoopCount::Infinite));
        assert_eq!(LoopCount::from_repeat(3), Ok(LoopCount::Repeat(3)));
        assert_eq!(
            LoopCount::from_repeat(1_000_000),
            Ok(LoopCount::Repeat(65535))
        );
        assert_eq!(LoopCount::from_repeat(-2), Err(ConfigError::LoopCount(-2)));
        assert_eq!(LoopCount::Once.wire_value(), None);
        assert_eq!(LoopCount::Infinite.wire_value(), Some(0));
    }

    #[test]
    fn loop_block_byte_order() {
        for count in [0u16, 1, 255, 256, 0x1234, 65535] {
            let [id, hi, lo] = netscape_loop_block(count, LoopByteOrder::HighFirst);
            assert_eq!(id, 1);
            assert_eq!(u16::from(hi) << 8 | u16::from(lo), count);

            let [_, lo, hi] = netscape_loop_block(count, LoopByteOrder::LowFirst);
            assert_eq!(u16::from_le_bytes([lo, hi]), count);
        }
    }
}
