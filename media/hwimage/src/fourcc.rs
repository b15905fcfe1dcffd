// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Registry of the pixel formats images can be stored in.

use std::fmt;
use std::str::FromStr;

use enumn::N;
use remain::sorted;
use thiserror::Error as ThisError;

/// Packs four characters into a little-endian FourCC code.
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

/// A raw FourCC code, as reported by drivers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Fourcc(pub u32);

impl From<&[u8; 4]> for Fourcc {
    fn from(code: &[u8; 4]) -> Self {
        Fourcc(fourcc(code))
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in self.0.to_le_bytes() {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

#[sorted]
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown image format name \"{0}\"")]
    UnknownName(String),
    #[error("unsupported FourCC {0}")]
    UnsupportedFourcc(Fourcc),
}

/// How the pixels of a format are laid out in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatClass {
    /// Luma and chroma in separate planes, chroma subsampled 2x2.
    PlanarYuv,
    /// All YUV components interleaved in a single plane.
    PackedYuv,
    /// One 32-bit word per pixel.
    PackedRgb,
}

/// Pixel formats an `Image` can hold. The discriminant is the FourCC code.
///
/// For the RGB formats the name gives the order of the bytes in memory, e.g. `Bgra` stores blue
/// at the lowest address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, N)]
#[repr(u32)]
pub enum PixelFormat {
    Nv12 = fourcc(b"NV12"),
    Yv12 = fourcc(b"YV12"),
    Iyuv = fourcc(b"IYUV"),
    I420 = fourcc(b"I420"),
    Ayuv = fourcc(b"AYUV"),
    Uyvy = fourcc(b"UYVY"),
    Yuy2 = fourcc(b"YUY2"),
    Yuyv = fourcc(b"YUYV"),
    Argb = fourcc(b"ARGB"),
    Bgra = fourcc(b"BGRA"),
    Rgba = fourcc(b"RGBA"),
    Abgr = fourcc(b"ABGR"),
}

/// Every supported format, in registry order.
pub const ALL_FORMATS: [PixelFormat; 12] = [
    PixelFormat::Nv12,
    PixelFormat::Yv12,
    PixelFormat::Iyuv,
    PixelFormat::I420,
    PixelFormat::Ayuv,
    PixelFormat::Uyvy,
    PixelFormat::Yuy2,
    PixelFormat::Yuyv,
    PixelFormat::Argb,
    PixelFormat::Bgra,
    PixelFormat::Rgba,
    PixelFormat::Abgr,
];

impl PixelFormat {
    /// The native 32-bit RGB format: a pixel read as a native `u32` is `0xAARRGGBB`.
    pub const fn rgb32() -> PixelFormat {
        if cfg!(target_endian = "big") {
            PixelFormat::Argb
        } else {
            PixelFormat::Bgra
        }
    }

    pub fn fourcc(self) -> Fourcc {
        Fourcc(self as u32)
    }

    pub fn classify(self) -> FormatClass {
        use PixelFormat::*;
        match self {
            Nv12 | Yv12 | Iyuv | I420 => FormatClass::PlanarYuv,
            Ayuv | Uyvy | Yuy2 | Yuyv => FormatClass::PackedYuv,
            Argb | Bgra | Rgba | Abgr => FormatClass::PackedRgb,
        }
    }

    pub fn is_rgb(self) -> bool {
        self.classify() == FormatClass::PackedRgb
    }

    pub fn num_planes(self) -> usize {
        match self {
            PixelFormat::Nv12 => 2,
            PixelFormat::Yv12 | PixelFormat::Iyuv | PixelFormat::I420 => 3,
            _ => 1,
        }
    }

    /// Number of rows of `plane` in an image `height` pixels tall.
    pub fn plane_rows(self, plane: usize, height: u32) -> usize {
        let height = height as usize;
        if plane > 0 {
            height / 2 + height % 2
        } else {
            height
        }
    }

    /// Number of bytes holding pixel data in one row of `plane` for an image `width` pixels wide.
    pub fn row_bytes(self, plane: usize, width: u32) -> usize {
        let width = width as usize;
        let half = width / 2 + width % 2;
        match (self.classify(), plane) {
            (FormatClass::PlanarYuv, 0) => width,
            (FormatClass::PlanarYuv, _) if self == PixelFormat::Nv12 => half.saturating_mul(2),
            (FormatClass::PlanarYuv, _) => half,
            (FormatClass::PackedYuv, _) if self == PixelFormat::Ayuv => width.saturating_mul(4),
            (FormatClass::PackedYuv, _) => half.saturating_mul(4),
            (FormatClass::PackedRgb, _) => width.saturating_mul(4),
        }
    }

    /// Byte index of the red, green, blue and alpha components within a pixel.
    pub fn rgba_offsets(self) -> Option<[usize; 4]> {
        match self {
            PixelFormat::Argb => Some([1, 2, 3, 0]),
            PixelFormat::Bgra => Some([2, 1, 0, 3]),
            PixelFormat::Rgba => Some([0, 1, 2, 3]),
            PixelFormat::Abgr => Some([3, 2, 1, 0]),
            _ => None,
        }
    }

    /// Lower case name used on the command line.
    pub fn name(self) -> &'static str {
        use PixelFormat::*;
        match self {
            Nv12 => "nv12",
            Yv12 => "yv12",
            Iyuv => "iyuv",
            I420 => "i420",
            Ayuv => "ayuv",
            Uyvy => "uyvy",
            Yuy2 => "yuy2",
            Yuyv => "yuyv",
            Argb => "argb",
            Bgra => "bgra",
            Rgba => "rgba",
            Abgr => "abgr",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.fourcc())
    }
}

impl FromStr for PixelFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase();
        if name == "rgb32" {
            return Ok(PixelFormat::rgb32());
        }
        ALL_FORMATS
            .iter()
            .copied()
            .find(|f| f.name() == name)
            .ok_or_else(|| FormatError::UnknownName(s.to_owned()))
    }
}

impl TryFrom<Fourcc> for PixelFormat {
    type Error = FormatError;

    fn try_from(code: Fourcc) -> Result<Self, Self::Error> {
        PixelFormat::n(code.0).ok_or(FormatError::UnsupportedFourcc(code))
    }
}

/// Finds the 32-bit RGB format matching a driver's description of its pixel layout.
///
/// The masks select each component within a 32-bit word stored with the given byte order. Only
/// layouts where every component, alpha included, occupies a whole byte are recognized; anything
/// else yields `None`.
pub fn rgba_format_from_masks(
    bits_per_pixel: u32,
    msb_first: bool,
    red_mask: u32,
    green_mask: u32,
    blue_mask: u32,
    alpha_mask: u32,
) -> Option<PixelFormat> {
    if bits_per_pixel != 32 {
        return None;
    }
    let mut offsets = [0usize; 4];
    for (offset, mask) in offsets
        .iter_mut()
        .zip([red_mask, green_mask, blue_mask, alpha_mask])
    {
        let shift = mask.trailing_zeros();
        if shift % 8 != 0 || mask.checked_shr(shift) != Some(0xff) {
            return None;
        }
        let byte = (shift / 8) as usize;
        *offset = if msb_first { 3 - byte } else { byte };
    }
    ALL_FORMATS
        .iter()
        .copied()
        .find(|f| f.rgba_offsets() == Some(offsets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_is_little_endian() {
        assert_eq!(fourcc(b"NV12"), 0x3231_564e);
        assert_eq!(PixelFormat::Nv12.fourcc(), Fourcc::from(b"NV12"));
        assert_eq!(PixelFormat::Yuy2.to_string(), "YUY2");
        assert_eq!(Fourcc(0x0001_4142).to_string(), "BA??");
    }

    #[test]
    fn unknown_fourcc_is_rejected() {
        assert_eq!(
            PixelFormat::try_from(Fourcc::from(b"XRGB")),
            Err(FormatError::UnsupportedFourcc(Fourcc::from(b"XRGB")))
        );
        assert_eq!(
            PixelFormat::try_from(Fourcc::from(b"I420")),
            Ok(PixelFormat::I420)
        );
    }

    #[test]
    fn names_round_trip() {
        for format in ALL_FORMATS {
            assert_eq!(format.name().parse::<PixelFormat>(), Ok(format));
        }
        assert_eq!("RGB32".parse::<PixelFormat>(), Ok(PixelFormat::rgb32()));
        assert!("rgb24".parse::<PixelFormat>().is_err());
    }

    #[test]
    fn rgb32_reads_as_argb_word() {
        let offsets = PixelFormat::rgb32().rgba_offsets().unwrap();
        let word = 0x8011_2233u32.to_ne_bytes();
        assert_eq!(
            [word[offsets[0]], word[offsets[1]], word[offsets[2]], word[offsets[3]]],
            [0x11, 0x22, 0x33, 0x80]
        );
    }

    #[test]
    fn classification() {
        assert_eq!(PixelFormat::Yv12.classify(), FormatClass::PlanarYuv);
        assert_eq!(PixelFormat::Ayuv.classify(), FormatClass::PackedYuv);
        assert_eq!(PixelFormat::Abgr.classify(), FormatClass::PackedRgb);
        assert_eq!(PixelFormat::Nv12.num_planes(), 2);
        assert_eq!(PixelFormat::Nv12.row_bytes(1, 5), 6);
        assert_eq!(PixelFormat::I420.row_bytes(2, 5), 3);
        assert_eq!(PixelFormat::Uyvy.row_bytes(0, 5), 12);
        assert_eq!(PixelFormat::I420.plane_rows(1, 5), 3);
    }

    #[test]
    fn masks_in_native_order() {
        // LSB first: the red mask's low byte comes first in memory.
        assert_eq!(
            rgba_format_from_masks(32, false, 0xff, 0xff00, 0xff_0000, 0xff00_0000),
            Some(PixelFormat::Rgba)
        );
        assert_eq!(
            rgba_format_from_masks(32, false, 0xff_0000, 0xff00, 0xff, 0xff00_0000),
            Some(PixelFormat::Bgra)
        );
        assert_eq!(
            rgba_format_from_masks(32, false, 0xff00_0000, 0xff_0000, 0xff00, 0xff),
            Some(PixelFormat::Abgr)
        );
        assert_eq!(
            rgba_format_from_masks(32, false, 0xff00, 0xff_0000, 0xff00_0000, 0xff),
            Some(PixelFormat::Argb)
        );
    }

    #[test]
    fn masks_in_reversed_order() {
        assert_eq!(
            rgba_format_from_masks(32, true, 0xff00_0000, 0xff_0000, 0xff00, 0xff),
            Some(PixelFormat::Rgba)
        );
        assert_eq!(
            rgba_format_from_masks(32, true, 0xff00, 0xff_0000, 0xff00_0000, 0xff),
            Some(PixelFormat::Bgra)
        );
        assert_eq!(
            rgba_format_from_masks(32, true, 0xff_0000, 0xff00, 0xff, 0xff00_0000),
            Some(PixelFormat::Argb)
        );
    }

    #[test]
    fn unknown_layouts_yield_none() {
        // No alpha channel.
        assert_eq!(
            rgba_format_from_masks(32, false, 0xff_0000, 0xff00, 0xff, 0),
            None
        );
        // 16-bit RGB565.
        assert_eq!(
            rgba_format_from_masks(16, false, 0xf800, 0x7e0, 0x1f, 0),
            None
        );
        // Components that do not sit on byte boundaries.
        assert_eq!(
            rgba_format_from_masks(32, false, 0x3ff0_0000, 0xffc00, 0x3ff, 0xc000_0000),
            None
        );
    }
}
