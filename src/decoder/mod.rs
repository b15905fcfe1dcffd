// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Hardware decoder abstraction and the image transfers built on top of it.
//!
//! A decoder owns one surface holding the decoded picture. Clients never see the surface
//! directly: they map it through [`HwDecoder::with_image`], either in the surface's native layout
//! (a derived image) or converted into one of the image formats advertised by the decoder, and
//! bind the mapping as an [`Image`] view.

mod dummy;

use std::fmt;

use hwimage::convert;
use hwimage::rgba_format_from_masks;
use hwimage::FramePlane;
use hwimage::Fourcc;
use hwimage::Image;
use hwimage::PixelFormat;
use log::debug;

pub use self::dummy::DummyDecoder;
use crate::codec::DecodeRequest;
use crate::error::Error;
use crate::error::Result;

/// Image formats tried, in order, when neither a format was requested nor a derived image can be
/// used.
pub const FALLBACK_FORMATS: [PixelFormat; 8] = [
    PixelFormat::Yv12,
    PixelFormat::Nv12,
    PixelFormat::Uyvy,
    PixelFormat::Yuyv,
    PixelFormat::Argb,
    PixelFormat::Abgr,
    PixelFormat::Bgra,
    PixelFormat::Rgba,
];

/// Direction of a transfer through a mapped image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// The mapping holds the surface content; changes are discarded.
    Read,
    /// Changes made to the mapping are committed to the surface when it is unmapped.
    Write,
}

/// Order of the bytes of a pixel word in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    LsbFirst,
    MsbFirst,
}

/// Image format record, as reported by a driver.
///
/// Channel masks are only meaningful for RGB formats and select each channel within a pixel word
/// stored in `byte_order`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageFormatDesc {
    pub fourcc: Fourcc,
    pub byte_order: ByteOrder,
    pub bits_per_pixel: u32,
    pub depth: u32,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub alpha_mask: u32,
}

impl ImageFormatDesc {
    /// Describes `format` the way a little-endian driver would.
    pub fn new(format: PixelFormat) -> Self {
        let mut desc = ImageFormatDesc {
            fourcc: format.fourcc(),
            byte_order: ByteOrder::LsbFirst,
            bits_per_pixel: 0,
            depth: 0,
            red_mask: 0,
            green_mask: 0,
            blue_mask: 0,
            alpha_mask: 0,
        };
        match format.rgba_offsets() {
            Some([r, g, b, a]) => {
                let mask = |byte: usize| 0xffu32 << (8 * byte);
                desc.bits_per_pixel = 32;
                desc.depth = 32;
                desc.red_mask = mask(r);
                desc.green_mask = mask(g);
                desc.blue_mask = mask(b);
                desc.alpha_mask = mask(a);
            }
            None => {
                desc.bits_per_pixel = match format {
                    PixelFormat::Ayuv => 32,
                    PixelFormat::Uyvy | PixelFormat::Yuy2 | PixelFormat::Yuyv => 16,
                    _ => 12,
                };
            }
        }
        desc
    }

    /// Resolves the record to a pixel format, going through the channel masks for RGB formats.
    pub fn pixel_format(&self) -> Result<PixelFormat> {
        let format = PixelFormat::try_from(self.fourcc)
            .map_err(|_| Error::UnsupportedImageFormat(self.fourcc))?;
        if !format.is_rgb() {
            return Ok(format);
        }
        rgba_format_from_masks(
            self.bits_per_pixel,
            self.byte_order == ByteOrder::MsbFirst,
            self.red_mask,
            self.green_mask,
            self.blue_mask,
            self.alpha_mask,
        )
        .ok_or(Error::UnsupportedRgbLayout(self.fourcc))
    }
}

impl fmt::Display for ImageFormatDesc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {} bits per pixel", self.fourcc, self.bits_per_pixel)?;
        if self.depth != 0 {
            write!(
                f,
                ", depth {}, {:?}, masks r 0x{:08x} g 0x{:08x} b 0x{:08x} a 0x{:08x}",
                self.depth,
                self.byte_order,
                self.red_mask,
                self.green_mask,
                self.blue_mask,
                self.alpha_mask
            )?;
        }
        Ok(())
    }
}

/// A decoder surface mapped into client memory.
pub struct MappedImage<'a> {
    pub format: ImageFormatDesc,
    pub width: u32,
    pub height: u32,
    pub planes: Vec<FramePlane>,
    pub data: &'a mut [u8],
}

/// A hardware video decoder with a single output surface.
pub trait HwDecoder {
    fn name(&self) -> &'static str;

    /// Allocates the output surface for pictures of `width`x`height` pixels.
    fn init(&mut self, width: u32, height: u32) -> Result<()>;

    /// Size of the output surface, if allocated.
    fn surface_size(&self) -> Option<(u32, u32)>;

    /// Image formats the surface can be mapped in.
    fn image_formats(&self) -> &[ImageFormatDesc];

    /// Whether the surface can be mapped directly in its native layout.
    fn can_derive_image(&self) -> bool;

    /// Decodes one picture into the output surface.
    fn decode(&mut self, request: &DecodeRequest) -> Result<()>;

    /// Maps the output surface in `format`, or in its native layout if `format` is `None`, and
    /// calls `f` with the mapping. The surface is unmapped when `f` returns.
    ///
    /// A mapping in `format` is staged: the changes made by `f` are committed only if `access` is
    /// [`Access::Write`] and `f` succeeded. A derived mapping exposes the surface memory itself,
    /// so its writes land as they are made whatever `f` returns.
    fn with_image(
        &mut self,
        format: Option<&ImageFormatDesc>,
        access: Access,
        f: &mut dyn FnMut(MappedImage) -> Result<()>,
    ) -> Result<()>;
}

/// Chooses the image format a surface is mapped in. `None` selects a derived image.
///
/// A requested format must be advertised by the decoder. Without one, a derived image is used
/// when allowed, and the fallback formats are tried otherwise.
pub fn select_image_format(
    decoder: &dyn HwDecoder,
    requested: Option<PixelFormat>,
    allow_derive: bool,
) -> Result<Option<ImageFormatDesc>> {
    let find = |fourcc: Fourcc| {
        decoder
            .image_formats()
            .iter()
            .find(|desc| desc.fourcc == fourcc)
            .copied()
    };
    if let Some(format) = requested {
        return find(format.fourcc())
            .map(Some)
            .ok_or(Error::UnsupportedImageFormat(format.fourcc()));
    }
    if allow_derive && decoder.can_derive_image() {
        return Ok(None);
    }
    FALLBACK_FORMATS
        .iter()
        .find_map(|format| find(format.fourcc()))
        .map(Some)
        .ok_or(Error::NoImageFormat)
}

/// Wraps a mapped surface in an image view, without copying.
pub fn bind_image(mapped: MappedImage) -> Result<Image> {
    let format = mapped.format.pixel_format()?;
    Image::bind(
        mapped.data,
        &mapped.planes,
        mapped.width,
        mapped.height,
        format,
    )
    .map_err(Error::BindImage)
}

fn describe(format: Option<&ImageFormatDesc>) -> String {
    match format {
        Some(desc) => desc.to_string(),
        None => "derived".to_string(),
    }
}

/// Reads the decoded picture back into `dst`, scaling it to the size of `dst`.
pub fn get_image(
    decoder: &mut dyn HwDecoder,
    dst: &mut Image,
    requested: Option<PixelFormat>,
    allow_derive: bool,
) -> Result<()> {
    let format = select_image_format(decoder, requested, allow_derive)?;
    debug!("selected {} image format for getimage", describe(format.as_ref()));
    decoder.with_image(format.as_ref(), Access::Read, &mut |mapped| {
        let bound = bind_image(mapped)?;
        convert(dst, &bound)?;
        Ok(())
    })
}

/// Uploads `src` to the decoder surface, scaling it to the size of the surface.
pub fn put_image(
    decoder: &mut dyn HwDecoder,
    src: &Image,
    requested: Option<PixelFormat>,
    allow_derive: bool,
) -> Result<()> {
    let format = select_image_format(decoder, requested, allow_derive)?;
    debug!("selected {} image format for putimage", describe(format.as_ref()));
    decoder.with_image(format.as_ref(), Access::Write, &mut |mapped| {
        let mut bound = bind_image(mapped)?;
        convert(&mut bound, src)?;
        Ok(())
    })
}
