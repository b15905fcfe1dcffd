// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A software decoder whose only purpose is to let the rest of the pipeline run without
//! hardware. Decoding validates the request and leaves a black picture behind.

use hwimage::convert;
use hwimage::FramePlane;
use hwimage::Image;
use hwimage::PixelFormat;
use log::debug;

use super::Access;
use super::HwDecoder;
use super::ImageFormatDesc;
use super::MappedImage;
use crate::codec::DecodeRequest;
use crate::error::Error;
use crate::error::Result;

const SURFACE_ALIGNMENT: usize = 64;
const STAGING_ALIGNMENT: usize = 16;

const IMAGE_FORMATS: [PixelFormat; 9] = [
    PixelFormat::Nv12,
    PixelFormat::Yv12,
    PixelFormat::I420,
    PixelFormat::Uyvy,
    PixelFormat::Yuy2,
    PixelFormat::Bgra,
    PixelFormat::Rgba,
    PixelFormat::Argb,
    PixelFormat::Abgr,
];

const BLACK_LUMA: u8 = 16;
const BLACK_CHROMA: u8 = 128;

fn align_up(value: usize, alignment: usize) -> Option<usize> {
    Some(value.checked_add(alignment - 1)? / alignment * alignment)
}

fn alloc_zeroed(size: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(size)
        .map_err(|_| Error::ImageAllocation(size))?;
    data.resize(size, 0);
    Ok(data)
}

/// Plane layout of a `format` image with rows aligned to `alignment` bytes, and its total size.
///
/// Fails with `ImageAllocation` if the size does not fit in memory.
fn aligned_layout(
    format: PixelFormat,
    width: u32,
    height: u32,
    alignment: usize,
) -> Result<(Vec<FramePlane>, usize)> {
    let too_large = || Error::ImageAllocation(usize::MAX);
    let mut planes = Vec::with_capacity(format.num_planes());
    let mut size: usize = 0;
    for plane in 0..format.num_planes() {
        let stride = align_up(format.row_bytes(plane, width), alignment).ok_or_else(too_large)?;
        planes.push(FramePlane {
            offset: size,
            stride,
        });
        size = stride
            .checked_mul(format.plane_rows(plane, height))
            .and_then(|len| size.checked_add(len))
            .ok_or_else(too_large)?;
    }
    Ok((planes, size))
}

/// NV12 picture memory.
struct Surface {
    width: u32,
    height: u32,
    planes: Vec<FramePlane>,
    data: Vec<u8>,
}

impl Surface {
    fn new(width: u32, height: u32) -> Result<Self> {
        let (planes, size) = aligned_layout(PixelFormat::Nv12, width, height, SURFACE_ALIGNMENT)?;
        let mut surface = Surface {
            width,
            height,
            planes,
            data: alloc_zeroed(size)?,
        };
        surface.clear();
        Ok(surface)
    }

    fn clear(&mut self) {
        let chroma_offset = self.planes[1].offset;
        self.data[..chroma_offset].fill(BLACK_LUMA);
        self.data[chroma_offset..].fill(BLACK_CHROMA);
    }

    fn image(&mut self) -> Result<Image> {
        Image::bind(
            &mut self.data,
            &self.planes,
            self.width,
            self.height,
            PixelFormat::Nv12,
        )
        .map_err(Error::BindImage)
    }
}

/// Software stand-in for a hardware decoder, backed by an NV12 surface in system memory.
pub struct DummyDecoder {
    formats: Vec<ImageFormatDesc>,
    surface: Option<Surface>,
}

impl DummyDecoder {
    pub fn new() -> Self {
        DummyDecoder {
            formats: IMAGE_FORMATS.iter().copied().map(ImageFormatDesc::new).collect(),
            surface: None,
        }
    }
}

impl Default for DummyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HwDecoder for DummyDecoder {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn init(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidPictureSize(width, height));
        }
        self.surface = Some(Surface::new(width, height)?);
        debug!("dummy: allocated {}x{} NV12 surface", width, height);
        Ok(())
    }

    fn surface_size(&self) -> Option<(u32, u32)> {
        self.surface.as_ref().map(|s| (s.width, s.height))
    }

    fn image_formats(&self) -> &[ImageFormatDesc] {
        &self.formats
    }

    fn can_derive_image(&self) -> bool {
        true
    }

    fn decode(&mut self, request: &DecodeRequest) -> Result<()> {
        let surface = self.surface.as_mut().ok_or(Error::NoSurface)?;
        if (request.width, request.height) != (surface.width, surface.height) {
            return Err(Error::MismatchedPictureSize {
                request_width: request.width,
                request_height: request.height,
                width: surface.width,
                height: surface.height,
            });
        }
        if request.slices.is_empty() {
            return Err(Error::NoSlices);
        }
        debug!(
            "dummy: decoding {:?} picture, {} slices, {} bytes of stream",
            request.profile,
            request.slices.len(),
            request.stream.len()
        );
        surface.clear();
        Ok(())
    }

    fn with_image(
        &mut self,
        format: Option<&ImageFormatDesc>,
        access: Access,
        f: &mut dyn FnMut(MappedImage) -> Result<()>,
    ) -> Result<()> {
        let surface = self.surface.as_mut().ok_or(Error::NoSurface)?;
        let (width, height) = (surface.width, surface.height);

        let desc = match format {
            // The surface memory is handed out as is. Writes land as they are made, even if
            // `f` fails.
            None => {
                return f(MappedImage {
                    format: ImageFormatDesc::new(PixelFormat::Nv12),
                    width,
                    height,
                    planes: surface.planes.clone(),
                    data: &mut surface.data,
                })
            }
            Some(desc) => desc,
        };
        if !self.formats.contains(desc) {
            return Err(Error::UnsupportedImageFormat(desc.fourcc));
        }

        let pixel_format = desc.pixel_format()?;
        let (planes, size) = aligned_layout(pixel_format, width, height, STAGING_ALIGNMENT)?;
        let mut staging = alloc_zeroed(size)?;
        if access == Access::Read {
            let mut view = Image::bind(&mut staging, &planes, width, height, pixel_format)
                .map_err(Error::BindImage)?;
            convert(&mut view, &surface.image()?)?;
        }

        f(MappedImage {
            format: *desc,
            width,
            height,
            planes: planes.clone(),
            data: &mut staging,
        })?;

        if access == Access::Write {
            let view = Image::bind(&mut staging, &planes, width, height, pixel_format)
                .map_err(Error::BindImage)?;
            convert(&mut surface.image()?, &view)?;
        }
        Ok(())
    }
}
