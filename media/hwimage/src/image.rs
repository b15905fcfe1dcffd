// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Memory layout of a picture: its planes, their strides and offsets, and the pixel memory they
//! point into.

use remain::sorted;
use thiserror::Error as ThisError;

use crate::fourcc::FormatClass;
use crate::fourcc::PixelFormat;

/// Upper bound on the number of planes of an image.
pub const MAX_IMAGE_PLANES: usize = 3;

#[sorted]
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ImageError {
    #[error("failed to allocate {0} bytes of pixel memory")]
    AllocationFailed(usize),
    #[error("invalid image dimensions {0}x{1}")]
    InvalidDimensions(u32, u32),
    #[error("plane {0} does not fit in the bound memory or overlaps another plane")]
    InvalidLayout(usize),
    #[error("{format} images have {expected} planes, {got} were given")]
    PlaneCount {
        format: PixelFormat,
        expected: usize,
        got: usize,
    },
    #[error("unsupported image format {0}")]
    UnsupportedFormat(PixelFormat),
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// Location of one plane inside the pixel memory of an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FramePlane {
    /// Offset of the first byte of the plane.
    pub offset: usize,
    /// Distance in bytes between the starts of two consecutive rows.
    pub stride: usize,
}

enum Storage<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
}

/// A picture in one of the formats of the registry.
///
/// An image either owns its pixel memory, when built with [`Image::new`], or is a view over
/// memory owned by someone else, typically a mapped driver buffer, when built with
/// [`Image::bind`]. Dropping a view never releases the memory it points to; the borrow ends and
/// the owner remains responsible for unmapping it.
pub struct Image<'a> {
    format: PixelFormat,
    width: u32,
    height: u32,
    num_planes: usize,
    planes: [FramePlane; MAX_IMAGE_PLANES],
    lens: [usize; MAX_IMAGE_PLANES],
    storage: Storage<'a>,
}

/// Bytes spanned by a plane, from its first byte to the end of its last row of pixels, or `None`
/// if that does not fit in a `usize`.
fn plane_extent(
    format: PixelFormat,
    plane: usize,
    width: u32,
    height: u32,
    stride: usize,
) -> Option<usize> {
    let rows = format.plane_rows(plane, height);
    stride
        .checked_mul(rows - 1)?
        .checked_add(format.row_bytes(plane, width))
}

impl Image<'static> {
    /// Allocates a zeroed image laid out with tightly packed rows.
    ///
    /// Only packed RGB, NV12 and the three-plane 4:2:0 formats can be allocated; packed YUV
    /// formats only exist as views over driver memory.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions(width, height));
        }
        let too_large = || ImageError::AllocationFailed(usize::MAX);
        let (w, h) = (width as usize, height as usize);
        let luma = w.checked_mul(h).ok_or_else(too_large)?;
        let chroma_stride = format.row_bytes(1, width);
        let chroma = chroma_stride
            .checked_mul(format.plane_rows(1, height))
            .ok_or_else(too_large)?;

        let mut planes = [FramePlane::default(); MAX_IMAGE_PLANES];
        let size = match format.classify() {
            FormatClass::PackedRgb => {
                let stride = format.row_bytes(0, width);
                planes[0] = FramePlane { offset: 0, stride };
                stride.checked_mul(h).ok_or_else(too_large)?
            }
            FormatClass::PlanarYuv if format == PixelFormat::Nv12 => {
                planes[0] = FramePlane {
                    offset: 0,
                    stride: w,
                };
                planes[1] = FramePlane {
                    offset: luma,
                    stride: chroma_stride,
                };
                luma.checked_add(chroma).ok_or_else(too_large)?
            }
            FormatClass::PlanarYuv => {
                let v_offset = luma.checked_add(chroma).ok_or_else(too_large)?;
                planes[0] = FramePlane {
                    offset: 0,
                    stride: w,
                };
                planes[1] = FramePlane {
                    offset: luma,
                    stride: chroma_stride,
                };
                planes[2] = FramePlane {
                    offset: v_offset,
                    stride: chroma_stride,
                };
                v_offset.checked_add(chroma).ok_or_else(too_large)?
            }
            FormatClass::PackedYuv => return Err(ImageError::UnsupportedFormat(format)),
        };

        let num_planes = format.num_planes();
        let mut lens = [0; MAX_IMAGE_PLANES];
        for (plane, (len, frame_plane)) in lens.iter_mut().zip(&planes).enumerate().take(num_planes)
        {
            *len = plane_extent(format, plane, width, height, frame_plane.stride)
                .ok_or_else(too_large)?;
        }

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| ImageError::AllocationFailed(size))?;
        data.resize(size, 0);

        Ok(Image {
            format,
            width,
            height,
            num_planes,
            planes,
            lens,
            storage: Storage::Owned(data),
        })
    }
}

impl<'a> Image<'a> {
    /// Wraps memory owned elsewhere without copying it.
    ///
    /// `planes` gives the offset and stride of every plane of `format`, in plane order. Every
    /// plane must fit inside `data` and planes must not overlap.
    pub fn bind(
        data: &'a mut [u8],
        planes: &[FramePlane],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions(width, height));
        }
        let expected = format.num_planes();
        if planes.len() != expected {
            return Err(ImageError::PlaneCount {
                format,
                expected,
                got: planes.len(),
            });
        }

        let mut layout = [FramePlane::default(); MAX_IMAGE_PLANES];
        layout[..expected].copy_from_slice(planes);
        let mut lens = [0; MAX_IMAGE_PLANES];
        let mut extents = Vec::with_capacity(expected);
        for (plane, frame_plane) in planes.iter().enumerate() {
            if frame_plane.stride < format.row_bytes(plane, width) {
                return Err(ImageError::InvalidLayout(plane));
            }
            let len = plane_extent(format, plane, width, height, frame_plane.stride)
                .ok_or(ImageError::InvalidLayout(plane))?;
            let end = frame_plane
                .offset
                .checked_add(len)
                .filter(|&end| end <= data.len())
                .ok_or(ImageError::InvalidLayout(plane))?;
            lens[plane] = len;
            extents.push((frame_plane.offset, end, plane));
        }
        extents.sort_unstable();
        for pair in extents.windows(2) {
            if pair[0].1 > pair[1].0 {
                return Err(ImageError::InvalidLayout(pair[1].2));
            }
        }
        Ok(Image {
            format,
            width,
            height,
            num_planes: expected,
            planes: layout,
            lens,
            storage: Storage::Borrowed(data),
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn num_planes(&self) -> usize {
        self.num_planes
    }

    pub fn stride(&self, plane: usize) -> usize {
        self.planes[plane].stride
    }

    pub fn offset(&self, plane: usize) -> usize {
        self.planes[plane].offset
    }

    /// Size of the owned pixel memory, or 0 for views.
    pub fn data_size(&self) -> usize {
        match &self.storage {
            Storage::Owned(data) => data.len(),
            Storage::Borrowed(_) => 0,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    /// All the memory the image can reach, including padding between planes.
    pub fn data(&self) -> &[u8] {
        match &self.storage {
            Storage::Owned(data) => data,
            Storage::Borrowed(data) => data,
        }
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Owned(data) => data,
            Storage::Borrowed(data) => data,
        }
    }

    pub fn plane(&self, plane: usize) -> &[u8] {
        let start = self.planes[plane].offset;
        &self.data()[start..start + self.lens[plane]]
    }

    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        let start = self.planes[plane].offset;
        let len = self.lens[plane];
        &mut self.data_mut()[start..start + len]
    }

    /// Bytes `plane` would span if its last row were padded to the full stride.
    fn padded_len(&self, plane: usize) -> usize {
        let rows = self.format.plane_rows(plane, self.height);
        self.planes[plane].stride.saturating_mul(rows)
    }

    /// Like [`Image::plane`], extended over the padding of the last row as far as the memory
    /// reaches.
    pub fn padded_plane(&self, plane: usize) -> &[u8] {
        let start = self.planes[plane].offset;
        let end = start
            .saturating_add(self.padded_len(plane))
            .min(self.data().len());
        &self.data()[start..end]
    }

    /// Mutable slices over every plane at once, in plane order.
    ///
    /// Each slice covers the padding of the last row as far as the memory reaches without running
    /// into the next plane.
    pub fn planes_mut(&mut self) -> Vec<&mut [u8]> {
        let mut extents: Vec<(usize, usize, usize)> = (0..self.num_planes)
            .map(|plane| (self.planes[plane].offset, self.padded_len(plane), plane))
            .collect();
        extents.sort_unstable();

        let mut slices: Vec<Option<&mut [u8]>> = (0..self.num_planes).map(|_| None).collect();
        let mut rest = self.data_mut();
        let mut consumed = 0;
        for (i, &(offset, padded, plane)) in extents.iter().enumerate() {
            let limit = extents
                .get(i + 1)
                .map_or(consumed + rest.len(), |next| next.0);
            let end = offset.saturating_add(padded).min(limit);
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(offset - consumed);
            let (slice, tail) = tail.split_at_mut(end - offset);
            slices[plane] = Some(slice);
            rest = tail;
            consumed = end;
        }
        slices.into_iter().flatten().collect()
    }

    /// Returns the pixel at (`x`, `y`) of a packed RGB image as `0xAARRGGBB`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        let offsets = self.format.rgba_offsets()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y as usize * self.planes[0].stride + x as usize * 4;
        let px = &self.plane(0)[start..start + 4];
        Some(u32::from_be_bytes([
            px[offsets[3]],
            px[offsets[0]],
            px[offsets[1]],
            px[offsets[2]],
        ]))
    }

    /// Fills a rectangle of a packed RGB image with `color`, given as `0xAARRGGBB`.
    ///
    /// The rectangle is clipped to the image.
    pub fn draw_rectangle(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: u32,
    ) -> Result<()> {
        let offsets = self
            .format
            .rgba_offsets()
            .ok_or(ImageError::UnsupportedFormat(self.format))?;
        if x >= self.width || y >= self.height {
            return Ok(());
        }
        let width = width.min(self.width - x) as usize;
        let height = height.min(self.height - y) as usize;

        let [a, r, g, b] = color.to_be_bytes();
        let mut px = [0u8; 4];
        px[offsets[0]] = r;
        px[offsets[1]] = g;
        px[offsets[2]] = b;
        px[offsets[3]] = a;

        let stride = self.planes[0].stride;
        let plane = self.plane_mut(0);
        for row in 0..height {
            let start = (y as usize + row) * stride + x as usize * 4;
            for dst in plane[start..start + width * 4].chunks_exact_mut(4) {
                dst.copy_from_slice(&px);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fourcc::ALL_FORMATS;

    #[test]
    fn yuv_420_size() {
        for (w, h) in [(1, 1), (2, 2), (5, 3), (64, 48), (641, 479)] {
            let chroma = ((w as usize + 1) / 2) * ((h as usize + 1) / 2);
            for format in [
                PixelFormat::Nv12,
                PixelFormat::Yv12,
                PixelFormat::Iyuv,
                PixelFormat::I420,
            ] {
                let image = Image::new(w, h, format).unwrap();
                assert_eq!(image.data_size(), (w * h) as usize + 2 * chroma);
                assert_eq!(image.num_planes(), format.num_planes());
                assert!(image.is_owned());
            }
        }
    }

    #[test]
    fn rgb_size() {
        for (w, h) in [(1, 1), (3, 7), (320, 240)] {
            for format in [
                PixelFormat::Argb,
                PixelFormat::Bgra,
                PixelFormat::Rgba,
                PixelFormat::Abgr,
            ] {
                let image = Image::new(w, h, format).unwrap();
                assert_eq!(image.data_size(), (4 * w * h) as usize);
                assert_eq!(image.stride(0), (4 * w) as usize);
            }
        }
    }

    #[test]
    fn plane_layout() {
        let image = Image::new(5, 3, PixelFormat::I420).unwrap();
        assert_eq!((image.offset(1), image.stride(1)), (15, 3));
        assert_eq!((image.offset(2), image.stride(2)), (21, 3));
        let image = Image::new(5, 3, PixelFormat::Nv12).unwrap();
        assert_eq!((image.offset(1), image.stride(1)), (15, 6));
        assert_eq!(image.plane(1).len(), 12);
    }

    #[test]
    fn unsupported_allocations() {
        for format in ALL_FORMATS {
            let result = Image::new(4, 4, format);
            if format.classify() == FormatClass::PackedYuv {
                assert_eq!(result.err(), Some(ImageError::UnsupportedFormat(format)));
            } else {
                assert!(result.is_ok());
            }
        }
        assert_eq!(
            Image::new(0, 4, PixelFormat::Nv12).err(),
            Some(ImageError::InvalidDimensions(0, 4))
        );
    }

    #[test]
    fn views_write_through() {
        let mut memory = vec![0u8; 64];
        {
            let planes = [FramePlane {
                offset: 8,
                stride: 16,
            }];
            let mut view = Image::bind(&mut memory, &planes, 2, 3, PixelFormat::Rgba).unwrap();
            assert!(!view.is_owned());
            assert_eq!(view.data_size(), 0);
            view.draw_rectangle(1, 2, 10, 10, 0xff11_2233).unwrap();
            assert_eq!(view.pixel(1, 2), Some(0xff11_2233));
        }
        assert_eq!(&memory[8 + 32 + 4..8 + 32 + 8], &[0x11, 0x22, 0x33, 0xff]);
        assert_eq!(memory.iter().filter(|&&b| b != 0).count(), 4);
    }

    #[test]
    fn bind_rejects_bad_layouts() {
        let mut memory = vec![0u8; 32];
        let too_small = [FramePlane {
            offset: 0,
            stride: 8,
        }];
        assert_eq!(
            Image::bind(&mut memory, &too_small, 2, 5, PixelFormat::Argb).err(),
            Some(ImageError::InvalidLayout(0))
        );
        let short_stride = [FramePlane {
            offset: 0,
            stride: 4,
        }];
        assert_eq!(
            Image::bind(&mut memory, &short_stride, 2, 2, PixelFormat::Argb).err(),
            Some(ImageError::InvalidLayout(0))
        );
        let overlapping = [
            FramePlane {
                offset: 0,
                stride: 4,
            },
            FramePlane {
                offset: 12,
                stride: 4,
            },
        ];
        assert_eq!(
            Image::bind(&mut memory, &overlapping, 4, 4, PixelFormat::Nv12).err(),
            Some(ImageError::InvalidLayout(1))
        );
        assert!(matches!(
            Image::bind(&mut memory, &overlapping, 4, 4, PixelFormat::I420),
            Err(ImageError::PlaneCount { expected: 3, .. })
        ));
    }

    #[test]
    fn oversized_allocations_fail() {
        for format in [PixelFormat::Bgra, PixelFormat::Nv12, PixelFormat::I420] {
            assert!(matches!(
                Image::new(u32::MAX, u32::MAX, format),
                Err(ImageError::AllocationFailed(_))
            ));
        }
    }

    #[test]
    fn bind_rejects_overflowing_layouts() {
        let mut memory = vec![0u8; 64];
        let far_offset = [FramePlane {
            offset: usize::MAX - 2,
            stride: 8,
        }];
        assert_eq!(
            Image::bind(&mut memory, &far_offset, 2, 2, PixelFormat::Argb).err(),
            Some(ImageError::InvalidLayout(0))
        );
        let huge_stride = [FramePlane {
            offset: 0,
            stride: usize::MAX / 2,
        }];
        assert_eq!(
            Image::bind(&mut memory, &huge_stride, 2, 3, PixelFormat::Argb).err(),
            Some(ImageError::InvalidLayout(0))
        );
        let huge_chroma_stride = [
            FramePlane {
                offset: 0,
                stride: 4,
            },
            FramePlane {
                offset: 16,
                stride: usize::MAX,
            },
        ];
        assert_eq!(
            Image::bind(&mut memory, &huge_chroma_stride, 4, 4, PixelFormat::Nv12).err(),
            Some(ImageError::InvalidLayout(1))
        );
    }

    #[test]
    fn padded_planes_reach_the_end_of_the_stride() {
        let mut memory = vec![0u8; 38];
        let planes = [
            FramePlane {
                offset: 0,
                stride: 8,
            },
            FramePlane {
                offset: 24,
                stride: 8,
            },
        ];
        let mut view = Image::bind(&mut memory, &planes, 4, 3, PixelFormat::Nv12).unwrap();
        assert_eq!(view.plane(0).len(), 20);
        assert_eq!(view.padded_plane(0).len(), 24);
        // The memory ends before the padding of the last chroma row.
        assert_eq!(view.plane(1).len(), 12);
        assert_eq!(view.padded_plane(1).len(), 14);
        let slices = view.planes_mut();
        assert_eq!((slices[0].len(), slices[1].len()), (24, 14));
    }

    #[test]
    fn planes_mut_follows_plane_order() {
        let mut memory: Vec<u8> = (0..24).collect();
        // Chroma planes stored in reverse order.
        let planes = [
            FramePlane {
                offset: 0,
                stride: 4,
            },
            FramePlane {
                offset: 20,
                stride: 2,
            },
            FramePlane {
                offset: 16,
                stride: 2,
            },
        ];
        let mut view = Image::bind(&mut memory, &planes, 4, 4, PixelFormat::Yv12).unwrap();
        let slices = view.planes_mut();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].len(), 16);
        assert_eq!(slices[1][0], 20);
        assert_eq!(slices[2][0], 16);
    }

    #[test]
    fn rectangles_are_clipped() {
        let mut image = Image::new(4, 3, PixelFormat::rgb32()).unwrap();
        image.draw_rectangle(2, 1, 100, 100, 0xff00_ff00).unwrap();
        image.draw_rectangle(9, 9, 1, 1, 0xffff_ffff).unwrap();
        for y in 0..3 {
            for x in 0..4 {
                let expected = if x >= 2 && y >= 1 { 0xff00_ff00 } else { 0 };
                assert_eq!(image.pixel(x, y), Some(expected));
            }
        }
        let mut yuv = Image::new(4, 4, PixelFormat::Nv12).unwrap();
        assert!(yuv.draw_rectangle(0, 0, 1, 1, 0).is_err());
    }
}
