// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Conversion of images between formats and sizes.
//!
//! Conversions are dispatched in order: images of the same format and size are copied row by
//! row, and packed RGB images of the same size are swizzled byte by byte. Everything else is
//! decoded to RGBA by `yuvutils-rs`, resampled by `fast_image_resize` if the sizes differ, and
//! encoded into the destination format. AYUV has no converter equivalent and is staged through
//! three full-resolution planes.

use fast_image_resize::images::Image as ResizeImage;
use fast_image_resize::images::ImageRef;
use fast_image_resize::FilterType;
use fast_image_resize::ImageBufferError;
use fast_image_resize::PixelType;
use fast_image_resize::ResizeAlg;
use fast_image_resize::ResizeError;
use fast_image_resize::ResizeOptions;
use fast_image_resize::Resizer;
use remain::sorted;
use thiserror::Error as ThisError;
use yuvutils_rs::BufferStoreMut;
use yuvutils_rs::YuvBiPlanarImage;
use yuvutils_rs::YuvBiPlanarImageMut;
use yuvutils_rs::YuvConversionMode;
use yuvutils_rs::YuvError;
use yuvutils_rs::YuvPackedImage;
use yuvutils_rs::YuvPackedImageMut;
use yuvutils_rs::YuvPlanarImage;
use yuvutils_rs::YuvPlanarImageMut;
use yuvutils_rs::YuvRange;
use yuvutils_rs::YuvStandardMatrix;

use crate::fourcc::PixelFormat;
use crate::image::Image;

/// Failure reported by the color converter or the resampler.
#[sorted]
#[derive(Debug, ThisError)]
pub enum DelegateError {
    #[error("color conversion failed: {0}")]
    ColorConversion(#[from] YuvError),
    #[error("resampling failed: {0}")]
    Resize(#[from] ResizeError),
    #[error("resampler rejected a buffer: {0}")]
    ResizeBuffer(#[from] ImageBufferError),
}

#[sorted]
#[derive(Debug, ThisError)]
pub enum ConvertError {
    #[error("failed to allocate {0} bytes of staging memory")]
    AllocationFailed(usize),
    #[error("delegate failure: {0}")]
    DelegateFailure(#[from] DelegateError),
    #[error("stride of {0} bytes is too large for the color converter")]
    StrideTooLarge(usize),
    #[error("no conversion path from {0} to {1}")]
    UnsupportedFormat(PixelFormat, PixelFormat),
}

impl From<YuvError> for ConvertError {
    fn from(e: YuvError) -> Self {
        ConvertError::DelegateFailure(e.into())
    }
}

impl From<ResizeError> for ConvertError {
    fn from(e: ResizeError) -> Self {
        ConvertError::DelegateFailure(e.into())
    }
}

impl From<ImageBufferError> for ConvertError {
    fn from(e: ImageBufferError) -> Self {
        ConvertError::DelegateFailure(e.into())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Byte index of the Y, U, V and A components of an AYUV pixel in memory.
const AYUV_OFFSETS: [usize; 4] = if cfg!(target_endian = "big") {
    [1, 2, 3, 0]
} else {
    [2, 1, 0, 3]
};

const RGBA_OFFSETS: [usize; 4] = [0, 1, 2, 3];

const RANGE: YuvRange = YuvRange::Limited;
const MATRIX: YuvStandardMatrix = YuvStandardMatrix::Bt601;
const MODE: YuvConversionMode = YuvConversionMode::Balanced;

/// Converts the pixels of `src` into `dst`, scaling if their sizes differ.
///
/// `dst` keeps its format and layout. All staging memory is allocated before `dst` is written,
/// so an allocation failure leaves `dst` untouched.
pub fn convert(dst: &mut Image, src: &Image) -> Result<()> {
    let same_size = dst.width() == src.width() && dst.height() == src.height();
    if same_size && dst.format() == src.format() {
        copy_planes(dst, src);
        return Ok(());
    }
    if same_size {
        if let (Some(from), Some(to)) = (src.format().rgba_offsets(), dst.format().rgba_offsets())
        {
            swizzle(dst, src, from, to);
            return Ok(());
        }
    }
    scale(dst, src)
}

fn copy_planes(dst: &mut Image, src: &Image) {
    let format = src.format();
    for plane in 0..src.num_planes() {
        let row_bytes = format.row_bytes(plane, src.width());
        let (src_stride, dst_stride) = (src.stride(plane), dst.stride(plane));
        let from = src.plane(plane);
        let to = dst.plane_mut(plane);
        for row in 0..format.plane_rows(plane, src.height()) {
            to[row * dst_stride..row * dst_stride + row_bytes]
                .copy_from_slice(&from[row * src_stride..row * src_stride + row_bytes]);
        }
    }
}

fn swizzle(dst: &mut Image, src: &Image, from: [usize; 4], to: [usize; 4]) {
    let size = (src.width(), src.height());
    let dst_stride = dst.stride(0);
    swizzle_rows(
        (dst.plane_mut(0), dst_stride),
        (src.plane(0), src.stride(0)),
        size,
        from,
        to,
    );
}

/// Moves the channels of packed 32-bit pixels from the byte positions `from` to `to`. Planes are
/// given with their strides.
fn swizzle_rows(
    (dst, dst_stride): (&mut [u8], usize),
    (src, src_stride): (&[u8], usize),
    (width, height): (u32, u32),
    from: [usize; 4],
    to: [usize; 4],
) {
    let row_bytes = width as usize * 4;
    for row in 0..height as usize {
        let src_row = &src[row * src_stride..row * src_stride + row_bytes];
        let dst_row = &mut dst[row * dst_stride..row * dst_stride + row_bytes];
        for (s, d) in src_row.chunks_exact(4).zip(dst_row.chunks_exact_mut(4)) {
            for c in 0..4 {
                d[to[c]] = s[from[c]];
            }
        }
    }
}

#[cfg(test)]
thread_local! {
    /// Largest staging allocation that succeeds on this thread.
    static STAGING_LIMIT: std::cell::Cell<usize> = std::cell::Cell::new(usize::MAX);
}

#[cfg(test)]
fn over_staging_limit(size: usize) -> bool {
    size > STAGING_LIMIT.with(|limit| limit.get())
}

#[cfg(not(test))]
fn over_staging_limit(_size: usize) -> bool {
    false
}

fn alloc_staging(size: usize) -> Result<Vec<u8>> {
    if over_staging_limit(size) {
        return Err(ConvertError::AllocationFailed(size));
    }
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|_| ConvertError::AllocationFailed(size))?;
    buffer.resize(size, 0);
    Ok(buffer)
}

fn stride_of(image: &Image, plane: usize) -> Result<u32> {
    let stride = image.stride(plane);
    u32::try_from(stride).map_err(|_| ConvertError::StrideTooLarge(stride))
}

/// Tightly packed RGBA pixels, the form shared by the color converter and the resampler.
struct RgbaBuffer {
    width: u32,
    height: u32,
    stride: u32,
    pixels: Vec<u8>,
}

impl RgbaBuffer {
    fn new(width: u32, height: u32) -> Result<Self> {
        let stride = width
            .checked_mul(4)
            .ok_or(ConvertError::StrideTooLarge((width as usize).saturating_mul(4)))?;
        let size = (stride as usize)
            .checked_mul(height as usize)
            .ok_or(ConvertError::AllocationFailed(usize::MAX))?;
        Ok(RgbaBuffer {
            width,
            height,
            stride,
            pixels: alloc_staging(size)?,
        })
    }
}

/// Full-resolution Y, U and V planes standing in for an AYUV image.
struct Planar444 {
    width: u32,
    height: u32,
    planes: [Vec<u8>; 3],
}

impl Planar444 {
    fn new(width: u32, height: u32) -> Result<Self> {
        let size = (width as usize)
            .checked_mul(height as usize)
            .ok_or(ConvertError::AllocationFailed(usize::MAX))?;
        Ok(Planar444 {
            width,
            height,
            planes: [alloc_staging(size)?, alloc_staging(size)?, alloc_staging(size)?],
        })
    }

    fn deinterleave(image: &Image) -> Result<Self> {
        let mut staging = Planar444::new(image.width(), image.height())?;
        let stride = image.stride(0);
        let packed = image.plane(0);
        let width = staging.width as usize;
        for y in 0..staging.height as usize {
            let row = &packed[y * stride..y * stride + width * 4];
            for (x, px) in row.chunks_exact(4).enumerate() {
                for c in 0..3 {
                    staging.planes[c][y * width + x] = px[AYUV_OFFSETS[c]];
                }
            }
        }
        Ok(staging)
    }

    fn interleave(&self, image: &mut Image) {
        let stride = image.stride(0);
        let width = self.width as usize;
        let packed = image.plane_mut(0);
        for y in 0..self.height as usize {
            let row = &mut packed[y * stride..y * stride + width * 4];
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                for c in 0..3 {
                    px[AYUV_OFFSETS[c]] = self.planes[c][y * width + x];
                }
                px[AYUV_OFFSETS[3]] = 0xff;
            }
        }
    }

    fn planar(&self) -> YuvPlanarImage<'_, u8> {
        YuvPlanarImage {
            y_plane: &self.planes[0],
            y_stride: self.width,
            u_plane: &self.planes[1],
            u_stride: self.width,
            v_plane: &self.planes[2],
            v_stride: self.width,
            width: self.width,
            height: self.height,
        }
    }

    fn planar_mut(&mut self) -> YuvPlanarImageMut<'_, u8> {
        let [y, u, v] = &mut self.planes;
        YuvPlanarImageMut {
            y_plane: BufferStoreMut::Borrowed(y.as_mut_slice()),
            y_stride: self.width,
            u_plane: BufferStoreMut::Borrowed(u.as_mut_slice()),
            u_stride: self.width,
            v_plane: BufferStoreMut::Borrowed(v.as_mut_slice()),
            v_stride: self.width,
            width: self.width,
            height: self.height,
        }
    }
}

/// Indices of the U and V planes of a three-plane 4:2:0 format.
fn chroma_planes(format: PixelFormat) -> (usize, usize) {
    if format == PixelFormat::Yv12 {
        (2, 1)
    } else {
        (1, 2)
    }
}

fn scale(dst: &mut Image, src: &Image) -> Result<()> {
    let rgba = to_rgba(src)?;
    let rgba = if (rgba.width, rgba.height) == (dst.width(), dst.height()) {
        rgba
    } else {
        resample(&rgba, dst.width(), dst.height())?
    };
    from_rgba(dst, &rgba)
}

fn ayuv_to_rgba(src: &Image) -> Result<RgbaBuffer> {
    let staging = Planar444::deinterleave(src)?;
    let mut rgba = RgbaBuffer::new(src.width(), src.height())?;
    yuvutils_rs::yuv444_to_rgba(
        &staging.planar(),
        &mut rgba.pixels,
        rgba.stride,
        RANGE,
        MATRIX,
    )?;
    Ok(rgba)
}

/// Decodes `src` to RGBA at its own size.
fn to_rgba(src: &Image) -> Result<RgbaBuffer> {
    let format = src.format();
    if format == PixelFormat::Ayuv {
        return ayuv_to_rgba(src);
    }

    let (width, height) = (src.width(), src.height());
    let mut rgba = RgbaBuffer::new(width, height)?;
    let stride = rgba.stride;
    let out = rgba.pixels.as_mut_slice();
    match format {
        PixelFormat::Nv12 => {
            let image = YuvBiPlanarImage {
                y_plane: src.padded_plane(0),
                y_stride: stride_of(src, 0)?,
                uv_plane: src.padded_plane(1),
                uv_stride: stride_of(src, 1)?,
                width,
                height,
            };
            yuvutils_rs::yuv_nv12_to_rgba(&image, out, stride, RANGE, MATRIX, MODE)?;
        }
        PixelFormat::Yv12 | PixelFormat::Iyuv | PixelFormat::I420 => {
            let (u, v) = chroma_planes(format);
            let image = YuvPlanarImage {
                y_plane: src.padded_plane(0),
                y_stride: stride_of(src, 0)?,
                u_plane: src.padded_plane(u),
                u_stride: stride_of(src, u)?,
                v_plane: src.padded_plane(v),
                v_stride: stride_of(src, v)?,
                width,
                height,
            };
            yuvutils_rs::yuv420_to_rgba(&image, out, stride, RANGE, MATRIX)?;
        }
        PixelFormat::Uyvy | PixelFormat::Yuy2 | PixelFormat::Yuyv => {
            let image = YuvPackedImage {
                yuy: src.padded_plane(0),
                yuy_stride: stride_of(src, 0)?,
                width,
                height,
            };
            if format == PixelFormat::Uyvy {
                yuvutils_rs::uyvy422_to_rgba(&image, out, stride, RANGE, MATRIX)?;
            } else {
                yuvutils_rs::yuyv422_to_rgba(&image, out, stride, RANGE, MATRIX)?;
            }
        }
        _ => {
            let from = format
                .rgba_offsets()
                .ok_or(ConvertError::UnsupportedFormat(format, PixelFormat::Rgba))?;
            swizzle_rows(
                (out, stride as usize),
                (src.plane(0), src.stride(0)),
                (width, height),
                from,
                RGBA_OFFSETS,
            );
        }
    }
    Ok(rgba)
}

/// Resamples `src` to `width`x`height` with a Catmull-Rom (bicubic) filter.
fn resample(src: &RgbaBuffer, width: u32, height: u32) -> Result<RgbaBuffer> {
    let mut dst = RgbaBuffer::new(width, height)?;
    {
        let from = ImageRef::new(src.width, src.height, &src.pixels, PixelType::U8x4)?;
        let mut to = ResizeImage::from_slice_u8(width, height, &mut dst.pixels, PixelType::U8x4)?;
        // Alpha is resampled as a plain channel, not premultiplied into the colors.
        let options = ResizeOptions::new()
            .resize_alg(ResizeAlg::Convolution(FilterType::CatmullRom))
            .use_alpha(false);
        Resizer::new().resize(&from, &mut to, &options)?;
    }
    Ok(dst)
}

/// Encodes `rgba`, which has the size of `dst`, into the format of `dst`.
fn from_rgba(dst: &mut Image, rgba: &RgbaBuffer) -> Result<()> {
    let format = dst.format();
    let (width, height) = (dst.width(), dst.height());
    if format == PixelFormat::Ayuv {
        let mut staging = Planar444::new(width, height)?;
        yuvutils_rs::rgba_to_yuv444(
            &mut staging.planar_mut(),
            &rgba.pixels,
            rgba.stride,
            RANGE,
            MATRIX,
            MODE,
        )?;
        staging.interleave(dst);
        return Ok(());
    }

    let strides = (0..dst.num_planes())
        .map(|plane| stride_of(dst, plane))
        .collect::<Result<Vec<u32>>>()?;
    let unsupported = ConvertError::UnsupportedFormat(PixelFormat::Rgba, format);
    let mut planes = dst.planes_mut();
    match (format, planes.as_mut_slice()) {
        (PixelFormat::Nv12, [y, uv]) => {
            let mut image = YuvBiPlanarImageMut {
                y_plane: BufferStoreMut::Borrowed(&mut **y),
                y_stride: strides[0],
                uv_plane: BufferStoreMut::Borrowed(&mut **uv),
                uv_stride: strides[1],
                width,
                height,
            };
            yuvutils_rs::rgba_to_yuv_nv12(
                &mut image,
                &rgba.pixels,
                rgba.stride,
                RANGE,
                MATRIX,
                MODE,
            )?;
        }
        (PixelFormat::Yv12 | PixelFormat::Iyuv | PixelFormat::I420, [y, first, second]) => {
            let ((u, u_stride), (v, v_stride)) = if format == PixelFormat::Yv12 {
                ((second, strides[2]), (first, strides[1]))
            } else {
                ((first, strides[1]), (second, strides[2]))
            };
            let mut image = YuvPlanarImageMut {
                y_plane: BufferStoreMut::Borrowed(&mut **y),
                y_stride: strides[0],
                u_plane: BufferStoreMut::Borrowed(&mut **u),
                u_stride,
                v_plane: BufferStoreMut::Borrowed(&mut **v),
                v_stride,
                width,
                height,
            };
            yuvutils_rs::rgba_to_yuv420(
                &mut image,
                &rgba.pixels,
                rgba.stride,
                RANGE,
                MATRIX,
                MODE,
            )?;
        }
        (PixelFormat::Uyvy | PixelFormat::Yuy2 | PixelFormat::Yuyv, [packed]) => {
            let mut image = YuvPackedImageMut {
                yuy: BufferStoreMut::Borrowed(&mut **packed),
                yuy_stride: strides[0],
                width,
                height,
            };
            if format == PixelFormat::Uyvy {
                yuvutils_rs::rgba_to_uyvy422(&mut image, &rgba.pixels, rgba.stride, RANGE, MATRIX)?;
            } else {
                yuvutils_rs::rgba_to_yuyv422(&mut image, &rgba.pixels, rgba.stride, RANGE, MATRIX)?;
            }
        }
        (_, [packed]) => {
            let to = format.rgba_offsets().ok_or(unsupported)?;
            swizzle_rows(
                (&mut **packed, strides[0] as usize),
                (&rgba.pixels, rgba.stride as usize),
                (width, height),
                RGBA_OFFSETS,
                to,
            );
        }
        _ => return Err(unsupported),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::FramePlane;

    fn fill_pattern(image: &mut Image) {
        for (i, b) in image.data_mut().iter_mut().enumerate() {
            *b = (i * 31 + 7) as u8;
        }
    }

    fn assert_same_pixels(a: &Image, b: &Image) {
        assert_eq!(a.format(), b.format());
        let format = a.format();
        for plane in 0..a.num_planes() {
            let row_bytes = format.row_bytes(plane, a.width());
            for row in 0..format.plane_rows(plane, a.height()) {
                let ra = &a.plane(plane)[row * a.stride(plane)..][..row_bytes];
                let rb = &b.plane(plane)[row * b.stride(plane)..][..row_bytes];
                assert_eq!(ra, rb, "{} plane {} row {}", format, plane, row);
            }
        }
    }

    fn assert_near(got: u8, want: u8, tolerance: i32) {
        assert!(
            (got as i32 - want as i32).abs() <= tolerance,
            "got {}, want {} +/- {}",
            got,
            want,
            tolerance
        );
    }

    fn packed_view(memory: &mut [u8], stride: usize, w: u32, h: u32, f: PixelFormat) -> Image<'_> {
        Image::bind(memory, &[FramePlane { offset: 0, stride }], w, h, f).unwrap()
    }

    #[test]
    fn identical_formats_copy_exactly() {
        for format in [
            PixelFormat::Nv12,
            PixelFormat::Yv12,
            PixelFormat::Iyuv,
            PixelFormat::I420,
            PixelFormat::Argb,
            PixelFormat::Bgra,
            PixelFormat::Rgba,
            PixelFormat::Abgr,
        ] {
            for (w, h) in [(1, 1), (7, 5), (16, 9)] {
                let mut src = Image::new(w, h, format).unwrap();
                fill_pattern(&mut src);
                let mut dst = Image::new(w, h, format).unwrap();
                convert(&mut dst, &src).unwrap();
                assert_eq!(dst.data(), src.data());
            }
        }
    }

    #[test]
    fn identity_copy_honors_padded_strides() {
        for format in [
            PixelFormat::Ayuv,
            PixelFormat::Uyvy,
            PixelFormat::Yuy2,
            PixelFormat::Bgra,
        ] {
            let (w, h) = (5, 3);
            let row_bytes = format.row_bytes(0, w);
            let mut src_mem: Vec<u8> = (0..row_bytes * h as usize).map(|i| i as u8).collect();
            let mut dst_mem = vec![0u8; (row_bytes + 16) * h as usize];
            let src = packed_view(&mut src_mem, row_bytes, w, h, format);
            let mut dst = packed_view(&mut dst_mem, row_bytes + 16, w, h, format);
            convert(&mut dst, &src).unwrap();
            assert_same_pixels(&dst, &src);
        }
    }

    #[test]
    fn argb_bgra_round_trip() {
        let mut argb = Image::new(13, 7, PixelFormat::Argb).unwrap();
        fill_pattern(&mut argb);
        let mut bgra = Image::new(13, 7, PixelFormat::Bgra).unwrap();
        convert(&mut bgra, &argb).unwrap();
        let mut back = Image::new(13, 7, PixelFormat::Argb).unwrap();
        convert(&mut back, &bgra).unwrap();
        assert_eq!(back.data(), argb.data());
        let mut reversed = [0u8; 4];
        reversed.copy_from_slice(&bgra.data()[0..4]);
        reversed.reverse();
        assert_eq!(&argb.data()[0..4], &reversed);
    }

    #[test]
    fn swizzle_moves_channels() {
        let mut argb = Image::new(1, 1, PixelFormat::Argb).unwrap();
        argb.data_mut().copy_from_slice(&[0x80, 0x11, 0x22, 0x33]);
        for (format, bytes) in [
            (PixelFormat::Rgba, [0x11, 0x22, 0x33, 0x80]),
            (PixelFormat::Bgra, [0x33, 0x22, 0x11, 0x80]),
            (PixelFormat::Abgr, [0x80, 0x33, 0x22, 0x11]),
        ] {
            let mut dst = Image::new(1, 1, format).unwrap();
            convert(&mut dst, &argb).unwrap();
            assert_eq!(dst.data(), &bytes);
            assert_eq!(dst.pixel(0, 0), Some(0x8011_2233));
        }
    }

    #[test]
    fn gray_i420_to_rgb32() {
        let mut yuv = Image::new(64, 48, PixelFormat::I420).unwrap();
        yuv.data_mut().fill(128);
        let mut rgb = Image::new(64, 48, PixelFormat::rgb32()).unwrap();
        convert(&mut rgb, &yuv).unwrap();
        for y in 0..48 {
            for x in 0..64 {
                let [a, r, g, b] = rgb.pixel(x, y).unwrap().to_be_bytes();
                assert_eq!(a, 0xff);
                for c in [r, g, b] {
                    assert_near(c, 128, 2);
                }
            }
        }
    }

    /// A 6x4 AYUV picture whose chroma is constant over each 2x2 block, so that 4:2:0 can hold
    /// it. Every value maps to an RGB color without clipping.
    fn ayuv_pattern() -> (u32, u32, Vec<u8>) {
        let (w, h) = (6u32, 4u32);
        let stride = w as usize * 4;
        let mut memory = vec![0u8; stride * h as usize];
        for y in 0..h as usize {
            for x in 0..w as usize {
                let yuva = [
                    (100 + x * 10 + y * 3) as u8,
                    (120 + (x / 2) * 8) as u8,
                    (130 - (y / 2) * 10) as u8,
                    (x * y) as u8,
                ];
                let px = &mut memory[y * stride + x * 4..][..4];
                for c in 0..4 {
                    px[AYUV_OFFSETS[c]] = yuva[c];
                }
            }
        }
        (w, h, memory)
    }

    #[test]
    fn ayuv_through_i420_and_back() {
        let (w, h, mut src_mem) = ayuv_pattern();
        let stride = w as usize * 4;
        let expected = src_mem.clone();
        let src = packed_view(&mut src_mem, stride, w, h, PixelFormat::Ayuv);

        let mut i420 = Image::new(w, h, PixelFormat::I420).unwrap();
        convert(&mut i420, &src).unwrap();
        assert_near(i420.plane(0)[0], 100, 2);
        assert_near(i420.plane(1)[1], 128, 2);
        assert_near(i420.plane(2)[3], 120, 2);

        let mut out_mem = vec![0u8; stride * h as usize];
        let mut out = packed_view(&mut out_mem, stride, w, h, PixelFormat::Ayuv);
        convert(&mut out, &i420).unwrap();
        drop(out);
        for (got, want) in out_mem.chunks(4).zip(expected.chunks(4)) {
            for c in 0..3 {
                assert_near(got[AYUV_OFFSETS[c]], want[AYUV_OFFSETS[c]], 3);
            }
            assert_eq!(got[AYUV_OFFSETS[3]], 0xff);
        }
    }

    #[test]
    fn ayuv_staging_failure_leaves_destination_alone() {
        let (w, h, mut src_mem) = ayuv_pattern();
        let src = packed_view(&mut src_mem, w as usize * 4, w, h, PixelFormat::Ayuv);
        let mut dst = Image::new(w, h, PixelFormat::rgb32()).unwrap();
        dst.data_mut().fill(0x5a);

        // Room for the three staging planes but not for the RGBA picture decoded from them.
        let pixels = (w * h) as usize;
        STAGING_LIMIT.with(|limit| limit.set(pixels * 3));
        let result = convert(&mut dst, &src);
        STAGING_LIMIT.with(|limit| limit.set(usize::MAX));

        assert!(
            matches!(result, Err(ConvertError::AllocationFailed(size)) if size == pixels * 4),
            "{:?}",
            result
        );
        assert!(dst.data().iter().all(|&b| b == 0x5a));

        // Nothing is left over from the failed attempt.
        convert(&mut dst, &src).unwrap();
        assert_eq!(dst.pixel(0, 0).map(|px| px >> 24), Some(0xff));
    }

    #[test]
    fn yv12_swaps_chroma_planes() {
        let mut i420 = Image::new(4, 4, PixelFormat::I420).unwrap();
        i420.plane_mut(0).fill(128);
        i420.plane_mut(1).fill(110);
        i420.plane_mut(2).fill(150);
        let mut yv12 = Image::new(4, 4, PixelFormat::Yv12).unwrap();
        convert(&mut yv12, &i420).unwrap();
        for (plane, want) in [(0, 128), (1, 150), (2, 110)] {
            for &b in yv12.plane(plane) {
                assert_near(b, want, 2);
            }
        }

        let mut nv12 = Image::new(4, 4, PixelFormat::Nv12).unwrap();
        convert(&mut nv12, &yv12).unwrap();
        assert_near(nv12.plane(1)[0], 110, 3);
        assert_near(nv12.plane(1)[1], 150, 3);
    }

    #[test]
    fn scaling_keeps_flat_colors() {
        let mut small = Image::new(16, 16, PixelFormat::rgb32()).unwrap();
        small.draw_rectangle(0, 0, 16, 16, 0xff20_80c0).unwrap();
        let mut large = Image::new(40, 30, PixelFormat::Rgba).unwrap();
        convert(&mut large, &small).unwrap();
        for y in 0..30 {
            for x in 0..40 {
                let got = large.pixel(x, y).unwrap().to_be_bytes();
                for (g, w) in got.iter().zip(0xff20_80c0u32.to_be_bytes()) {
                    assert_near(*g, w, 1);
                }
            }
        }
    }

    #[test]
    fn scaling_between_yuv_formats() {
        let mut nv12 = Image::new(64, 48, PixelFormat::Nv12).unwrap();
        nv12.plane_mut(0).fill(128);
        nv12.plane_mut(1).fill(128);
        let mut i420 = Image::new(30, 22, PixelFormat::I420).unwrap();
        convert(&mut i420, &nv12).unwrap();
        for plane in 0..3 {
            for &b in i420.plane(plane) {
                assert_near(b, 128, 2);
            }
        }
    }

    #[test]
    fn rgb_through_nv12() {
        let mut rgb = Image::new(8, 8, PixelFormat::rgb32()).unwrap();
        rgb.draw_rectangle(0, 0, 8, 8, 0xffc0_2020).unwrap();
        let mut nv12 = Image::new(8, 8, PixelFormat::Nv12).unwrap();
        convert(&mut nv12, &rgb).unwrap();
        let mut back = Image::new(8, 8, PixelFormat::rgb32()).unwrap();
        convert(&mut back, &nv12).unwrap();
        let [_, r, g, b] = back.pixel(3, 5).unwrap().to_be_bytes();
        assert_near(r, 0xc0, 3);
        assert_near(g, 0x20, 3);
        assert_near(b, 0x20, 3);
    }

    #[test]
    fn delegate_errors_are_wrapped() {
        let rgba = RgbaBuffer::new(4, 4).unwrap();
        // A source picture claiming more rows than its buffer holds.
        let short = RgbaBuffer {
            height: 8,
            ..rgba
        };
        assert!(matches!(
            resample(&short, 2, 2),
            Err(ConvertError::DelegateFailure(DelegateError::ResizeBuffer(_)))
        ));
    }

    #[test]
    fn packed_422_round_trip() {
        for format in [PixelFormat::Uyvy, PixelFormat::Yuy2] {
            let (w, h) = (6u32, 2u32);
            let mut rgb = Image::new(w, h, PixelFormat::rgb32()).unwrap();
            rgb.draw_rectangle(0, 0, w, h, 0xff30_a050).unwrap();
            let stride = format.row_bytes(0, w);
            let mut memory = vec![0u8; stride * h as usize];
            let mut packed = packed_view(&mut memory, stride, w, h, format);
            convert(&mut packed, &rgb).unwrap();
            let mut back = Image::new(w, h, PixelFormat::rgb32()).unwrap();
            convert(&mut back, &packed).unwrap();
            let got = back.pixel(5, 1).unwrap().to_be_bytes();
            for (g, w) in got.iter().zip(0xff30_a050u32.to_be_bytes()) {
                assert_near(*g, w, 3);
            }
        }
    }
}
