// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Binary PPM (`P6`) output.

use std::io;
use std::io::Write;

use remain::sorted;
use thiserror::Error as ThisError;

use crate::fourcc::PixelFormat;
use crate::image::Image;

#[sorted]
#[derive(Debug, ThisError)]
pub enum PpmError {
    #[error("failed to write PPM data: {0}")]
    Io(#[from] io::Error),
    #[error("cannot write {0} images as PPM")]
    UnsupportedFormat(PixelFormat),
}

/// Writes a packed RGB `image` to `out` as a binary PPM, dropping the alpha channel.
pub fn write_ppm<W: Write>(image: &Image, out: &mut W) -> Result<(), PpmError> {
    let offsets = image
        .format()
        .rgba_offsets()
        .ok_or(PpmError::UnsupportedFormat(image.format()))?;
    let (width, height) = (image.width() as usize, image.height() as usize);

    write!(out, "P6\n{} {}\n255\n", width, height)?;
    let plane = image.plane(0);
    let mut line = Vec::with_capacity(width * 3);
    for y in 0..height {
        line.clear();
        let row = &plane[y * image.stride(0)..][..width * 4];
        for px in row.chunks_exact(4) {
            line.extend_from_slice(&[px[offsets[0]], px[offsets[1]], px[offsets[2]]]);
        }
        out.write_all(&line)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::FramePlane;

    #[test]
    fn header_and_pixels() {
        let mut image = Image::new(2, 2, PixelFormat::rgb32()).unwrap();
        image.draw_rectangle(0, 0, 1, 1, 0xff10_2030).unwrap();
        image.draw_rectangle(1, 1, 1, 1, 0x00ff_ffff).unwrap();
        let mut out = Vec::new();
        write_ppm(&image, &mut out).unwrap();
        let mut expected = b"P6\n2 2\n255\n".to_vec();
        expected.extend_from_slice(&[0x10, 0x20, 0x30, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0xff]);
        assert_eq!(out, expected);
    }

    #[test]
    fn padded_abgr_view() {
        let mut memory = vec![0u8; 16];
        memory[0..4].copy_from_slice(&[0xff, 3, 2, 1]);
        memory[8..12].copy_from_slice(&[0xff, 6, 5, 4]);
        let planes = [FramePlane {
            offset: 0,
            stride: 8,
        }];
        let view = Image::bind(&mut memory, &planes, 1, 2, PixelFormat::Abgr).unwrap();
        let mut out = Vec::new();
        write_ppm(&view, &mut out).unwrap();
        assert_eq!(&out[out.len() - 6..], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(out.len(), b"P6\n1 2\n255\n".len() + 6);
    }

    #[test]
    fn yuv_is_rejected() {
        let image = Image::new(2, 2, PixelFormat::Nv12).unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            write_ppm(&image, &mut out),
            Err(PpmError::UnsupportedFormat(PixelFormat::Nv12))
        ));
        assert!(out.is_empty());
    }
}
