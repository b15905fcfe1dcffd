// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use hwimage::ConvertError;
use hwimage::Fourcc;
use hwimage::ImageError;
use remain::sorted;
use thiserror::Error as ThisError;

/// Failures of a hardware decoder or of the transfers between its surface and client images.
#[sorted]
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("failed to bind mapped image: {0}")]
    BindImage(ImageError),
    #[error("failed to convert image: {0}")]
    Convert(#[from] ConvertError),
    #[error("failed to allocate {0} bytes of image memory")]
    ImageAllocation(usize),
    #[error("invalid picture size {0}x{1}")]
    InvalidPictureSize(u32, u32),
    #[error("request for a {request_width}x{request_height} picture, surface is {width}x{height}")]
    MismatchedPictureSize {
        request_width: u32,
        request_height: u32,
        width: u32,
        height: u32,
    },
    #[error("decoder supports none of the fallback image formats")]
    NoImageFormat,
    #[error("decode request has no slices")]
    NoSlices,
    #[error("decoder has no surface, it must be initialized first")]
    NoSurface,
    #[error("image format {0} is not supported by the decoder")]
    UnsupportedImageFormat(Fourcc),
    #[error("{0} image format has a channel layout that cannot be handled")]
    UnsupportedRgbLayout(Fourcc),
}

pub type Result<T> = std::result::Result<T, Error>;
