// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Pixel formats, image buffers and the conversions between them.

pub mod convert;
pub mod fourcc;
pub mod generate;
pub mod image;
pub mod ppm;
pub mod random;

pub use convert::convert;
pub use convert::ConvertError;
pub use convert::DelegateError;
pub use fourcc::rgba_format_from_masks;
pub use fourcc::FormatClass;
pub use fourcc::FormatError;
pub use fourcc::Fourcc;
pub use fourcc::PixelFormat;
pub use generate::generate;
pub use generate::GenImageType;
pub use image::FramePlane;
pub use image::Image;
pub use image::ImageError;
pub use ppm::write_ppm;
pub use ppm::PpmError;
