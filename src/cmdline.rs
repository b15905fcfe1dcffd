// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::PathBuf;
use std::str::FromStr;

use argh::FromArgs;
use hwimage::GenImageType;
use hwimage::PixelFormat;

use crate::config::Config;
use crate::config::GetImageMode;
use crate::config::HwAccel;
use crate::config::PutImageMode;
use crate::config::Size;
use crate::config::DEFAULT_WINDOW_SIZE;

fn default_size() -> Size {
    DEFAULT_WINDOW_SIZE
}

fn parse_format(value: &str) -> Result<PixelFormat, String> {
    PixelFormat::from_str(value).map_err(|e| e.to_string())
}

#[derive(Debug, FromArgs)]
/// Decode a picture through a hardware decoder and exercise image transfers to and from its
/// surface.
pub struct Args {
    /// size of the toplevel window, as WIDTHxHEIGHT (default: 640x480)
    #[argh(option, default = "default_size()")]
    pub size: Size,
    /// write the image read back from the decoder to FILE, in PPM format
    #[argh(option, arg_name = "FILE")]
    pub output: Option<PathBuf>,
    /// type of generated image: auto, rects, rgb-rects or flowers (default: auto)
    #[argh(option, default = "GenImageType::Auto")]
    pub genimage: GenImageType,
    /// read decoded pixels back from the surface: none, video or output (default: video)
    #[argh(option, default = "GetImageMode::Video")]
    pub getimage: GetImageMode,
    /// image format used to read the surface back (default: decoder's choice)
    #[argh(option, from_str_fn(parse_format))]
    pub getimage_format: Option<PixelFormat>,
    /// upload a generated image to the surface: none or override (default: none)
    #[argh(option, default = "PutImageMode::None")]
    pub putimage: PutImageMode,
    /// image format used to upload to the surface (default: decoder's choice)
    #[argh(option, from_str_fn(parse_format))]
    pub putimage_format: Option<PixelFormat>,
    /// size of the uploaded image, as WIDTHxHEIGHT (default: picture size)
    #[argh(option)]
    pub putimage_size: Option<Size>,
    /// never map the surface in its native layout
    #[argh(switch)]
    pub no_derive_image: bool,
    /// hardware acceleration API (default: none)
    #[argh(option, default = "HwAccel::None")]
    pub hwaccel: HwAccel,
    /// print debug messages
    #[argh(switch)]
    pub debug: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            window_size: args.size,
            output: args.output,
            genimage: args.genimage,
            getimage_mode: args.getimage,
            getimage_format: args.getimage_format,
            putimage_mode: args.putimage,
            putimage_format: args.putimage_format,
            putimage_size: args.putimage_size,
            derive_image: !args.no_derive_image,
            hwaccel: args.hwaccel,
            debug: args.debug,
        }
    }
}
