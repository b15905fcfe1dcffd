// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Settings of a harness run.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use hwimage::GenImageType;
use hwimage::PixelFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Size { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid size \"{}\", expected WIDTHxHEIGHT", s);
        let (width, height) = s.split_once('x').ok_or_else(invalid)?;
        let width: u32 = width.parse().map_err(|_| invalid())?;
        let height: u32 = height.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Size { width, height })
    }
}

/// Hardware acceleration API used to decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HwAccel {
    /// Software decoder only.
    #[default]
    None,
}

impl fmt::Display for HwAccel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HwAccel::None => write!(f, "none"),
        }
    }
}

impl FromStr for HwAccel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(HwAccel::None),
            "vaapi" | "vdpau" | "xvba" => Err(format!("{} acceleration is not available", s)),
            _ => Err(format!("unknown hardware accelerator \"{}\"", s)),
        }
    }
}

/// Where decoded pixels are read back from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GetImageMode {
    None,
    /// The decoded surface, right after decoding.
    #[default]
    Video,
    /// The surface as presented, after any upload.
    Output,
}

impl fmt::Display for GetImageMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            GetImageMode::None => "none",
            GetImageMode::Video => "video",
            GetImageMode::Output => "output",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for GetImageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(GetImageMode::None),
            "video" => Ok(GetImageMode::Video),
            "output" => Ok(GetImageMode::Output),
            _ => Err(format!(
                "unknown getimage mode \"{}\", expected none, video or output",
                s
            )),
        }
    }
}

/// How a generated image is uploaded to the surface before display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PutImageMode {
    #[default]
    None,
    /// Replace the surface content.
    Override,
}

impl fmt::Display for PutImageMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PutImageMode::None => write!(f, "none"),
            PutImageMode::Override => write!(f, "override"),
        }
    }
}

impl FromStr for PutImageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(PutImageMode::None),
            "override" => Ok(PutImageMode::Override),
            "blend" => Err("blend putimage mode is not available".to_string()),
            _ => Err(format!(
                "unknown putimage mode \"{}\", expected none or override",
                s
            )),
        }
    }
}

pub const DEFAULT_WINDOW_SIZE: Size = Size::new(640, 480);

/// Everything a harness run depends on, passed down explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub window_size: Size,
    pub output: Option<PathBuf>,
    pub genimage: GenImageType,
    pub getimage_mode: GetImageMode,
    /// Image format used to read the surface back, or the decoder's choice.
    pub getimage_format: Option<PixelFormat>,
    pub putimage_mode: PutImageMode,
    pub putimage_format: Option<PixelFormat>,
    /// Size of the uploaded image, or the picture size.
    pub putimage_size: Option<Size>,
    /// Allow mapping the surface in its native layout when no image format is requested.
    pub derive_image: bool,
    pub hwaccel: HwAccel,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window_size: DEFAULT_WINDOW_SIZE,
            output: None,
            genimage: GenImageType::default(),
            getimage_mode: GetImageMode::default(),
            getimage_format: None,
            putimage_mode: PutImageMode::default(),
            putimage_format: None,
            putimage_size: None,
            derive_image: true,
            hwaccel: HwAccel::default(),
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size() {
        assert_eq!("320x240".parse::<Size>(), Ok(Size::new(320, 240)));
        assert_eq!(Size::new(7, 9).to_string(), "7x9");
        for bad in ["", "320", "x240", "320x", "0x240", "320x-1", "320X240"] {
            assert!(bad.parse::<Size>().is_err(), "accepted \"{}\"", bad);
        }
    }

    #[test]
    fn parse_modes() {
        assert_eq!("output".parse::<GetImageMode>(), Ok(GetImageMode::Output));
        assert_eq!("override".parse::<PutImageMode>(), Ok(PutImageMode::Override));
        assert!("blend".parse::<PutImageMode>().is_err());
        assert!("pixmap".parse::<GetImageMode>().is_err());
    }

    #[test]
    fn only_software_acceleration() {
        assert_eq!("none".parse::<HwAccel>(), Ok(HwAccel::None));
        assert_eq!(
            "vaapi".parse::<HwAccel>(),
            Err("vaapi acceleration is not available".to_string())
        );
        assert!("cuda".parse::<HwAccel>().is_err());
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.window_size, Size::new(640, 480));
        assert_eq!(config.getimage_mode, GetImageMode::Video);
        assert_eq!(config.putimage_mode, PutImageMode::None);
        assert!(config.derive_image);
    }
}
