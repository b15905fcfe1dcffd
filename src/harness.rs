// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! One run of the decode pipeline: decode, upload, read back and write out.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use hwimage::generate;
use hwimage::write_ppm;
use hwimage::Image;
use hwimage::PixelFormat;
use log::debug;
use log::info;

use crate::codec::CodecSource;
use crate::codec::DecodeRequest;
use crate::config::Config;
use crate::config::GetImageMode;
use crate::config::PutImageMode;
use crate::config::Size;
use crate::decoder::get_image;
use crate::decoder::put_image;
use crate::decoder::HwDecoder;

fn format_name(format: Option<PixelFormat>) -> &'static str {
    format.map_or("hardware default", PixelFormat::name)
}

fn log_settings(config: &Config, decoder: &dyn HwDecoder) {
    info!(
        "decoder '{}', hardware accelerator '{}', window size {}",
        decoder.name(),
        config.hwaccel,
        config.window_size
    );
    if config.getimage_mode != GetImageMode::None {
        info!(
            "reading back decoded pixels from '{}' surface, in {} format",
            config.getimage_mode,
            format_name(config.getimage_format)
        );
    }
    if config.putimage_mode != PutImageMode::None {
        info!(
            "transferring {} pixels to surface in '{}' mode, in {} format",
            config.genimage,
            config.putimage_mode,
            format_name(config.putimage_format)
        );
    }
}

/// Uploads the generated image if requested, then reads the presented surface back.
fn display(
    config: &Config,
    decoder: &mut dyn HwDecoder,
    image: &mut Image,
    picture_size: Size,
) -> anyhow::Result<()> {
    if config.putimage_mode == PutImageMode::Override {
        let size = config.putimage_size.unwrap_or(picture_size);
        let pattern = generate(size.width, size.height, config.genimage).with_context(|| {
            format!("failed to generate {} image of size {}", config.genimage, size)
        })?;
        put_image(
            decoder,
            &pattern,
            config.putimage_format,
            config.derive_image,
        )
        .context("failed to upload generated image")?;
    }

    // Video and output surfaces are the same.
    if config.getimage_mode == GetImageMode::Output {
        get_image(decoder, image, config.getimage_format, config.derive_image)
            .context("failed to read back output surface")?;
    }
    debug!("no display backend, presentation skipped");
    Ok(())
}

fn write_output(path: &Path, image: &Image) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_ppm(image, &mut out).with_context(|| format!("failed to write {}", path.display()))?;
    info!(
        "wrote {}x{} image to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}

/// Runs the pipeline on `decoder`, decoding the picture of `source` if one is given.
///
/// Without a source the surface is sized after the window and keeps its initial content.
pub fn run(
    config: &Config,
    decoder: &mut dyn HwDecoder,
    source: Option<&dyn CodecSource>,
) -> anyhow::Result<()> {
    log_settings(config, decoder);

    let Size { width, height } = config.window_size;
    let mut image = Image::new(width, height, PixelFormat::rgb32())
        .context("failed to allocate working image")?;

    let request = source
        .map(DecodeRequest::from_source)
        .transpose()
        .context("failed to gather coded picture")?;
    let picture_size = request
        .as_ref()
        .map_or(config.window_size, |r| Size::new(r.width, r.height));
    decoder
        .init(picture_size.width, picture_size.height)
        .with_context(|| format!("failed to initialize decoder for {}", picture_size))?;

    match &request {
        Some(request) => {
            decoder.decode(request).context("decode failed")?;
            info!("decoded {} picture of size {}", request.codec, picture_size);
        }
        None => info!("no coded picture, surface left as initialized"),
    }
    if config.getimage_mode == GetImageMode::Video {
        get_image(decoder, &mut image, config.getimage_format, config.derive_image)
            .context("failed to read back decoded picture")?;
    }

    display(config, decoder, &mut image, picture_size)?;

    if let Some(path) = &config.output {
        if config.getimage_mode == GetImageMode::None {
            info!("nothing read back, not writing {}", path.display());
        } else {
            write_output(path, &image)?;
        }
    }
    Ok(())
}
