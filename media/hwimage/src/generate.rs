// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Synthetic test patterns, used as payloads for image uploads.

use std::fmt;
use std::str::FromStr;

use log::debug;
use log::warn;
use rand::Rng;
use remain::sorted;
use thiserror::Error as ThisError;

use crate::fourcc::PixelFormat;
use crate::image::Image;
use crate::image::Result;
use crate::random::random_range;
use crate::random::with_rng;

const RECT_COUNT: usize = 10;
const RECT_MIN: u32 = 10;
const RECT_VAR: u32 = 50;

/// Which pattern [`generate`] draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenImageType {
    /// Flowers, or rectangles if flowers cannot be drawn.
    #[default]
    Auto,
    Rects,
    RgbRects,
    Flowers,
}

impl fmt::Display for GenImageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            GenImageType::Auto => "auto",
            GenImageType::Rects => "rects",
            GenImageType::RgbRects => "rgb-rects",
            GenImageType::Flowers => "flowers",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for GenImageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "auto" => Ok(GenImageType::Auto),
            "rects" => Ok(GenImageType::Rects),
            "rgb-rects" => Ok(GenImageType::RgbRects),
            "flowers" => Ok(GenImageType::Flowers),
            _ => Err(format!(
                "unknown pattern \"{}\", expected auto, rects, rgb-rects or flowers",
                s
            )),
        }
    }
}

#[sorted]
#[derive(Debug, ThisError)]
enum RenderError {
    #[cfg(feature = "flowers")]
    #[error("vector graphics renderer failed: {0}")]
    DelegateFailure(&'static str),
    #[cfg(not(feature = "flowers"))]
    #[error("built without vector graphics support")]
    Unavailable,
}

/// Draws a `kind` pattern into a new native RGB32 image.
pub fn generate(width: u32, height: u32, kind: GenImageType) -> Result<Image<'static>> {
    with_rng(|rng| generate_with_rng(width, height, kind, rng))
}

/// Same as [`generate`], drawing random numbers from `rng`.
pub fn generate_with_rng<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    kind: GenImageType,
    rng: &mut R,
) -> Result<Image<'static>> {
    let mut image = Image::new(width, height, PixelFormat::rgb32())?;
    match kind {
        GenImageType::Rects => draw_rects(&mut image, rng)?,
        GenImageType::RgbRects => draw_rgb_rects(&mut image)?,
        GenImageType::Auto | GenImageType::Flowers => {
            if let Err(e) = draw_flowers(&mut image, rng) {
                if kind == GenImageType::Flowers {
                    warn!("cannot draw flowers ({}), drawing rectangles instead", e);
                } else {
                    debug!("cannot draw flowers ({}), drawing rectangles instead", e);
                }
                draw_rects(&mut image, rng)?;
            }
        }
    }
    Ok(image)
}

fn draw_rects<R: Rng + ?Sized>(image: &mut Image, rng: &mut R) -> Result<()> {
    image.data_mut().fill(0);
    let (width, height) = (image.width(), image.height());
    for _ in 0..RECT_COUNT {
        let x = random_range(rng, 0, width.saturating_sub(RECT_MIN + RECT_VAR));
        let y = random_range(rng, 0, height);
        let w = random_range(rng, RECT_MIN, RECT_MIN + RECT_VAR);
        let h = random_range(rng, RECT_MIN, RECT_MIN + RECT_VAR);
        let color = 0xff00_0000 | random_range(rng, 0, 1 << 24);
        image.draw_rectangle(x, y, w, h, color)?;
    }
    Ok(())
}

fn draw_rgb_rects(image: &mut Image) -> Result<()> {
    image.data_mut().fill(0);
    let (w, h) = (image.width() / 2, image.height() / 2);
    image.draw_rectangle(0, 0, w, h, 0xffff_0000)?;
    image.draw_rectangle(w, 0, w, h, 0xff00_ff00)?;
    image.draw_rectangle(0, h, w, h, 0xff00_00ff)?;
    Ok(())
}

#[cfg(not(feature = "flowers"))]
fn draw_flowers<R: Rng + ?Sized>(
    _image: &mut Image,
    _rng: &mut R,
) -> std::result::Result<(), RenderError> {
    Err(RenderError::Unavailable)
}

#[cfg(feature = "flowers")]
use flowers::draw_flowers;

#[cfg(feature = "flowers")]
mod flowers {
    use rand::Rng;
    use tiny_skia::FillRule;
    use tiny_skia::Paint;
    use tiny_skia::Path;
    use tiny_skia::PathBuilder;
    use tiny_skia::Pixmap;
    use tiny_skia::Transform;

    use super::RenderError;
    use crate::image::Image;
    use crate::random::random_range;

    const FLOWER_COUNT: usize = 10;
    const PETAL_MIN: u32 = 5;
    const PETAL_VAR: u32 = 8;

    const PALETTE: [[f32; 3]; 10] = [
        [0.71, 0.81, 0.83],
        [1.00, 0.78, 0.57],
        [0.64, 0.30, 0.35],
        [0.73, 0.40, 0.39],
        [0.91, 0.56, 0.64],
        [0.70, 0.47, 0.45],
        [0.92, 0.75, 0.60],
        [0.82, 0.86, 0.85],
        [0.51, 0.56, 0.67],
        [1.00, 0.79, 0.58],
    ];

    /// Half transparent paint with a palette color different from `last`.
    fn pick_paint<R: Rng + ?Sized>(rng: &mut R, last: &mut Option<usize>) -> Paint<'static> {
        let index = loop {
            let i = random_range(rng, 0, PALETTE.len() as u32) as usize;
            if Some(i) != *last {
                break i;
            }
        };
        *last = Some(index);
        let [r, g, b] = PALETTE[index];
        let mut paint = Paint::default();
        paint.set_color_rgba8(
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
            128,
        );
        paint.anti_alias = true;
        paint
    }

    /// A petal pointing along the x axis, made of two cubic curves starting at the origin.
    fn petal(size: f32, pm1: f32, pm2: f32) -> Option<Path> {
        let tip = 2.0 * size + pm1;
        let mut pb = PathBuilder::new();
        pb.move_to(0.0, 0.0);
        pb.cubic_to(size, size, (pm2 + 2.0) * size, size, tip, 0.0);
        pb.cubic_to(tip + pm2 * size, -size, tip - size, -size, 0.0, 0.0);
        pb.close();
        pb.finish()
    }

    fn draw_flower<R: Rng + ?Sized>(
        pixmap: &mut Pixmap,
        x: f32,
        y: f32,
        mut petal_size: i32,
        rng: &mut R,
    ) -> Result<(), RenderError> {
        let shrink = petal_size as u32;
        let origin = Transform::from_translate(x, y);
        let mut last_color = None;

        for _ in 0..random_range(rng, 1, 4) {
            let petals = random_range(rng, 4, 9);
            let group = origin.pre_concat(Transform::from_rotate(
                (random_range(rng, 0, 6) as f32).to_degrees(),
            ));
            let paint = pick_paint(rng, &mut last_color);
            let pm1 = random_range(rng, 0, 20) as f32;
            let pm2 = random_range(rng, 0, 4) as f32;

            // Degenerate petals have no path and are skipped.
            if let Some(path) = petal(petal_size as f32, pm1, pm2) {
                for j in 1..=petals {
                    let angle = 360.0 * j as f32 / petals as f32;
                    let transform = group.pre_concat(Transform::from_rotate(angle));
                    pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
                }
            }
            petal_size -= random_range(rng, 0, shrink) as i32;
        }

        let paint = pick_paint(rng, &mut last_color);
        if petal_size < 0 {
            petal_size = random_range(rng, 0, 10) as i32;
        }
        if petal_size > 0 {
            let center = PathBuilder::from_circle(0.0, 0.0, petal_size as f32)
                .ok_or(RenderError::DelegateFailure("invalid flower center"))?;
            pixmap.fill_path(&center, &paint, FillRule::Winding, origin, None);
        }
        Ok(())
    }

    pub(super) fn draw_flowers<R: Rng + ?Sized>(
        image: &mut Image,
        rng: &mut R,
    ) -> Result<(), RenderError> {
        let (width, height) = (image.width(), image.height());
        let mut pixmap = Pixmap::new(width, height)
            .ok_or(RenderError::DelegateFailure("cannot allocate canvas"))?;

        for _ in 0..FLOWER_COUNT {
            let x = random_range(rng, 0, width.saturating_sub((PETAL_MIN + PETAL_VAR) * 2));
            let y = random_range(rng, 0, height);
            let petal_size = random_range(rng, PETAL_MIN, PETAL_MIN + PETAL_VAR);
            draw_flower(&mut pixmap, x as f32, y as f32, petal_size as i32, rng)?;
        }

        // The canvas starts transparent, so premultiplied colors are the colors over black.
        let stride = image.stride(0);
        let width = width as usize;
        let plane = image.plane_mut(0);
        for (i, px) in pixmap.pixels().iter().enumerate() {
            let argb = 0xff00_0000
                | (px.red() as u32) << 16
                | (px.green() as u32) << 8
                | px.blue() as u32;
            let start = (i / width) * stride + (i % width) * 4;
            plane[start..start + 4].copy_from_slice(&argb.to_ne_bytes());
        }
        Ok(())
    }
}
