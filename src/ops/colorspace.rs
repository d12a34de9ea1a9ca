// ============================================================================
// HSV conversion and hue/saturation recomposition
// ============================================================================
//
// Hue is carried in [0, 1), saturation and value in [0, 1]. Conversions back
// to 8-bit round to nearest so a value channel taken from an 8-bit pixel
// survives the round trip unchanged.

use image::{ImageBuffer, Pixel, RgbImage, RgbaImage};
use rayon::prelude::*;

use crate::error::{IganError, Result};

/// 8-bit RGB → `[h, s, v]`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [f32; 3] {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;

    let h = if d == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / d % 6.0) / 6.0
    } else if max == g {
        (((b - r) / d) + 2.0) / 6.0
    } else {
        (((r - g) / d) + 4.0) / 6.0
    };
    let h = if h < 0.0 { h + 1.0 } else { h };
    let s = if max == 0.0 { 0.0 } else { d / max };
    [h, s, max]
}

/// `[h, s, v]` → 8-bit RGB.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let c = v * s;
    let x = c * (1.0 - ((h6 % 2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h6 as i32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [to_u8(r + m), to_u8(g + m), to_u8(b + m)]
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Hue and saturation of `painted`, value of `original`.
#[inline]
pub fn recolor_pixel(original: [u8; 3], painted: [u8; 3]) -> [u8; 3] {
    if original == painted {
        return original;
    }
    let [h, s, _] = rgb_to_hsv(painted[0], painted[1], painted[2]);
    let [_, _, v] = rgb_to_hsv(original[0], original[1], original[2]);
    hsv_to_rgb(h, s, v)
}

/// Compose `painted`'s hue/saturation over `original`'s value channel.
/// Both images must have the same size.
pub fn merge_hue_saturation(original: &RgbImage, painted: &RgbImage) -> Result<RgbImage> {
    merge_buffers(original, painted)
}

/// RGBA variant of [`merge_hue_saturation`]. Alpha is taken from `original`.
pub fn merge_hue_saturation_rgba(original: &RgbaImage, painted: &RgbaImage) -> Result<RgbaImage> {
    merge_buffers(original, painted)
}

fn merge_buffers<P>(
    original: &ImageBuffer<P, Vec<u8>>,
    painted: &ImageBuffer<P, Vec<u8>>,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    if original.dimensions() != painted.dimensions() {
        return Err(IganError::InvalidGeometry(format!(
            "cannot merge {:?} with {:?}",
            original.dimensions(),
            painted.dimensions()
        )));
    }
    let channels = P::CHANNEL_COUNT as usize;
    if channels < 3 {
        return Err(IganError::InvalidGeometry(
            "hue/saturation merge needs a color image".into(),
        ));
    }

    let (w, h) = original.dimensions();
    let stride = w as usize * channels;
    let src = original.as_raw();
    let paint = painted.as_raw();
    let mut dst = src.clone();

    if stride > 0 {
        dst.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
            let row_src = &src[y * stride..(y + 1) * stride];
            let row_paint = &paint[y * stride..(y + 1) * stride];
            for pi in (0..stride).step_by(channels) {
                let o = [row_src[pi], row_src[pi + 1], row_src[pi + 2]];
                let p = [row_paint[pi], row_paint[pi + 1], row_paint[pi + 2]];
                row_out[pi..pi + 3].copy_from_slice(&recolor_pixel(o, p));
            }
        });
    }

    ImageBuffer::from_raw(w, h, dst)
        .ok_or_else(|| IganError::InvalidGeometry("merged buffer has the wrong length".into()))
}
