// ============================================================================
// Stroke rasterization: hard-edged polylines in image space
// ============================================================================
//
// Width 1 uses Bresenham so single-pixel strokes stay 8-connected. Wider
// strokes fill every pixel whose center lies within `width / 2` of the
// segment (a capsule with round caps). Points outside the image are clipped.
// Only the first three channels of a pixel are written.

use image::{ImageBuffer, Pixel, Rgb};

/// Draw a polyline through `points`. A single point draws a dot.
pub fn draw_polyline<P>(
    img: &mut ImageBuffer<P, Vec<u8>>,
    points: &[(i32, i32)],
    color: Rgb<u8>,
    width: u32,
) where
    P: Pixel<Subpixel = u8>,
{
    match points {
        [] => {}
        [p] => draw_line(img, *p, *p, color, width),
        _ => {
            for pair in points.windows(2) {
                draw_line(img, pair[0], pair[1], color, width);
            }
        }
    }
}

/// Draw one segment from `start` to `end` (inclusive).
pub fn draw_line<P>(
    img: &mut ImageBuffer<P, Vec<u8>>,
    start: (i32, i32),
    end: (i32, i32),
    color: Rgb<u8>,
    width: u32,
) where
    P: Pixel<Subpixel = u8>,
{
    if width <= 1 {
        draw_pixel_line(img, start, end, color);
    } else {
        draw_capsule(img, start, end, color, width as f64 / 2.0);
    }
}

#[inline]
fn put<P>(img: &mut ImageBuffer<P, Vec<u8>>, x: i64, y: i64, color: Rgb<u8>)
where
    P: Pixel<Subpixel = u8>,
{
    if x >= 0 && y >= 0 && x < img.width() as i64 && y < img.height() as i64 {
        let px = img.get_pixel_mut(x as u32, y as u32);
        px.channels_mut()[..3].copy_from_slice(&color.0);
    }
}

/// Clip `a`-`b` to `[lo_x, hi_x] x [lo_y, hi_y]` (Liang-Barsky).
/// Returns `None` when the segment misses the rectangle.
fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    (lo_x, hi_x): (f64, f64),
    (lo_y, hi_y): (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, a.0 - lo_x),
        (dx, hi_x - a.0),
        (-dy, a.1 - lo_y),
        (dy, hi_y - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

fn draw_pixel_line<P>(
    img: &mut ImageBuffer<P, Vec<u8>>,
    start: (i32, i32),
    end: (i32, i32),
    color: Rgb<u8>,
) where
    P: Pixel<Subpixel = u8>,
{
    // One pixel of margin so clipped endpoints still round onto the edge.
    let clipped = clip_segment(
        (start.0 as f64, start.1 as f64),
        (end.0 as f64, end.1 as f64),
        (-1.0, img.width() as f64),
        (-1.0, img.height() as f64),
    );
    let Some((a, b)) = clipped else {
        return;
    };

    let (mut x0, mut y0) = (a.0.round() as i64, a.1.round() as i64);
    let (x1, y1) = (b.0.round() as i64, b.1.round() as i64);

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    loop {
        put(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Distance from `(px, py)` to the segment `a`-`b`.
#[inline]
fn segment_distance(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

fn draw_capsule<P>(
    img: &mut ImageBuffer<P, Vec<u8>>,
    start: (i32, i32),
    end: (i32, i32),
    color: Rgb<u8>,
    radius: f64,
) where
    P: Pixel<Subpixel = u8>,
{
    let pad = radius.ceil() as i64;
    let (sx, sy) = (start.0 as i64, start.1 as i64);
    let (ex, ey) = (end.0 as i64, end.1 as i64);
    let min_x = (sx.min(ex) - pad).max(0);
    let max_x = (sx.max(ex) + pad).min(img.width() as i64 - 1);
    let min_y = (sy.min(ey) - pad).max(0);
    let max_y = (sy.max(ey) + pad).min(img.height() as i64 - 1);

    let (ax, ay) = (start.0 as f64, start.1 as f64);
    let (bx, by) = (end.0 as f64, end.1 as f64);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if segment_distance(x as f64, y as f64, ax, ay, bx, by) <= radius {
                put(img, x, y, color);
            }
        }
    }
}
