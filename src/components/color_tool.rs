//! Brush color tool: recolors the area under a stroke while keeping the
//! image's original lighting.
//!
//! The stroke is rasterized into a copy of the image; the result takes hue
//! and saturation from that copy and value from the untouched original.

use image::{ImageBuffer, Pixel, Rgb, RgbImage, RgbaImage};

use crate::error::{IganError, Result};
use crate::log_info;
use crate::ops::colorspace::{merge_hue_saturation, merge_hue_saturation_rgba};
use crate::ops::stroke::draw_polyline;

pub const MIN_BRUSH_WIDTH: i32 = 1;
pub const MAX_BRUSH_WIDTH: i32 = 100;

/// Brush state for one canvas.
///
/// `width` is in display pixels; `scale` maps display to image coordinates
/// (`image = display / scale`).
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTool {
    img_width: u32,
    img_height: u32,
    width: i32,
    scale: f32,
}

impl ColorTool {
    pub fn new(img_width: i64, img_height: i64, brush_width: i32, scale: f32) -> Result<Self> {
        if img_width <= 0 || img_height <= 0 {
            return Err(IganError::InvalidGeometry(format!(
                "canvas must be positive, got {}x{}",
                img_width, img_height
            )));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(IganError::InvalidGeometry(format!(
                "scale must be positive, got {}",
                scale
            )));
        }
        let img_width = u32::try_from(img_width)
            .map_err(|_| IganError::InvalidGeometry(format!("canvas width {} too large", img_width)))?;
        let img_height = u32::try_from(img_height).map_err(|_| {
            IganError::InvalidGeometry(format!("canvas height {} too large", img_height))
        })?;

        Ok(Self {
            img_width,
            img_height,
            width: brush_width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH),
            scale,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.img_width, self.img_height)
    }

    /// Brush width in image pixels, never below one.
    pub fn image_brush_width(&self) -> u32 {
        (self.width as f32 / self.scale).max(1.0) as u32
    }

    /// Display → image coordinates, truncating toward zero.
    pub fn to_image_coords(&self, point: (f32, f32)) -> (i32, i32) {
        ((point.0 / self.scale) as i32, (point.1 / self.scale) as i32)
    }

    /// Grow or shrink the brush by `delta`, clamped to [1, 100].
    pub fn set_brush_width(&mut self, delta: i32) -> i32 {
        self.width = self
            .width
            .saturating_add(delta)
            .clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH);
        self.width
    }

    /// Nothing to reset yet; kept for parity with the other tools.
    pub fn reset(&mut self) {}

    /// Paint `points` (display coordinates) in `color` and return the
    /// recolored image. `image` is not modified and must match
    /// [`ColorTool::canvas_size`].
    pub fn paint(&self, image: &RgbImage, points: &[(f32, f32)], color: Rgb<u8>) -> Result<RgbImage> {
        let stroked = self.stroke_copy(image, points, color)?;
        merge_hue_saturation(image, &stroked)
    }

    /// RGBA variant of [`ColorTool::paint`]. Alpha passes through unchanged.
    pub fn paint_rgba(
        &self,
        image: &RgbaImage,
        points: &[(f32, f32)],
        color: Rgb<u8>,
    ) -> Result<RgbaImage> {
        let stroked = self.stroke_copy(image, points, color)?;
        merge_hue_saturation_rgba(image, &stroked)
    }

    fn stroke_copy<P>(
        &self,
        image: &ImageBuffer<P, Vec<u8>>,
        points: &[(f32, f32)],
        color: Rgb<u8>,
    ) -> Result<ImageBuffer<P, Vec<u8>>>
    where
        P: Pixel<Subpixel = u8>,
    {
        if image.dimensions() != self.canvas_size() {
            return Err(IganError::InvalidGeometry(format!(
                "image is {}x{}, tool canvas is {}x{}",
                image.width(),
                image.height(),
                self.img_width,
                self.img_height
            )));
        }
        let mut copy = image.clone();
        let scaled: Vec<(i32, i32)> = points.iter().map(|&p| self.to_image_coords(p)).collect();
        let w = self.image_brush_width();
        draw_polyline(&mut copy, &scaled, color, w);
        log_info!(
            "color stroke: {} point(s), width {}px, rgb({}, {}, {})",
            points.len(),
            w,
            color[0],
            color[1],
            color[2]
        );
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::colorspace::rgb_to_hsv;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn rejects_bad_geometry() {
        assert!(matches!(ColorTool::new(0, 10, 5, 1.0), Err(IganError::InvalidGeometry(_))));
        assert!(matches!(ColorTool::new(10, -1, 5, 1.0), Err(IganError::InvalidGeometry(_))));
        assert!(matches!(ColorTool::new(10, 10, 5, 0.0), Err(IganError::InvalidGeometry(_))));
        assert!(matches!(ColorTool::new(10, 10, 5, f32::NAN), Err(IganError::InvalidGeometry(_))));
    }

    #[test]
    fn image_must_match_canvas() {
        let tool = ColorTool::new(16, 16, 3, 1.0).unwrap();
        let img = RgbImage::new(16, 12);
        assert!(matches!(
            tool.paint(&img, &[(1.0, 1.0)], Rgb([255, 0, 0])),
            Err(IganError::InvalidGeometry(_))
        ));
        let rgba = RgbaImage::new(12, 16);
        assert!(matches!(
            tool.paint_rgba(&rgba, &[], Rgb([255, 0, 0])),
            Err(IganError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn far_stroke_endpoint_does_not_panic() {
        let tool = ColorTool::new(16, 16, 1, 1.0).unwrap();
        let gray = RgbImage::from_pixel(16, 16, Rgb([128, 128, 128]));
        let out = tool.paint(&gray, &[(2.0, 2.0), (1.2e9, 2.0)], Rgb([255, 0, 0])).unwrap();
        assert_eq!(out[(15, 2)], Rgb([128, 0, 0]));
        assert_eq!(out[(1, 2)], Rgb([128, 128, 128]));
    }

    #[test]
    fn brush_width_clamps() {
        let mut tool = ColorTool::new(64, 64, 50, 1.0).unwrap();
        assert_eq!(tool.set_brush_width(60), 100);
        assert_eq!(tool.set_brush_width(-200), 1);
        assert_eq!(tool.set_brush_width(4), 5);
    }

    #[test]
    fn coords_truncate_by_scale() {
        let tool = ColorTool::new(64, 64, 10, 2.0).unwrap();
        assert_eq!(tool.to_image_coords((21.9, 5.0)), (10, 2));
        assert_eq!(tool.image_brush_width(), 5);
        let thin = ColorTool::new(64, 64, 1, 4.0).unwrap();
        assert_eq!(thin.image_brush_width(), 1);
    }

    #[test]
    fn single_point_keeps_luminance() {
        let tool = ColorTool::new(20, 20, 1, 1.0).unwrap();
        let gray = RgbImage::from_pixel(20, 20, Rgb([128, 128, 128]));
        let color = Rgb([30, 200, 90]);
        let out = tool.paint(&gray, &[(10.0, 10.0)], color).unwrap();

        let [h, s, v] = rgb_to_hsv(out[(10, 10)][0], out[(10, 10)][1], out[(10, 10)][2]);
        let [ch, cs, _] = rgb_to_hsv(color[0], color[1], color[2]);
        assert_abs_diff_eq!(h, ch, epsilon = 0.01);
        assert_abs_diff_eq!(s, cs, epsilon = 0.01);
        assert_abs_diff_eq!(v, 128.0 / 255.0, epsilon = 1e-6);
        assert_eq!(out[(0, 0)], Rgb([128, 128, 128]));
    }

    #[test]
    fn input_is_not_mutated() {
        let tool = ColorTool::new(16, 16, 6, 1.0).unwrap();
        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8 * 10, y as u8 * 10, 77]));
        let before = img.clone();
        let out = tool.paint(&img, &[(2.0, 2.0), (12.0, 9.0)], Rgb([0, 0, 255])).unwrap();
        assert_eq!(img, before);
        assert_ne!(out, before);
    }

    #[test]
    fn empty_stroke_is_identity() {
        let tool = ColorTool::new(8, 8, 6, 1.0).unwrap();
        let img = RgbImage::from_fn(8, 8, |x, y| Rgb([x as u8 * 30, y as u8 * 30, 5]));
        assert_eq!(tool.paint(&img, &[], Rgb([255, 0, 0])).unwrap(), img);
    }

    #[test]
    fn rgba_paint_keeps_alpha() {
        let tool = ColorTool::new(8, 8, 3, 1.0).unwrap();
        let img = RgbaImage::from_pixel(8, 8, image::Rgba([200, 200, 200, 99]));
        let out = tool.paint_rgba(&img, &[(4.0, 4.0)], Rgb([255, 0, 0])).unwrap();
        assert_eq!(out[(4, 4)], image::Rgba([200, 0, 0, 99]));
    }

    proptest! {
        #[test]
        fn prop_width_always_in_range(start in -500i32..500, deltas in prop::collection::vec(-300i32..300, 0..20)) {
            let mut tool = ColorTool::new(10, 10, start, 1.0).unwrap();
            for d in deltas {
                let w = tool.set_brush_width(d);
                prop_assert!((MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH).contains(&w));
            }
        }
    }
}
