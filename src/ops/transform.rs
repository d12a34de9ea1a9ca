// ============================================================================
// Image batch transforms: normalisation, crops, flips and grid tiling
// ============================================================================
//
// Arrays are laid out as (H, W, C) for single images and (N, H, W, C) for
// batches. Generator output lives in [-1, 1]; display images in [0, 1].

use image::{GrayImage, RgbImage};
use ndarray::{Array, Array3, ArrayView3, ArrayView4, Dimension, s};
use rand::Rng;

use crate::error::{IganError, Result};

/// Grid shape `(rows, cols)` for `num_images` tiles: `floor(sqrt n)` by
/// `ceil(sqrt n)`. Fails when that grid does not hold exactly `n` tiles.
pub fn image_manifold_size(num_images: usize) -> Result<(usize, usize)> {
    let root = (num_images as f64).sqrt();
    let rows = root.floor() as usize;
    let cols = root.ceil() as usize;
    if rows * cols != num_images || num_images == 0 {
        return Err(IganError::InvalidGeometry(format!(
            "{} images do not fill a {}x{} grid",
            num_images, rows, cols
        )));
    }
    Ok((rows, cols))
}

/// Tile a batch into one image, row-major, `size = (rows, cols)`.
/// Unused cells stay zero.
pub fn merge(images: ArrayView4<'_, f32>, size: (usize, usize)) -> Result<Array3<f32>> {
    let (n, h, w, c) = images.dim();
    if !matches!(c, 1 | 3 | 4) {
        return Err(IganError::InvalidGeometry(format!(
            "merge expects 1, 3 or 4 channels, got {}",
            c
        )));
    }
    let (rows, cols) = size;
    if n > rows * cols {
        return Err(IganError::InvalidGeometry(format!(
            "{} images do not fit a {}x{} grid",
            n, rows, cols
        )));
    }

    let mut grid = Array3::<f32>::zeros((rows * h, cols * w, c));
    for (idx, image) in images.outer_iter().enumerate() {
        let i = idx % cols;
        let j = idx / cols;
        grid.slice_mut(s![j * h..(j + 1) * h, i * w..(i + 1) * w, ..])
            .assign(&image);
    }
    Ok(grid)
}

/// [-1, 1] → [0, 1].
pub fn inverse_transform<D: Dimension>(images: &Array<f32, D>) -> Array<f32, D> {
    images.mapv(|v| (v + 1.0) / 2.0)
}

/// [0, 255] pixels → [-1, 1], optionally center-cropped first.
pub fn transform(image: ArrayView3<'_, f32>, crop: Option<(usize, usize)>) -> Result<Array3<f32>> {
    let cropped = match crop {
        Some((ch, cw)) => center_crop(image, ch, Some(cw))?,
        None => image.to_owned(),
    };
    Ok(cropped.mapv(|v| v / 127.5 - 1.0))
}

/// Crop the center `crop_h` x `crop_w` window (`crop_w` defaults to `crop_h`).
/// Offsets round half to even.
pub fn center_crop(
    image: ArrayView3<'_, f32>,
    crop_h: usize,
    crop_w: Option<usize>,
) -> Result<Array3<f32>> {
    let crop_w = crop_w.unwrap_or(crop_h);
    let (h, w, _) = image.dim();
    check_crop(h, w, crop_h, crop_w)?;
    let j = ((h - crop_h) as f64 / 2.0).round_ties_even() as usize;
    let i = ((w - crop_w) as f64 / 2.0).round_ties_even() as usize;
    Ok(image
        .slice(s![j..j + crop_h, i..i + crop_w, ..])
        .to_owned())
}

/// Crop a uniformly placed `crop_h` x `crop_w` window.
pub fn crop_random<R: Rng + ?Sized>(
    rng: &mut R,
    image: ArrayView3<'_, f32>,
    crop_h: usize,
    crop_w: usize,
) -> Result<Array3<f32>> {
    let (h, w, _) = image.dim();
    check_crop(h, w, crop_h, crop_w)?;
    let y0 = rng.gen_range(0..=h - crop_h);
    let x0 = rng.gen_range(0..=w - crop_w);
    Ok(image
        .slice(s![y0..y0 + crop_h, x0..x0 + crop_w, ..])
        .to_owned())
}

/// Mirror horizontally with probability one half.
pub fn flip_random<R: Rng + ?Sized>(rng: &mut R, image: ArrayView3<'_, f32>) -> Array3<f32> {
    if rng.r#gen::<f64>() > 0.5 {
        image.slice(s![.., ..;-1, ..]).to_owned()
    } else {
        image.to_owned()
    }
}

fn check_crop(h: usize, w: usize, crop_h: usize, crop_w: usize) -> Result<()> {
    if crop_h > h || crop_w > w {
        return Err(IganError::InvalidGeometry(format!(
            "cannot crop {}x{} out of {}x{}",
            crop_h, crop_w, h, w
        )));
    }
    Ok(())
}

/// 8-bit RGB image → (H, W, 3) array of raw [0, 255] values.
pub fn rgb_image_to_array(img: &RgbImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    Array3::from_shape_fn((h as usize, w as usize, 3), |(y, x, c)| {
        img.get_pixel(x as u32, y as u32).0[c] as f32
    })
}

/// Quantize a [0, 1] (H, W, C) array to an RGB image. One channel is
/// replicated to gray; a fourth channel is dropped.
pub fn to_rgb_image(image: ArrayView3<'_, f32>) -> Result<RgbImage> {
    let (h, w, c) = image.dim();
    let q = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    match c {
        1 => {
            let gray = GrayImage::from_fn(w as u32, h as u32, |x, y| {
                image::Luma([q(image[[y as usize, x as usize, 0]])])
            });
            Ok(image::DynamicImage::ImageLuma8(gray).to_rgb8())
        }
        3 | 4 => Ok(RgbImage::from_fn(w as u32, h as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            image::Rgb([q(image[[y, x, 0]]), q(image[[y, x, 1]]), q(image[[y, x, 2]])])
        })),
        _ => Err(IganError::InvalidGeometry(format!(
            "expected 1, 3 or 4 channels, got {}",
            c
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array4, array};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn manifold_for_squares_and_near_squares() {
        assert_eq!(image_manifold_size(64).unwrap(), (8, 8));
        assert_eq!(image_manifold_size(12).unwrap(), (3, 4));
        assert!(image_manifold_size(10).is_err());
        assert!(image_manifold_size(0).is_err());
    }

    #[test]
    fn merge_places_tiles_row_major() {
        let mut batch = Array4::<f32>::zeros((4, 2, 2, 3));
        for n in 0..4 {
            batch.slice_mut(s![n, .., .., ..]).fill(n as f32);
        }
        let grid = merge(batch.view(), (2, 2)).unwrap();
        assert_eq!(grid.dim(), (4, 4, 3));
        assert_eq!(grid[[0, 0, 0]], 0.0);
        assert_eq!(grid[[0, 3, 0]], 1.0);
        assert_eq!(grid[[3, 0, 0]], 2.0);
        assert_eq!(grid[[3, 3, 2]], 3.0);
    }

    #[test]
    fn merge_rejects_two_channels() {
        let batch = Array4::<f32>::zeros((1, 2, 2, 2));
        assert!(merge(batch.view(), (1, 1)).is_err());
    }

    #[test]
    fn transform_and_inverse_cover_unit_range() {
        let img = array![[[0.0f32], [255.0]]];
        let t = transform(img.view(), None).unwrap();
        assert_abs_diff_eq!(t[[0, 0, 0]], -1.0);
        assert_abs_diff_eq!(t[[0, 1, 0]], 1.0);
        let back = inverse_transform(&t);
        assert_abs_diff_eq!(back[[0, 0, 0]], 0.0);
        assert_abs_diff_eq!(back[[0, 1, 0]], 1.0);
    }

    #[test]
    fn center_crop_rounds_half_to_even() {
        let img = Array3::from_shape_fn((7, 4, 1), |(y, x, _)| (y * 10 + x) as f32);
        // (7 - 2) / 2 = 2.5 -> 2, (4 - 1) / 2 = 1.5 -> 2
        let c = center_crop(img.view(), 2, Some(1)).unwrap();
        assert_eq!(c.dim(), (2, 1, 1));
        assert_eq!(c[[0, 0, 0]], 22.0);
        assert!(center_crop(img.view(), 8, None).is_err());
    }

    #[test]
    fn random_crop_stays_inside() {
        let mut rng = StdRng::seed_from_u64(4);
        let img = Array3::<f32>::ones((10, 12, 3));
        for _ in 0..20 {
            let c = crop_random(&mut rng, img.view(), 4, 12).unwrap();
            assert_eq!(c.dim(), (4, 12, 3));
        }
    }

    #[test]
    fn flip_random_mirrors_or_copies() {
        let mut rng = StdRng::seed_from_u64(8);
        let img = array![[[1.0f32], [2.0], [3.0]]];
        for _ in 0..10 {
            let f = flip_random(&mut rng, img.view());
            let first = f[[0, 0, 0]];
            assert!(first == 1.0 || first == 3.0);
            assert_eq!(f[[0, 1, 0]], 2.0);
        }
    }

    #[test]
    fn quantize_gray_and_color() {
        let gray = Array3::from_elem((1, 2, 1), 0.5f32);
        let img = to_rgb_image(gray.view()).unwrap();
        assert_eq!(img.get_pixel(1, 0).0, [128, 128, 128]);

        let rgb = array![[[1.0f32, 0.0, 0.25]]];
        assert_eq!(to_rgb_image(rgb.view()).unwrap().get_pixel(0, 0).0, [255, 0, 64]);
    }
}
