//! Visualization drivers: build latent dictionaries, run them through a
//! [`Generator`] and turn the output into named frames ready for export.
//!
//! Nothing here touches the filesystem; see [`crate::io`] for writing frames.

use image::RgbImage;
use ndarray::{Array4, Axis, s};
use rand::Rng;

use crate::error::{IganError, Result};
use crate::latent::{self, LatentLayout, LatentSamples, Mode};
use crate::log_info;
use crate::ops::transform::{image_manifold_size, inverse_transform, merge, to_rgb_image};

/// Anything that turns a latent dictionary into a batch of images.
///
/// Output shape is `(batch, H, W, C)` with values in [-1, 1].
pub trait Generator {
    fn generate(&mut self, z: &LatentSamples) -> Result<Array4<f32>>;
}

/// A rendered image plus the file stem it should be saved under.
#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,
    pub image: RgbImage,
}

/// A named frame sequence, exported as an animated GIF.
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: String,
    pub frames: Vec<RgbImage>,
}

fn run<G: Generator + ?Sized>(generator: &mut G, z: &LatentSamples) -> Result<Array4<f32>> {
    let images = generator.generate(z)?;
    if images.len_of(Axis(0)) != z.batch_size() {
        return Err(IganError::InvalidGeometry(format!(
            "generator returned {} images for a batch of {}",
            images.len_of(Axis(0)),
            z.batch_size()
        )));
    }
    Ok(images)
}

/// Tile a generator batch into one display image.
pub fn render_grid(images: &Array4<f32>, size: (usize, usize)) -> Result<RgbImage> {
    let grid = merge(inverse_transform(images).view(), size)?;
    to_rgb_image(grid.view())
}

fn render_each(images: &Array4<f32>) -> Result<Vec<RgbImage>> {
    let unit = inverse_transform(images);
    unit.outer_iter().map(to_rgb_image).collect()
}

/// One grid of fully random samples.
pub fn visualize_random<G, R>(
    generator: &mut G,
    rng: &mut R,
    layout: &LatentLayout,
    batch_size: usize,
    name: &str,
) -> Result<Frame>
where
    G: Generator + ?Sized,
    R: Rng + ?Sized,
{
    let size = image_manifold_size(batch_size)?;
    let z = latent::sample(rng, layout, batch_size, Mode::FullRandom)?;
    let images = run(generator, &z)?;
    Ok(Frame {
        name: format!("test_{}_all_rand", name),
        image: render_grid(&images, size)?,
    })
}

/// One gradient-sweep grid per pyramid level.
pub fn visualize_level_sweeps<G, R>(
    generator: &mut G,
    rng: &mut R,
    layout: &LatentLayout,
    batch_size: usize,
    name: &str,
) -> Result<Vec<Frame>>
where
    G: Generator + ?Sized,
    R: Rng + ?Sized,
{
    let size = image_manifold_size(batch_size)?;
    let mut frames = Vec::with_capacity(layout.latent_levels());
    for level in 0..layout.latent_levels() {
        let z = latent::sample(rng, layout, batch_size, Mode::SharedSweep { level })?;
        let images = run(generator, &z)?;
        frames.push(Frame {
            name: format!("test_{}_-1_gradient_level_{}_option2", name, level),
            image: render_grid(&images, size)?,
        });
    }
    log_info!("rendered {} level sweep grid(s)", frames.len());
    Ok(frames)
}

/// Per-level sweeps as frame sequences (one frame per batch row).
pub fn visualize_level_animations<G, R>(
    generator: &mut G,
    rng: &mut R,
    layout: &LatentLayout,
    batch_size: usize,
    name: &str,
) -> Result<Vec<Animation>>
where
    G: Generator + ?Sized,
    R: Rng + ?Sized,
{
    let mut out = Vec::with_capacity(layout.latent_levels());
    for level in 0..layout.latent_levels() {
        let z = latent::sample(rng, layout, batch_size, Mode::SharedSweep { level })?;
        let images = run(generator, &z)?;
        out.push(Animation {
            name: format!("test_{}_gif_gradient_{}_option2", name, level),
            frames: render_each(&images)?,
        });
    }
    Ok(out)
}

/// One sweep grid per latent dimension of a flat generator.
pub fn visualize_flat_sweeps<G, R>(
    generator: &mut G,
    rng: &mut R,
    z_dim: usize,
    batch_size: usize,
    name: &str,
) -> Result<Vec<Frame>>
where
    G: Generator + ?Sized,
    R: Rng + ?Sized,
{
    let size = image_manifold_size(batch_size)?;
    let mut frames = Vec::with_capacity(z_dim);
    for idx in 0..z_dim {
        let z = latent::flat_dimension_sweep(rng, z_dim, batch_size, idx)?;
        let images = run(generator, &z)?;
        frames.push(Frame {
            name: format!("test_{}_{}_gradient_option1", name, idx),
            image: render_grid(&images, size)?,
        });
    }
    Ok(frames)
}

/// One grid per (level, dimension) pair, sweeping that single component.
pub fn visualize_all_dims<G, R>(
    generator: &mut G,
    rng: &mut R,
    layout: &LatentLayout,
    batch_size: usize,
    name: &str,
) -> Result<Vec<Frame>>
where
    G: Generator + ?Sized,
    R: Rng + ?Sized,
{
    let size = image_manifold_size(batch_size)?;
    let mut frames = Vec::new();
    for level in 0..layout.latent_levels() {
        let width = layout.dim(level).unwrap_or(0);
        for dim in 0..width {
            let z = latent::sample(rng, layout, batch_size, Mode::IndexedSweep { level, dim })?;
            let images = run(generator, &z)?;
            frames.push(Frame {
                name: format!("test_dim{}_gradient_level_{}_{}", name, level, dim),
                image: render_grid(&images, size)?,
            });
        }
    }
    log_info!("rendered {} per-dimension grid(s)", frames.len());
    Ok(frames)
}

/// `rounds` strips of the first five fusion-mode rows, in reverse order.
pub fn synthesize<G, R>(
    generator: &mut G,
    rng: &mut R,
    layout: &LatentLayout,
    batch_size: usize,
    rounds: usize,
    name: &str,
) -> Result<Vec<Frame>>
where
    G: Generator + ?Sized,
    R: Rng + ?Sized,
{
    let mut frames = Vec::with_capacity(rounds);
    for num in 0..rounds {
        let z = latent::sample(rng, layout, batch_size, Mode::Fusion)?;
        let images = run(generator, &z)?;
        let strip = images.slice(s![0..5;-1, .., .., ..]).to_owned();
        frames.push(Frame {
            name: format!("test_{}_synthesis_num_{}_option2", name, num),
            image: render_grid(&strip, (1, 5))?,
        });
    }
    Ok(frames)
}

/// `rounds` fused dictionaries, each saved as eight single images.
pub fn image_fusion<G, R>(
    generator: &mut G,
    rng: &mut R,
    layout: &LatentLayout,
    batch_size: usize,
    rounds: usize,
    name: &str,
) -> Result<Vec<Frame>>
where
    G: Generator + ?Sized,
    R: Rng + ?Sized,
{
    let mut frames = Vec::with_capacity(rounds * latent::FUSION_MIN_BATCH);
    for exp in 0..rounds {
        let z = latent::fusion(rng, layout, batch_size)?;
        let images = run(generator, &z)?;
        let singles = render_each(&images)?;
        for (i, image) in singles.into_iter().take(latent::FUSION_MIN_BATCH).enumerate() {
            frames.push(Frame {
                name: format!("test_{}_fusion_{}_{}", name, exp, i),
                image,
            });
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latent::LatentKey;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Paints each image with the first component of its level-0 (or flat) row.
    struct MeanGenerator {
        calls: usize,
    }

    impl Generator for MeanGenerator {
        fn generate(&mut self, z: &LatentSamples) -> Result<Array4<f32>> {
            self.calls += 1;
            let key = z.keys().next().unwrap_or(LatentKey::Flat);
            let src = z.get(key).unwrap();
            Ok(Array4::from_shape_fn((z.batch_size(), 2, 3, 3), |(n, _, _, _)| {
                src[[n, 0]].clamp(-1.0, 1.0)
            }))
        }
    }

    struct ShortGenerator;

    impl Generator for ShortGenerator {
        fn generate(&mut self, _z: &LatentSamples) -> Result<Array4<f32>> {
            Ok(Array4::zeros((1, 2, 2, 3)))
        }
    }

    #[test]
    fn level_sweeps_one_grid_per_level() {
        let mut generator = MeanGenerator { calls: 0 };
        let mut rng = StdRng::seed_from_u64(1);
        let layout = LatentLayout::pyramid(vec![4, 4, 4]);
        let frames = visualize_level_sweeps(&mut generator, &mut rng, &layout, 4, "m").unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(generator.calls, 3);
        assert_eq!(frames[1].name, "test_m_-1_gradient_level_1_option2");
        assert_eq!(frames[0].image.dimensions(), (6, 4));
    }

    #[test]
    fn all_dims_covers_every_component() {
        let mut generator = MeanGenerator { calls: 0 };
        let mut rng = StdRng::seed_from_u64(1);
        let layout = LatentLayout::pyramid(vec![2, 3]);
        let frames = visualize_all_dims(&mut generator, &mut rng, &layout, 4, "").unwrap();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[4].name, "test_dim_gradient_level_1_2");
    }

    #[test]
    fn synthesize_strips_are_five_wide() {
        let mut generator = MeanGenerator { calls: 0 };
        let mut rng = StdRng::seed_from_u64(1);
        let layout = LatentLayout::pyramid(vec![4, 4]);
        let frames = synthesize(&mut generator, &mut rng, &layout, 8, 2, "s").unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].image.dimensions(), (15, 2));
    }

    #[test]
    fn fusion_emits_eight_singles_per_round() {
        let mut generator = MeanGenerator { calls: 0 };
        let mut rng = StdRng::seed_from_u64(1);
        let layout = LatentLayout::pyramid(vec![4, 4, 4]);
        let frames = image_fusion(&mut generator, &mut rng, &layout, 16, 2, "f").unwrap();
        assert_eq!(frames.len(), 16);
        assert_eq!(frames[9].name, "test_f_fusion_1_1");
        assert_eq!(frames[0].image.dimensions(), (3, 2));
    }

    #[test]
    fn flat_sweeps_and_animation() {
        let mut generator = MeanGenerator { calls: 0 };
        let mut rng = StdRng::seed_from_u64(1);
        let frames = visualize_flat_sweeps(&mut generator, &mut rng, 3, 4, "flat").unwrap();
        assert_eq!(frames.len(), 3);

        let layout = LatentLayout::pyramid(vec![4, 4]);
        let anims = visualize_level_animations(&mut generator, &mut rng, &layout, 5, "a").unwrap();
        assert_eq!(anims.len(), 2);
        assert_eq!(anims[0].frames.len(), 5);
        // The sweep brightens monotonically along the batch axis.
        let lum: Vec<u8> = anims[0].frames.iter().map(|f| f.get_pixel(0, 0)[0]).collect();
        assert!(lum.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn short_generator_output_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let layout = LatentLayout::pyramid(vec![4]);
        let err = visualize_random(&mut ShortGenerator, &mut rng, &layout, 4, "x");
        assert!(matches!(err, Err(IganError::InvalidGeometry(_))));
    }
}
