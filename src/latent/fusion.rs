//! Fusion composer: blends two latent endpoints at a chosen pyramid depth.
//!
//! The row layout is a fixed demo recipe over an 8-row batch:
//!
//! | row | content |
//! |-----|---------|
//! | 0   | `left` endpoint (root level redrawn) |
//! | 1   | `right` endpoint (copy of row 4) |
//! | 2-4 | levels below `split-1` from left, the rest from right |
//! | 5-7 | levels below `split-4` from right, the rest from left |

use rand::Rng;

use super::{FUSION_MIN_BATCH, FUSION_RANGE, LatentLayout, LatentSamples, Mode, sample};
use crate::error::{IganError, Result};
use crate::log_info;

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;
/// Row copied into `RIGHT` before the splits are written.
const RIGHT_SOURCE: usize = 4;
const LEFT_SPLITS: [usize; 3] = [2, 3, 4];
const RIGHT_SPLITS: [usize; 3] = [5, 6, 7];

/// Build a [`Mode::Fusion`] dictionary and compose it in one step.
pub fn fusion<R: Rng + ?Sized>(
    rng: &mut R,
    layout: &LatentLayout,
    batch_size: usize,
) -> Result<LatentSamples> {
    let mut samples = sample(rng, layout, batch_size, Mode::Fusion)?;
    compose_fusion(rng, &mut samples)?;
    Ok(samples)
}

/// Rewrite rows 0..8 of every pyramid level of `samples` in place.
pub fn compose_fusion<R: Rng + ?Sized>(rng: &mut R, samples: &mut LatentSamples) -> Result<()> {
    if samples.batch_size() < FUSION_MIN_BATCH {
        return Err(IganError::InvalidConfiguration(format!(
            "fusion needs a batch size of at least {}, got {}",
            FUSION_MIN_BATCH,
            samples.batch_size()
        )));
    }
    samples.check_shape()?;
    let levels = samples.pyramid_levels();
    if levels == 0 {
        return Err(IganError::InvalidConfiguration(
            "fusion needs a pyramid dictionary".into(),
        ));
    }

    let root = samples.level_array_mut(0).ok_or_else(|| {
        IganError::InvalidConfiguration("fusion dictionary is missing level 0".into())
    })?;
    for v in root.row_mut(LEFT).iter_mut() {
        *v = rng.gen_range(-FUSION_RANGE..FUSION_RANGE);
    }

    for level in 0..levels {
        copy_row(samples, level, RIGHT_SOURCE, RIGHT)?;
    }
    for split in LEFT_SPLITS {
        for level in 0..levels {
            let src = if level + 1 < split { LEFT } else { RIGHT };
            copy_row(samples, level, src, split)?;
        }
    }
    for split in RIGHT_SPLITS {
        for level in 0..levels {
            let src = if level + 4 < split { RIGHT } else { LEFT };
            copy_row(samples, level, src, split)?;
        }
    }

    log_info!("composed fusion rows over {} level(s)", levels);
    Ok(())
}

fn copy_row(samples: &mut LatentSamples, level: usize, src: usize, dst: usize) -> Result<()> {
    let z = samples.level_array_mut(level).ok_or_else(|| {
        IganError::InvalidConfiguration(format!("fusion dictionary is missing level {}", level))
    })?;
    let row = z.row(src).to_owned();
    z.row_mut(dst).assign(&row);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latent::LatentKey;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn layout() -> LatentLayout {
        LatentLayout::pyramid(vec![4; 6])
    }

    #[test]
    fn right_row_is_old_row_four() {
        let mut rng = StdRng::seed_from_u64(42);
        let base = sample(&mut rng.clone(), &layout(), 8, Mode::Fusion).unwrap();
        let fused = fusion(&mut rng, &layout(), 8).unwrap();
        for level in 0..6 {
            assert_eq!(fused.level(level).unwrap().row(RIGHT), base.level(level).unwrap().row(4));
        }
    }

    #[test]
    fn left_splits_threshold_by_level() {
        let mut rng = StdRng::seed_from_u64(9);
        let z = fusion(&mut rng, &layout(), 8).unwrap();
        for split in [2usize, 3, 4] {
            for level in 0..6 {
                let lvl = z.level(level).unwrap();
                let want = if level < split - 1 { lvl.row(LEFT) } else { lvl.row(RIGHT) };
                assert_eq!(lvl.row(split), want, "split {} level {}", split, level);
            }
        }
    }

    #[test]
    fn right_splits_invert_roles() {
        let mut rng = StdRng::seed_from_u64(9);
        let z = fusion(&mut rng, &layout(), 8).unwrap();
        for split in [5usize, 6, 7] {
            for level in 0..6 {
                let lvl = z.level(level).unwrap();
                let want = if level < split - 4 { lvl.row(RIGHT) } else { lvl.row(LEFT) };
                assert_eq!(lvl.row(split), want, "split {} level {}", split, level);
            }
        }
    }

    #[test]
    fn root_left_row_is_redrawn() {
        let mut rng = StdRng::seed_from_u64(31);
        let z = fusion(&mut rng, &layout(), 8).unwrap();
        let root = z.get(LatentKey::Level(0)).unwrap();
        assert_ne!(root.row(LEFT), root.row(RIGHT));
        assert!(root.row(LEFT).iter().all(|&v| (-0.8..0.8).contains(&v)));
    }

    #[test]
    fn rows_shorter_than_batch_are_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut entries = std::collections::BTreeMap::new();
        entries.insert(LatentKey::Level(0), crate::latent::zero_z(2, 3));
        let mut z = LatentSamples { batch_size: 8, entries };
        assert!(matches!(
            compose_fusion(&mut rng, &mut z),
            Err(IganError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn short_batch_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut z = LatentSamples::new(4);
        z.insert(LatentKey::Level(0), crate::latent::zero_z(4, 2)).unwrap();
        assert!(matches!(
            compose_fusion(&mut rng, &mut z),
            Err(IganError::InvalidConfiguration(_))
        ));
    }
}
