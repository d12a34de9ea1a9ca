//! Latent-sample construction for a hierarchical (pyramid) generator.
//!
//! A generator with `n_levels` output levels takes one latent batch per level
//! `0..n_levels-1`. The samplers here build those batches as
//! [`LatentSamples`]: an ordered map from a stable [`LatentKey`] to a
//! `(batch, dim)` array. Every call draws from a caller-owned RNG, so a seeded
//! `StdRng` reproduces a dictionary exactly.

pub mod fusion;

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{IganError, Result};
use crate::{log_info, log_warn};

pub use fusion::{compose_fusion, fusion};

/// Half-width of the uniform range used for ordinary random latents.
pub const RANDOM_RANGE: f32 = 0.5;
/// Half-width of the uniform range used for fusion endpoints.
pub const FUSION_RANGE: f32 = 0.8;
/// Sweeps start here and span `2 * SWEEP_START.abs()`.
pub const SWEEP_START: f64 = -0.9;
pub const SWEEP_SPAN: f64 = 1.8;
/// Span of the flat (non-pyramid) per-dimension sweep.
pub const FLAT_SWEEP_SPAN: f64 = 1.9;

/// Constant fill of the non-root levels in [`Mode::Fusion`].
pub const FUSION_FILL: f32 = 0.5;
/// Factor applied to the leading rows of each non-root fusion level.
pub const FUSION_NEGATE: f32 = -0.5;
/// Level `l` has its first `FUSION_CORNER_ROWS - l` rows negated.
pub const FUSION_CORNER_ROWS: usize = 5;
/// Fusion dictionaries index rows up to 7.
pub const FUSION_MIN_BATCH: usize = 8;

/// Shape of the latent inputs a generator expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatentLayout {
    /// One latent input per pyramid level; `dims[i]` is the width at level `i`.
    /// The generator itself has `dims.len() + 1` output levels.
    Pyramid { dims: Vec<usize> },
    /// A single latent input shared by the whole generator.
    Flat { z_dim: usize },
}

impl LatentLayout {
    pub fn pyramid(dims: Vec<usize>) -> Self {
        LatentLayout::Pyramid { dims }
    }

    /// Number of generator output levels (latent levels + 1). Flat layouts have one.
    pub fn n_levels(&self) -> usize {
        match self {
            LatentLayout::Pyramid { dims } => dims.len() + 1,
            LatentLayout::Flat { .. } => 1,
        }
    }

    /// Number of latent inputs.
    pub fn latent_levels(&self) -> usize {
        match self {
            LatentLayout::Pyramid { dims } => dims.len(),
            LatentLayout::Flat { .. } => 1,
        }
    }

    /// Latent width of `level`. Flat layouts answer `z_dim` for level 0.
    pub fn dim(&self, level: usize) -> Option<usize> {
        match self {
            LatentLayout::Pyramid { dims } => dims.get(level).copied(),
            LatentLayout::Flat { z_dim } => (level == 0).then_some(*z_dim),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            LatentLayout::Pyramid { dims } => {
                if dims.is_empty() {
                    return Err(IganError::InvalidConfiguration(
                        "pyramid layout needs at least one latent level".into(),
                    ));
                }
                if let Some(level) = dims.iter().position(|&d| d == 0) {
                    return Err(IganError::InvalidConfiguration(format!(
                        "latent level {} has zero width",
                        level
                    )));
                }
            }
            LatentLayout::Flat { z_dim } => {
                if *z_dim == 0 {
                    return Err(IganError::InvalidConfiguration(
                        "flat layout needs a non-zero z_dim".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Identifies one latent input of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LatentKey {
    Level(usize),
    Flat,
}

impl fmt::Display for LatentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatentKey::Level(l) => write!(f, "level {}", l),
            LatentKey::Flat => write!(f, "z"),
        }
    }
}

/// Sampling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Independent uniform draws in [-0.5, 0.5) for every row of every level.
    FullRandom,
    /// One random row per level, replicated across the batch.
    Replicated,
    /// [`Mode::Replicated`], except `level` holds a gradient sweep along the batch axis.
    SharedSweep { level: usize },
    /// [`Mode::Replicated`], except column `dim` of `level` is linearly
    /// interpolated from -0.9 to 0.9 across the batch.
    IndexedSweep { level: usize, dim: usize },
    /// Starting dictionary for [`fusion::compose_fusion`].
    Fusion,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::FullRandom => "random",
            Mode::Replicated => "replicated",
            Mode::SharedSweep { .. } => "sweep",
            Mode::IndexedSweep { .. } => "indexed",
            Mode::Fusion => "fusion",
        }
    }
}

/// Latent batches keyed by generator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentSamples {
    batch_size: usize,
    entries: BTreeMap<LatentKey, Array2<f32>>,
}

/// Per-entry statistics, used for CLI summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySummary {
    pub key: LatentKey,
    pub rows: usize,
    pub cols: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

impl LatentSamples {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            entries: BTreeMap::new(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a batch. Fails if its row count differs from the dictionary's batch size.
    pub fn insert(&mut self, key: LatentKey, z: Array2<f32>) -> Result<()> {
        if z.nrows() != self.batch_size {
            return Err(IganError::InvalidConfiguration(format!(
                "{} has {} rows, expected batch size {}",
                key,
                z.nrows(),
                self.batch_size
            )));
        }
        self.entries.insert(key, z);
        Ok(())
    }

    /// Check that every entry has `batch_size` rows and at least one column.
    /// Dictionaries built through [`LatentSamples::insert`] always pass;
    /// decoded ones may not.
    pub fn check_shape(&self) -> Result<()> {
        for (key, z) in &self.entries {
            if z.nrows() != self.batch_size || z.ncols() == 0 {
                return Err(IganError::InvalidConfiguration(format!(
                    "{} is {}x{}, expected {} rows",
                    key,
                    z.nrows(),
                    z.ncols(),
                    self.batch_size
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, key: LatentKey) -> Option<ArrayView2<'_, f32>> {
        self.entries.get(&key).map(|z| z.view())
    }

    pub fn get_mut(&mut self, key: LatentKey) -> Option<ArrayViewMut2<'_, f32>> {
        self.entries.get_mut(&key).map(|z| z.view_mut())
    }

    pub fn level(&self, level: usize) -> Option<ArrayView2<'_, f32>> {
        self.get(LatentKey::Level(level))
    }

    pub fn row(&self, key: LatentKey, row: usize) -> Option<ArrayView1<'_, f32>> {
        self.entries
            .get(&key)
            .filter(|z| row < z.nrows())
            .map(|z| z.row(row))
    }

    pub fn keys(&self) -> impl Iterator<Item = LatentKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LatentKey, ArrayView2<'_, f32>)> {
        self.entries.iter().map(|(k, z)| (*k, z.view()))
    }

    /// Number of `Level(_)` entries.
    pub fn pyramid_levels(&self) -> usize {
        self.entries
            .keys()
            .filter(|k| matches!(k, LatentKey::Level(_)))
            .count()
    }

    pub(crate) fn level_array_mut(&mut self, level: usize) -> Option<&mut Array2<f32>> {
        self.entries.get_mut(&LatentKey::Level(level))
    }

    pub fn summary(&self) -> Vec<EntrySummary> {
        self.entries
            .iter()
            .map(|(key, z)| {
                let (min, max) = z
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    });
                EntrySummary {
                    key: *key,
                    rows: z.nrows(),
                    cols: z.ncols(),
                    min,
                    max,
                    mean: z.mean().unwrap_or(0.0),
                }
            })
            .collect()
    }
}

// ============================================================================
// Primitive batches
// ============================================================================

fn uniform<R: Rng + ?Sized>(rng: &mut R, batch: usize, dim: usize, half: f32) -> Array2<f32> {
    Array2::from_shape_fn((batch, dim), |_| rng.gen_range(-half..half))
}

/// `(batch, dim)` batch of independent draws from [-0.5, 0.5).
pub fn random_z<R: Rng + ?Sized>(rng: &mut R, batch: usize, dim: usize) -> Array2<f32> {
    uniform(rng, batch, dim, RANDOM_RANGE)
}

pub fn zero_z(batch: usize, dim: usize) -> Array2<f32> {
    Array2::zeros((batch, dim))
}

/// Repeat `row` `batch` times.
pub fn tile_row(row: ArrayView1<'_, f32>, batch: usize) -> Array2<f32> {
    Array2::from_shape_fn((batch, row.len()), |(_, j)| row[j])
}

/// One random row replicated across the batch.
pub fn replicated_z<R: Rng + ?Sized>(rng: &mut R, batch: usize, dim: usize) -> Array2<f32> {
    let row = random_z(rng, 1, dim);
    tile_row(row.row(0), batch)
}

/// Sweep value for batch row `k` of `batch`: -0.9 + k * 1.8 / batch.
pub fn sweep_value(k: usize, batch: usize) -> f32 {
    (SWEEP_START + k as f64 * (SWEEP_SPAN / batch as f64)) as f32
}

/// Gradient batch along the batch axis.
///
/// A random base is drawn and then every column is overwritten with the
/// sweep, one dimension after another, so each row `k` ends up constant at
/// [`sweep_value`]`(k, batch)`. Callers that feed this to a generator see
/// the whole latent vector move together, not a single axis.
pub fn gradient_z<R: Rng + ?Sized>(rng: &mut R, batch: usize, dim: usize) -> Array2<f32> {
    let mut z = random_z(rng, batch, dim);
    for idx in 0..dim {
        for (k, mut row) in z.rows_mut().into_iter().enumerate() {
            row[idx] = sweep_value(k, batch);
        }
    }
    z
}

// ============================================================================
// Dictionaries
// ============================================================================

/// Build a latent dictionary for `layout` under `mode`.
///
/// Flat layouts only support [`Mode::FullRandom`]; use
/// [`flat_dimension_sweep`] for the flat sweep.
pub fn sample<R: Rng + ?Sized>(
    rng: &mut R,
    layout: &LatentLayout,
    batch_size: usize,
    mode: Mode,
) -> Result<LatentSamples> {
    if let Err(e) = validate(layout, batch_size, mode) {
        log_warn!("rejected {} sampling: {}", mode.name(), e);
        return Err(e);
    }

    let mut samples = LatentSamples::new(batch_size);
    let dims = match layout {
        LatentLayout::Flat { z_dim } => {
            samples.insert(LatentKey::Flat, random_z(rng, batch_size, *z_dim))?;
            log_info!("sampled flat random z ({} x {})", batch_size, z_dim);
            return Ok(samples);
        }
        LatentLayout::Pyramid { dims } => dims,
    };

    match mode {
        Mode::FullRandom => {
            for (level, &dim) in dims.iter().enumerate() {
                samples.insert(LatentKey::Level(level), random_z(rng, batch_size, dim))?;
            }
        }
        Mode::Replicated | Mode::SharedSweep { .. } | Mode::IndexedSweep { .. } => {
            for (level, &dim) in dims.iter().enumerate() {
                samples.insert(LatentKey::Level(level), replicated_z(rng, batch_size, dim))?;
            }
            match mode {
                Mode::SharedSweep { level } => {
                    samples.insert(
                        LatentKey::Level(level),
                        gradient_z(rng, batch_size, dims[level]),
                    )?;
                }
                Mode::IndexedSweep { level, dim } => {
                    if let Some(z) = samples.level_array_mut(level) {
                        let denom = (batch_size - 1) as f64;
                        for (i, mut row) in z.rows_mut().into_iter().enumerate() {
                            row[dim] = (SWEEP_START + i as f64 * SWEEP_SPAN / denom) as f32;
                        }
                    }
                }
                _ => {}
            }
        }
        Mode::Fusion => {
            let root = uniform(rng, 1, dims[0], FUSION_RANGE);
            samples.insert(LatentKey::Level(0), tile_row(root.row(0), batch_size))?;
            for (level, &dim) in dims.iter().enumerate().skip(1) {
                let mut z = Array2::from_elem((batch_size, dim), FUSION_FILL);
                let corner = FUSION_CORNER_ROWS.saturating_sub(level).min(batch_size);
                for mut row in z.rows_mut().into_iter().take(corner) {
                    row.mapv_inplace(|v| v * FUSION_NEGATE);
                }
                samples.insert(LatentKey::Level(level), z)?;
            }
        }
    }

    log_info!(
        "sampled {} latents: {} level(s), batch {}",
        mode.name(),
        samples.len(),
        batch_size
    );
    Ok(samples)
}

fn validate(layout: &LatentLayout, batch_size: usize, mode: Mode) -> Result<()> {
    layout.validate()?;
    if batch_size == 0 {
        return Err(IganError::InvalidConfiguration(
            "batch size must be at least 1".into(),
        ));
    }
    if matches!(layout, LatentLayout::Flat { .. }) && mode != Mode::FullRandom {
        return Err(IganError::InvalidConfiguration(format!(
            "mode '{}' needs a pyramid layout",
            mode.name()
        )));
    }

    let check_level = |level: usize| -> Result<usize> {
        layout.dim(level).ok_or_else(|| {
            IganError::InvalidConfiguration(format!(
                "level {} outside [0, {})",
                level,
                layout.latent_levels()
            ))
        })
    };

    match mode {
        Mode::FullRandom | Mode::Replicated => {}
        Mode::SharedSweep { level } => {
            check_level(level)?;
        }
        Mode::IndexedSweep { level, dim } => {
            let width = check_level(level)?;
            if dim >= width {
                return Err(IganError::InvalidConfiguration(format!(
                    "dimension {} outside level {} width {}",
                    dim, level, width
                )));
            }
            if batch_size < 2 {
                return Err(IganError::InvalidConfiguration(
                    "indexed sweep needs a batch size of at least 2".into(),
                ));
            }
        }
        Mode::Fusion => {
            if batch_size < FUSION_MIN_BATCH {
                return Err(IganError::InvalidConfiguration(format!(
                    "fusion needs a batch size of at least {}, got {}",
                    FUSION_MIN_BATCH, batch_size
                )));
            }
        }
    }
    Ok(())
}

/// Per-dimension sweep for a flat (single input) generator: one random row
/// replicated across the batch, with column `dim` set to
/// `-0.9 + k * 1.9 / batch`.
pub fn flat_dimension_sweep<R: Rng + ?Sized>(
    rng: &mut R,
    z_dim: usize,
    batch_size: usize,
    dim: usize,
) -> Result<LatentSamples> {
    let layout = LatentLayout::Flat { z_dim };
    validate(&layout, batch_size, Mode::FullRandom)?;
    if dim >= z_dim {
        return Err(IganError::InvalidConfiguration(format!(
            "dimension {} outside z_dim {}",
            dim, z_dim
        )));
    }

    let mut z = replicated_z(rng, batch_size, z_dim);
    let step = FLAT_SWEEP_SPAN / batch_size as f64;
    for (k, mut row) in z.rows_mut().into_iter().enumerate() {
        row[dim] = (SWEEP_START + k as f64 * step) as f32;
    }

    let mut samples = LatentSamples::new(batch_size);
    samples.insert(LatentKey::Flat, z)?;
    Ok(samples)
}
