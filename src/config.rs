//! TOML configuration for the sampler and the brush.
//!
//! ```toml
//! [sampler]
//! batch_size = 64
//! dims = [100, 100, 100, 100]
//! seed = 7
//!
//! [brush]
//! img_width = 256
//! img_height = 256
//! brush_width = 12
//! scale = 2.0
//! ```

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::components::color_tool::ColorTool;
use crate::error::Result;
use crate::latent::LatentLayout;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sampler: SamplerConfig,
    pub brush: BrushConfig,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub batch_size: usize,
    /// Latent width per pyramid level. Ignored when `use_z_pyramid` is false.
    pub dims: Vec<usize>,
    /// Latent width of a flat generator.
    pub z_dim: usize,
    pub use_z_pyramid: bool,
    /// Fixed seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            dims: vec![100; 4],
            z_dim: 100,
            use_z_pyramid: true,
            seed: None,
        }
    }
}

impl SamplerConfig {
    pub fn layout(&self) -> LatentLayout {
        if self.use_z_pyramid {
            LatentLayout::Pyramid {
                dims: self.dims.clone(),
            }
        } else {
            LatentLayout::Flat { z_dim: self.z_dim }
        }
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub img_width: i64,
    pub img_height: i64,
    pub brush_width: i32,
    pub scale: f32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            img_width: 256,
            img_height: 256,
            brush_width: 10,
            scale: 1.0,
        }
    }
}

impl BrushConfig {
    pub fn build(&self) -> Result<ColorTool> {
        ColorTool::new(self.img_width, self.img_height, self.brush_width, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IganError;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = AppConfig::from_toml_str("[sampler]\nbatch_size = 16\nseed = 3\n").unwrap();
        assert_eq!(cfg.sampler.batch_size, 16);
        assert_eq!(cfg.sampler.seed, Some(3));
        assert_eq!(cfg.sampler.dims, vec![100; 4]);
        assert_eq!(cfg.brush, BrushConfig::default());
    }

    #[test]
    fn flat_layout_when_pyramid_disabled() {
        let cfg = AppConfig::from_toml_str("[sampler]\nuse_z_pyramid = false\nz_dim = 8\n").unwrap();
        assert_eq!(cfg.sampler.layout(), LatentLayout::Flat { z_dim: 8 });
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            AppConfig::from_toml_str("[sampler\nbatch_size ="),
            Err(IganError::Config(_))
        ));
    }

    #[test]
    fn brush_section_builds_tool() {
        let cfg = AppConfig::from_toml_str("[brush]\nbrush_width = 30\nscale = 2.0\n").unwrap();
        let tool = cfg.brush.build().unwrap();
        assert_eq!(tool.width(), 30);
        assert_eq!(tool.image_brush_width(), 15);
    }
}
