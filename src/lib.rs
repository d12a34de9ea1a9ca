//! Latent-sample construction for pyramid GANs and a luminance-preserving
//! brush color tool for interactive editors.

pub mod logger;
pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod io;
pub mod latent;
pub mod ops;
pub mod visualize;

pub use components::ColorTool;
pub use config::{AppConfig, BrushConfig, SamplerConfig};
pub use error::{IganError, Result};
pub use latent::{LatentKey, LatentLayout, LatentSamples, Mode};
pub use visualize::Generator;
