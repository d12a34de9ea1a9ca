//! Crate-wide error type.

use thiserror::Error;

/// Errors reported by the samplers, the color tool and the export helpers.
#[derive(Debug, Error)]
pub enum IganError {
    /// Sampler parameters that cannot produce a valid latent dictionary
    /// (bad batch size, level or dimension index, unsupported mode for the layout).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Non-positive canvas size or scale factor, or mismatched image shapes.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// bincode failure while reading or writing a latent-sample file.
    #[error("serialization error: {0}")]
    Serialize(String),

    /// Malformed TOML configuration.
    #[error("config error: {0}")]
    Config(String),

    /// GIF encoder failure.
    #[error("encode error: {0}")]
    Encode(String),
}

impl From<Box<bincode::ErrorKind>> for IganError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        IganError::Serialize(e.to_string())
    }
}

impl From<toml::de::Error> for IganError {
    fn from(e: toml::de::Error) -> Self {
        IganError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IganError>;
