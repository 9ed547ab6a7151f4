use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for LeafHealth
#[derive(Error, Debug)]
pub enum LeafHealthError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    /// Byte length does not match `width * height * 4`, or a dimension is zero.
    #[error("Invalid pixel buffer: {width}x{height} with {len} bytes")]
    InvalidBuffer {
        width: u32,
        height: u32,
        len: usize,
    },

    #[error("Background removal service unreachable: {0}")]
    Network(String),

    #[error("Background removal service returned unusable data: {0}")]
    UpstreamFormat(String),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, LeafHealthError>;
