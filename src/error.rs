//! Error types for the SECAM simulator.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the picture, effect and codec modules.
pub type Result<T> = std::result::Result<T, SecamError>;

#[derive(Error, Debug)]
pub enum SecamError {
    /// Input image unreadable or in an unsupported format.
    #[error("cannot decode '{}': {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot encode '{}': {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Output extension (or override token) is not one of jpg/jpeg/png/bmp/tga.
    #[error("unknown output format '{0}'")]
    UnknownFormat(String),

    #[error("picture size mismatch: base is {}x{}, overlay is {}x{}", .base.0, .base.1, .overlay.0, .overlay.1)]
    SizeMismatch {
        base: (usize, usize),
        overlay: (usize, usize),
    },

    /// Width must be a non-zero multiple of 4, height a non-zero multiple of 2.
    #[error("invalid picture dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("RGB buffer has {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },
}
