//! Effect engine backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the pipeline needs:
//! identify an image, apply an effect from one file into another, and import
//! uploaded bytes as a normalized original.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording mock in [`tests`].

use super::params::{EffectParams, Quality};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// What the detail page shows about a served image file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Container format, e.g. `"JPEG"`.
    pub format: String,
    /// Colour layout, e.g. `"RGB"` or `"L"`.
    pub color: String,
}

/// Trait for effect engine backends.
///
/// Implementations must never leave a partially written file at an output
/// path: either the complete result is there afterwards or nothing new is.
pub trait ImageBackend: Sync {
    /// Read dimensions, format and colour layout.
    fn identify(&self, path: &Path) -> Result<ImageInfo, BackendError>;

    /// Run `params.effect` from `params.source` into `params.output`.
    ///
    /// Source and output may be the same path.
    fn apply(&self, params: &EffectParams) -> Result<(), BackendError>;

    /// Decode uploaded bytes and store them as a JPEG original at `output`.
    ///
    /// Missing parent directories are created, but only once `data` has
    /// decoded.
    fn import(&self, data: &[u8], output: &Path, quality: Quality)
    -> Result<ImageInfo, BackendError>;
}
