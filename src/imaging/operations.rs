//! High-level effect operations.
//!
//! These functions combine configuration with backend execution. They decide
//! what parameters an effect run gets and whether it runs at all.

use super::backend::{BackendError, ImageBackend, ImageInfo};
use super::params::{BoundingBox, Effect, EffectParams, Quality};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoding settings shared by every effect run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectConfig {
    pub quality: Quality,
    pub thumbnail_box: BoundingBox,
}

/// Read format, size and colour layout of an image file.
pub fn describe(backend: &impl ImageBackend, path: &Path) -> Result<ImageInfo> {
    backend.identify(path)
}

/// Plan an effect run without executing it.
pub fn plan_effect(
    source: &Path,
    output: &Path,
    effect: Effect,
    config: &EffectConfig,
) -> EffectParams {
    EffectParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        effect,
        quality: config.quality,
        thumbnail_box: config.thumbnail_box,
    }
}

/// Apply `effect` from `source` into `output`.
///
/// `Effect::None` is a no-op: nothing is read or written and `Ok(false)` is
/// returned. Every other effect returns `Ok(true)` once the output is in place.
pub fn apply_effect(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    effect: Effect,
    config: &EffectConfig,
) -> Result<bool> {
    if effect.is_none() {
        return Ok(false);
    }
    backend.apply(&plan_effect(source, output, effect, config))?;
    Ok(true)
}
