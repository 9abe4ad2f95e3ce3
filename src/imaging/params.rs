//! Parameter types for effect operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! and the [`backend`](super::backend), which does the pixel work. Keeping them
//! separate lets tests swap in a mock backend without touching operation logic.
//!
//! ## Types
//!
//! - [`Effect`]: The closed set of visual effects, including the no-op `None`.
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`BoundingBox`]: Maximum thumbnail dimensions.
//! - [`EffectParams`]: Everything one effect run needs: source, output, effect, encoding settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A named, deterministic pixel transformation.
///
/// `None` is a valid choice meaning "serve the original". Parsing never fails:
/// unrecognized names map to `None`, so a bad query parameter degrades to the
/// untransformed image instead of an error page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    None,
    Grayscale,
    Negative,
    Sepia,
    Thumbnail,
}

impl Effect {
    /// Every effect that produces a cache entry.
    pub const TRANSFORMS: [Effect; 4] = [
        Effect::Grayscale,
        Effect::Negative,
        Effect::Sepia,
        Effect::Thumbnail,
    ];

    /// Case-insensitive lookup; unknown names are `None`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "grayscale" | "greyscale" => Effect::Grayscale,
            "negative" => Effect::Negative,
            "sepia" => Effect::Sepia,
            "thumbnail" => Effect::Thumbnail,
            _ => Effect::None,
        }
    }

    /// Name used in cache file names and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Grayscale => "grayscale",
            Effect::Negative => "negative",
            Effect::Sepia => "sepia",
            Effect::Thumbnail => "thumbnail",
        }
    }

    pub fn is_none(self) -> bool {
        self == Effect::None
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Box a thumbnail must fit inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub width: u32,
    pub height: u32,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
        }
    }
}

/// Parameters for a single effect run.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub effect: Effect,
    pub quality: Quality,
    pub thumbnail_box: BoundingBox,
}
