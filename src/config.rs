//! Gallery configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. User values are
//! merged on top of stock defaults, so a config file only needs the keys it
//! wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! static_dir = "static"        # Served directory, relative to the config dir
//! url_prefix = "/static"       # URL under which static_dir is served
//! metadata_file = "info.json"  # Metadata store, relative to static_dir
//!
//! [effects]
//! quality = 90                 # JPEG quality for renditions and uploads (1-100)
//! thumbnail_box = [128, 128]   # Thumbnail effect bounding box [width, height]
//!
//! [remote]
//! api_key = ""                 # Flickr API key; empty = offline (local images only)
//! endpoint = "https://www.flickr.com/services/rest/"
//! per_page = 5                 # Remote search results shown
//! safe_search = 1              # 1 = safe, 2 = moderate, 3 = restricted
//! timeout_secs = 30            # Per-request timeout for API calls and downloads
//! extras = "url_sq,url_t,url_s,url_q,url_m,url_n,url_z,url_c,url_l,url_o"
//!
//! [processing]
//! max_workers = 4              # Max parallel workers for `warm` (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{BoundingBox, EffectConfig, Quality};
use crate::layout::Layout;
use crate::remote::{DEFAULT_EXTRAS, FLICKR_ENDPOINT};
use crate::search::RemoteSearch;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Directory served as static files.
    pub static_dir: PathBuf,
    /// URL prefix `static_dir` is served under.
    pub url_prefix: String,
    /// Metadata store file name, relative to `static_dir`.
    pub metadata_file: String,
    /// Effect encoding settings.
    pub effects: EffectsConfig,
    /// Remote photo API settings.
    pub remote: RemoteConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("static"),
            url_prefix: "/static".to_string(),
            metadata_file: "info.json".to_string(),
            effects: EffectsConfig::default(),
            remote: RemoteConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.effects.quality) {
            return Err(ConfigError::Validation(
                "effects.quality must be 1-100".into(),
            ));
        }
        if self.effects.thumbnail_box[0] == 0 || self.effects.thumbnail_box[1] == 0 {
            return Err(ConfigError::Validation(
                "effects.thumbnail_box values must be non-zero".into(),
            ));
        }
        if self.remote.per_page == 0 {
            return Err(ConfigError::Validation(
                "remote.per_page must be at least 1".into(),
            ));
        }
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote.timeout_secs must be at least 1".into(),
            ));
        }
        if self.metadata_file.is_empty()
            || Path::new(&self.metadata_file).components().count() != 1
        {
            return Err(ConfigError::Validation(
                "metadata_file must be a plain file name".into(),
            ));
        }
        Ok(())
    }

    /// Storage layout, with a relative `static_dir` taken from `base`.
    pub fn layout(&self, base: &Path) -> Layout {
        Layout::new(base.join(&self.static_dir), &self.url_prefix)
    }

    /// Path of the metadata store for a given layout.
    pub fn metadata_path(&self, layout: &Layout) -> PathBuf {
        layout.static_dir().join(&self.metadata_file)
    }

    pub fn effect_config(&self) -> EffectConfig {
        EffectConfig {
            quality: Quality::new(self.effects.quality),
            thumbnail_box: BoundingBox {
                width: self.effects.thumbnail_box[0],
                height: self.effects.thumbnail_box[1],
            },
        }
    }

    pub fn remote_search(&self) -> RemoteSearch {
        RemoteSearch {
            per_page: self.remote.per_page,
            safe_search: self.remote.safe_search,
            extras: self.remote.extras.clone(),
        }
    }
}

/// Effect encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectsConfig {
    /// JPEG quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Bounding box `[width, height]` the thumbnail effect fits into.
    pub thumbnail_box: [u32; 2],
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            thumbnail_box: [128, 128],
        }
    }
}

/// Remote photo API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// API key. Empty means offline: only local images resolve.
    pub api_key: String,
    pub endpoint: String,
    pub per_page: u32,
    pub safe_search: u8,
    pub timeout_secs: u64,
    /// Comma-separated size URLs requested with search results.
    pub extras: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: FLICKR_ENDPOINT.to_string(),
            per_page: 5,
            safe_search: 1,
            timeout_secs: 30,
            extras: DEFAULT_EXTRAS.to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn is_offline(&self) -> bool {
        self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel cache warm-up workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_workers
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GalleryConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<GalleryConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# fx-gal Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory served as static files, relative to this config file's directory.
static_dir = "static"

# URL prefix under which static_dir is served.
url_prefix = "/static"

# Metadata store (title + tags per image), relative to static_dir.
metadata_file = "info.json"

# ---------------------------------------------------------------------------
# Effects
# ---------------------------------------------------------------------------
[effects]
# JPEG quality for cached renditions and uploaded originals (1-100).
quality = 90

# Bounding box [width, height] for the thumbnail effect. Never upscales.
thumbnail_box = [128, 128]

# ---------------------------------------------------------------------------
# Remote photo API (Flickr)
# ---------------------------------------------------------------------------
[remote]
# API key. Leave empty to run offline with local images only.
# The FLICKR_API_KEY environment variable or --api-key flag override this.
api_key = ""

endpoint = "https://www.flickr.com/services/rest/"

# Number of remote search results to show.
per_page = 5

# 1 = safe, 2 = moderate, 3 = restricted.
safe_search = 1

# Seconds before an API call or image download is abandoned.
timeout_secs = 30

# Size URLs requested with each search result.
extras = "url_sq,url_t,url_s,url_q,url_m,url_n,url_z,url_c,url_l,url_o"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for cache warm-up.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_workers = 4
"##
}
