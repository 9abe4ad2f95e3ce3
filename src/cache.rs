//! Lazily materialized effect renditions.
//!
//! A rendition of `(id, effect)` lives at a path that is a pure function of
//! the pair (see [`Layout::cache_path`]). The file existing **is** the cache
//! hit; there is no manifest and no freshness check.
//!
//! ```text
//! get_or_create(descriptor, effect)
//!   effect == None        → descriptor's own URL, cache untouched
//!   cache file exists     → hit, returned as-is
//!   otherwise             → [fetch remote original to temp file]
//!                           → effect engine → atomic rename into cache
//! ```
//!
//! ## Concurrency
//!
//! Check-then-create runs under a per-path mutex, so concurrent requests for
//! the same pair do the work once and the rest see a hit. Distinct pairs
//! proceed in parallel, which is what [`EffectCache::warm`] relies on. A
//! pair's mutex is forgotten once no request holds it.
//!
//! ## Failure
//!
//! A failed fetch or transform leaves no file at the cache path. The error
//! propagates and the next request simply tries again; nothing is retried
//! here.
//!
//! ## Staleness
//!
//! Entries are never invalidated. If an original is replaced under an
//! unchanged id, its old renditions keep being served until the cache files
//! are deleted by hand.

use crate::imaging::{BackendError, Effect, EffectConfig, ImageBackend, apply_effect};
use crate::layout::Layout;
use crate::remote::{Fetcher, RemoteError};
use crate::resolve::Descriptor;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Fetching original failed: {0}")]
    Fetch(#[from] RemoteError),
    #[error("Effect failed: {0}")]
    Transform(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// How a rendition was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// No effect; the original is served.
    Original,
    /// Served from an existing cache file.
    Cached,
    /// Generated by this call.
    Created,
}

/// A servable image for one `(id, effect)` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendition {
    pub url: String,
    /// Local file behind `url`, when there is one. Remote originals have none.
    pub path: Option<PathBuf>,
    pub effect: Effect,
    pub origin: Origin,
}

/// Cache activity since the cache was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub fetches: u32,
    pub failures: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let created = self.misses.saturating_sub(self.failures);
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} created ({} total)",
                self.hits,
                created,
                self.total()
            )?;
        } else {
            write!(f, "{} created", created)?;
        }
        if self.fetches > 0 {
            write!(f, ", {} fetched", self.fetches)?;
        }
        if self.failures > 0 {
            write!(f, ", {} failed", self.failures)?;
        }
        Ok(())
    }
}

/// Outcome of one warm-up job.
#[derive(Debug)]
pub struct WarmResult {
    pub id: String,
    pub effect: Effect,
    pub result: Result<Rendition, CacheError>,
}

pub struct EffectCache<B: ImageBackend> {
    backend: B,
    fetcher: Box<dyn Fetcher>,
    layout: Layout,
    config: EffectConfig,
    key_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    stats: Mutex<CacheStats>,
}

impl<B: ImageBackend> EffectCache<B> {
    pub fn new(backend: B, fetcher: Box<dyn Fetcher>, layout: Layout, config: EffectConfig) -> Self {
        Self {
            backend,
            fetcher,
            layout,
            config,
            key_locks: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The untransformed original, exactly as the descriptor names it.
    pub fn original(&self, descriptor: &Descriptor) -> Rendition {
        let path = match descriptor {
            Descriptor::Local { id, .. } => Some(self.layout.original_path(id)),
            Descriptor::Remote { .. } => None,
        };
        Rendition {
            url: descriptor.url().to_string(),
            path,
            effect: Effect::None,
            origin: Origin::Original,
        }
    }

    /// Return the rendition of `descriptor` under `effect`, creating it on a miss.
    pub fn get_or_create(
        &self,
        descriptor: &Descriptor,
        effect: Effect,
    ) -> Result<Rendition, CacheError> {
        if effect.is_none() {
            return Ok(self.original(descriptor));
        }

        let id = descriptor.id();
        let path = self.layout.cache_path(id, effect);

        let key_lock = self.key_lock(&path);
        let origin = {
            let _guard = key_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.check_then_create(descriptor, effect, &path)
        };
        self.release_key_lock(&path, key_lock);

        Ok(Rendition {
            url: self.layout.cache_url(id, effect),
            path: Some(path),
            effect,
            origin: origin?,
        })
    }

    /// Must run under the key lock for `path`.
    fn check_then_create(
        &self,
        descriptor: &Descriptor,
        effect: Effect,
        path: &Path,
    ) -> Result<Origin, CacheError> {
        let id = descriptor.id();
        if path.exists() {
            debug!(id, %effect, "cache hit");
            self.record(|s| s.hits += 1);
            return Ok(Origin::Cached);
        }

        self.record(|s| s.misses += 1);
        if let Err(e) = self.create(descriptor, effect, path) {
            self.record(|s| s.failures += 1);
            return Err(e);
        }
        info!(id, %effect, "created rendition");
        Ok(Origin::Created)
    }

    /// Materialize every `(descriptor, effect)` pair in parallel on the
    /// current rayon pool. `Effect::None` pairs are skipped.
    pub fn warm(&self, descriptors: &[Descriptor], effects: &[Effect]) -> Vec<WarmResult> {
        let jobs: Vec<(&Descriptor, Effect)> = descriptors
            .iter()
            .flat_map(|d| effects.iter().filter(|e| !e.is_none()).map(move |e| (d, *e)))
            .collect();

        jobs.into_par_iter()
            .map(|(descriptor, effect)| WarmResult {
                id: descriptor.id().to_string(),
                effect,
                result: self.get_or_create(descriptor, effect),
            })
            .collect()
    }

    fn create(&self, descriptor: &Descriptor, effect: Effect, path: &Path) -> Result<(), CacheError> {
        let cache_dir = self.layout.cache_dir();
        std::fs::create_dir_all(&cache_dir)?;

        match descriptor {
            Descriptor::Local { id, .. } => {
                let source = self.layout.original_path(id);
                apply_effect(&self.backend, &source, path, effect, &self.config)?;
            }
            Descriptor::Remote { id, url, .. } => {
                // Dropped (and deleted) on every path out of this block.
                let mut download = tempfile::Builder::new()
                    .prefix(".fetch-")
                    .suffix(".jpg")
                    .tempfile_in(&cache_dir)?;
                let bytes = self.fetcher.fetch(url, download.as_file_mut())?;
                download.as_file_mut().flush()?;
                self.record(|s| s.fetches += 1);
                debug!(id, bytes, "fetched remote original");
                apply_effect(&self.backend, download.path(), path, effect, &self.config)?;
            }
        }
        Ok(())
    }

    fn key_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    /// Drop the map entry for `path` unless another request still holds it.
    ///
    /// Clones are only handed out under the map lock, so a count of two (the
    /// map plus `held`) means nobody else is waiting.
    fn release_key_lock(&self, path: &Path, held: Arc<Mutex<()>>) {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&held) <= 2 {
            locks.remove(path);
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.key_locks.lock().unwrap().len()
    }

    fn record(&self, f: impl FnOnce(&mut CacheStats)) {
        f(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}
