//! Local image metadata store.
//!
//! A single JSON document maps image id to its descriptive metadata:
//!
//! ```json
//! {
//!   "sunset-3f9a0c12b4de": { "title": "Sunset over bay", "tags": ["beach", "evening"] },
//!   "mountain-77ab01cd93ee": { "title": "Mountain", "tags": [] }
//! }
//! ```
//!
//! The store is a full-snapshot key-value store: [`MetadataStore::load`]
//! reads the whole document and [`MetadataStore::save`] rewrites it. There is
//! no partial update.
//!
//! ## Fidelity
//!
//! Key order is kept as found in the file, and record fields this crate does
//! not know about are carried through untouched, so a load followed by a save
//! changes nothing. The servable URL of a record is derived from its id at
//! read time and is never written.
//!
//! ## Concurrency
//!
//! Saves go through a temp file and an atomic rename, so readers never see a
//! half-written document. Writers in this process are serialized by an
//! internal lock; use [`MetadataStore::update`] for read-modify-write so the
//! lock covers the whole cycle. Multiple processes writing the same file are
//! not coordinated.

use crate::layout::write_atomic;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Metadata for one locally stored image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageRecord {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Fields written by other tools, preserved on save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ImageRecord {
    pub fn new(title: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            title: title.into(),
            tags,
            extra: serde_json::Map::new(),
        }
    }
}

/// All records, in store order.
pub type Records = IndexMap<String, ImageRecord>;

pub struct MetadataStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record. A missing file is an empty store.
    ///
    /// A file that exists but does not parse is an error rather than an empty
    /// store, so a later save cannot silently wipe it.
    pub fn load(&self) -> Result<Records, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Records::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Records::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Look up a single record.
    pub fn get(&self, id: &str) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.load()?.shift_remove(id))
    }

    /// Replace the whole document with `records`.
    pub fn save(&self, records: &Records) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.write(records)
    }

    /// Load, let `f` modify the records, and save, all under the write lock.
    ///
    /// Nothing is written if `f` returns an error.
    pub fn update<T, E>(&self, f: impl FnOnce(&mut Records) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let _guard = self.lock();
        let mut records = self.load()?;
        let value = f(&mut records)?;
        self.write(&records)?;
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is (), so a poisoned lock carries no broken state
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self, records: &Records) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), records = records.len(), "saved metadata store");
        Ok(())
    }
}
