//! Where images live on disk and how they are addressed by URL.
//!
//! ```text
//! static/                          ← static_dir, served at url_prefix
//! ├── info.json                    # metadata store
//! └── images/
//!     ├── sunset-3f9a0c12b4de.jpg  # local originals: {id}.jpg
//!     └── cache/
//!         ├── sunset-3f9a0c12b4de_sepia.jpg   # cache entries: {id}_{effect}.jpg
//!         └── 52836412311_negative.jpg        # remote ids cache the same way
//! ```
//!
//! Paths and URLs are pure functions of the id and effect, so the same pair
//! always maps to the same cache entry.

use crate::imaging::Effect;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const IMAGES_DIR: &str = "images";
const CACHE_DIR: &str = "cache";
#[cfg(unix)]
const SERVABLE_MODE: u32 = 0o644;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    static_dir: PathBuf,
    url_prefix: String,
}

impl Layout {
    pub fn new(static_dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            static_dir: static_dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    pub fn images_dir(&self) -> PathBuf {
        self.static_dir.join(IMAGES_DIR)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.images_dir().join(CACHE_DIR)
    }

    pub fn original_path(&self, id: &str) -> PathBuf {
        self.images_dir().join(format!("{id}.jpg"))
    }

    pub fn original_url(&self, id: &str) -> String {
        format!("{}/{IMAGES_DIR}/{id}.jpg", self.url_prefix)
    }

    pub fn cache_path(&self, id: &str, effect: Effect) -> PathBuf {
        self.cache_dir().join(cache_file_name(id, effect))
    }

    pub fn cache_url(&self, id: &str, effect: Effect) -> String {
        format!(
            "{}/{IMAGES_DIR}/{CACHE_DIR}/{}",
            self.url_prefix,
            cache_file_name(id, effect)
        )
    }

    /// Create the images and cache directories if missing.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.cache_dir())
    }
}

fn cache_file_name(id: &str, effect: Effect) -> String {
    format!("{id}_{}.jpg", effect.name())
}

/// Temp files are created owner-only; published files are not.
#[cfg(unix)]
fn set_servable(file: &std::fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(SERVABLE_MODE))
}

#[cfg(not(unix))]
fn set_servable(_file: &std::fs::File) -> io::Result<()> {
    Ok(())
}

/// Write `bytes` to `path` so readers see either the old file or the new one.
///
/// The data goes to a temporary file in the same directory, which is then
/// renamed over `path`. On error the temporary file is removed. The result is
/// world-readable (0644) so a separate static file server can serve it.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    set_servable(tmp.as_file())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
