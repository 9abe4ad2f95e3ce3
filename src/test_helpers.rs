//! Shared test utilities for the fx-gal test suite.
//!
//! Provides synthetic image fixtures and counting doubles for the two
//! network boundaries, [`PhotoApi`] and [`Fetcher`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let api = FakePhotoApi::new().with_photo("777", "Harbour", &["boats"], &[(75, 75), (2048, 1536)]);
//! let fetcher = CountingFetcher::new();
//! let calls = fetcher.calls();
//! // ... exercise the pipeline ...
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! assert_eq!(api.info_calls.load(Ordering::SeqCst), 1);
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{ImageEncoder, RgbImage};

use crate::remote::{
    Fetcher, PhotoApi, PhotoInfo, PhotoSize, PhotoSummary, RemoteError, SearchParams,
};
use crate::store::{ImageRecord, MetadataStore, StoreError};

// =========================================================================
// Synthetic images
// =========================================================================

/// An RGB image whose channels vary with position.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a gradient JPEG to `path`.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient_rgb(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a gradient PNG (lossless) to `path`.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode_png(width, height)).unwrap();
}

/// A gradient PNG as bytes, e.g. for upload payloads.
pub fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_rgb(width, height);
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

// =========================================================================
// Metadata store
// =========================================================================

/// Add `(id, title, tags)` records to `store`, keeping existing ones.
pub fn seed_store(store: &MetadataStore, entries: &[(&str, &str, &[&str])]) {
    store
        .update(|records| {
            for (id, title, tags) in entries {
                records.insert(
                    id.to_string(),
                    ImageRecord::new(*title, tags.iter().map(|t| t.to_string()).collect()),
                );
            }
            Ok::<_, StoreError>(())
        })
        .unwrap();
}

// =========================================================================
// Remote API double
// =========================================================================

/// In-memory [`PhotoApi`] with call counters.
///
/// Unknown ids answer with a non-ok status, as the real API does.
/// Counters are shared `Arc`s so they stay readable after the fake is boxed.
#[derive(Default)]
pub struct FakePhotoApi {
    infos: HashMap<String, PhotoInfo>,
    sizes: HashMap<String, Vec<PhotoSize>>,
    search_results: Vec<PhotoSummary>,
    timeout: bool,
    last_search: Mutex<Option<SearchParams>>,
    pub info_calls: Arc<AtomicUsize>,
    pub sizes_calls: Arc<AtomicUsize>,
    pub search_calls: Arc<AtomicUsize>,
}

impl FakePhotoApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake whose every call times out.
    pub fn timing_out() -> Self {
        Self {
            timeout: true,
            ..Self::default()
        }
    }

    /// Register a photo. Each size `(w, h)` gets the source URL
    /// `https://photos.test/{id}_{w}x{h}.jpg`.
    pub fn with_photo(
        mut self,
        id: &str,
        title: &str,
        tags: &[&str],
        sizes: &[(u32, u32)],
    ) -> Self {
        self.infos.insert(
            id.to_string(),
            PhotoInfo {
                id: id.to_string(),
                title: title.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                page_url: Some(format!("https://photos.test/page/{id}")),
            },
        );
        self.sizes.insert(
            id.to_string(),
            sizes
                .iter()
                .map(|&(width, height)| PhotoSize {
                    label: format!("{width}x{height}"),
                    width,
                    height,
                    source: format!("https://photos.test/{id}_{width}x{height}.jpg"),
                })
                .collect(),
        );
        self
    }

    pub fn with_search(mut self, results: Vec<PhotoSummary>) -> Self {
        self.search_results = results;
        self
    }

    pub fn last_search(&self) -> Option<SearchParams> {
        self.last_search.lock().unwrap().clone()
    }

    fn check_timeout(&self) -> Result<(), RemoteError> {
        if self.timeout {
            Err(RemoteError::Timeout)
        } else {
            Ok(())
        }
    }
}

fn not_found() -> RemoteError {
    RemoteError::Status {
        code: 1,
        message: "Photo not found".to_string(),
    }
}

impl PhotoApi for FakePhotoApi {
    fn search(&self, params: &SearchParams) -> Result<Vec<PhotoSummary>, RemoteError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_search.lock().unwrap() = Some(params.clone());
        self.check_timeout()?;
        Ok(self.search_results.clone())
    }

    fn get_info(&self, photo_id: &str) -> Result<PhotoInfo, RemoteError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.check_timeout()?;
        self.infos.get(photo_id).cloned().ok_or_else(not_found)
    }

    fn get_sizes(&self, photo_id: &str) -> Result<Vec<PhotoSize>, RemoteError> {
        self.sizes_calls.fetch_add(1, Ordering::SeqCst);
        self.check_timeout()?;
        self.sizes.get(photo_id).cloned().ok_or_else(not_found)
    }
}

/// A search hit with a thumbnail URL.
pub fn summary(id: &str) -> PhotoSummary {
    PhotoSummary {
        id: id.to_string(),
        title: format!("Photo {id}"),
        owner: "owner@N00".to_string(),
        urls: [("url_q".to_string(), format!("https://photos.test/{id}_q.jpg"))]
            .into_iter()
            .collect(),
    }
}

// =========================================================================
// Fetcher double
// =========================================================================

/// [`Fetcher`] that counts calls and serves fixed bytes.
pub struct CountingFetcher {
    body: Option<PathBuf>,
    fail: AtomicBool,
    calls: Arc<AtomicUsize>,
}

impl CountingFetcher {
    /// Serves a few placeholder bytes (enough for `MockBackend`).
    pub fn new() -> Self {
        Self {
            body: None,
            fail: AtomicBool::new(false),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serves the contents of `path` for every URL.
    pub fn serving(path: &Path) -> Self {
        Self {
            body: Some(path.to_path_buf()),
            ..Self::new()
        }
    }

    /// Every fetch fails with an HTTP error.
    pub fn failing() -> Self {
        let fetcher = Self::new();
        fetcher.fail.store(true, Ordering::SeqCst);
        fetcher
    }

    /// Shared call counter, readable after the fetcher is moved.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Fetcher for CountingFetcher {
    fn fetch(&self, _url: &str, out: &mut dyn Write) -> Result<u64, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::Http("503 Service Unavailable".to_string()));
        }
        let bytes = match &self.body {
            Some(path) => std::fs::read(path)?,
            None => b"remote original".to_vec(),
        };
        out.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }
}
