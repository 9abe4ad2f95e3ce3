//! Upload intake: payload + title + comma-separated tags → new local image.
//!
//! Every check that can reject an upload runs before anything is written to
//! the metadata store. The payload is decoded and re-encoded as JPEG, so a
//! stored original is always a valid `{id}.jpg` regardless of what was sent.
//!
//! Uploading the same bytes under the same title yields the same id; the
//! record is updated in place rather than duplicated.

use crate::imaging::{BackendError, ImageBackend, ImageInfo, Quality};
use crate::layout::Layout;
use crate::naming::{parse_tags, upload_id};
use crate::resolve::Descriptor;
use crate::store::{ImageRecord, MetadataStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{0}")]
    Validation(String),
    #[error("Metadata store error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An upload as received.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub data: &'a [u8],
    pub title: &'a str,
    /// Comma-separated, e.g. `"beach, evening"`.
    pub tags: &'a str,
}

/// What a successful upload produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uploaded {
    pub descriptor: Descriptor,
    pub info: ImageInfo,
    /// An image with this id already existed and was replaced.
    pub replaced: bool,
}

impl Uploaded {
    pub fn id(&self) -> &str {
        self.descriptor.id()
    }
}

fn validate(request: &UploadRequest) -> Result<(), UploadError> {
    if request.title.trim().is_empty() {
        return Err(UploadError::Validation("A title is required".to_string()));
    }
    if request.data.is_empty() {
        return Err(UploadError::Validation("No image data received".to_string()));
    }
    Ok(())
}

/// Validate, store the original, and record its metadata.
pub fn upload(
    store: &MetadataStore,
    backend: &impl ImageBackend,
    layout: &Layout,
    quality: Quality,
    request: UploadRequest,
) -> Result<Uploaded, UploadError> {
    validate(&request)?;

    let title = request.title.trim();
    let tags = parse_tags(request.tags);
    let id = upload_id(title, request.data);
    let path = layout.original_path(&id);
    let replaced = path.exists();

    let info = backend
        .import(request.data, &path, quality)
        .map_err(|e| match e {
            BackendError::Io(io) => UploadError::Io(io),
            BackendError::ProcessingFailed(_) => {
                UploadError::Validation("The file is not a supported image".to_string())
            }
        })?;

    let record = ImageRecord::new(title, tags);
    let saved = store.update(|records| {
        match records.get_mut(&id) {
            Some(existing) => {
                existing.title = record.title.clone();
                existing.tags = record.tags.clone();
            }
            None => {
                records.insert(id.clone(), record.clone());
            }
        }
        Ok::<_, StoreError>(())
    });
    if let Err(e) = saved {
        if !replaced && let Err(cleanup) = std::fs::remove_file(&path) {
            warn!(id, error = %cleanup, "could not remove orphaned upload");
        }
        return Err(e.into());
    }

    info!(id, replaced, "stored upload");
    Ok(Uploaded {
        descriptor: Descriptor::local(layout, &id, &record),
        info,
        replaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{encode_png, seed_store};
    use std::fs;
    use tempfile::TempDir;

    fn fixture(tmp: &TempDir) -> (MetadataStore, Layout) {
        let layout = Layout::new(tmp.path().join("static"), "/static");
        let store = MetadataStore::new(layout.static_dir().join("info.json"));
        (store, layout)
    }

    fn request<'a>(data: &'a [u8], title: &'a str, tags: &'a str) -> UploadRequest<'a> {
        UploadRequest { data, title, tags }
    }

    fn image_count(layout: &Layout) -> usize {
        fs::read_dir(layout.images_dir())
            .map(|d| d.filter(|e| e.as_ref().unwrap().path().is_file()).count())
            .unwrap_or(0)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn empty_title_rejected_and_store_unchanged() {
        let tmp = TempDir::new().unwrap();
        let (store, layout) = fixture(&tmp);
        seed_store(&store, &[("existing", "Existing", &["a"])]);
        let before = fs::read(store.path()).unwrap();
        let backend = MockBackend::new();

        let err = upload(&store, &backend, &layout, Quality::default(), request(b"img", "", "x"))
            .unwrap_err();

        assert!(matches!(err, UploadError::Validation(_)));
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert!(backend.get_operations().is_empty());
        assert_eq!(image_count(&layout), 0);
    }

    #[test]
    fn whitespace_title_rejected() {
        let tmp = TempDir::new().unwrap();
        let (store, layout) = fixture(&tmp);
        let result = upload(
            &store,
            &MockBackend::new(),
            &layout,
            Quality::default(),
            request(b"img", "   ", ""),
        );
        assert!(matches!(result, Err(UploadError::Validation(_))));
        assert!(!store.path().exists());
    }

    #[test]
    fn empty_payload_rejected() {
        let tmp = TempDir::new().unwrap();
        let (store, layout) = fixture(&tmp);
        let result = upload(
            &store,
            &MockBackend::new(),
            &layout,
            Quality::default(),
            request(b"", "Title", ""),
        );
        assert!(matches!(result, Err(UploadError::Validation(_))));
        assert!(!store.path().exists());
    }

    #[test]
    fn undecodable_payload_rejected_without_writes() {
        let tmp = TempDir::new().unwrap();
        let (store, layout) = fixture(&tmp);
        seed_store(&store, &[("existing", "Existing", &[])]);
        let before = fs::read(store.path()).unwrap();

        let result = upload(
            &store,
            &RustBackend::new(),
            &layout,
            Quality::default(),
            request(b"definitely not an image", "Title", ""),
        );

        assert!(matches!(result, Err(UploadError::Validation(_))));
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert!(!layout.images_dir().exists());
    }

    // =========================================================================
    // Success
    // =========================================================================

    #[test]
    fn upload_stores_original_and_record() {
        let tmp = TempDir::new().unwrap();
        let (store, layout) = fixture(&tmp);

        let uploaded = upload(
            &store,
            &MockBackend::new(),
            &layout,
            Quality::default(),
            request(b"pixels", "  Sunset over bay ", "beach, evening,"),
        )
        .unwrap();

        assert!(uploaded.id().starts_with("sunset-over-bay-"));
        assert!(!uploaded.replaced);
        assert!(layout.original_path(uploaded.id()).exists());
        let record = store.get(uploaded.id()).unwrap().unwrap();
        assert_eq!(record.title, "Sunset over bay");
        assert_eq!(record.tags, vec!["beach", "evening"]);
        assert_eq!(
            uploaded.descriptor.url(),
            format!("/static/images/{}.jpg", uploaded.id())
        );
    }

    #[test]
    fn same_upload_twice_keeps_one_record() {
        let tmp = TempDir::new().unwrap();
        let (store, layout) = fixture(&tmp);
        let backend = MockBackend::new();

        let first =
            upload(&store, &backend, &layout, Quality::default(), request(b"px", "Dup", "a"))
                .unwrap();
        let second =
            upload(&store, &backend, &layout, Quality::default(), request(b"px", "Dup", "b"))
                .unwrap();

        assert_eq!(first.id(), second.id());
        assert!(second.replaced);
        let records = store.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[first.id()].tags, vec!["b"]);
    }

    #[test]
    fn reupload_preserves_unknown_record_fields() {
        let tmp = TempDir::new().unwrap();
        let (store, layout) = fixture(&tmp);
        let backend = MockBackend::new();
        let first =
            upload(&store, &backend, &layout, Quality::default(), request(b"px", "Keep", ""))
                .unwrap();
        store
            .update(|records| {
                records[first.id()]
                    .extra
                    .insert("license".into(), "cc-by".into());
                Ok::<_, StoreError>(())
            })
            .unwrap();

        upload(&store, &backend, &layout, Quality::default(), request(b"px", "Keep", "new")).unwrap();

        assert_eq!(store.get(first.id()).unwrap().unwrap().extra["license"], "cc-by");
    }

    #[test]
    fn png_upload_is_reencoded_as_jpeg() {
        let tmp = TempDir::new().unwrap();
        let (store, layout) = fixture(&tmp);

        let uploaded = upload(
            &store,
            &RustBackend::new(),
            &layout,
            Quality::default(),
            request(&encode_png(40, 30), "Gradient", ""),
        )
        .unwrap();

        assert_eq!(uploaded.info.format, "JPEG");
        assert_eq!((uploaded.info.width, uploaded.info.height), (40, 30));
        let bytes = fs::read(layout.original_path(uploaded.id())).unwrap();
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn store_failure_removes_new_original() {
        let tmp = TempDir::new().unwrap();
        let (store, layout) = fixture(&tmp);
        fs::create_dir_all(layout.static_dir()).unwrap();
        fs::write(store.path(), "{corrupt").unwrap();

        let result = upload(
            &store,
            &MockBackend::new(),
            &layout,
            Quality::default(),
            request(b"px", "Orphan", ""),
        );

        assert!(matches!(result, Err(UploadError::Store(_))));
        assert_eq!(image_count(&layout), 0);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{corrupt");
    }
}
