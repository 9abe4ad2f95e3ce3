//! Request-level error taxonomy.
//!
//! Module errors ([`StoreError`], [`RemoteError`], [`CacheError`], ...) carry
//! the detail needed for logs. At the request boundary they collapse into
//! [`GalleryError`], whose kind decides what the caller sees:
//!
//! | Kind | Meaning | User sees |
//! |---|---|---|
//! | `NotFound` | id is neither local nor remote | "not found" |
//! | `Upstream` | remote API or download failed | generic "try again" |
//! | `Transform` | effect engine could not process the source | generic message |
//! | `Validation` | upload rejected before any write | the validation reason |
//! | `Internal` | store or filesystem trouble | generic message |
//!
//! [`GalleryError::user_message`] never includes filesystem paths or raw API
//! responses; the `Display` output does, and belongs in logs.

use crate::cache::CacheError;
use crate::remote::RemoteError;
use crate::resolve::ResolveError;
use crate::search::SearchError;
use crate::store::StoreError;
use crate::upload::UploadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Upstream failure: {0}")]
    Upstream(#[source] RemoteError),
    #[error("Transform failed: {0}")]
    Transform(#[source] CacheError),
    #[error("Invalid upload: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GalleryError {
    /// Short, safe text for end users.
    pub fn user_message(&self) -> String {
        match self {
            GalleryError::NotFound(_) => "Image not found.".to_string(),
            GalleryError::Upstream(RemoteError::Timeout) => {
                "The photo service took too long to respond. Please try again.".to_string()
            }
            GalleryError::Upstream(_) => {
                "The photo service is unavailable. Please try again later.".to_string()
            }
            GalleryError::Transform(_) => "The image could not be processed.".to_string(),
            GalleryError::Validation(reason) => reason.clone(),
            GalleryError::Internal(_) => "Something went wrong on our side.".to_string(),
        }
    }

    /// HTTP status a web front end would answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            GalleryError::NotFound(_) => 404,
            GalleryError::Validation(_) => 400,
            GalleryError::Upstream(RemoteError::Timeout) => 504,
            GalleryError::Upstream(_) => 502,
            GalleryError::Transform(_) | GalleryError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for GalleryError {
    fn from(e: StoreError) -> Self {
        GalleryError::Internal(e.to_string())
    }
}

impl From<RemoteError> for GalleryError {
    fn from(e: RemoteError) -> Self {
        GalleryError::Upstream(e)
    }
}

impl From<ResolveError> for GalleryError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Store(e) => e.into(),
            ResolveError::Upstream(e) => e.into(),
        }
    }
}

impl From<SearchError> for GalleryError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Store(e) => e.into(),
            SearchError::Upstream(e) => e.into(),
        }
    }
}

impl From<CacheError> for GalleryError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Fetch(e) => GalleryError::Upstream(e),
            CacheError::Transform(_) => GalleryError::Transform(e),
            CacheError::Io(e) => GalleryError::Internal(e.to_string()),
        }
    }
}

impl From<UploadError> for GalleryError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Validation(reason) => GalleryError::Validation(reason),
            UploadError::Store(e) => e.into(),
            UploadError::Io(e) => GalleryError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::BackendError;

    #[test]
    fn user_messages_hide_paths_and_payloads() {
        let errors = vec![
            GalleryError::from(RemoteError::Status {
                code: 105,
                message: "Service currently unavailable at /secret/api".to_string(),
            }),
            GalleryError::from(StoreError::Io(std::io::Error::other(
                "/srv/static/info.json: permission denied",
            ))),
            GalleryError::from(CacheError::Transform(BackendError::ProcessingFailed(
                "Failed to decode /srv/static/images/a.jpg".to_string(),
            ))),
            GalleryError::NotFound("/etc/passwd".to_string()),
        ];
        for e in errors {
            let msg = e.user_message();
            assert!(!msg.contains('/'), "leaked path in {msg:?}");
            assert!(!msg.contains("105"), "leaked payload in {msg:?}");
        }
    }

    #[test]
    fn timeout_is_distinct_from_not_found() {
        let timeout = GalleryError::from(RemoteError::Timeout);
        let missing = GalleryError::NotFound("x".to_string());
        assert_eq!(timeout.status_code(), 504);
        assert_eq!(missing.status_code(), 404);
        assert_ne!(timeout.user_message(), missing.user_message());
    }

    #[test]
    fn fetch_failure_maps_to_upstream() {
        let e = GalleryError::from(CacheError::Fetch(RemoteError::Http("502".to_string())));
        assert!(matches!(e, GalleryError::Upstream(_)));
        assert_eq!(e.status_code(), 502);
    }

    #[test]
    fn validation_reason_is_shown() {
        let e = GalleryError::from(UploadError::Validation("A title is required".to_string()));
        assert_eq!(e.user_message(), "A title is required");
        assert_eq!(e.status_code(), 400);
    }
}
