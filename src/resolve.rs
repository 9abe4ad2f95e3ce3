//! Turn an image id into a [`Descriptor`].
//!
//! Local ids (present in the metadata store) always win. Anything else is
//! looked up on the remote API with one info query and one sizes query. The
//! resolver only reads the store; it never writes it.

use crate::layout::Layout;
use crate::naming::{is_path_safe_id, is_valid_id};
use crate::remote::{PhotoApi, RemoteError, largest_size};
use crate::store::{ImageRecord, MetadataStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Metadata store error: {0}")]
    Store(#[from] StoreError),
    #[error("Remote API error: {0}")]
    Upstream(#[from] RemoteError),
}

/// Normalized view of an image, wherever its original lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Descriptor {
    /// Original is on disk at the layout's `{id}.jpg`.
    Local {
        id: String,
        title: String,
        tags: Vec<String>,
        url: String,
    },
    /// Original only exists at `url` and must be fetched before transforming.
    Remote {
        id: String,
        title: String,
        tags: Vec<String>,
        page_url: Option<String>,
        url: String,
    },
}

impl Descriptor {
    pub fn local(layout: &Layout, id: &str, record: &ImageRecord) -> Self {
        Descriptor::Local {
            id: id.to_string(),
            title: record.title.clone(),
            tags: record.tags.clone(),
            url: layout.original_url(id),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Descriptor::Local { id, .. } | Descriptor::Remote { id, .. } => id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Descriptor::Local { title, .. } | Descriptor::Remote { title, .. } => title,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            Descriptor::Local { tags, .. } | Descriptor::Remote { tags, .. } => tags,
        }
    }

    /// Servable URL of the untransformed original.
    pub fn url(&self) -> &str {
        match self {
            Descriptor::Local { url, .. } | Descriptor::Remote { url, .. } => url,
        }
    }

    pub fn page_url(&self) -> Option<&str> {
        match self {
            Descriptor::Local { .. } => None,
            Descriptor::Remote { page_url, .. } => page_url.as_deref(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Descriptor::Remote { .. })
    }
}

/// Resolve `id`, returning `Ok(None)` when it is known nowhere.
///
/// A non-ok API status counts as "not found". Transport failures and
/// timeouts are errors, so callers can tell an outage from a missing photo.
///
/// Any key present in the store resolves locally, whatever characters it
/// holds, as long as it cannot escape the images directory. Only ids of the
/// strict form are sent to the remote API.
pub fn resolve(
    store: &MetadataStore,
    api: &dyn PhotoApi,
    layout: &Layout,
    id: &str,
) -> Result<Option<Descriptor>, ResolveError> {
    if !is_path_safe_id(id) {
        debug!(id, "rejecting unsafe id");
        return Ok(None);
    }

    if let Some(record) = store.get(id)? {
        return Ok(Some(Descriptor::local(layout, id, &record)));
    }

    if !is_valid_id(id) {
        debug!(id, "not a remote photo id");
        return Ok(None);
    }

    // Both queries go out before either result is inspected.
    let info = api.get_info(id);
    let sizes = api.get_sizes(id);

    let info = match info {
        Ok(info) => info,
        Err(RemoteError::Status { code, .. }) => {
            debug!(id, code, "remote info lookup reported not found");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let sizes = match sizes {
        Ok(sizes) => sizes,
        Err(RemoteError::Status { code, .. }) => {
            debug!(id, code, "remote sizes lookup reported not found");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let Some(original) = largest_size(&sizes) else {
        warn!(id, "remote photo has no downloadable sizes");
        return Ok(None);
    };

    Ok(Some(Descriptor::Remote {
        id: id.to_string(),
        title: info.title,
        tags: info.tags,
        page_url: info.page_url,
        url: original.source.clone(),
    }))
}
