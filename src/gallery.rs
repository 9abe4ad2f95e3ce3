//! The gallery: every pipeline piece wired together behind one handle.
//!
//! [`Gallery`] owns the metadata store, the remote API client, the fetcher
//! and the effect cache. All collaborators are passed in at construction, so
//! tests swap in fakes and production uses [`Gallery::from_config`]. Each
//! public method is one user-facing request and returns a [`GalleryError`]
//! from the request-level taxonomy.

use crate::cache::{CacheError, CacheStats, EffectCache, Rendition, WarmResult};
use crate::config::GalleryConfig;
use crate::error::GalleryError;
use crate::imaging::{Effect, EffectConfig, ImageBackend, ImageInfo, RustBackend, describe};
use crate::layout::Layout;
use crate::remote::{FlickrClient, Fetcher, HttpFetcher, OfflineApi, PhotoApi};
use crate::resolve::{Descriptor, resolve};
use crate::search::{RemoteSearch, SearchResults, search};
use crate::store::MetadataStore;
use crate::upload::{UploadRequest, Uploaded, upload};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Everything the detail page shows for one `(id, effect)` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub descriptor: Descriptor,
    pub rendition: Rendition,
    /// Size, format and colour layout of the served file, when it is local.
    pub info: Option<ImageInfo>,
    /// The effect failed and the original is served instead.
    pub fell_back: bool,
}

/// Outcome of [`Gallery::warm`].
#[derive(Debug)]
pub struct WarmReport {
    pub results: Vec<WarmResult>,
    /// Requested ids that could not be resolved, with the reason.
    pub unresolved: Vec<(String, GalleryError)>,
    pub stats: CacheStats,
}

impl WarmReport {
    pub fn failures(&self) -> usize {
        self.unresolved.len() + self.results.iter().filter(|r| r.result.is_err()).count()
    }
}

pub struct Gallery<B: ImageBackend = RustBackend> {
    store: MetadataStore,
    api: Box<dyn PhotoApi>,
    cache: EffectCache<B>,
    remote_search: RemoteSearch,
}

impl Gallery<RustBackend> {
    /// Build a production gallery from configuration.
    ///
    /// Relative paths in `config` are taken from `base`. With no API key the
    /// gallery runs offline: only local images resolve.
    pub fn from_config(config: &GalleryConfig, base: &Path) -> Result<Self, GalleryError> {
        let layout = config.layout(base);
        layout
            .ensure_dirs()
            .map_err(|e| GalleryError::Internal(e.to_string()))?;

        let timeout = config.remote.timeout();
        let api: Box<dyn PhotoApi> = if config.remote.is_offline() {
            info!("no API key configured, remote lookups disabled");
            Box::new(OfflineApi)
        } else {
            Box::new(FlickrClient::new(
                &config.remote.endpoint,
                &config.remote.api_key,
                timeout,
            )?)
        };

        Ok(Gallery::new(
            MetadataStore::new(config.metadata_path(&layout)),
            api,
            Box::new(HttpFetcher::new(timeout)?),
            RustBackend::new(),
            layout,
            config.effect_config(),
            config.remote_search(),
        ))
    }
}

impl<B: ImageBackend> Gallery<B> {
    pub fn new(
        store: MetadataStore,
        api: Box<dyn PhotoApi>,
        fetcher: Box<dyn Fetcher>,
        backend: B,
        layout: Layout,
        effects: EffectConfig,
        remote_search: RemoteSearch,
    ) -> Self {
        Self {
            store,
            api,
            cache: EffectCache::new(backend, fetcher, layout, effects),
            remote_search,
        }
    }

    pub fn layout(&self) -> &Layout {
        self.cache.layout()
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        self.cache.backend()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Local and remote search results, kept separate.
    pub fn search(&self, query: &str) -> Result<SearchResults, GalleryError> {
        Ok(search(
            &self.store,
            self.api.as_ref(),
            self.layout(),
            &self.remote_search,
            query,
        )?)
    }

    /// Resolve `id` or fail with [`GalleryError::NotFound`].
    pub fn resolve(&self, id: &str) -> Result<Descriptor, GalleryError> {
        resolve(&self.store, self.api.as_ref(), self.layout(), id)?
            .ok_or_else(|| GalleryError::NotFound(id.to_string()))
    }

    /// Resolve `id` and serve it under `effect`.
    ///
    /// If the effect engine cannot process the image, the untransformed
    /// original is served and `fell_back` is set. Fetch failures are not
    /// masked this way; they surface as [`GalleryError::Upstream`].
    pub fn detail(&self, id: &str, effect: Effect) -> Result<DetailView, GalleryError> {
        let descriptor = self.resolve(id)?;

        let (rendition, fell_back) = match self.cache.get_or_create(&descriptor, effect) {
            Ok(rendition) => (rendition, false),
            Err(CacheError::Transform(e)) => {
                warn!(id, %effect, error = %e, "effect failed, serving original");
                (self.cache.original(&descriptor), true)
            }
            Err(e) => return Err(e.into()),
        };

        let info = rendition
            .path
            .as_deref()
            .and_then(|path| match describe(self.cache.backend(), path) {
                Ok(info) => Some(info),
                Err(e) => {
                    debug!(id, error = %e, "could not read image details");
                    None
                }
            });

        Ok(DetailView {
            descriptor,
            rendition,
            info,
            fell_back,
        })
    }

    pub fn upload(&self, request: UploadRequest) -> Result<Uploaded, GalleryError> {
        Ok(upload(
            &self.store,
            self.cache.backend(),
            self.layout(),
            self.cache.config().quality,
            request,
        )?)
    }

    /// Up to `count` distinct local images in random order.
    pub fn featured<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Descriptor>, GalleryError> {
        let records = self.store.load()?;
        let mut all: Vec<Descriptor> = records
            .iter()
            .map(|(id, record)| Descriptor::local(self.layout(), id, record))
            .collect();
        all.shuffle(rng);
        all.truncate(count);
        Ok(all)
    }

    /// Pre-generate renditions of `ids` under `effects` in parallel.
    ///
    /// An empty `ids` means every local image. Ids that do not resolve are
    /// reported, not fatal.
    pub fn warm(&self, ids: &[String], effects: &[Effect]) -> Result<WarmReport, GalleryError> {
        let ids: Vec<String> = if ids.is_empty() {
            self.store.load()?.into_keys().collect()
        } else {
            ids.to_vec()
        };

        let mut descriptors = Vec::with_capacity(ids.len());
        let mut unresolved = Vec::new();
        for id in ids {
            match self.resolve(&id) {
                Ok(d) => descriptors.push(d),
                Err(e) => {
                    warn!(id, error = %e, "skipping unresolved id");
                    unresolved.push((id, e));
                }
            }
        }

        let results = self.cache.warm(&descriptors, effects);
        Ok(WarmReport {
            results,
            unresolved,
            stats: self.cache.stats(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Origin;
    use crate::imaging::backend::tests::MockBackend;
    use crate::remote::DEFAULT_EXTRAS;
    use crate::test_helpers::{CountingFetcher, FakePhotoApi, seed_store};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn gallery_with(
        tmp: &TempDir,
        backend: MockBackend,
        api: FakePhotoApi,
        fetcher: CountingFetcher,
    ) -> Gallery<MockBackend> {
        let layout = Layout::new(tmp.path().join("static"), "/static");
        layout.ensure_dirs().unwrap();
        Gallery::new(
            MetadataStore::new(layout.static_dir().join("info.json")),
            Box::new(api),
            Box::new(fetcher),
            backend,
            layout,
            EffectConfig::default(),
            RemoteSearch {
                per_page: 5,
                safe_search: 1,
                extras: DEFAULT_EXTRAS.to_string(),
            },
        )
    }

    fn add_local(gallery: &Gallery<MockBackend>, id: &str, title: &str) {
        seed_store(gallery.store(), &[(id, title, &[])]);
        std::fs::write(gallery.layout().original_path(id), b"original").unwrap();
    }

    // =========================================================================
    // detail
    // =========================================================================

    #[test]
    fn detail_none_serves_original_with_info() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());
        add_local(&g, "abc", "Title");

        let view = g.detail("abc", Effect::None).unwrap();

        assert_eq!(view.rendition.url, "/static/images/abc.jpg");
        assert_eq!(view.rendition.origin, Origin::Original);
        assert!(!view.fell_back);
        assert_eq!(view.info.unwrap().format, "JPEG");
    }

    #[test]
    fn detail_effect_serves_cache_url() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());
        add_local(&g, "abc", "Title");

        let view = g.detail("abc", Effect::Sepia).unwrap();

        assert_eq!(view.rendition.url, "/static/images/cache/abc_sepia.jpg");
        assert!(view.info.is_some());
    }

    #[test]
    fn searchable_key_with_dots_is_viewable() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());
        add_local(&g, "IMG 0042.v2", "Sunset");

        let hits = g.search("sunset").unwrap().local;
        let view = g.detail(hits[0].descriptor.id(), Effect::Sepia).unwrap();

        assert_eq!(view.rendition.url, "/static/images/cache/IMG 0042.v2_sepia.jpg");
        assert!(!view.fell_back);
    }

    #[test]
    fn detail_unknown_id_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());

        let err = g.detail("nope", Effect::Sepia).unwrap_err();

        assert!(matches!(err, GalleryError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn detail_transform_failure_falls_back_to_original() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(
            &tmp,
            MockBackend::failing(),
            FakePhotoApi::new(),
            CountingFetcher::new(),
        );
        add_local(&g, "abc", "Title");

        let view = g.detail("abc", Effect::Negative).unwrap();

        assert!(view.fell_back);
        assert_eq!(view.rendition.url, "/static/images/abc.jpg");
        assert!(!g.layout().cache_path("abc", Effect::Negative).exists());
    }

    #[test]
    fn detail_remote_fetch_failure_is_upstream() {
        let tmp = TempDir::new().unwrap();
        let api = FakePhotoApi::new().with_photo("77", "Remote", &[], &[(640, 480)]);
        let g = gallery_with(&tmp, MockBackend::new(), api, CountingFetcher::failing());

        let err = g.detail("77", Effect::Grayscale).unwrap_err();
        assert!(matches!(err, GalleryError::Upstream(_)));
    }

    #[test]
    fn detail_remote_twice_fetches_once() {
        let tmp = TempDir::new().unwrap();
        let api = FakePhotoApi::new().with_photo("77", "Remote", &["sea"], &[(640, 480)]);
        let fetcher = CountingFetcher::new();
        let fetches = fetcher.calls();
        let g = gallery_with(&tmp, MockBackend::new(), api, fetcher);

        let first = g.detail("77", Effect::Grayscale).unwrap();
        let second = g.detail("77", Effect::Grayscale).unwrap();

        assert_eq!(first.rendition.url, second.rendition.url);
        assert_eq!(second.rendition.origin, Origin::Cached);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(g.backend().apply_count(), 1);
        assert_eq!(first.descriptor.tags(), ["sea"]);
    }

    #[test]
    fn detail_remote_none_has_no_local_info() {
        let tmp = TempDir::new().unwrap();
        let api = FakePhotoApi::new().with_photo("77", "Remote", &[], &[(640, 480)]);
        let g = gallery_with(&tmp, MockBackend::new(), api, CountingFetcher::new());

        let view = g.detail("77", Effect::None).unwrap();

        assert_eq!(view.rendition.url, "https://photos.test/77_640x480.jpg");
        assert!(view.info.is_none());
    }

    // =========================================================================
    // featured
    // =========================================================================

    #[test]
    fn featured_returns_distinct_local_images() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());
        for i in 0..6 {
            add_local(&g, &format!("img{i}"), "T");
        }
        let mut rng = StdRng::seed_from_u64(7);

        let picks = g.featured(3, &mut rng).unwrap();

        assert_eq!(picks.len(), 3);
        let unique: HashSet<&str> = picks.iter().map(|d| d.id()).collect();
        assert_eq!(unique.len(), 3);
        assert!(picks.iter().all(|d| !d.is_remote()));
    }

    #[test]
    fn featured_with_few_images_returns_all() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());
        add_local(&g, "only", "T");

        let picks = g.featured(3, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(picks.len(), 1);
    }

    // =========================================================================
    // warm
    // =========================================================================

    #[test]
    fn warm_defaults_to_all_local_images() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());
        add_local(&g, "a", "A");
        add_local(&g, "b", "B");

        let report = g.warm(&[], &[Effect::Sepia, Effect::Thumbnail]).unwrap();

        assert_eq!(report.results.len(), 4);
        assert_eq!(report.failures(), 0);
        assert_eq!(report.stats.misses, 4);
    }

    #[test]
    fn warm_reports_unresolved_ids() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());
        add_local(&g, "a", "A");

        let report = g
            .warm(&["a".to_string(), "ghost".to_string()], &[Effect::Negative])
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].0, "ghost");
        assert_eq!(report.failures(), 1);
    }

    // =========================================================================
    // upload + search
    // =========================================================================

    #[test]
    fn uploaded_image_is_searchable_and_viewable() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());

        let uploaded = g
            .upload(UploadRequest {
                data: b"pixels",
                title: "Sunset over bay",
                tags: "beach, evening",
            })
            .unwrap();
        let results = g.search("sunset beach").unwrap();
        let view = g.detail(uploaded.id(), Effect::Sepia).unwrap();

        assert_eq!(results.local.len(), 1);
        assert_eq!(results.local[0].hits, 2);
        assert_eq!(results.local[0].descriptor.id(), uploaded.id());
        assert!(!view.fell_back);
    }

    #[test]
    fn rejected_upload_maps_to_validation() {
        let tmp = TempDir::new().unwrap();
        let g = gallery_with(&tmp, MockBackend::new(), FakePhotoApi::new(), CountingFetcher::new());

        let err = g
            .upload(UploadRequest {
                data: b"pixels",
                title: "",
                tags: "",
            })
            .unwrap_err();

        assert!(matches!(err, GalleryError::Validation(_)));
        assert!(!g.store().path().exists());
    }
}
