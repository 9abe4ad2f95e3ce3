//! Remote photo API and image download.
//!
//! The pipeline only needs three things from a photo host, captured by
//! [`PhotoApi`]:
//!
//! | Operation | Flickr method | Result |
//! |---|---|---|
//! | `search` | `flickr.photos.search` | photo summaries with size URLs |
//! | `get_info` | `flickr.photos.getInfo` | title, tags, photo page URL |
//! | `get_sizes` | `flickr.photos.getSizes` | every available size with dimensions |
//!
//! [`FlickrClient`] speaks the Flickr REST API (JSON, no callback wrapper).
//! [`OfflineApi`] stands in when no API key is configured. Tests inject their
//! own implementations.
//!
//! A response whose `stat` is not `"ok"` becomes [`RemoteError::Status`].
//! Transport failures are [`RemoteError::Http`], except timeouts, which are
//! reported separately as [`RemoteError::Timeout`]. Error messages never
//! include request URLs, since those carry the API key.
//!
//! Downloads go through [`Fetcher`], whose production implementation is
//! [`HttpFetcher`].

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const FLICKR_ENDPOINT: &str = "https://www.flickr.com/services/rest/";

/// Size keys requested as search extras, smallest first.
pub const DEFAULT_EXTRAS: &str = "url_sq,url_t,url_s,url_q,url_m,url_n,url_z,url_c,url_l,url_o";

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("API returned status {code}: {message}")]
    Status { code: i64, message: String },
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Http(e.without_url().to_string())
        }
    }
}

/// Title, tags and page link of a remote photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoInfo {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub page_url: Option<String>,
}

/// One downloadable rendition of a remote photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoSize {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub source: String,
}

impl PhotoSize {
    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Pick the largest size by pixel area.
///
/// Ties go to the later entry, so a list the API returns in ascending order
/// resolves to its last element, as the API intends.
pub fn largest_size(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes.iter().max_by_key(|s| s.area())
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoSummary {
    pub id: String,
    pub title: String,
    pub owner: String,
    /// Size URLs returned as extras, keyed by extra name (`url_q`, `url_o`, ...).
    pub urls: BTreeMap<String, String>,
}

impl PhotoSummary {
    /// Smallest square-ish URL suitable for a result grid.
    pub fn thumbnail_url(&self) -> Option<&str> {
        ["url_q", "url_s", "url_t", "url_sq", "url_m"]
            .iter()
            .find_map(|k| self.urls.get(*k))
            .map(String::as_str)
    }
}

/// Parameters for [`PhotoApi::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub text: String,
    pub per_page: u32,
    pub safe_search: u8,
    pub extras: String,
}

/// The remote photo host, as far as this crate is concerned.
pub trait PhotoApi: Send + Sync {
    fn search(&self, params: &SearchParams) -> Result<Vec<PhotoSummary>, RemoteError>;

    fn get_info(&self, photo_id: &str) -> Result<PhotoInfo, RemoteError>;

    /// Sizes as listed by the host; no ordering is assumed.
    fn get_sizes(&self, photo_id: &str) -> Result<Vec<PhotoSize>, RemoteError>;
}

// ---------------------------------------------------------------------------
// Flickr wire format (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Stat {
    stat: String,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(rename = "_content", default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    photo: WireInfo,
}

#[derive(Debug, Deserialize)]
struct WireInfo {
    id: String,
    #[serde(default)]
    title: Content,
    #[serde(default)]
    tags: WireTags,
    #[serde(default)]
    urls: WireUrls,
}

#[derive(Debug, Default, Deserialize)]
struct WireTags {
    #[serde(default)]
    tag: Vec<WireTag>,
}

#[derive(Debug, Deserialize)]
struct WireTag {
    #[serde(default)]
    raw: String,
    #[serde(rename = "_content", default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireUrls {
    #[serde(default)]
    url: Vec<WireUrl>,
}

#[derive(Debug, Deserialize)]
struct WireUrl {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "_content", default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct SizesResponse {
    sizes: WireSizes,
}

#[derive(Debug, Deserialize)]
struct WireSizes {
    #[serde(default)]
    size: Vec<WireSize>,
}

#[derive(Debug, Deserialize)]
struct WireSize {
    #[serde(default)]
    label: String,
    #[serde(deserialize_with = "dimension")]
    width: u32,
    #[serde(deserialize_with = "dimension")]
    height: u32,
    source: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    photos: WirePhotos,
}

#[derive(Debug, Deserialize)]
struct WirePhotos {
    #[serde(default)]
    photo: Vec<WireSummary>,
}

#[derive(Debug, Deserialize)]
struct WireSummary {
    id: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    title: String,
    #[serde(flatten)]
    rest: BTreeMap<String, serde_json::Value>,
}

/// Flickr reports dimensions as numbers or numeric strings depending on the method.
fn dimension<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => u32::try_from(n).map_err(de::Error::custom),
        NumberOrString::String(s) if s.is_empty() => Ok(0),
        NumberOrString::String(s) => s.parse().map_err(de::Error::custom),
    }
}

fn check_stat(value: serde_json::Value) -> Result<serde_json::Value, RemoteError> {
    let stat: Stat =
        serde_json::from_value(value.clone()).map_err(|e| RemoteError::Decode(e.to_string()))?;
    if stat.stat != "ok" {
        return Err(RemoteError::Status {
            code: stat.code,
            message: stat.message,
        });
    }
    Ok(value)
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, RemoteError> {
    serde_json::from_value(check_stat(value)?).map_err(|e| RemoteError::Decode(e.to_string()))
}

fn parse_info(value: serde_json::Value) -> Result<PhotoInfo, RemoteError> {
    let InfoResponse { photo } = decode(value)?;
    let tags = photo
        .tags
        .tag
        .into_iter()
        .map(|t| if t.raw.is_empty() { t.content } else { t.raw })
        .filter(|t| !t.is_empty())
        .collect();
    let page_url = photo
        .urls
        .url
        .into_iter()
        .find(|u| u.kind == "photopage")
        .map(|u| u.content);
    Ok(PhotoInfo {
        id: photo.id,
        title: photo.title.content,
        tags,
        page_url,
    })
}

fn parse_sizes(value: serde_json::Value) -> Result<Vec<PhotoSize>, RemoteError> {
    let SizesResponse { sizes } = decode(value)?;
    Ok(sizes
        .size
        .into_iter()
        .map(|s| PhotoSize {
            label: s.label,
            width: s.width,
            height: s.height,
            source: s.source,
        })
        .collect())
}

fn parse_search(value: serde_json::Value) -> Result<Vec<PhotoSummary>, RemoteError> {
    let SearchResponse { photos } = decode(value)?;
    Ok(photos
        .photo
        .into_iter()
        .map(|p| PhotoSummary {
            id: p.id,
            title: p.title,
            owner: p.owner,
            urls: p
                .rest
                .into_iter()
                .filter(|(k, _)| k.starts_with("url_"))
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                .collect(),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

/// Flickr REST API client.
pub struct FlickrClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl FlickrClient {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<serde_json::Value, RemoteError> {
        let mut query: Vec<(&str, &str)> = vec![
            ("method", method),
            ("api_key", &self.api_key),
            ("format", "json"),
            ("nojsoncallback", "1"),
        ];
        query.extend_from_slice(params);

        debug!(method, "flickr request");
        let value = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()?
            .error_for_status()?
            .json::<serde_json::Value>()?;
        Ok(value)
    }
}

impl PhotoApi for FlickrClient {
    fn search(&self, params: &SearchParams) -> Result<Vec<PhotoSummary>, RemoteError> {
        let per_page = params.per_page.to_string();
        let safe_search = params.safe_search.to_string();
        parse_search(self.call(
            "flickr.photos.search",
            &[
                ("text", &params.text),
                ("per_page", &per_page),
                ("safe_search", &safe_search),
                ("extras", &params.extras),
            ],
        )?)
    }

    fn get_info(&self, photo_id: &str) -> Result<PhotoInfo, RemoteError> {
        parse_info(self.call("flickr.photos.getInfo", &[("photo_id", photo_id)])?)
    }

    fn get_sizes(&self, photo_id: &str) -> Result<Vec<PhotoSize>, RemoteError> {
        parse_sizes(self.call("flickr.photos.getSizes", &[("photo_id", photo_id)])?)
    }
}

/// Used when no API key is configured: searches find nothing and every
/// photo lookup reports "not found".
pub struct OfflineApi;

impl PhotoApi for OfflineApi {
    fn search(&self, _params: &SearchParams) -> Result<Vec<PhotoSummary>, RemoteError> {
        Ok(Vec::new())
    }

    fn get_info(&self, _photo_id: &str) -> Result<PhotoInfo, RemoteError> {
        Err(offline())
    }

    fn get_sizes(&self, _photo_id: &str) -> Result<Vec<PhotoSize>, RemoteError> {
        Err(offline())
    }
}

fn offline() -> RemoteError {
    RemoteError::Status {
        code: 1,
        message: "remote API not configured".to_string(),
    }
}

/// Downloads a remote image.
pub trait Fetcher: Send + Sync {
    /// Stream the body at `url` into `out`, returning the byte count.
    fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<u64, RemoteError>;
}

/// Blocking HTTP downloader with a request timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<u64, RemoteError> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let bytes = response.copy_to(out)?;
        debug!(bytes, "downloaded remote original");
        Ok(bytes)
    }
}
