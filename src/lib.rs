//! # fx-gal
//!
//! An image gallery that serves local uploads and Flickr photos side by side,
//! with a small set of effects rendered on first request and cached on disk.
//!
//! # Architecture: Resolve, Then Render
//!
//! Every request goes through the same two steps:
//!
//! ```text
//! 1. Resolve   id            →  Descriptor     (local store first, then Flickr)
//! 2. Render    Descriptor    →  Rendition      (original, cached, or created now)
//! ```
//!
//! A [`resolve::Descriptor`] is the single shape both sources are normalized
//! to, so the cache, search and output code never branch on where an image
//! came from except to pick where the original bytes live.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`gallery`] | One handle over everything; one method per user request |
//! | [`resolve`] | Id → [`resolve::Descriptor`], local metadata first, Flickr second |
//! | [`cache`] | Lazily renders effects into `images/cache/`, fetching remote originals |
//! | [`search`] | Keyword match over local titles and tags, plus Flickr text search |
//! | [`upload`] | Validates, names, stores and records a new local image |
//! | [`store`] | The JSON metadata file (`id → {title, tags}`) with atomic rewrites |
//! | [`remote`] | Flickr REST client and the HTTP fetcher for original bytes |
//! | [`imaging`] | Pure-Rust effect engine: grayscale, negative, sepia, thumbnail |
//! | [`layout`] | Where originals and renditions live on disk and at which URL |
//! | [`naming`] | Id validation, slugs, content hashes and tag parsing |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`error`] | Request-level error taxonomy with user-facing messages |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Cache Keys Are Paths
//!
//! A rendition is identified by `(id, effect)` and lives at
//! `images/cache/{id}_{effect}.jpg`. Existence of that file is the cache: there
//! is no index to get out of sync, and clearing the cache is `rm -r`. Writes go
//! through a temp file and rename, so a half-written rendition is never served.
//!
//! ## Two Network Seams
//!
//! Talking to Flickr ([`remote::PhotoApi`]) and downloading bytes
//! ([`remote::Fetcher`]) are separate traits. Tests replace both with counting
//! doubles, which is how "a cached rendition is never fetched twice" is checked
//! without a network.
//!
//! ## Pure-Rust Imaging
//!
//! Effects use the `image` crate only. No ImageMagick, no system libraries; the
//! binary is self-contained.

pub mod cache;
pub mod config;
pub mod error;
pub mod gallery;
pub mod imaging;
pub mod layout;
pub mod naming;
pub mod output;
pub mod remote;
pub mod resolve;
pub mod search;
pub mod store;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
