//! Image identifiers and the strings derived from them.
//!
//! An identifier names an image everywhere: it is the key in the metadata
//! store, the stem of the original file (`{id}.jpg`), the prefix of every
//! cache entry (`{id}_{effect}.jpg`), and, for remote images, the Flickr
//! photo id. Because ids flow straight into filesystem paths, every id that
//! reaches the pipeline is checked with [`is_path_safe_id`] first. Keys
//! already in the store are trusted beyond that; ids sent to the remote API
//! must also pass the stricter [`is_valid_id`].
//!
//! ## Upload identifiers
//!
//! Uploaded images get an id built from their title and content:
//!
//! ```text
//! "Sunset over bay" + <jpeg bytes>  →  "sunset-over-bay-3f9a0c12b4de"
//! ```
//!
//! The slug keeps ids readable in URLs; the content hash keeps two uploads
//! with the same title apart and makes re-uploading the same file idempotent.

use sha2::{Digest, Sha256};

const MAX_ID_LEN: usize = 128;
const MAX_SLUG_LEN: usize = 64;
const HASH_PREFIX_LEN: usize = 12;

/// Whether `id` is safe to use as a store key and file stem.
///
/// Accepts 1 to 128 ASCII alphanumerics, dashes and underscores. Anything
/// else (path separators, dots, whitespace) is rejected.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Whether `id` can name a file inside the images directory.
///
/// Rejects the empty id, path separators, NUL and `.`/`..` components.
/// Dots and spaces elsewhere are fine: `IMG 0042.v2` maps to `IMG 0042.v2.jpg`.
pub fn is_path_safe_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains(['/', '\\', '\0'])
        && !id.contains("..")
        && id != "."
}

/// Lowercase a title into a URL-safe slug.
///
/// - Non-alphanumeric characters become dashes
/// - Consecutive dashes collapse into one
/// - Leading and trailing dashes are stripped
/// - Long slugs are cut at the last dash before the limit
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');

    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}

/// SHA-256 of a byte payload as lowercase hex.
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Derive the identifier for an uploaded image.
pub fn upload_id(title: &str, data: &[u8]) -> String {
    let hash = content_hash(data);
    let short = &hash[..HASH_PREFIX_LEN];
    let slug = slugify(title);
    if slug.is_empty() {
        short.to_string()
    } else {
        format!("{slug}-{short}")
    }
}

/// Split a comma-separated tag string into trimmed, non-empty tags.
///
/// Order is preserved and case is left alone; search lowercases at query time.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
