//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Each entity leads with its positional index and title. Ids, URLs and
//! image details follow as indented context lines, so output reads as an
//! inventory while still letting users copy an id into the next command.
//!
//! # Output Format
//!
//! ## Search
//!
//! ```text
//! Local (1 match)
//! 001 Sunset over bay (2 hits)
//!     Id: sunset-over-bay-3f9a0c12b4de
//!     Tags: beach, evening
//!
//! Remote (2 results)
//! 001 Harbour at dusk
//!     Id: 52836412311
//!     Thumbnail: https://live.staticflickr.com/.../52836412311_q.jpg
//! 002 (untitled)
//!     Id: 52836412399
//! ```
//!
//! ## Show
//!
//! ```text
//! Sunset over bay
//!     Id: sunset-over-bay-3f9a0c12b4de
//!     Source: local
//!     Tags: beach, evening
//!     Effect: sepia (created)
//!     Url: /static/images/cache/sunset-over-bay-3f9a0c12b4de_sepia.jpg
//!     Image: 640x480 JPEG RGB
//! ```
//!
//! ## Warm
//!
//! ```text
//! 001 sunset-over-bay-3f9a0c12b4de
//!     sepia: created
//!     thumbnail: cached
//!
//! Cache: 1 cached, 1 created (2 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::Origin;
use crate::gallery::{DetailView, WarmReport};
use crate::imaging::ImageInfo;
use crate::resolve::Descriptor;
use crate::search::SearchResults;
use crate::upload::Uploaded;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Titled entries show the title, untitled ones a placeholder.
///
/// ```text
/// 001 Harbour at dusk
/// 002 (untitled)
/// ```
fn entry_line(index: usize, title: &str) -> String {
    if title.trim().is_empty() {
        format!("{} (untitled)", format_index(index))
    } else {
        format!("{} {}", format_index(index), truncate(title, 60))
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

fn tags_line(tags: &[String]) -> Option<String> {
    (!tags.is_empty()).then(|| format!("{}Tags: {}", indent(1), tags.join(", ")))
}

fn info_summary(info: &ImageInfo) -> String {
    format!("{}x{} {} {}", info.width, info.height, info.format, info.color)
}

fn origin_label(origin: Origin) -> &'static str {
    match origin {
        Origin::Original => "original",
        Origin::Cached => "cached",
        Origin::Created => "created",
    }
}

fn descriptor_lines(index: usize, descriptor: &Descriptor) -> Vec<String> {
    let mut lines = vec![
        entry_line(index, descriptor.title()),
        format!("{}Id: {}", indent(1), descriptor.id()),
    ];
    lines.extend(tags_line(descriptor.tags()));
    lines.push(format!("{}Url: {}", indent(1), descriptor.url()));
    lines
}

// ============================================================================
// Search
// ============================================================================

/// Format search results: local matches first, then remote results.
pub fn format_search_output(results: &SearchResults) -> Vec<String> {
    let mut lines = Vec::new();

    if results.local.is_empty() {
        lines.push("Local: no matches".to_string());
    } else {
        lines.push(format!(
            "Local ({})",
            plural(results.local.len(), "match", "matches")
        ));
        for (i, hit) in results.local.iter().enumerate() {
            lines.push(format!(
                "{} ({})",
                entry_line(i + 1, hit.descriptor.title()),
                plural(hit.hits, "hit", "hits")
            ));
            lines.push(format!("{}Id: {}", indent(1), hit.descriptor.id()));
            lines.extend(tags_line(hit.descriptor.tags()));
        }
    }

    lines.push(String::new());

    if results.remote.is_empty() {
        lines.push("Remote: no results".to_string());
    } else {
        lines.push(format!(
            "Remote ({})",
            plural(results.remote.len(), "result", "results")
        ));
        for (i, photo) in results.remote.iter().enumerate() {
            lines.push(entry_line(i + 1, &photo.title));
            lines.push(format!("{}Id: {}", indent(1), photo.id));
            if let Some(url) = photo.thumbnail_url() {
                lines.push(format!("{}Thumbnail: {}", indent(1), url));
            }
        }
    }

    lines
}

pub fn print_search_output(results: &SearchResults) {
    for line in format_search_output(results) {
        println!("{}", line);
    }
}

// ============================================================================
// Show
// ============================================================================

/// Format the detail view of one image.
pub fn format_detail_output(view: &DetailView) -> Vec<String> {
    let d = &view.descriptor;
    let title = if d.title().trim().is_empty() {
        "(untitled)"
    } else {
        d.title()
    };
    let mut lines = vec![
        title.to_string(),
        format!("{}Id: {}", indent(1), d.id()),
        format!(
            "{}Source: {}",
            indent(1),
            if d.is_remote() { "remote" } else { "local" }
        ),
    ];
    if let Some(page) = d.page_url() {
        lines.push(format!("{}Page: {}", indent(1), page));
    }
    lines.extend(tags_line(d.tags()));

    if view.fell_back {
        lines.push(format!(
            "{}Effect: failed, showing original",
            indent(1)
        ));
    } else {
        lines.push(format!(
            "{}Effect: {} ({})",
            indent(1),
            view.rendition.effect,
            origin_label(view.rendition.origin)
        ));
    }
    lines.push(format!("{}Url: {}", indent(1), view.rendition.url));
    if let Some(info) = &view.info {
        lines.push(format!("{}Image: {}", indent(1), info_summary(info)));
    }
    lines
}

pub fn print_detail_output(view: &DetailView) {
    for line in format_detail_output(view) {
        println!("{}", line);
    }
}

// ============================================================================
// Upload
// ============================================================================

pub fn format_upload_output(uploaded: &Uploaded) -> Vec<String> {
    let verb = if uploaded.replaced {
        "Replaced"
    } else {
        "Uploaded"
    };
    let mut lines = vec![
        format!("{} {}", verb, uploaded.descriptor.title()),
        format!("{}Id: {}", indent(1), uploaded.id()),
    ];
    lines.extend(tags_line(uploaded.descriptor.tags()));
    lines.push(format!("{}Url: {}", indent(1), uploaded.descriptor.url()));
    lines.push(format!(
        "{}Image: {}",
        indent(1),
        info_summary(&uploaded.info)
    ));
    lines
}

pub fn print_upload_output(uploaded: &Uploaded) {
    for line in format_upload_output(uploaded) {
        println!("{}", line);
    }
}

// ============================================================================
// Featured
// ============================================================================

pub fn format_featured_output(featured: &[Descriptor]) -> Vec<String> {
    if featured.is_empty() {
        return vec!["No local images yet".to_string()];
    }
    let mut lines = vec!["Featured".to_string()];
    for (i, d) in featured.iter().enumerate() {
        lines.extend(descriptor_lines(i + 1, d));
    }
    lines
}

pub fn print_featured_output(featured: &[Descriptor]) {
    for line in format_featured_output(featured) {
        println!("{}", line);
    }
}

// ============================================================================
// Warm
// ============================================================================

/// Format a warm-up report, grouping effects under their image id.
pub fn format_warm_output(report: &WarmReport) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<&str> = None;
    let mut index = 0;

    for r in &report.results {
        if current != Some(r.id.as_str()) {
            index += 1;
            current = Some(r.id.as_str());
            lines.push(format!("{} {}", format_index(index), r.id));
        }
        let status = match &r.result {
            Ok(rendition) => origin_label(rendition.origin).to_string(),
            Err(e) => format!("failed ({})", e),
        };
        lines.push(format!("{}{}: {}", indent(1), r.effect, status));
    }

    if !report.unresolved.is_empty() {
        lines.push(String::new());
        lines.push("Unresolved".to_string());
        for (id, e) in &report.unresolved {
            lines.push(format!("{}{}: {}", indent(1), id, e.user_message()));
        }
    }

    lines.push(String::new());
    lines.push(format!("Cache: {}", report.stats));
    lines
}

pub fn print_warm_output(report: &WarmReport) {
    for line in format_warm_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
