//! Text normalization and content digests.
//!
//! ## Line-set model
//!
//! Code and business logic are compared as **sets of lines**, never by
//! sequence alignment. The canonical line set of a text is computed as:
//!
//! ```text
//! line_set(text) = { trim_end(l) | l in lines(normalize_newlines(text)), trim(l) != "" }
//! ```
//!
//! Where:
//! - `normalize_newlines`: CRLF → LF, CR → LF
//! - `trim_end`: trailing whitespace is not significant
//! - blank lines are dropped
//!
//! Leading indentation is kept: re-indenting a line counts as changing it.
//!
//! ## Digests
//!
//! Content digests are SHA-256 over the newline-normalized text, returned as
//! lowercase hex. They are reporting aids; equality decisions compare the
//! content itself.

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// CRLF and lone CR become LF; nothing else changes.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Normalize newlines and trim surrounding whitespace.
///
/// Used for digests only. Line sets never trim the whole text, so the
/// indentation of the first line survives.
///
/// ```rust
/// use reconcile_kernel::content::normalize_text;
///
/// assert_eq!(normalize_text("  a\r\nb  "), "a\nb");
/// ```
pub fn normalize_text(text: &str) -> String {
    normalize_newlines(text).trim().to_string()
}

/// Canonical line set of a text.
///
/// A line's canonical form does not depend on its position.
pub fn line_set(text: &str) -> BTreeSet<String> {
    normalize_newlines(text)
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonical line set of an optional text; absent text has no lines.
pub fn optional_line_set(text: Option<&str>) -> BTreeSet<String> {
    text.map(line_set).unwrap_or_default()
}

/// SHA-256 of arbitrary bytes as lowercase hex.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 of the newline-normalized text as lowercase hex.
pub fn text_digest(text: &str) -> String {
    digest_bytes(normalize_text(text).as_bytes())
}
