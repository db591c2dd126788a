//! Content fingerprint stored alongside published pages.
//!
//! The fingerprint of the last upload lives in a page property. A page whose
//! stored fingerprint matches the new content is not written again, so
//! watchers get no notification and the page history stays clean.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of the page content followed by its title.
#[must_use]
pub fn content_fingerprint(content: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(title.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether the page has to be written.
///
/// True when the page does not exist yet, carries no fingerprint, or its
/// fingerprint differs from the one of `content` and `title`.
#[must_use]
pub fn needs_update(page_exists: bool, stored: Option<&str>, content: &str, title: &str) -> bool {
    if !page_exists {
        tracing::debug!("Page does not exist, it will be created");
        return true;
    }
    let Some(stored) = stored else {
        tracing::debug!("Page has no content fingerprint");
        return true;
    };
    let current = content_fingerprint(content, title);
    tracing::debug!(stored = %stored, current = %current, "Comparing content fingerprints");
    stored != current
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let hash = content_fingerprint("", "");

        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fingerprint_covers_content_then_title() {
        assert_eq!(content_fingerprint("ab", "c"), content_fingerprint("a", "bc"));
        assert_ne!(content_fingerprint("<p>a</p>", "One"), content_fingerprint("<p>a</p>", "Two"));
    }

    #[test]
    fn test_needs_update_missing_page() {
        assert!(needs_update(false, None, "<p>a</p>", "T"));
        let hash = content_fingerprint("<p>a</p>", "T");
        assert!(needs_update(false, Some(&hash), "<p>a</p>", "T"));
    }

    #[test]
    fn test_needs_update_missing_hash() {
        assert!(needs_update(true, None, "<p>a</p>", "T"));
    }

    #[test]
    fn test_needs_update_compares_hash() {
        let hash = content_fingerprint("<p>a</p>", "T");

        assert!(!needs_update(true, Some(&hash), "<p>a</p>", "T"));
        assert!(needs_update(true, Some(&hash), "<p>b</p>", "T"));
        assert!(needs_update(true, Some(&hash), "<p>a</p>", "Renamed"));
    }
}
