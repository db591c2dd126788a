//! Raw storage-format markup kept away from the converter.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

/// Tag whose body is passed through unchanged.
const RAW_TAG: &str = "raw_confluence";

/// Opening tag of a raw block or of any `ac:` element.
static OPEN_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(raw_confluence|ac:[^\s<>/]+)(?:\s[^<>]*)?>").expect("invalid raw tag regex")
});

/// Placeholder left in the Markdown for an escaped block.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[confluence_escaped hash=%(?P<hash>[0-9a-f]+?)%\]")
        .expect("invalid placeholder regex")
});

/// Escaped blocks keyed by the hex SHA-256 of their content.
#[derive(Debug, Default)]
pub struct RawBlocks {
    blocks: HashMap<String, String>,
}

impl RawBlocks {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct escaped blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether nothing was escaped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Replace raw blocks in `source` with placeholders.
    ///
    /// `<raw_confluence>` keeps only its body; an `ac:` element is kept
    /// whole, including its tags. Elements without a closing tag stay in
    /// the text.
    pub fn escape(&mut self, source: &str) -> String {
        let mut out = String::with_capacity(source.len());
        let mut pos = 0;

        while let Some(open) = OPEN_TAG_RE.captures_at(source, pos) {
            let Some(whole) = open.get(0) else {
                break;
            };
            let tag = &open[1];
            let self_closing = whole.as_str().ends_with("/>");
            let close = if self_closing {
                None
            } else {
                find_close(source, tag, whole.end())
            };
            let Some((body_end, close_end)) = close else {
                out.push_str(&source[pos..whole.end()]);
                pos = whole.end();
                continue;
            };

            let content = if tag == RAW_TAG {
                &source[whole.end()..body_end]
            } else {
                &source[whole.start()..close_end]
            };
            out.push_str(&source[pos..whole.start()]);
            out.push_str(&self.store(content));
            pos = close_end;
        }

        out.push_str(&source[pos..]);
        out
    }

    /// Put escaped blocks back in place of their placeholders.
    ///
    /// Unknown placeholders are left untouched.
    #[must_use]
    pub fn restore(&self, converted: &str) -> String {
        PLACEHOLDER_RE
            .replace_all(converted, |caps: &Captures<'_>| {
                let hash = &caps["hash"];
                if let Some(content) = self.blocks.get(hash) {
                    tracing::debug!(hash = %hash, "Restoring escaped block");
                    content.clone()
                } else {
                    tracing::warn!(hash = %hash, "No escaped block for placeholder");
                    caps[0].to_owned()
                }
            })
            .into_owned()
    }

    fn store(&mut self, content: &str) -> String {
        let hash = hex::encode(Sha256::digest(content.as_bytes()));
        tracing::debug!(hash = %hash, len = content.len(), "Escaping raw block");
        let placeholder = format!("[confluence_escaped hash=%{hash}%]");
        self.blocks.insert(hash, content.to_owned());
        placeholder
    }
}

/// Start and end of the closing tag matching an element opened before
/// `from`. Nested elements with the same name are skipped.
fn find_close(source: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut depth = 1usize;
    let mut pos = from;

    loop {
        let next_close = source[pos..].find(&close)? + pos;
        let next_open = source[pos..next_close]
            .match_indices(&open)
            .map(|(i, _)| i + pos)
            .find(|&i| opens_element(source, i + open.len()));

        if let Some(start) = next_open {
            let tag_end = source[start..].find('>').map_or(source.len(), |i| start + i);
            if !source[..tag_end].ends_with('/') {
                depth += 1;
            }
            pos = tag_end;
            continue;
        }

        depth -= 1;
        if depth == 0 {
            return Some((next_close, next_close + close.len()));
        }
        pos = next_close + close.len();
    }
}

/// Whether the character after a tag name ends the name.
fn opens_element(source: &str, after_name: usize) -> bool {
    source[after_name..]
        .chars()
        .next()
        .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
}
