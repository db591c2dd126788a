//! Clean-up applied to converted content before upload.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ReconcileError;
use crate::markup;

/// Table of contents macro placed at the top of the page.
const TOC_MACRO: &str = r#"<ac:structured-macro ac:macro-id="1" ac:name="toc" ac:schema-version="1" />"#;

/// Leading newline, or any trailing run of newlines with indentation.
static FORMATTING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\n|(\n\s*)+$").expect("invalid formatting regex"));

/// Prepend a table of contents macro.
#[must_use]
pub fn add_toc(content: &str) -> String {
    format!("{TOC_MACRO}\n{content}")
}

/// Strip formatting whitespace around tags.
///
/// Confluence Cloud renders the newlines a converter puts between block
/// tags. Every text node loses a leading newline and any trailing
/// newline-and-indentation; CDATA sections are left alone.
///
/// # Errors
///
/// Returns [`ReconcileError`] if the content is not well-formed.
pub fn unformat(content: &str) -> Result<String, ReconcileError> {
    let mut doc = markup::parse(content)?;
    let mut changed = 0usize;
    for run in doc.text_runs() {
        let Some(text) = doc.text(run) else {
            continue;
        };
        if !FORMATTING_RE.is_match(text) {
            continue;
        }
        let cleaned = FORMATTING_RE.replace_all(text, "").into_owned();
        doc.set_text(run, cleaned);
        changed += 1;
    }
    tracing::debug!(changed, "Removed formatting whitespace");
    Ok(markup::serialize(&doc))
}
