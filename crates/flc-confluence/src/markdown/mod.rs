//! Markdown preparation before external conversion.
//!
//! Constructs with a direct storage-format counterpart are rendered here and
//! hidden from the converter:
//!
//! 1. Optional removal of the leading heading ([`crop_title`])
//! 2. Source normalization ([`normalize`])
//! 3. Fenced code blocks to `code` macros ([`code_blocks`])
//! 4. Task lists to `ac:task-list` markup ([`tasks`])
//! 5. Raw blocks swapped for placeholders ([`RawBlocks`])
//!
//! After conversion, [`RawBlocks::restore`] puts the hidden markup back.

pub mod code_blocks;
mod raw;
pub mod tasks;

use std::sync::LazyLock;

use flc_config::{CodeBlocksConfig, PublishConfig};
use regex::Regex;

pub use raw::RawBlocks;

/// ATX heading at the very start of the text.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6} .+").expect("invalid heading regex"));

/// Spaces at the end of a line.
static TRAILING_SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +\n").expect("invalid trailing spaces regex"));

/// Markdown ready for conversion.
#[derive(Debug)]
pub struct PreparedMarkdown {
    /// Source with raw markup replaced by placeholders.
    pub markdown: String,
    /// Markup hidden from the converter.
    pub raw: RawBlocks,
}

/// Run every preparation step.
#[must_use]
pub fn prepare(
    source: &str,
    publish: &PublishConfig,
    codeblocks: &CodeBlocksConfig,
) -> PreparedMarkdown {
    let source = if publish.nohead {
        crop_title(source)
    } else {
        source
    };
    let processed = normalize(source);
    let processed = code_blocks::process_code_blocks(&processed, codeblocks);
    let processed = tasks::process_task_lists(&processed);

    let mut raw = RawBlocks::new();
    let markdown = raw.escape(&processed);
    tracing::debug!(escaped = raw.len(), "Prepared markdown for conversion");

    PreparedMarkdown { markdown, raw }
}

/// Drop the first line if the document starts with a heading.
///
/// Leading whitespace is ignored when looking for the heading. Documents not
/// starting with one are returned as is.
#[must_use]
pub fn crop_title(source: &str) -> &str {
    let trimmed = source.trim_start();
    if !HEADING_RE.is_match(trimmed) {
        return source;
    }
    match trimmed.find('\n') {
        Some(pos) => &trimmed[pos + 1..],
        None => "",
    }
}

/// Normalize line endings and whitespace.
///
/// CRLF and CR become LF, tabs become four spaces, trailing spaces are
/// removed from every line and the text ends with exactly one newline.
#[must_use]
pub fn normalize(source: &str) -> String {
    if source.is_empty() {
        return String::new();
    }
    let text = source
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', "    ");
    let mut text = text.trim_end_matches([' ', '\n']).to_owned();
    text.push('\n');
    TRAILING_SPACES_RE.replace_all(&text, "\n").into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_crop_title_removes_heading_line() {
        assert_eq!(crop_title("\n\n# Title\nBody\n"), "Body\n");
        assert_eq!(crop_title("### Deep\n\nText"), "\nText");
    }

    #[test]
    fn test_crop_title_heading_only() {
        assert_eq!(crop_title("# Title"), "");
    }

    #[test]
    fn test_crop_title_without_heading() {
        assert_eq!(crop_title("Text\n# Later"), "Text\n# Later");
        assert_eq!(crop_title("#NoSpace\n"), "#NoSpace\n");
        assert_eq!(crop_title("####### Seven\n"), "####### Seven\n");
    }

    #[test]
    fn test_normalize_line_endings_and_tabs() {
        assert_eq!(normalize("a\r\nb\rc\td"), "a\nb\nc    d\n");
    }

    #[test]
    fn test_normalize_trailing_whitespace() {
        assert_eq!(normalize("line   \nnext  \n\n\n  \n"), "line\nnext\n");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n "), "\n");
    }

    #[test]
    fn test_prepare_hides_generated_markup() {
        let source = "# Title\n\nText\n\n```python\nprint(1)\n```\n\n- [ ] todo\n";
        let publish = PublishConfig {
            nohead: true,
            ..PublishConfig::default()
        };

        let prepared = prepare(source, &publish, &CodeBlocksConfig::default());

        assert!(!prepared.markdown.contains("# Title"));
        assert!(!prepared.markdown.contains("<ac:"));
        assert!(prepared.markdown.contains("[confluence_escaped hash=%"));
        assert_eq!(prepared.raw.len(), 2);

        let restored = prepared.raw.restore(&prepared.markdown);
        assert!(restored.contains(r#"<ac:parameter ac:name="language">py</ac:parameter>"#));
        assert!(restored.contains("<ac:task-status>incomplete</ac:task-status>"));
    }
}
