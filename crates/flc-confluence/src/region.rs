//! Managed region of a page body.
//!
//! The publisher owns only the part of a page between two anchor macros.
//! Anything an editor adds around them survives every upload.

use flc_config::MarkupConfig;

use crate::error::ReconcileError;
use crate::markup::{self, Document, NodeId};

/// Page body split around the managed region. Marker macros are excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRegions {
    /// Markup preceding the start marker.
    pub before: String,
    /// Markup between the markers.
    pub managed: String,
    /// Markup following the end marker.
    pub after: String,
}

impl PageRegions {
    /// Split a stored page body into its three regions.
    ///
    /// - Both markers found: content before, between and after them.
    /// - Only the start marker: `managed` is empty and everything after the
    ///   start marker goes to `after`.
    /// - No start marker: the whole body is `managed`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if the body cannot be parsed.
    pub fn extract(source: &str, markup: &MarkupConfig) -> Result<Self, ReconcileError> {
        let doc = markup::parse(source)?;
        let (open, close) = find_markers(&doc, markup);

        let regions = match (open, close) {
            (Some(open), Some(close)) => Self {
                before: serialize_siblings(&doc, ..index(&doc, open)),
                managed: serialize_siblings(&doc, index(&doc, open) + 1..index(&doc, close)),
                after: serialize_siblings(&doc, index(&doc, close) + 1..),
            },
            (Some(open), None) => {
                tracing::debug!("Start marker without end marker, managed region is empty");
                Self {
                    before: serialize_siblings(&doc, ..index(&doc, open)),
                    managed: String::new(),
                    after: serialize_siblings(&doc, index(&doc, open) + 1..),
                }
            }
            (None, _) => Self::unmanaged(markup::serialize(&doc)),
        };
        Ok(regions)
    }

    /// Regions of a body that has never been published: all of it is managed.
    #[must_use]
    pub fn unmanaged(body: String) -> Self {
        Self {
            before: String::new(),
            managed: body,
            after: String::new(),
        }
    }

    /// Build the body to upload: surrounding regions with `content` framed
    /// by fresh start and end markers.
    #[must_use]
    pub fn wrap(&self, content: &str, markup: &MarkupConfig) -> String {
        let start = anchor_macro(markup.open_marker());
        let end = anchor_macro(markup.close_marker());
        let mut body = String::with_capacity(
            self.before.len() + start.len() + content.len() + end.len() + self.after.len(),
        );
        body.push_str(&self.before);
        body.push_str(&start);
        body.push_str(content);
        body.push_str(&end);
        body.push_str(&self.after);
        body
    }
}

/// Anchor macro used as a region marker.
#[must_use]
pub fn anchor_macro(name: &str) -> String {
    format!(
        r#"<ac:structured-macro ac:macro-id="0" ac:name="anchor" ac:schema-version="1"><ac:parameter ac:name="">{}</ac:parameter></ac:structured-macro>"#,
        markup::escape_xml(name, false)
    )
}

/// Top-level ancestors of the first start marker and the first end marker
/// after it. An end marker sharing the start marker's ancestor is ignored.
fn find_markers(doc: &Document, markup: &MarkupConfig) -> (Option<NodeId>, Option<NodeId>) {
    let mut open = None;
    let mut close = None;

    for node in doc.descendants(doc.root()) {
        let is_macro = doc.tag(node).is_some_and(|t| t.ends_with("structured-macro"));
        if !is_macro {
            continue;
        }
        let Some(name) = anchor_name(doc, node) else {
            continue;
        };
        let is_open = markup.open_markers.iter().any(|m| m.eq_ignore_ascii_case(&name));
        if open.is_none() && is_open {
            open = Some(node);
        } else if markup.close_markers.iter().any(|m| m.eq_ignore_ascii_case(&name)) {
            close = Some(node);
            break;
        }
    }

    let top_open = open.and_then(|n| doc.top_level_ancestor(n));
    let top_close = close.and_then(|n| doc.top_level_ancestor(n));
    if top_open.is_some() && top_open == top_close {
        return (top_open, None);
    }
    (top_open, top_close)
}

/// Lower-cased text of the macro's first `ac:parameter` child.
fn anchor_name(doc: &Document, node: NodeId) -> Option<String> {
    doc.children(node)
        .iter()
        .find(|&&c| doc.is_element(c, "ac:parameter"))
        .map(|&p| doc.text_content(p).trim().to_lowercase())
}

fn index(doc: &Document, node: NodeId) -> usize {
    doc.index_in_parent(node).unwrap_or_default()
}

fn serialize_siblings(
    doc: &Document,
    range: impl std::slice::SliceIndex<[NodeId], Output = [NodeId]>,
) -> String {
    let children = doc.children(doc.root());
    children
        .get(range)
        .unwrap_or_default()
        .iter()
        .map(|&c| markup::serialize_node(doc, c))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn markup() -> MarkupConfig {
        MarkupConfig::default()
    }

    #[test]
    fn test_extract_without_markers() {
        let regions = PageRegions::extract("<p>Hello</p><p>World</p>", &markup()).unwrap();

        assert_eq!(regions.before, "");
        assert_eq!(regions.managed, "<p>Hello</p><p>World</p>");
        assert_eq!(regions.after, "");
    }

    #[test]
    fn test_extract_both_markers() {
        let source = format!(
            "<p>Intro</p>{}<p>Generated</p>{}<p>Outro</p>",
            anchor_macro("foliant_start"),
            anchor_macro("foliant_end")
        );
        let regions = PageRegions::extract(&source, &markup()).unwrap();

        assert_eq!(regions.before, "<p>Intro</p>");
        assert_eq!(regions.managed, "<p>Generated</p>");
        assert_eq!(regions.after, "<p>Outro</p>");
    }

    #[test]
    fn test_extract_markers_nested_in_paragraphs() {
        let source = format!(
            "<p>Intro</p><p>{}</p><h1>Title</h1><p>{}</p><p>Outro</p>",
            anchor_macro("FOLIANT"),
            anchor_macro("foliant_finish")
        );
        let regions = PageRegions::extract(&source, &markup()).unwrap();

        assert_eq!(regions.before, "<p>Intro</p>");
        assert_eq!(regions.managed, "<h1>Title</h1>");
        assert_eq!(regions.after, "<p>Outro</p>");
    }

    #[test]
    fn test_extract_only_start_marker() {
        let source = format!("<p>Intro</p>{}<p>Rest</p>", anchor_macro("foliant"));
        let regions = PageRegions::extract(&source, &markup()).unwrap();

        assert_eq!(regions.before, "<p>Intro</p>");
        assert_eq!(regions.managed, "");
        assert_eq!(regions.after, "<p>Rest</p>");
    }

    #[test]
    fn test_extract_markers_in_same_block() {
        let source = format!(
            "<p>{}middle{}</p><p>Rest</p>",
            anchor_macro("foliant_start"),
            anchor_macro("foliant_end")
        );
        let regions = PageRegions::extract(&source, &markup()).unwrap();

        assert_eq!(regions.before, "");
        assert_eq!(regions.managed, "");
        assert_eq!(regions.after, "<p>Rest</p>");
    }

    #[test]
    fn test_extract_keeps_editor_entities_and_empty_cells() {
        let source = format!(
            "<p>Caf&eacute; &uuml;ber</p><table><tr><td></td></tr></table>{}<p>Generated</p>{}<p>na&iuml;ve &amp; co</p>",
            anchor_macro("foliant_start"),
            anchor_macro("foliant_end")
        );
        let regions = PageRegions::extract(&source, &markup()).unwrap();

        assert_eq!(
            regions.before,
            "<p>Caf\u{e9} \u{fc}ber</p><table><tr><td></td></tr></table>"
        );
        assert_eq!(regions.after, "<p>na\u{ef}ve &amp; co</p>");
    }

    #[test]
    fn test_other_macros_ignored() {
        let source = r#"<ac:structured-macro ac:name="info"><ac:parameter ac:name="title">note</ac:parameter></ac:structured-macro><p>x</p>"#;
        let regions = PageRegions::extract(source, &markup()).unwrap();

        assert_eq!(regions.managed, source);
    }

    #[test]
    fn test_wrap_then_extract_round_trips() {
        let first = PageRegions::extract("<p>Old</p>", &markup()).unwrap();
        let body = PageRegions {
            before: "<p>Manual header</p>".to_owned(),
            after: "<p>Manual footer</p>".to_owned(),
            ..first
        }
        .wrap("<p>New <strong>content</strong></p>", &markup());

        let again = PageRegions::extract(&body, &markup()).unwrap();

        assert_eq!(again.before, "<p>Manual header</p>");
        assert_eq!(again.managed, "<p>New <strong>content</strong></p>");
        assert_eq!(again.after, "<p>Manual footer</p>");
        assert_eq!(again.wrap(&again.managed, &markup()), body);
    }

    #[test]
    fn test_wrap_writes_first_marker_names() {
        let body = PageRegions::default().wrap("<p>x</p>", &markup());

        assert!(body.starts_with(&anchor_macro("foliant_start")));
        assert!(body.ends_with(&anchor_macro("foliant_end")));
    }
}
