//! Inline comment extraction from the previous page version.
//!
//! Every comment marker is unwrapped into the text around it, so the old
//! tree ends up with the same shape as freshly converted content. The text
//! run that replaces a marker becomes the comment's key.

use flc_config::MarkupConfig;

use super::UnmatchedComment;
use crate::markup::{Document, NodeId, NodeKind};

/// Text next to a comment marker, or an earlier comment that shares the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// Plain text up to the neighboring markup.
    Text(String),
    /// A comment whose run this comment absorbed.
    Nested(Box<CommentAnchor>),
}

/// One inline comment of the old version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentAnchor {
    /// Comment reference id.
    pub ref_id: String,
    /// Text the marker wrapped.
    pub anchor_text: String,
    /// Marker attributes as stored on the server.
    pub attrs: Vec<(String, String)>,
    /// What preceded the marker in its run.
    pub before: Option<Context>,
    /// What followed the marker in its run.
    pub after: Option<Context>,
}

impl CommentAnchor {
    /// This comment and all comments nested in it, in document order.
    #[must_use]
    pub fn chain(&self) -> Vec<&CommentAnchor> {
        let mut out = Vec::new();
        if let Some(Context::Nested(inner)) = &self.before {
            out.extend(inner.chain());
        }
        out.push(self);
        if let Some(Context::Nested(inner)) = &self.after {
            out.extend(inner.chain());
        }
        out
    }

    /// Distinct reference ids of [`chain`](Self::chain), in document order.
    #[must_use]
    pub fn ref_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for anchor in self.chain() {
            if !ids.contains(&anchor.ref_id.as_str()) {
                ids.push(&anchor.ref_id);
            }
        }
        ids
    }

    /// Full text of the run the comment was unwrapped into.
    #[must_use]
    pub fn run_text(&self) -> String {
        let mut text = String::new();
        if let Some(before) = &self.before {
            text.push_str(&context_text(before));
        }
        text.push_str(&self.anchor_text);
        if let Some(after) = &self.after {
            text.push_str(&context_text(after));
        }
        text
    }
}

fn context_text(context: &Context) -> String {
    match context {
        Context::Text(text) => text.clone(),
        Context::Nested(anchor) => anchor.run_text(),
    }
}

/// Comment keyed by the old text run it was unwrapped into.
#[derive(Debug, Clone)]
pub struct LocatedComment {
    /// Run in the flattened old document.
    pub run: NodeId,
    /// The comment, with any comments absorbed into the same run.
    pub anchor: CommentAnchor,
}

/// Outcome of flattening the old document.
#[derive(Debug)]
pub struct Located {
    /// Old document with every supported marker unwrapped.
    pub doc: Document,
    /// Comments in document order of their runs.
    pub comments: Vec<LocatedComment>,
    /// Markers wrapping markup instead of text.
    pub malformed: Vec<UnmatchedComment>,
}

/// Unwrap every comment marker of a copy of `old`.
#[must_use]
pub fn locate_comments(old: &Document, markup: &MarkupConfig) -> Located {
    let mut doc = old.clone();
    remove_outer_resolved(&mut doc, markup);

    let mut comments: Vec<LocatedComment> = Vec::new();
    let mut malformed = Vec::new();

    for marker in doc.elements_by_tag(&markup.comment_tag) {
        let Some(ref_id) = doc.attr(marker, &markup.comment_ref_attr).map(str::to_owned) else {
            tracing::warn!("Comment marker without reference id, skipping");
            continue;
        };

        let anchor_text = match doc.children(marker) {
            [] => String::new(),
            [only] if doc.is_text(*only) => doc.text(*only).unwrap_or_default().to_owned(),
            _ => {
                tracing::debug!(ref_id = %ref_id, "Comment marker wraps markup, skipping");
                malformed.push(UnmatchedComment {
                    text: doc.text_content(marker),
                    ref_id,
                });
                continue;
            }
        };

        let before_run = doc.previous_sibling(marker).filter(|&n| doc.is_text(n));
        let after_run = doc.next_sibling(marker).filter(|&n| doc.is_text(n));

        let before = before_run.map(|run| {
            if let Some(pos) = comments.iter().position(|c| c.run == run) {
                Context::Nested(Box::new(comments.remove(pos).anchor))
            } else {
                Context::Text(doc.text(run).unwrap_or_default().to_owned())
            }
        });
        let after = after_run.map(|run| Context::Text(doc.text(run).unwrap_or_default().to_owned()));

        let anchor = CommentAnchor {
            attrs: marker_attrs(&doc, marker),
            ref_id,
            anchor_text,
            before,
            after,
        };

        let joined = doc.create_text(anchor.run_text());
        doc.replace_with(marker, &[joined]);
        for run in before_run.into_iter().chain(after_run) {
            doc.detach(run);
        }

        comments.push(LocatedComment {
            run: joined,
            anchor,
        });
    }

    tracing::debug!(
        count = comments.len(),
        malformed = malformed.len(),
        "Collected comments from old content"
    );

    Located {
        doc,
        comments,
        malformed,
    }
}

fn marker_attrs(doc: &Document, marker: NodeId) -> Vec<(String, String)> {
    match doc.kind(marker) {
        NodeKind::Element { attrs, .. } => attrs.clone(),
        _ => Vec::new(),
    }
}

/// Unwrap markers that directly contain other markers.
///
/// The server keeps resolved comments as markers around newer ones. Each pass
/// unwraps one outer marker; repeat until none is left.
fn remove_outer_resolved(doc: &mut Document, markup: &MarkupConfig) {
    let tag = markup.comment_tag.as_str();
    loop {
        let outer = doc.elements_by_tag(tag).into_iter().find(|&marker| {
            doc.children(marker)
                .iter()
                .any(|&child| doc.is_element(child, tag))
        });
        let Some(outer) = outer else {
            return;
        };
        tracing::debug!(
            ref_id = ?doc.attr(outer, &markup.comment_ref_attr),
            "Removing comment with nested comments"
        );
        let Some(parent) = doc.parent(outer) else {
            return;
        };
        doc.unwrap(outer);
        doc.merge_adjacent_text(parent);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::markup::{parse, serialize};

    fn locate(html: &str) -> Located {
        locate_comments(&parse(html).unwrap(), &MarkupConfig::default())
    }

    #[test]
    fn test_single_comment_unwrapped() {
        let located = locate(
            r#"<p>The <ac:inline-comment-marker ac:ref="x">quick</ac:inline-comment-marker> fox</p>"#,
        );

        assert_eq!(serialize(&located.doc), "<p>The quick fox</p>");
        assert_eq!(located.comments.len(), 1);
        let anchor = &located.comments[0].anchor;
        assert_eq!(anchor.ref_id, "x");
        assert_eq!(anchor.anchor_text, "quick");
        assert_eq!(anchor.before, Some(Context::Text("The ".to_owned())));
        assert_eq!(anchor.after, Some(Context::Text(" fox".to_owned())));
        assert_eq!(located.doc.text(located.comments[0].run), Some("The quick fox"));
    }

    #[test]
    fn test_comments_in_one_run_are_nested() {
        let located = locate(concat!(
            r#"<p>a <ac:inline-comment-marker ac:ref="1">b</ac:inline-comment-marker> c "#,
            r#"<ac:inline-comment-marker ac:ref="2">d</ac:inline-comment-marker> e</p>"#,
        ));

        assert_eq!(located.comments.len(), 1);
        let outer = &located.comments[0].anchor;
        assert_eq!(outer.ref_id, "2");
        assert_eq!(outer.ref_ids(), vec!["1", "2"]);
        assert_eq!(outer.run_text(), "a b c d e");
        let Some(Context::Nested(inner)) = &outer.before else {
            panic!("expected nested comment");
        };
        assert_eq!(inner.ref_id, "1");
        assert_eq!(inner.after, Some(Context::Text(" c ".to_owned())));
    }

    #[test]
    fn test_adjacent_markers_without_text_between() {
        let located = locate(concat!(
            r#"<p><ac:inline-comment-marker ac:ref="1">one</ac:inline-comment-marker>"#,
            r#"<ac:inline-comment-marker ac:ref="2">two</ac:inline-comment-marker></p>"#,
        ));

        assert_eq!(located.comments.len(), 1);
        assert_eq!(located.comments[0].anchor.ref_ids(), vec!["1", "2"]);
        assert_eq!(serialize(&located.doc), "<p>onetwo</p>");
    }

    #[test]
    fn test_marker_with_markup_is_malformed() {
        let located = locate(
            r#"<p><ac:inline-comment-marker ac:ref="m"><strong>bold</strong></ac:inline-comment-marker> text</p>"#,
        );

        assert!(located.comments.is_empty());
        assert_eq!(
            located.malformed,
            vec![UnmatchedComment {
                ref_id: "m".to_owned(),
                text: "bold".to_owned(),
            }]
        );
    }

    #[test]
    fn test_outer_resolved_marker_removed() {
        let located = locate(concat!(
            r#"<p>x <ac:inline-comment-marker ac:ref="old">a "#,
            r#"<ac:inline-comment-marker ac:ref="new">b</ac:inline-comment-marker>"#,
            r#" c</ac:inline-comment-marker> y</p>"#,
        ));

        assert_eq!(located.comments.len(), 1);
        let anchor = &located.comments[0].anchor;
        assert_eq!(anchor.ref_id, "new");
        assert_eq!(anchor.before, Some(Context::Text("x a ".to_owned())));
        assert_eq!(anchor.after, Some(Context::Text(" c y".to_owned())));
        assert_eq!(serialize(&located.doc), "<p>x a b c y</p>");
    }

    #[test]
    fn test_original_document_untouched() {
        let html = r#"<p><ac:inline-comment-marker ac:ref="x">kept</ac:inline-comment-marker></p>"#;
        let old = parse(html).unwrap();
        let _ = locate_comments(&old, &MarkupConfig::default());

        assert_eq!(serialize(&old), html);
    }
}
