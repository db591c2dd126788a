//! Inline comment restoration for regenerated page content.
//!
//! The previous page version carries inline comment markers; freshly converted
//! content does not. This module moves the markers over:
//!
//! - [`locator`]: unwraps old markers into plain text runs, remembering where
//!   each marker sat inside its run
//! - [`aligner`]: diffs the non-blank text runs of old and new content
//! - [`resolver`]: maps every comment onto new runs and drops runs inside
//!   macros
//! - [`reinserter`]: rebuilds unchanged runs verbatim and splits changed runs
//!   between the comments competing for them
//!
//! # Example
//!
//! ```ignore
//! use std::collections::HashSet;
//! use flc_confluence::{ReconcileContext, restore_comments};
//!
//! let old_html = r#"<p>The <ac:inline-comment-marker ac:ref="x">quick</ac:inline-comment-marker> fox</p>"#;
//! let new_html = "<p>Intro</p><p>The quick fox</p>";
//!
//! let ctx = ReconcileContext::default();
//! let result = restore_comments(old_html, new_html, &HashSet::new(), false, &ctx);
//! assert_eq!(result.exact, vec!["x".to_owned()]);
//! ```

mod aligner;
mod locator;
mod reinserter;
mod resolver;

use std::collections::HashSet;

use flc_config::{Config, MarkupConfig, ReconcileConfig};

use crate::error::ReconcileError;
use crate::markup;

pub use aligner::{OpKind, Opcode, align};
pub use locator::{CommentAnchor, Context};

/// Comment that could not be placed in new HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedComment {
    /// Comment reference ID.
    pub ref_id: String,
    /// Text content the marker was wrapping.
    pub text: String,
}

/// Result of comment restoration.
#[derive(Debug, Clone, Default)]
pub struct RestoreResult {
    /// New content with comment markers.
    pub html: String,
    /// Comments restored on unchanged text.
    pub exact: Vec<String>,
    /// Comments placed on changed text.
    pub approximate: Vec<String>,
    /// Comments that could not be placed.
    pub unmatched_comments: Vec<UnmatchedComment>,
}

impl RestoreResult {
    fn unchanged(html: &str) -> Self {
        Self {
            html: html.to_owned(),
            ..Self::default()
        }
    }
}

/// Settings and logging span for one reconciliation.
///
/// Passed explicitly to every restoration call; the span is entered for the
/// duration of the call so all engine events carry the page context.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    /// Markup constants.
    pub markup: MarkupConfig,
    /// Placement tuning.
    pub tuning: ReconcileConfig,
    span: tracing::Span,
}

impl Default for ReconcileContext {
    fn default() -> Self {
        Self::new(MarkupConfig::default(), ReconcileConfig::default())
    }
}

impl ReconcileContext {
    /// Create a context without a page span.
    #[must_use]
    pub fn new(markup: MarkupConfig, tuning: ReconcileConfig) -> Self {
        Self {
            markup,
            tuning,
            span: tracing::Span::none(),
        }
    }

    /// Create a context for one page, with a `reconcile` span naming it.
    #[must_use]
    pub fn for_page(config: &Config, page_id: &str) -> Self {
        Self {
            markup: config.markup.clone(),
            tuning: config.reconcile.clone(),
            span: tracing::debug_span!("reconcile", page_id = %page_id),
        }
    }

    /// Span events of this reconciliation are recorded in.
    #[must_use]
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

/// Restore inline comments of `old_html` in `new_html`.
///
/// Comments on unchanged text are restored verbatim. Comments on changed
/// text are spread over the replacing text unless `resolve_changed` is set,
/// in which case they are left out. Ids in `resolved_ids` are never placed
/// on changed text.
///
/// If either side cannot be parsed, the error is logged and `new_html` is
/// returned unchanged. Blank new content is returned unchanged as well.
pub fn restore_comments(
    old_html: &str,
    new_html: &str,
    resolved_ids: &HashSet<String>,
    resolve_changed: bool,
    ctx: &ReconcileContext,
) -> RestoreResult {
    let _entered = ctx.span.enter();
    tracing::info!("Starting comment restoration");
    tracing::debug!(old_len = old_html.len(), new_len = new_html.len(), "Input sizes");

    match try_restore_comments(old_html, new_html, resolved_ids, resolve_changed, ctx) {
        Ok(result) => {
            tracing::info!(
                exact = result.exact.len(),
                approximate = result.approximate.len(),
                unmatched = result.unmatched_comments.len(),
                "Comment restoration completed"
            );
            result
        }
        Err(e) => {
            tracing::error!(error = %e, "Comment restoration failed");
            tracing::warn!("Falling back to new content without comments");
            RestoreResult::unchanged(new_html)
        }
    }
}

fn try_restore_comments(
    old_html: &str,
    new_html: &str,
    resolved_ids: &HashSet<String>,
    resolve_changed: bool,
    ctx: &ReconcileContext,
) -> Result<RestoreResult, ReconcileError> {
    let markup_cfg = &ctx.markup;

    let mut new_doc = markup::parse(new_html)?;
    if new_doc.is_blank() {
        tracing::debug!("New content is empty, inline comments are omitted");
        return Ok(RestoreResult::unchanged(new_html));
    }
    let old_doc = markup::parse(old_html)?;

    let located = locator::locate_comments(&old_doc, markup_cfg);

    let old_runs = located.doc.non_blank_runs();
    let new_runs = new_doc.non_blank_runs();
    let old_texts: Vec<&str> = old_runs.iter().filter_map(|&r| located.doc.text(r)).collect();
    let new_texts: Vec<&str> = new_runs.iter().filter_map(|&r| new_doc.text(r)).collect();

    let opcodes = align(&old_texts, &new_texts);
    tracing::debug!(count = opcodes.len(), "Aligned text runs");

    let placements = resolver::find_placements(
        &located.comments,
        &old_runs,
        &opcodes,
        new_runs.len(),
        ctx.tuning.delete_fallback_radius,
    );
    let placements = resolver::correct_boundaries(
        placements,
        &new_doc,
        &new_runs,
        &markup_cfg.macro_prefix,
        ctx.tuning.boundary_scan_window,
    );
    let divided = resolver::divide_placements(placements, &located.comments);

    reinserter::restore_exact(
        &mut new_doc,
        &new_runs,
        &divided.exact,
        &located.comments,
        &markup_cfg.comment_tag,
    );
    let mut exact: Vec<String> = Vec::new();
    for placement in &divided.exact {
        for ref_id in located.comments[placement.comment].anchor.ref_ids() {
            push_unique(&mut exact, ref_id);
        }
    }

    let approximate = if resolve_changed {
        tracing::debug!("Changed text keeps no comments");
        Vec::new()
    } else {
        reinserter::insert_shared(
            &mut new_doc,
            &new_runs,
            &divided.shared,
            resolved_ids,
            &markup_cfg.comment_tag,
            &markup_cfg.comment_ref_attr,
        )
        .into_iter()
        .filter(|r| !exact.contains(r))
        .collect()
    };

    let mut unmatched_comments = located.malformed;
    for located_comment in &located.comments {
        for anchor in located_comment.anchor.chain() {
            let placed = exact.contains(&anchor.ref_id) || approximate.contains(&anchor.ref_id);
            let reported = unmatched_comments.iter().any(|c| c.ref_id == anchor.ref_id);
            if !placed && !reported {
                tracing::debug!(ref_id = %anchor.ref_id, "Comment could not be placed");
                unmatched_comments.push(UnmatchedComment {
                    ref_id: anchor.ref_id.clone(),
                    text: anchor.anchor_text.clone(),
                });
            }
        }
    }

    Ok(RestoreResult {
        html: markup::serialize(&new_doc),
        exact,
        approximate,
        unmatched_comments,
    })
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_owned());
    }
}
