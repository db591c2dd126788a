//! Writing comment markers into the new document.

use std::collections::{BTreeMap, HashSet};

use super::locator::{CommentAnchor, Context, LocatedComment};
use super::resolver::Placement;
use crate::markup::{Document, NodeId};

/// Replace each exactly matched run with the old marker sequence.
///
/// The sequence is rebuilt from the anchor: nested comments first, then the
/// text before the marker, the marker itself and the text after it.
pub fn restore_exact(
    doc: &mut Document,
    new_runs: &[NodeId],
    exact: &[Placement],
    comments: &[LocatedComment],
    comment_tag: &str,
) {
    for placement in exact {
        let target = placement.targets.first().and_then(|&idx| new_runs.get(idx));
        let Some(&target) = target else {
            continue;
        };
        let anchor = &comments[placement.comment].anchor;
        let nodes = materialize(doc, anchor, comment_tag);
        tracing::debug!(
            ref_id = %placement.ref_id,
            nodes = nodes.len(),
            "Restoring comment verbatim"
        );
        doc.replace_with(target, &nodes);
    }
}

fn materialize(doc: &mut Document, anchor: &CommentAnchor, comment_tag: &str) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    if let Some(before) = &anchor.before {
        nodes.extend(materialize_context(doc, before, comment_tag));
    }

    let marker = doc.create_element(comment_tag, anchor.attrs.clone());
    if !anchor.anchor_text.is_empty() {
        let text = doc.create_text(anchor.anchor_text.clone());
        doc.append_child(marker, text);
    }
    nodes.push(marker);

    if let Some(after) = &anchor.after {
        nodes.extend(materialize_context(doc, after, comment_tag));
    }
    nodes
}

fn materialize_context(
    doc: &mut Document,
    context: &Context,
    comment_tag: &str,
) -> Vec<NodeId> {
    match context {
        Context::Text(text) if text.is_empty() => Vec::new(),
        Context::Text(text) => vec![doc.create_text(text.clone())],
        Context::Nested(anchor) => materialize(doc, anchor, comment_tag),
    }
}

/// Wrap shared runs in markers, one equal slice of text per reference id.
///
/// Resolved ids are dropped first; a run left without ids is not touched.
/// When there are more ids than characters, the extra ids are not placed.
/// Returns the ids that were placed at least once, in placement order.
pub fn insert_shared(
    doc: &mut Document,
    new_runs: &[NodeId],
    shared: &BTreeMap<usize, Vec<String>>,
    resolved: &HashSet<String>,
    comment_tag: &str,
    ref_attr: &str,
) -> Vec<String> {
    let mut placed: Vec<String> = Vec::new();

    for (&idx, refs) in shared {
        let Some(&run) = new_runs.get(idx) else {
            continue;
        };
        let refs: Vec<&String> = refs.iter().filter(|r| !resolved.contains(*r)).collect();
        if refs.is_empty() {
            tracing::debug!(run = idx, "All comments for run are resolved, skipping");
            continue;
        }

        let chars: Vec<char> = doc.text(run).unwrap_or_default().chars().collect();
        let count = refs.len().min(chars.len());
        if count == 0 {
            continue;
        }
        let chunk = chars.len() / count;
        tracing::debug!(run = idx, count, chunk, "Splitting run between comments");

        let mut markers = Vec::with_capacity(count);
        for (i, ref_id) in refs.iter().take(count).enumerate() {
            let start = i * chunk;
            let end = if i + 1 == count { chars.len() } else { start + chunk };
            let slice: String = chars[start..end].iter().collect();

            let marker =
                doc.create_element(comment_tag, vec![(ref_attr.to_owned(), (*ref_id).clone())]);
            let text = doc.create_text(slice);
            doc.append_child(marker, text);
            markers.push(marker);

            if !placed.contains(ref_id) {
                placed.push((*ref_id).clone());
            }
        }
        doc.replace_with(run, &markers);
    }

    placed
}
