//! Mapping old comments onto new text runs.

use std::collections::{BTreeMap, HashSet};

use super::aligner::{OpKind, Opcode};
use super::locator::LocatedComment;
use crate::markup::{Document, NodeId};

/// Where one located comment goes in the new document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Index into the located comments.
    pub comment: usize,
    /// Reference id of the located comment.
    pub ref_id: String,
    /// Indices into the new document's non-blank runs.
    pub targets: Vec<usize>,
    /// The target run carries the same text as the old run.
    pub is_exact: bool,
}

/// Placements split by how they are reinserted.
#[derive(Debug, Default)]
pub struct DividedPlacements {
    /// Runs whose text is unchanged; restored verbatim.
    pub exact: Vec<Placement>,
    /// Changed runs mapped to the reference ids competing for them.
    pub shared: BTreeMap<usize, Vec<String>>,
}

/// Find target runs for every located comment.
///
/// Comments whose old run is not among `old_runs`, or that no opcode covers,
/// are left out.
#[must_use]
pub fn find_placements(
    comments: &[LocatedComment],
    old_runs: &[NodeId],
    opcodes: &[Opcode],
    new_len: usize,
    delete_radius: usize,
) -> Vec<Placement> {
    let mut placements = Vec::with_capacity(comments.len());

    for (idx, located) in comments.iter().enumerate() {
        let ref_id = &located.anchor.ref_id;
        let Some(pos) = old_runs.iter().position(|&r| r == located.run) else {
            tracing::debug!(ref_id = %ref_id, "Commented run is blank, skipping");
            continue;
        };
        let Some(op_idx) = opcodes.iter().position(|op| op.old_range.contains(&pos)) else {
            tracing::debug!(ref_id = %ref_id, "No opcode covers commented run, skipping");
            continue;
        };
        let opcode = &opcodes[op_idx];

        let (targets, is_exact) = match opcode.kind {
            OpKind::Equal => {
                let target = opcode.new_range.start + (pos - opcode.old_range.start);
                (vec![target], true)
            }
            OpKind::Replace => (opcode.new_range.clone().collect(), false),
            OpKind::Delete => (
                deletion_targets(opcodes, op_idx, new_len, delete_radius),
                false,
            ),
            OpKind::Insert => continue,
        };

        tracing::debug!(ref_id = %ref_id, ?targets, is_exact, "Placed comment");
        placements.push(Placement {
            comment: idx,
            ref_id: ref_id.clone(),
            targets,
            is_exact,
        });
    }

    placements
}

/// Targets for a comment whose text was deleted.
///
/// An insertion right before or after the deletion is taken as its
/// replacement. Otherwise the runs within `radius` of the deletion point.
fn deletion_targets(
    opcodes: &[Opcode],
    op_idx: usize,
    new_len: usize,
    radius: usize,
) -> Vec<usize> {
    let mut targets = Vec::new();
    let neighbors = [
        op_idx.checked_sub(1).and_then(|i| opcodes.get(i)),
        opcodes.get(op_idx + 1),
    ];
    for neighbor in neighbors.into_iter().flatten() {
        if neighbor.kind == OpKind::Insert {
            targets.extend(neighbor.new_range.clone());
        }
    }
    if targets.is_empty() {
        let point = opcodes[op_idx].new_range.start;
        targets.extend(point.saturating_sub(radius)..(point + radius).min(new_len));
    }
    targets
}

/// Move placement boundaries off runs that cannot carry comments.
///
/// A run cannot carry a comment when any ancestor is macro markup (a tag
/// starting with `macro_prefix`). Leading and trailing such runs are skipped
/// for at most `scan_window` runs per side; a placement whose boundary cannot
/// be moved within the window is dropped. Interior macro runs are removed.
#[must_use]
pub fn correct_boundaries(
    placements: Vec<Placement>,
    doc: &Document,
    new_runs: &[NodeId],
    macro_prefix: &str,
    scan_window: usize,
) -> Vec<Placement> {
    let commentable = |idx: &usize| {
        new_runs
            .get(*idx)
            .is_some_and(|&run| is_commentable(doc, run, macro_prefix))
    };

    placements
        .into_iter()
        .filter_map(|mut placement| {
            let Some(start) = placement.targets.iter().position(&commentable) else {
                tracing::debug!(ref_id = %placement.ref_id, "Placement lies inside macros, dropping");
                return None;
            };
            let end = placement.targets.iter().rposition(&commentable).unwrap_or(start);
            let trailing = placement.targets.len() - 1 - end;
            if start > scan_window || trailing > scan_window {
                tracing::debug!(ref_id = %placement.ref_id, "Boundary outside scan window, dropping");
                return None;
            }
            placement.targets = placement.targets[start..=end]
                .iter()
                .copied()
                .filter(|idx| commentable(idx))
                .collect();
            Some(placement)
        })
        .collect()
}

/// Whether a run sits outside every macro element.
#[must_use]
pub fn is_commentable(doc: &Document, run: NodeId, macro_prefix: &str) -> bool {
    !doc.ancestors(run)
        .any(|node| doc.tag(node).is_some_and(|tag| tag.starts_with(macro_prefix)))
}

/// Split placements into exact ones and shared runs.
///
/// Runs claimed by an exact placement are removed from every other
/// placement. Each remaining run collects the reference ids of all
/// placements targeting it, nested comments first, without duplicates.
#[must_use]
pub fn divide_placements(
    placements: Vec<Placement>,
    comments: &[LocatedComment],
) -> DividedPlacements {
    let (exact, inexact): (Vec<_>, Vec<_>) = placements.into_iter().partition(|p| p.is_exact);
    let claimed: HashSet<usize> = exact.iter().flat_map(|p| p.targets.iter().copied()).collect();

    let mut shared: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for placement in inexact {
        let refs = comments[placement.comment].anchor.ref_ids();
        for target in placement.targets.iter().filter(|t| !claimed.contains(*t)) {
            let entry = shared.entry(*target).or_default();
            for ref_id in &refs {
                if !entry.iter().any(|r| r.as_str() == *ref_id) {
                    entry.push((*ref_id).to_owned());
                }
            }
        }
    }

    tracing::debug!(exact = exact.len(), shared = shared.len(), "Divided placements");
    DividedPlacements { exact, shared }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::comment_preservation::locator::{CommentAnchor, Context};
    use crate::markup::parse;

    fn op(kind: OpKind, old: std::ops::Range<usize>, new: std::ops::Range<usize>) -> Opcode {
        Opcode {
            kind,
            old_range: old,
            new_range: new,
        }
    }

    fn located(doc: &mut Document, ref_id: &str, before: Option<Context>) -> LocatedComment {
        LocatedComment {
            run: doc.create_text("run"),
            anchor: CommentAnchor {
                ref_id: ref_id.to_owned(),
                anchor_text: "run".to_owned(),
                attrs: Vec::new(),
                before,
                after: None,
            },
        }
    }

    fn placement(comment: usize, ref_id: &str, targets: Vec<usize>, is_exact: bool) -> Placement {
        Placement {
            comment,
            ref_id: ref_id.to_owned(),
            targets,
            is_exact,
        }
    }

    #[test]
    fn test_equal_opcode_gives_exact_placement() {
        let mut doc = Document::new();
        let comment = located(&mut doc, "a", None);
        let old_runs = vec![doc.create_text("x"), comment.run];
        let opcodes = vec![op(OpKind::Insert, 0..0, 0..1), op(OpKind::Equal, 0..2, 1..3)];

        let placements = find_placements(&[comment], &old_runs, &opcodes, 3, 1);

        assert_eq!(placements, vec![placement(0, "a", vec![2], true)]);
    }

    #[test]
    fn test_replace_opcode_covers_new_range() {
        let mut doc = Document::new();
        let comment = located(&mut doc, "a", None);
        let old_runs = vec![comment.run];
        let opcodes = vec![op(OpKind::Replace, 0..1, 0..3)];

        let placements = find_placements(&[comment], &old_runs, &opcodes, 3, 1);

        assert_eq!(placements, vec![placement(0, "a", vec![0, 1, 2], false)]);
    }

    #[test]
    fn test_delete_falls_back_to_window() {
        let mut doc = Document::new();
        let comment = located(&mut doc, "a", None);
        let other = doc.create_text("y");
        let old_runs = vec![other, comment.run, other];
        let opcodes = vec![
            op(OpKind::Equal, 0..1, 0..1),
            op(OpKind::Delete, 1..2, 1..1),
            op(OpKind::Equal, 2..3, 1..2),
        ];

        let placements = find_placements(&[comment], &old_runs, &opcodes, 2, 1);

        assert_eq!(placements, vec![placement(0, "a", vec![0, 1], false)]);
    }

    #[test]
    fn test_delete_window_clamped_at_end() {
        let mut doc = Document::new();
        let comment = located(&mut doc, "a", None);
        let other = doc.create_text("y");
        let old_runs = vec![other, comment.run];
        let opcodes = vec![op(OpKind::Equal, 0..1, 0..1), op(OpKind::Delete, 1..2, 1..1)];

        let placements = find_placements(&[comment], &old_runs, &opcodes, 1, 1);

        assert_eq!(placements, vec![placement(0, "a", vec![0], false)]);
    }

    #[test]
    fn test_delete_next_to_insert_uses_insertion() {
        let opcodes = vec![
            op(OpKind::Insert, 0..0, 0..2),
            op(OpKind::Delete, 0..1, 2..2),
            op(OpKind::Equal, 1..2, 2..3),
        ];

        assert_eq!(deletion_targets(&opcodes, 1, 3, 1), vec![0, 1]);
    }

    #[test]
    fn test_blank_run_is_skipped() {
        let mut doc = Document::new();
        let comment = located(&mut doc, "a", None);
        let opcodes = vec![op(OpKind::Equal, 0..1, 0..1)];

        assert!(find_placements(&[comment], &[], &opcodes, 1, 1).is_empty());
    }

    #[test]
    fn test_correct_boundaries_skips_macro_runs() {
        let doc = parse(concat!(
            r#"<ac:structured-macro ac:name="info"><ac:rich-text-body><p>in macro</p></ac:rich-text-body></ac:structured-macro>"#,
            "<p>first</p>",
            r#"<p><ac:link><ri:page ri:content-title="x" /><ac:plain-text-link-body>link</ac:plain-text-link-body></ac:link></p>"#,
            "<p>second</p>",
        ))
        .unwrap();
        let runs = doc.non_blank_runs();
        assert_eq!(runs.len(), 4);

        let corrected = correct_boundaries(
            vec![
                placement(0, "a", vec![0, 1, 2], false),
                placement(1, "b", vec![0], true),
            ],
            &doc,
            &runs,
            "ac:",
            16,
        );

        assert_eq!(corrected, vec![placement(0, "a", vec![1], false)]);
    }

    #[test]
    fn test_correct_boundaries_respects_window() {
        let doc = parse(concat!(
            r#"<ac:structured-macro ac:name="info"><ac:rich-text-body><p>one</p><p>two</p></ac:rich-text-body></ac:structured-macro>"#,
            "<p>plain</p>",
        ))
        .unwrap();
        let runs = doc.non_blank_runs();

        let corrected = correct_boundaries(
            vec![placement(0, "a", vec![0, 1, 2], false)],
            &doc,
            &runs,
            "ac:",
            1,
        );

        assert!(corrected.is_empty());
    }

    #[test]
    fn test_divide_removes_exact_targets_from_shared() {
        let mut doc = Document::new();
        let first = located(&mut doc, "a", None);
        let second = located(&mut doc, "b", None);
        let nested = located(
            &mut doc,
            "d",
            Some(Context::Nested(Box::new(second.anchor.clone()))),
        );
        let comments = vec![first, second, nested];

        let divided = divide_placements(
            vec![
                placement(0, "a", vec![1], true),
                placement(1, "b", vec![1, 2], false),
                placement(2, "d", vec![2, 3], false),
            ],
            &comments,
        );

        assert_eq!(divided.exact, vec![placement(0, "a", vec![1], true)]);
        assert_eq!(
            divided.shared.into_iter().collect::<Vec<_>>(),
            vec![
                (2, vec!["b".to_owned(), "d".to_owned()]),
                (3, vec!["b".to_owned(), "d".to_owned()]),
            ]
        );
    }
}
