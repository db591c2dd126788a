//! Confluence publishing with inline comment preservation.
//!
//! Regenerating a page from Markdown would drop every inline comment
//! reviewers left on it and everything editors added around the generated
//! part. This crate keeps both:
//!
//! - [`PageRegions`]: splits a page body around its managed region
//! - [`restore_comments`]: carries inline comments over to new content
//! - [`PageUpdater`](updater::PageUpdater): the whole publishing workflow
//!   over the [`WikiApi`] and [`MarkdownConverter`] seams
//!
//! # Restoring comments
//!
//! ```ignore
//! use std::collections::HashSet;
//! use flc_confluence::{ReconcileContext, restore_comments};
//!
//! let old_html = r#"<p>The <ac:inline-comment-marker ac:ref="x">quick</ac:inline-comment-marker> fox</p>"#;
//! let result = restore_comments(old_html, "<p>The quick fox</p>", &HashSet::new(), false, &ReconcileContext::default());
//! println!("{}", result.html);
//! ```

// Storage-format tree
pub mod markup;

// Managed region
mod region;
pub use region::{PageRegions, anchor_macro};

// Comment preservation
mod comment_preservation;
pub use comment_preservation::{
    CommentAnchor, Context, OpKind, Opcode, ReconcileContext, RestoreResult, UnmatchedComment,
    align, restore_comments,
};

// Content fingerprint
pub mod fingerprint;

// Markdown preparation and post-conversion clean-up
pub mod markdown;
pub mod postprocess;

// Collaborator seams
pub mod convert;
pub mod wiki;
pub use convert::{ConversionError, MarkdownConverter};
pub use wiki::{NewPage, PageTarget, WikiApi};

// Types
pub mod types;

// Page updater
pub mod updater;

// Errors
pub mod error;
pub use error::{ReconcileError, WikiError};
