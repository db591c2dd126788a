//! Result types for page update operations.

use std::fmt;

use crate::comment_preservation::UnmatchedComment;

/// Result of a page update.
#[derive(Debug, Clone)]
pub struct UpdateResult {
    /// Page id; `None` for a page a test run would have created.
    pub page_id: Option<String>,
    /// Page title.
    pub title: String,
    /// URL to view the page.
    pub url: Option<String>,
    /// Whether the content differed from the published version.
    pub updated: bool,
    /// Nothing was written.
    pub test_run: bool,
    /// Reference ids of comments carried over to the new version.
    pub restored_comments: Vec<String>,
    /// Comments that could not be carried over.
    pub unmatched_comments: Vec<UnmatchedComment>,
}

impl fmt::Display for UpdateResult {
    /// One summary line: `* url (title)`, where `* ` marks a changed page
    /// and test runs are prefixed with `TEST RUN `.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.test_run {
            f.write_str("TEST RUN ")?;
        }
        if self.updated {
            f.write_str("* ")?;
        }
        let location = self
            .url
            .as_deref()
            .or(self.page_id.as_deref())
            .unwrap_or("<new page>");
        write!(f, "{location} ({})", self.title)
    }
}

/// Result of a dry run (no changes made).
#[derive(Debug, Clone)]
pub struct DryRunResult {
    /// Full page body that would be written.
    pub html: String,
    /// Title the page would get.
    pub title: String,
    /// Current page title, if the page exists.
    pub current_title: Option<String>,
    /// Current page version, if the page exists.
    pub current_version: Option<u32>,
    /// Whether the content differs from the published version.
    pub needs_update: bool,
    /// Reference ids of comments that would be carried over.
    pub restored_comments: Vec<String>,
    /// Comments that would be lost.
    pub unmatched_comments: Vec<UnmatchedComment>,
}
