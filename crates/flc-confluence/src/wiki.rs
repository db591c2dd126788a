//! Wiki API seam.
//!
//! [`PageUpdater`](crate::updater::PageUpdater) talks to the wiki only
//! through [`WikiApi`]. Transport, authentication and retries belong to the
//! implementation; failures come back as typed [`WikiError`]s.

use std::collections::HashSet;

use crate::error::WikiError;
use crate::types::{CommentsResponse, Page};

/// How a page is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTarget<'a> {
    /// Existing page by id.
    Id(&'a str),
    /// Page by space key and title; may not exist yet.
    Title {
        /// Space key.
        space_key: &'a str,
        /// Page title.
        title: &'a str,
    },
}

impl std::fmt::Display for PageTarget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "page {id}"),
            Self::Title { space_key, title } => write!(f, "page \"{title}\" in space {space_key}"),
        }
    }
}

/// New page to create.
#[derive(Debug, Clone, Copy)]
pub struct NewPage<'a> {
    /// Space key.
    pub space_key: &'a str,
    /// Page title.
    pub title: &'a str,
    /// Parent page id.
    pub parent_id: Option<&'a str>,
}

/// Wiki operations used by the publishing workflow.
pub trait WikiApi {
    /// Fetch a page with its storage body and version.
    ///
    /// Returns `Ok(None)` when no such page exists.
    fn find_page(&self, target: &PageTarget<'_>) -> Result<Option<Page>, WikiError>;

    /// Create a page with the given storage body.
    fn create_page(&self, page: &NewPage<'_>, body: &str) -> Result<Page, WikiError>;

    /// Store a new version of `page`.
    ///
    /// `minor_edit` suppresses watcher notifications.
    fn update_page(
        &self,
        page: &Page,
        title: &str,
        body: &str,
        minor_edit: bool,
    ) -> Result<Page, WikiError>;

    /// Read a page property.
    fn get_property(&self, page_id: &str, key: &str) -> Result<Option<String>, WikiError>;

    /// Create or replace a page property.
    fn set_property(&self, page_id: &str, key: &str, value: &str) -> Result<(), WikiError>;

    /// List the comments of a page, with inline properties and resolution.
    fn comments(&self, page_id: &str) -> Result<CommentsResponse, WikiError>;

    /// Reference ids of resolved inline comments on a page.
    fn resolved_comment_ids(&self, page_id: &str) -> Result<HashSet<String>, WikiError> {
        Ok(self.comments(page_id)?.resolved_marker_refs())
    }
}
