//! Wiki comment types.

use std::collections::HashSet;

use serde::Deserialize;

use super::Body;

/// Page comment. Inline comments carry [`InlineProperties`].
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    /// Comment ID.
    pub id: String,
    /// Comment title.
    #[serde(default)]
    pub title: String,
    /// Comment body content.
    #[serde(default)]
    pub body: Option<Body>,
    /// Extended properties.
    #[serde(default)]
    pub extensions: Option<Extensions>,
}

impl Comment {
    /// Marker reference of a resolved inline comment.
    #[must_use]
    pub fn resolved_marker_ref(&self) -> Option<&str> {
        let extensions = self.extensions.as_ref()?;
        let inline = extensions.inline_properties.as_ref()?;
        let resolution = extensions.resolution.as_ref()?;
        (resolution.status == "resolved").then_some(inline.marker_ref.as_str())
    }
}

/// Comment extensions.
#[derive(Debug, Clone, Deserialize)]
pub struct Extensions {
    /// Inline comment properties; absent for page-level comments.
    #[serde(rename = "inlineProperties", default)]
    pub inline_properties: Option<InlineProperties>,
    /// Resolution status.
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

/// Inline comment properties.
#[derive(Debug, Clone, Deserialize)]
pub struct InlineProperties {
    /// Reference id matching the marker in the page body.
    #[serde(rename = "markerRef")]
    pub marker_ref: String,
    /// Text selected when the comment was made.
    #[serde(rename = "originalSelection", default)]
    pub original_selection: String,
}

/// Comment resolution status.
#[derive(Debug, Clone, Deserialize)]
pub struct Resolution {
    /// Status ("open" or "resolved").
    pub status: String,
}

/// Comments API response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentsResponse {
    /// List of comments.
    pub results: Vec<Comment>,
    /// Number of comments in `results`.
    #[serde(default)]
    pub size: usize,
}

impl CommentsResponse {
    /// Marker references of all resolved inline comments.
    #[must_use]
    pub fn resolved_marker_refs(&self) -> HashSet<String> {
        self.results
            .iter()
            .filter_map(Comment::resolved_marker_ref)
            .map(str::to_owned)
            .collect()
    }
}
