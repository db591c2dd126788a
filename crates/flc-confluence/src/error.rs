//! Error types for the reconciliation engine and the wiki seam.

use std::str::Utf8Error;

/// Error while reading or rebuilding page markup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// XML parsing error.
    #[error("XML parse error")]
    XmlParse(#[from] quick_xml::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error")]
    Utf8(#[from] Utf8Error),

    /// XML attribute error.
    #[error("XML attribute error")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error during XML parsing.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// Input ended with elements still open.
    #[error("{0} element(s) left unclosed")]
    Unclosed(usize),
}

/// Failure reported by a [`WikiApi`](crate::wiki::WikiApi) implementation.
#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    /// Page or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Credentials lack access to the resource.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Server rejected the submitted content.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Server returned an unexpected status.
    #[error("HTTP error: {status} - {body}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}
