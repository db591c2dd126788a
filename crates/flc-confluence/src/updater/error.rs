//! Error types for page publishing.

use flc_config::ConfigError;

use crate::convert::ConversionError;
use crate::error::{ReconcileError, WikiError};

/// Error during a page update.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Invalid or incomplete configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Markdown conversion failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Configured parent page does not exist or cannot be read.
    #[error("parent page not found: {0}")]
    ParentNotFound(String),

    /// Wiki API error.
    #[error("wiki API error: {0}")]
    Wiki(#[from] WikiError),

    /// IO error (temp directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Page markup could not be processed.
    #[error("markup error: {0}")]
    Reconcile(#[from] ReconcileError),
}
