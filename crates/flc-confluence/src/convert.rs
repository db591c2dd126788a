//! Markdown converter seam.

use std::path::Path;

/// Failure of the external Markdown converter.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The converter ran and reported an error.
    #[error("conversion failed: {0}")]
    Failed(String),

    /// Working files could not be written or read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts Markdown to XHTML the wiki accepts.
pub trait MarkdownConverter {
    /// Convert `markdown`. `workdir` is an empty directory owned by the
    /// caller for the duration of the call.
    fn convert(&self, markdown: &str, workdir: &Path) -> Result<String, ConversionError>;
}
