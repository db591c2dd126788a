//! Confluence storage-format markup tree.
//!
//! - [`document`]: arena tree with stable node ids
//! - [`parser`]: quick-xml reader with `ac:`/`ri:` namespace wrapping
//! - [`serializer`]: XHTML writer
//! - [`entities`]: HTML entity pre-pass

mod document;
mod entities;
mod parser;
mod serializer;

pub use document::{Document, NodeId, NodeKind};
pub use entities::convert_html_entities;
pub use parser::parse;
pub(crate) use serializer::escape_xml;
pub use serializer::{serialize, serialize_children, serialize_node};
