//! Wiki API types.

mod comment;
mod page;

pub use comment::{Comment, CommentsResponse, Extensions, InlineProperties, Resolution};
pub use page::{Body, Links, Page, Storage, Version};
