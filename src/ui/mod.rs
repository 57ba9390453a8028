//! Terminal UI components.
//!
//! - [`pages`]: half-block painting of mounted pages
//! - status, title, prompt, and toast bars

pub mod pages;

mod render;
mod status;

pub use pages::ThumbnailCache;
pub use render::{render, split_screen};
