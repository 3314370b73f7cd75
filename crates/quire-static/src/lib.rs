//! Static site builder for quire.
//!
//! Renders Markdown posts and page templates into a static HTML tree.

pub mod builder;
pub mod output;
pub mod templates;

pub use builder::{order_posts, BuildConfig, BuildError, BuildResult, Post, SiteBuilder};
pub use output::RenderedItem;
