//! Front matter and Markdown handling for quire posts.
//!
//! Splits YAML or TOML front matter from a Markdown body, validates post
//! metadata, and renders Markdown to HTML with heading anchors.

pub mod document;
pub mod frontmatter;
pub mod markdown;

pub use document::{parse_document, Document, DocumentError, PostDate, PostMeta};
pub use frontmatter::{extract_frontmatter, Fields, FrontmatterError};
pub use markdown::{render_markdown, table_of_contents, TocEntry};
