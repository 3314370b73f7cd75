//! Preview server for sites built by quire.
//!
//! Serves a built output directory over plain HTTP for local browsing.

pub mod listing;
pub mod server;

pub use server::{PreviewConfig, PreviewServer, ServerError};
