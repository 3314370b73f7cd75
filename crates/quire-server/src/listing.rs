//! Directory listings for directories without an index page.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use minijinja::{context, Environment};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ListingEntry {
    /// Display name, directories end with `/`
    pub name: String,
    /// Percent-encoded link relative to the listed directory
    pub href: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// Errors that can occur while producing a listing.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("Failed to read directory: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to render listing: {0}")]
    Template(#[from] minijinja::Error),
}

/// Renders HTML listings for directories below a root.
pub struct DirectoryListing {
    root: PathBuf,
    env: Environment<'static>,
}

impl DirectoryListing {
    /// Create a listing renderer for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("listing.html", LISTING_TEMPLATE)?;

        Ok(Self {
            root: root.into(),
            env,
        })
    }

    /// Render the listing for a request path.
    ///
    /// Returns `None` when the path does not name a directory below the root.
    pub fn render(&self, request_path: &str) -> Result<Option<String>, ListingError> {
        let Some(dir) = resolve_dir(&self.root, request_path) else {
            return Ok(None);
        };

        let entries = list_directory(&dir)?;
        let display_path = urlencoding::decode(request_path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| request_path.to_string());

        let html = self.env.get_template("listing.html")?.render(context! {
            path => display_path,
            entries => entries,
        })?;

        Ok(Some(html))
    }
}

/// Map a URL path onto a directory below `root`.
///
/// Only plain path segments are accepted; `..`, absolute and prefixed
/// components are refused.
pub fn resolve_dir(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;

    let mut dir = root.to_path_buf();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => dir.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    dir.is_dir().then_some(dir)
}

/// List a directory, sorted case-insensitively by name.
pub fn list_directory(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        let mut href = urlencoding::encode(&name).into_owned();
        let is_dir = entry.path().is_dir();

        if is_dir {
            name.push('/');
            href.push('/');
        }

        entries.push(ListingEntry { name, href, is_dir });
    }

    entries.sort_by_key(|e| e.name.to_lowercase());

    Ok(entries)
}

const LISTING_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Directory listing for {{ path }}</title>
</head>
<body>
  <h1>Directory listing for {{ path }}</h1>
  <hr>
  <ul>
  {% for entry in entries %}
    <li><a href="{{ entry.href }}">{{ entry.name }}</a></li>
  {% endfor %}
  </ul>
  <hr>
</body>
</html>"##;
