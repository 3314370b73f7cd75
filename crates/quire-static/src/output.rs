//! Writing rendered items to the output tree.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::builder::BuildError;

/// A rendered page or post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedItem {
    /// Output path relative to the output root, `/`-separated
    pub path: String,

    /// Final HTML
    pub html: String,
}

/// Fail if two items would be written to the same file.
pub fn check_collisions(items: &[RenderedItem]) -> Result<(), BuildError> {
    let mut seen = HashSet::with_capacity(items.len());

    for item in items {
        if !seen.insert(item.path.as_str()) {
            return Err(BuildError::OutputCollision(item.path.clone()));
        }
    }

    Ok(())
}

/// Write every item below `output_root`, creating directories as needed.
///
/// Existing files are overwritten. Files not produced by this run are left
/// in place.
pub fn write_items(output_root: &Path, items: &[RenderedItem]) -> Result<usize, BuildError> {
    fs::create_dir_all(output_root).map_err(|e| BuildError::WriteError {
        path: output_root.display().to_string(),
        source: e,
    })?;

    for item in items {
        let path = output_root.join(&item.path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::WriteError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        fs::write(&path, &item.html).map_err(|e| BuildError::WriteError {
            path: path.display().to_string(),
            source: e,
        })?;

        tracing::debug!("Wrote {}", path.display());
    }

    Ok(items.len())
}
