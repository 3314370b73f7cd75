//! Site build command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use quire_static::{BuildConfig, SiteBuilder};

/// Run the build command.
pub fn run(source: PathBuf, strict: bool) -> Result<()> {
    tracing::info!("Generating website from {}", source.display());

    let config = BuildConfig {
        source_dir: source,
        strict_undefined: strict,
        ..Default::default()
    };

    let result = SiteBuilder::new(config)
        .build()
        .context("Build failed")?;

    tracing::info!(
        "Built {} pages and {} posts in {}ms",
        result.pages,
        result.posts,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
