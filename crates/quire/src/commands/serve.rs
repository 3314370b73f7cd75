//! Preview server command.

use std::path::PathBuf;

use anyhow::Result;
use quire_server::{PreviewConfig, PreviewServer};
use quire_static::BuildConfig;

/// Run the serve command.
pub async fn run(source: PathBuf, port: u16) -> Result<()> {
    let build = BuildConfig {
        source_dir: source,
        ..Default::default()
    };

    let config = PreviewConfig {
        root: build.output_root(),
        port,
        ..Default::default()
    };

    PreviewServer::new(config).start().await?;

    Ok(())
}
