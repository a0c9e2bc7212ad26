//! Init command implementation.

use super::{Geometry, DEFAULT_BLOCKS};
use crate::error::{CliError, CliResult};
use blocklog_core::Config;
use blocklog_storage::FileBlockStore;
use std::path::Path;
use tracing::info;

/// Creates a zeroed image and returns the configuration it was sized for.
pub fn create(path: &Path, geometry: &Geometry, force: bool) -> CliResult<Config> {
    if path.exists() && !force {
        return Err(CliError::ImageExists(path.to_path_buf()));
    }

    let nr_blocks = geometry.nr_blocks.unwrap_or(DEFAULT_BLOCKS);
    let config = geometry.config(nr_blocks);
    config.validate()?;

    FileBlockStore::create(path, config.block_size, config.nr_blocks)?;
    info!(
        path = %path.display(),
        nr_blocks = config.nr_blocks,
        block_size = config.block_size,
        "created image"
    );
    Ok(config)
}

/// Runs the init command.
pub fn run(path: &Path, geometry: &Geometry, force: bool) -> CliResult<()> {
    let config = create(path, geometry, force)?;
    println!(
        "Created {}: {} blocks of {} bytes (max message {} bytes)",
        path.display(),
        config.nr_blocks,
        config.block_size,
        config.max_msg_size
    );
    Ok(())
}
