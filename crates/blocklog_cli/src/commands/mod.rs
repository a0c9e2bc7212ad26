//! CLI command implementations.

pub mod init;
pub mod inspect;
pub mod read;
pub mod verify;
pub mod write;

use crate::error::CliResult;
use blocklog_core::{BlockLog, Config, BLOCK_HEADER_SIZE, PART_HEADER_SIZE};
use blocklog_storage::{BlockStore, FileBlockStore};
use clap::ValueEnum;
use std::path::Path;

/// Block count used by `init` when none is given.
pub const DEFAULT_BLOCKS: u32 = 16;

/// Output format for commands that report data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Image geometry and packing options from the command line.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub block_size: usize,
    pub nr_blocks: Option<u32>,
    pub max_msg_size: Option<usize>,
    pub min_part_size: Option<usize>,
}

impl Geometry {
    /// Builds the log configuration for an image of `image_blocks` blocks.
    ///
    /// Unset sizes fall back to the library defaults, clamped to what the
    /// geometry can hold.
    pub fn config(&self, image_blocks: u32) -> Config {
        let defaults = Config::default();
        let nr_blocks = self.nr_blocks.unwrap_or(image_blocks);
        let payload = self
            .block_size
            .saturating_sub(BLOCK_HEADER_SIZE + PART_HEADER_SIZE);
        let ring = payload.saturating_mul(nr_blocks as usize);

        Config::new()
            .block_size(self.block_size)
            .nr_blocks(nr_blocks)
            .max_msg_size(
                self.max_msg_size
                    .unwrap_or_else(|| defaults.max_msg_size.min(ring)),
            )
            .min_part_size(
                self.min_part_size
                    .unwrap_or_else(|| defaults.min_part_size.min(payload)),
            )
    }
}

/// Opens the image at `path` and recovers a log over it.
pub fn open_log(path: &Path, geometry: &Geometry) -> CliResult<BlockLog<FileBlockStore>> {
    let store = FileBlockStore::open(path, geometry.block_size)?;
    let config = geometry.config(store.block_count());
    Ok(BlockLog::open(config, store)?)
}
