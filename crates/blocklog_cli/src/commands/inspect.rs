//! Inspect command implementation.

use super::{Geometry, OutputFormat};
use crate::error::CliResult;
use blocklog_core::{BlockHeader, BlockLog, LogStats, PartIter};
use blocklog_storage::{BlockStore, FileBlockStore};
use serde::Serialize;
use std::path::Path;

/// Image inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Image path.
    pub path: String,
    /// Block size in bytes.
    pub block_size: usize,
    /// Number of blocks in the image.
    pub block_count: u32,
    /// Header summary of every block.
    pub blocks: Vec<BlockInfo>,
    /// Cursors recovered by opening the log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursors: Option<Cursors>,
    /// Why recovery failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_error: Option<String>,
}

/// Header summary of a single block.
#[derive(Debug, Serialize)]
pub struct BlockInfo {
    /// Slot index.
    pub index: u32,
    /// Block sequence, 0 when free or consumed.
    pub sequence: u32,
    /// Bytes of part data.
    pub used_size: u32,
    /// Well-formed parts at the head of the block.
    pub parts: usize,
}

/// Recovered cursors.
#[derive(Debug, Serialize)]
pub struct Cursors {
    /// Sequence of the newest committed block.
    pub last_block_seq: u32,
    /// Highest message sequence found.
    pub last_msg_seq: u32,
    /// Slot receiving the next commit.
    pub write_index: u32,
    /// Slot read next.
    pub read_index: u32,
    /// Offset of the next part within the read block.
    pub read_offset: usize,
    /// Committed blocks not yet fully read.
    pub pending_blocks: u32,
    /// Commits possible before the ring is full.
    pub free_blocks: u32,
}

impl From<LogStats> for Cursors {
    fn from(stats: LogStats) -> Self {
        Self {
            last_block_seq: stats.last_block_seq,
            last_msg_seq: stats.last_msg_seq,
            write_index: stats.write_index,
            read_index: stats.read_index,
            read_offset: stats.read_offset,
            pending_blocks: stats.pending_blocks,
            free_blocks: stats.free_blocks,
        }
    }
}

/// Summarizes every block header and recovers the cursors.
///
/// Nothing is written to the image.
pub fn inspect(path: &Path, geometry: &Geometry) -> CliResult<InspectResult> {
    let store = FileBlockStore::open(path, geometry.block_size)?;
    let mut blocks = Vec::with_capacity(store.block_count() as usize);

    for index in 0..store.block_count() {
        let block = store.block(index)?;
        let header = BlockHeader::decode(block)?;
        let parts = PartIter::new(block)
            .map(|parts| parts.take_while(Result::is_ok).count())
            .unwrap_or(0);
        blocks.push(BlockInfo {
            index,
            sequence: header.sequence,
            used_size: header.used_size,
            parts,
        });
    }

    let mut result = InspectResult {
        path: path.display().to_string(),
        block_size: store.block_size(),
        block_count: store.block_count(),
        blocks,
        cursors: None,
        recovery_error: None,
    };

    let config = geometry.config(store.block_count());
    match BlockLog::open(config, store) {
        Ok(log) => result.cursors = Some(log.stats().into()),
        Err(err) => result.recovery_error = Some(err.to_string()),
    }
    Ok(result)
}

/// Runs the inspect command.
pub fn run(path: &Path, geometry: &Geometry, format: OutputFormat) -> CliResult<()> {
    let result = inspect(path, geometry)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("blocklog Image Inspection");
    println!("=========================");
    println!();
    println!("Path: {}", result.path);
    println!(
        "Geometry: {} blocks of {} bytes",
        result.block_count, result.block_size
    );
    println!();
    println!("Blocks:");
    for block in &result.blocks {
        if block.sequence == 0 {
            println!("  [{:>3}] free", block.index);
        } else {
            println!(
                "  [{:>3}] seq {:<10} used {:>6} bytes, {} part(s)",
                block.index, block.sequence, block.used_size, block.parts
            );
        }
    }
    println!();

    if let Some(cursors) = &result.cursors {
        println!("Cursors:");
        println!("  Last block seq:   {}", cursors.last_block_seq);
        println!("  Last message seq: {}", cursors.last_msg_seq);
        println!("  Write index:      {}", cursors.write_index);
        println!(
            "  Read position:    block {} offset {}",
            cursors.read_index, cursors.read_offset
        );
        println!("  Unread blocks:    {}", cursors.pending_blocks);
        println!("  Free blocks:      {}", cursors.free_blocks);
    }
    if let Some(error) = &result.recovery_error {
        println!("Recovery failed: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{init, write};
    use tempfile::tempdir;

    fn geometry() -> Geometry {
        Geometry {
            block_size: 64,
            nr_blocks: Some(4),
            max_msg_size: None,
            min_part_size: None,
        }
    }

    #[test]
    fn reports_headers_and_cursors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flash.img");
        init::create(&path, &geometry(), false).unwrap();
        write::append(&path, &geometry(), &["a".into(), "b".into()]).unwrap();

        let result = inspect(&path, &geometry()).unwrap();
        assert_eq!(result.block_count, 4);
        assert_eq!(result.blocks[0].sequence, 1);
        assert_eq!(result.blocks[0].parts, 2);
        assert_eq!(result.blocks[1].sequence, 0);

        let cursors = result.cursors.unwrap();
        assert_eq!(cursors.last_msg_seq, 2);
        assert_eq!(cursors.write_index, 1);
        assert_eq!(cursors.pending_blocks, 1);
        assert!(result.recovery_error.is_none());
    }

    #[test]
    fn reports_recovery_failure_instead_of_failing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flash.img");
        init::create(&path, &geometry(), false).unwrap();

        // two blocks claiming the same sequence
        let mut image = std::fs::read(&path).unwrap();
        image[0] = 5;
        image[64] = 5;
        std::fs::write(&path, &image).unwrap();

        let result = inspect(&path, &geometry()).unwrap();
        assert!(result.cursors.is_none());
        assert!(result.recovery_error.unwrap().contains("corrupted"));
    }
}
