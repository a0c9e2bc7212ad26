//! Verify command implementation.

use super::Geometry;
use crate::error::{CliError, CliResult};
use blocklog_core::{BlockHeader, BlockLog, PartIter};
use blocklog_storage::{BlockStore, FileBlockStore};
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of live blocks checked.
    pub blocks_checked: usize,
    /// Number of parts checked.
    pub parts_checked: usize,
    /// List of problems found.
    pub problems: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Walks the parts of every live block and runs recovery over the image.
pub fn check(path: &Path, geometry: &Geometry) -> CliResult<VerifyResult> {
    let store = FileBlockStore::open(path, geometry.block_size)?;
    let mut result = VerifyResult::default();

    for index in 0..store.block_count() {
        let block = store.block(index)?;
        if BlockHeader::sequence_of(block)? == 0 {
            continue;
        }
        result.blocks_checked += 1;

        let parts = match PartIter::new(block) {
            Ok(parts) => parts,
            Err(err) => {
                result.problems.push(format!("block {index}: {err}"));
                continue;
            }
        };
        for (position, part) in parts.enumerate() {
            let part = match part {
                Ok(part) => part,
                Err(err) => {
                    result.problems.push(format!("block {index}: {err}"));
                    break;
                }
            };
            result.parts_checked += 1;

            let header = &part.header;
            if header.part_size > header.total_size {
                result.problems.push(format!(
                    "block {index} offset {}: part of {} bytes exceeds message {} of {} bytes",
                    part.offset, header.part_size, header.seq, header.total_size
                ));
            }
            // only the first part of a block may continue a message
            if position > 0 && header.part_index > 0 {
                result.problems.push(format!(
                    "block {index} offset {}: part {} of message {} follows another part",
                    part.offset, header.part_index, header.seq
                ));
            }
        }
    }

    let config = geometry.config(store.block_count());
    if let Err(err) = BlockLog::open(config, store) {
        result.problems.push(format!("recovery: {err}"));
    }
    Ok(result)
}

/// Runs the verify command.
pub fn run(path: &Path, geometry: &Geometry) -> CliResult<()> {
    println!("Verifying image at {}", path.display());
    println!();

    let result = check(path, geometry)?;
    println!("  Live blocks checked: {}", result.blocks_checked);
    println!("  Parts checked:       {}", result.parts_checked);
    for problem in &result.problems {
        println!("  - {problem}");
    }

    println!();
    if result.is_ok() {
        println!("✓ Image verification passed");
        Ok(())
    } else {
        println!("✗ Image verification failed");
        Err(CliError::VerifyFailed {
            problems: result.problems.len(),
        })
    }
}
