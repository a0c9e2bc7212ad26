//! The block log engine.
//!
//! ## Cursors
//!
//! - `write_index` is the block slot that receives the next commit
//! - `read_index`/`read_offset` locate the next part to read on flash
//! - `read_index == write_index` means no committed block is left unread;
//!   reads then come from the staging block
//!
//! One slot always stays free, so a ring of `n` blocks holds at most `n - 1`
//! committed unread blocks plus the staging block.
//!
//! ## Persisted progress
//!
//! The only read progress written to flash is the invalidation of a block
//! (its sequence reset to `0`) once its last part has been read. Recovery
//! reconstructs finer progress from part indices, so a message may be read
//! again after a restart if the restart happens before its block was
//! invalidated.

mod reader;
mod recovery;
mod writer;

use crate::config::Config;
use crate::error::{LogError, LogResult};
use crate::seq::{BlockSeq, MessageSeq};
use crate::staging::StagingBuffer;
use blocklog_storage::BlockStore;
use std::fmt;
use tracing::debug;

pub use reader::{Message, ReadInfo};

/// A message log packed into the fixed blocks of a [`BlockStore`].
///
/// The engine is single-threaded: every operation runs to completion on the
/// caller's thread. Share it across threads only behind external locking.
pub struct BlockLog<S: BlockStore> {
    config: Config,
    store: S,
    staging: StagingBuffer,
    /// Sequence of the most recently committed block, 0 = none.
    last_block_seq: BlockSeq,
    write_index: u32,
    read_index: u32,
    read_offset: usize,
    /// Set after a damaged block is skipped: leading continuation parts
    /// belong to a lost message.
    skip_continuations: bool,
    /// Highest message sequence assigned, 0 = none.
    last_msg_seq: MessageSeq,
    commit_count: u64,
}

impl<S: BlockStore> BlockLog<S> {
    /// Opens a log over `store`, recovering cursors from the block headers.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] if the configuration is unusable
    /// or does not match the store geometry, [`LogError::Corrupted`] if the
    /// block sequences are inconsistent, and [`LogError::Storage`] if a block
    /// cannot be read.
    pub fn open(config: Config, store: S) -> LogResult<Self> {
        config.validate()?;
        if store.block_size() != config.block_size || store.block_count() != config.nr_blocks {
            return Err(LogError::invalid_config(format!(
                "store has {} blocks of {} bytes, config expects {} blocks of {} bytes",
                store.block_count(),
                store.block_size(),
                config.nr_blocks,
                config.block_size
            )));
        }

        let mut log = Self {
            staging: StagingBuffer::new(config.block_size),
            config,
            store,
            last_block_seq: 0,
            write_index: 0,
            read_index: 0,
            read_offset: 0,
            skip_continuations: false,
            last_msg_seq: 0,
            commit_count: 0,
        };
        log.recover()?;

        debug!(
            nr_blocks = log.config.nr_blocks,
            block_size = log.config.block_size,
            last_block_seq = log.last_block_seq,
            last_msg_seq = log.last_msg_seq,
            write_index = log.write_index,
            read_index = log.read_index,
            read_offset = log.read_offset,
            "opened block log"
        );
        Ok(log)
    }

    /// Closes the log and hands back the store.
    ///
    /// Staged data is committed first when [`Config::sync_on_close`] is set.
    ///
    /// # Errors
    ///
    /// Fails with [`LogError::UnsyncedData`] if the staging block is not
    /// empty and may not be synced, or with the sync error. The log is
    /// returned inside the error so nothing staged is lost.
    pub fn close(mut self) -> Result<S, CloseError<S>> {
        if !self.staging.is_empty() {
            let result = if self.config.sync_on_close {
                self.sync()
            } else {
                Err(LogError::UnsyncedData {
                    staged: self.staging.used(),
                })
            };
            if let Err(error) = result {
                return Err(CloseError {
                    log: Box::new(self),
                    error,
                });
            }
        }
        debug!(commit_count = self.commit_count, "closed block log");
        Ok(self.store)
    }

    /// Number of blocks committed to the store by this instance.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    /// Returns the configuration the log was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns `true` if nothing is committed-unread or staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_index == self.write_index && self.staging.is_empty()
    }

    /// Returns a snapshot of the cursors and counters.
    #[must_use]
    pub fn stats(&self) -> LogStats {
        LogStats {
            last_block_seq: self.last_block_seq,
            last_msg_seq: self.last_msg_seq,
            write_index: self.write_index,
            read_index: self.read_index,
            read_offset: self.read_offset,
            staged_bytes: self.staging.used(),
            pending_blocks: self.pending_blocks(),
            free_blocks: self.free_blocks(),
            commit_count: self.commit_count,
        }
    }

    /// Index following `index` around the ring.
    fn next_index(&self, index: u32) -> u32 {
        let next = index + 1;
        if next == self.config.nr_blocks {
            0
        } else {
            next
        }
    }

    /// Committed blocks not yet fully read.
    fn pending_blocks(&self) -> u32 {
        let n = u64::from(self.config.nr_blocks);
        ((u64::from(self.write_index) + n - u64::from(self.read_index)) % n) as u32
    }

    /// Commits the ring can still take before reaching the read cursor.
    fn free_blocks(&self) -> u32 {
        self.config.nr_blocks - 1 - self.pending_blocks()
    }
}

impl<S: BlockStore> fmt::Debug for BlockLog<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockLog")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// A snapshot of the engine's cursors and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStats {
    /// Sequence of the most recently committed block.
    pub last_block_seq: BlockSeq,
    /// Highest message sequence assigned.
    pub last_msg_seq: MessageSeq,
    /// Slot receiving the next commit.
    pub write_index: u32,
    /// Slot read next.
    pub read_index: u32,
    /// Offset of the next part within the read block.
    pub read_offset: usize,
    /// Bytes of part data in the staging block.
    pub staged_bytes: usize,
    /// Committed blocks not yet fully read.
    pub pending_blocks: u32,
    /// Commits possible before the ring is full.
    pub free_blocks: u32,
    /// Blocks committed by this instance.
    pub commit_count: u64,
}

/// Error returned by [`BlockLog::close`], carrying the still-open log.
pub struct CloseError<S: BlockStore> {
    log: Box<BlockLog<S>>,
    error: LogError,
}

impl<S: BlockStore> CloseError<S> {
    /// Returns the reason the close failed.
    #[must_use]
    pub fn error(&self) -> &LogError {
        &self.error
    }

    /// Recovers the log, e.g. to sync it and close again.
    #[must_use]
    pub fn into_log(self) -> BlockLog<S> {
        *self.log
    }

    /// Splits into the log and the error.
    #[must_use]
    pub fn into_parts(self) -> (BlockLog<S>, LogError) {
        (*self.log, self.error)
    }
}

impl<S: BlockStore> fmt::Debug for CloseError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<S: BlockStore> fmt::Display for CloseError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to close block log: {}", self.error)
    }
}

impl<S: BlockStore> std::error::Error for CloseError<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
