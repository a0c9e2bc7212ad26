//! Test fixtures and log helpers.
//!
//! Provides convenience functions for setting up logs over in-memory and
//! file-backed stores and for simulating a power cycle.

use blocklog_core::{BlockLog, Config, LogError, Message};
use blocklog_storage::{BlockStore, FileBlockStore, InMemoryBlockStore};
use std::path::PathBuf;
use tempfile::TempDir;

/// Geometry used by most tests: 4 blocks of 64 bytes.
#[must_use]
pub fn small_config() -> Config {
    Config::new()
        .block_size(64)
        .nr_blocks(4)
        .max_msg_size(96)
        .min_part_size(16)
}

/// Opens a log over a zeroed in-memory store matching `config`.
pub fn memory_log(config: Config) -> BlockLog<InMemoryBlockStore> {
    let store = InMemoryBlockStore::new(config.block_size, config.nr_blocks)
        .expect("Failed to create in-memory store");
    BlockLog::open(config, store).expect("Failed to open log")
}

/// Simulates a power cycle: staged data is lost, flash survives.
///
/// The log is reopened with the same configuration over a copy of the
/// flash image.
pub fn reopen(log: BlockLog<InMemoryBlockStore>) -> BlockLog<InMemoryBlockStore> {
    let config = log.config().clone();
    let image = log.store().as_bytes().to_vec();
    drop(log);
    let store = InMemoryBlockStore::from_bytes(config.block_size, image)
        .expect("Failed to rebuild in-memory store");
    BlockLog::open(config, store).expect("Failed to reopen log")
}

/// Reads until [`LogError::ReadAll`], collecting every other outcome.
///
/// Stops after a generous bound so a reader that fails to make progress
/// fails the test instead of hanging it.
pub fn drain<S: BlockStore>(log: &mut BlockLog<S>) -> Vec<Result<Message, LogError>> {
    let limit = log.config().nr_blocks as usize * log.config().block_size + 1;
    let mut outcomes = Vec::new();
    for _ in 0..limit {
        match log.read_message() {
            Err(LogError::ReadAll) => return outcomes,
            outcome => outcomes.push(outcome),
        }
    }
    panic!("reader made no progress after {limit} reads");
}

/// Reads every remaining message, panicking on any error but the end.
pub fn drain_ok<S: BlockStore>(log: &mut BlockLog<S>) -> Vec<Message> {
    drain(log)
        .into_iter()
        .map(|outcome| outcome.expect("Unexpected read error"))
        .collect()
}

/// A file-backed log in a temporary directory.
pub struct TestFileLog {
    /// The log instance.
    pub log: BlockLog<FileBlockStore>,
    /// Path of the flash image.
    pub path: PathBuf,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestFileLog {
    /// Creates a zeroed image matching `config` and opens a log over it.
    pub fn create(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("flash.img");
        let store = FileBlockStore::create(&path, config.block_size, config.nr_blocks)
            .expect("Failed to create image");
        let log = BlockLog::open(config, store).expect("Failed to open file log");
        Self {
            log,
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Closes the log and opens the image again from disk.
    ///
    /// Staged data must have been synced; the close fails otherwise.
    pub fn reopen(self) -> Self {
        let config = self.log.config().clone();
        drop(self.log.close().expect("Failed to close file log"));
        let store =
            FileBlockStore::open(&self.path, config.block_size).expect("Failed to open image");
        let log = BlockLog::open(config, store).expect("Failed to reopen file log");
        Self {
            log,
            path: self.path,
            _temp_dir: self._temp_dir,
        }
    }
}

impl std::ops::Deref for TestFileLog {
    type Target = BlockLog<FileBlockStore>;

    fn deref(&self) -> &Self::Target {
        &self.log
    }
}

impl std::ops::DerefMut for TestFileLog {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.log
    }
}
