//! Log configuration.

use crate::error::{LogError, LogResult};
use crate::format::{BLOCK_HEADER_SIZE, PART_HEADER_SIZE};

/// Configuration for opening a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Size of every block in bytes.
    pub block_size: usize,

    /// Number of blocks in the ring.
    pub nr_blocks: u32,

    /// Largest message accepted by `write`.
    pub max_msg_size: usize,

    /// Smallest fragment the packer leaves at the end of a block.
    ///
    /// When fewer bytes fit, the staging block is committed and the part
    /// starts in a fresh block. The tail of a message may be smaller.
    pub min_part_size: usize,

    /// Whether `close` commits staged data instead of failing.
    pub sync_on_close: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: 4096,
            nr_blocks: 16,
            max_msg_size: 1024,
            min_part_size: 64,
            sync_on_close: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block size.
    #[must_use]
    pub const fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the number of blocks.
    #[must_use]
    pub const fn nr_blocks(mut self, count: u32) -> Self {
        self.nr_blocks = count;
        self
    }

    /// Sets the maximum message size.
    #[must_use]
    pub const fn max_msg_size(mut self, size: usize) -> Self {
        self.max_msg_size = size;
        self
    }

    /// Sets the minimum part size.
    #[must_use]
    pub const fn min_part_size(mut self, size: usize) -> Self {
        self.min_part_size = size;
        self
    }

    /// Sets whether `close` syncs staged data.
    #[must_use]
    pub const fn sync_on_close(mut self, value: bool) -> Self {
        self.sync_on_close = value;
        self
    }

    /// Bytes available for parts in one block.
    #[must_use]
    pub const fn block_capacity(&self) -> usize {
        self.block_size.saturating_sub(BLOCK_HEADER_SIZE)
    }

    /// Largest payload a single part can carry.
    #[must_use]
    pub const fn max_part_payload(&self) -> usize {
        self.block_capacity().saturating_sub(PART_HEADER_SIZE)
    }

    /// Checks that the configuration can drive a log.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> LogResult<()> {
        if self.max_part_payload() == 0 {
            return Err(LogError::invalid_config(format!(
                "block size {} leaves no room for part data after {} header bytes",
                self.block_size,
                BLOCK_HEADER_SIZE + PART_HEADER_SIZE
            )));
        }
        if u32::try_from(self.block_size).is_err() {
            return Err(LogError::invalid_config(format!(
                "block size {} does not fit the 32-bit used size field",
                self.block_size
            )));
        }
        if self.nr_blocks < 2 {
            return Err(LogError::invalid_config(format!(
                "need at least 2 blocks, got {}",
                self.nr_blocks
            )));
        }
        if self.min_part_size == 0 || self.min_part_size > self.max_part_payload() {
            return Err(LogError::invalid_config(format!(
                "min part size {} must be within 1..={}",
                self.min_part_size,
                self.max_part_payload()
            )));
        }
        let ring_payload = self
            .max_part_payload()
            .saturating_mul(self.nr_blocks as usize);
        if self.max_msg_size == 0 || self.max_msg_size > ring_payload {
            return Err(LogError::invalid_config(format!(
                "max message size {} must be within 1..={} for {} blocks of {} bytes",
                self.max_msg_size, ring_payload, self.nr_blocks, self.block_size
            )));
        }
        if u32::try_from(self.max_msg_size).is_err() {
            return Err(LogError::invalid_config(format!(
                "max message size {} does not fit the 32-bit size field",
                self.max_msg_size
            )));
        }
        Ok(())
    }
}
