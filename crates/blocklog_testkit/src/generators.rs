//! Property-based test generators using proptest.
//!
//! Provides strategies for messages and log geometries that satisfy the
//! engine's configuration rules.

use blocklog_core::{Config, BLOCK_HEADER_SIZE, PART_HEADER_SIZE};
use proptest::prelude::*;

/// Strategy for a single message of `1..=max_size` arbitrary bytes.
pub fn message_strategy(max_size: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_size.max(1))
}

/// Strategy for a batch of up to `max_count` messages.
pub fn messages_strategy(
    max_size: usize,
    max_count: usize,
) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(message_strategy(max_size), 1..=max_count.max(1))
}

/// Strategy for valid configurations with small blocks.
///
/// Small blocks make spanning and ring wrap-around frequent.
pub fn config_strategy() -> impl Strategy<Value = Config> {
    (48usize..=160, 2u32..=8)
        .prop_flat_map(|(block_size, nr_blocks)| {
            let payload = block_size - BLOCK_HEADER_SIZE - PART_HEADER_SIZE;
            let ring = payload * nr_blocks as usize;
            (
                Just(block_size),
                Just(nr_blocks),
                1..=payload,
                1..=ring.min(4 * block_size),
            )
        })
        .prop_map(|(block_size, nr_blocks, min_part, max_msg)| {
            Config::new()
                .block_size(block_size)
                .nr_blocks(nr_blocks)
                .min_part_size(min_part)
                .max_msg_size(max_msg)
        })
}

/// One step of a randomized workload.
#[derive(Debug, Clone)]
pub enum LogOperation {
    /// Write a message
    Write {
        /// Message bytes
        data: Vec<u8>,
    },
    /// Commit the staging block
    Sync,
    /// Read one message
    Read,
}

/// Strategy for a workload step with messages of up to `max_size` bytes.
pub fn log_operation_strategy(max_size: usize) -> impl Strategy<Value = LogOperation> {
    prop_oneof![
        3 => message_strategy(max_size).prop_map(|data| LogOperation::Write { data }),
        1 => Just(LogOperation::Sync),
        2 => Just(LogOperation::Read),
    ]
}

/// Strategy for a sequence of workload steps.
pub fn operation_sequence_strategy(
    max_size: usize,
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<LogOperation>> {
    prop::collection::vec(log_operation_strategy(max_size), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
