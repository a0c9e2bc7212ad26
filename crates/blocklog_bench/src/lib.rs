//! Benchmark utilities.

use blocklog_core::{BlockLog, Config};
use blocklog_storage::InMemoryBlockStore;
use rand::Rng;

/// Geometry used by the log benchmarks: 64 blocks of 4 KiB.
#[must_use]
pub fn bench_config(max_msg_size: usize) -> Config {
    Config::new()
        .block_size(4096)
        .nr_blocks(64)
        .max_msg_size(max_msg_size)
        .min_part_size(64)
}

/// Generate random message data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Opens a log over a zeroed in-memory store.
///
/// # Panics
///
/// Panics if `config` is unusable.
pub fn memory_log(config: Config) -> BlockLog<InMemoryBlockStore> {
    let store = InMemoryBlockStore::new(config.block_size, config.nr_blocks)
        .expect("Failed to create in-memory store");
    BlockLog::open(config, store).expect("Failed to open log")
}

/// Builds a flash image with `blocks` committed blocks of `size`-byte
/// messages, for recovery benchmarks.
///
/// # Panics
///
/// Panics if the messages do not fit the ring.
pub fn committed_image(config: &Config, blocks: u64, size: usize) -> Vec<u8> {
    let mut log = memory_log(config.clone());
    let data = random_data(size);
    while log.commit_count() < blocks {
        log.write(&data).expect("Failed to fill image");
    }
    log.store().as_bytes().to_vec()
}
