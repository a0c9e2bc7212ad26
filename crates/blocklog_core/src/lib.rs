//! # blocklog core
//!
//! A message-oriented append log over a fixed array of fixed-size blocks.
//!
//! This crate provides:
//! - Packing of messages into parts that fill blocks tightly
//! - A volatile staging block that defers flash writes until it is full
//!   or explicitly synced
//! - Reads that span committed blocks and the staging block transparently
//! - Cold-start recovery of all cursors from the block headers on flash
//!
//! ## Example
//!
//! ```rust
//! use blocklog_core::{BlockLog, Config};
//! use blocklog_storage::InMemoryBlockStore;
//!
//! let config = Config::new()
//!     .block_size(512)
//!     .nr_blocks(4)
//!     .max_msg_size(256)
//!     .min_part_size(32);
//! let store = InMemoryBlockStore::new(512, 4).unwrap();
//! let mut log = BlockLog::open(config, store).unwrap();
//!
//! let seq = log.write(b"hello flash").unwrap();
//! let mut buf = [0u8; 256];
//! let info = log.read(&mut buf).unwrap();
//! assert_eq!(info.seq, seq);
//! assert_eq!(&buf[..info.size], b"hello flash");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod format;
mod log;
pub mod seq;
mod staging;

pub use config::Config;
pub use error::{LogError, LogResult};
pub use format::{BlockHeader, Part, PartHeader, PartIter, BLOCK_HEADER_SIZE, PART_HEADER_SIZE};
pub use log::{BlockLog, CloseError, LogStats, Message, ReadInfo};
pub use seq::{BlockSeq, MessageSeq};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
