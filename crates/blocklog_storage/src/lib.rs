//! # blocklog storage
//!
//! Block store trait and implementations for blocklog.
//!
//! This crate provides the lowest-level storage abstraction for blocklog:
//! a fixed number of fixed-size blocks, addressed by index. Block stores are
//! **opaque** - they do not interpret the bytes they hold.
//!
//! ## Design Principles
//!
//! - A store writes whole blocks and hands out direct read views
//! - No knowledge of block headers, parts or messages
//! - The log engine owns all format interpretation
//!
//! ## Available Stores
//!
//! - [`InMemoryBlockStore`] - For testing and RAM-backed logs
//! - [`FileBlockStore`] - A flash image kept in a regular file
//!
//! ## Example
//!
//! ```rust
//! use blocklog_storage::{BlockStore, InMemoryBlockStore};
//!
//! let mut store = InMemoryBlockStore::new(64, 4).unwrap();
//! store.write_block(1, &[0xAB; 64]).unwrap();
//! assert_eq!(store.block(1).unwrap()[0], 0xAB);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::BlockStore;
pub use error::{StorageError, StorageResult};
pub use file::FileBlockStore;
pub use memory::InMemoryBlockStore;
