//! # blocklog testkit
//!
//! Test utilities for blocklog.
//!
//! This crate provides:
//! - A fault-injecting block store for I/O failure tests
//! - Property-based test generators using proptest
//! - Fixtures for in-memory and file-backed logs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blocklog_testkit::prelude::*;
//!
//! #[test]
//! fn survives_reopen() {
//!     let mut log = memory_log(small_config());
//!     log.write(b"hello").unwrap();
//!     log.sync().unwrap();
//!     let mut log = reopen(log);
//!     assert_eq!(log.read_message().unwrap().data, b"hello");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
