//! Fault injection for block stores.
//!
//! [`FaultyBlockStore`] wraps a real store and fails writes, reads or flushes
//! on command. The switches live behind a shared [`FaultSwitch`] handle so a
//! test can flip them after the store has been moved into a
//! [`blocklog_core::BlockLog`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blocklog_testkit::faulty::FaultyBlockStore;
//!
//! let store = FaultyBlockStore::new(InMemoryBlockStore::new(64, 4)?);
//! let switch = store.switch();
//! let mut log = BlockLog::open(config, store)?;
//! switch.fail_after_writes(0);
//! assert!(log.sync().is_err());
//! ```

use blocklog_storage::{BlockStore, StorageError, StorageResult};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Switches {
    fail_after_writes: AtomicUsize,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_on_flush: AtomicBool,
    failed: AtomicBool,
}

/// Shared handle to the fault switches of a [`FaultyBlockStore`].
#[derive(Debug, Clone)]
pub struct FaultSwitch {
    switches: Arc<Switches>,
}

impl FaultSwitch {
    fn new() -> Self {
        Self {
            switches: Arc::new(Switches {
                fail_after_writes: AtomicUsize::new(usize::MAX),
                writes: AtomicUsize::new(0),
                fail_reads: AtomicBool::new(false),
                fail_on_flush: AtomicBool::new(false),
                failed: AtomicBool::new(false),
            }),
        }
    }

    /// Lets `count` more block writes succeed, then fails every write.
    pub fn fail_after_writes(&self, count: usize) {
        let done = self.switches.writes.load(Ordering::SeqCst);
        self.switches
            .fail_after_writes
            .store(done.saturating_add(count), Ordering::SeqCst);
    }

    /// Sets whether block reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.switches.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Sets whether flush should fail.
    pub fn set_fail_on_flush(&self, fail: bool) {
        self.switches.fail_on_flush.store(fail, Ordering::SeqCst);
    }

    /// Clears every switch. The write counter keeps counting.
    pub fn reset(&self) {
        self.switches
            .fail_after_writes
            .store(usize::MAX, Ordering::SeqCst);
        self.switches.fail_reads.store(false, Ordering::SeqCst);
        self.switches.fail_on_flush.store(false, Ordering::SeqCst);
        self.switches.failed.store(false, Ordering::SeqCst);
    }

    /// Number of block writes that reached the inner store.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.switches.writes.load(Ordering::SeqCst)
    }

    /// Returns whether any fault has fired since the last reset.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.switches.failed.load(Ordering::SeqCst)
    }

    fn fault(&self, what: &str) -> StorageError {
        self.switches.failed.store(true, Ordering::SeqCst);
        StorageError::Io(io::Error::other(format!("simulated failure during {what}")))
    }
}

/// A block store wrapper that can simulate I/O failures.
#[derive(Debug)]
pub struct FaultyBlockStore<S> {
    inner: S,
    switch: FaultSwitch,
}

impl<S: BlockStore> FaultyBlockStore<S> {
    /// Wraps `inner` with every switch off.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            switch: FaultSwitch::new(),
        }
    }

    /// Returns a handle to this store's switches.
    #[must_use]
    pub fn switch(&self) -> FaultSwitch {
        self.switch.clone()
    }

    /// Returns the wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwraps the store.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: BlockStore> BlockStore for FaultyBlockStore<S> {
    fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    fn block_count(&self) -> u32 {
        self.inner.block_count()
    }

    fn write_block(&mut self, index: u32, data: &[u8]) -> StorageResult<()> {
        let switches = &self.switch.switches;
        if switches.writes.load(Ordering::SeqCst) >= switches.fail_after_writes.load(Ordering::SeqCst)
        {
            return Err(self.switch.fault("block write"));
        }
        self.inner.write_block(index, data)?;
        switches.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn block(&self, index: u32) -> StorageResult<&[u8]> {
        if self.switch.switches.fail_reads.load(Ordering::SeqCst) {
            return Err(self.switch.fault("block read"));
        }
        self.inner.block(index)
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.switch.switches.fail_on_flush.load(Ordering::SeqCst) {
            return Err(self.switch.fault("flush"));
        }
        self.inner.flush()
    }
}
