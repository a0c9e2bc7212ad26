//! Block store trait definition.

use crate::error::{StorageError, StorageResult};

/// A store of `block_count()` blocks, each exactly `block_size()` bytes.
///
/// This is the adapter between the log engine and the medium (typically
/// raw or QSPI flash). The engine never allocates or frees blocks; it only
/// writes whole blocks and reads through direct views.
///
/// # Invariants
///
/// - `write_block` is all-or-nothing as far as the medium allows: on error
///   the block keeps its previous contents, or, where a write can tear
///   (see [`super::FileBlockStore`]), `block` shows what reached the medium
/// - `block` returns exactly the bytes last written at that index
/// - indices are `0..block_count()`
///
/// # Implementors
///
/// - [`super::InMemoryBlockStore`] - For testing
/// - [`super::FileBlockStore`] - For a flash image on disk
pub trait BlockStore {
    /// Returns the size of every block in bytes.
    fn block_size(&self) -> usize;

    /// Returns the number of blocks in the store.
    fn block_count(&self) -> u32;

    /// Persists a full block at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `index` is out of range
    /// - `data` is not exactly one block long
    /// - An I/O error occurs
    fn write_block(&mut self, index: u32, data: &[u8]) -> StorageResult<()>;

    /// Returns a direct read view of the block at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range or the block cannot be
    /// mapped.
    fn block(&self, index: u32) -> StorageResult<&[u8]>;

    /// Makes all previous writes durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    /// Checks `index` and `data` against the store geometry.
    ///
    /// Implementations call this before touching the medium.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BlockOutOfRange`] or
    /// [`StorageError::BlockSizeMismatch`].
    fn check_write(&self, index: u32, data: &[u8]) -> StorageResult<()> {
        self.check_index(index)?;
        if data.len() != self.block_size() {
            return Err(StorageError::BlockSizeMismatch {
                expected: self.block_size(),
                actual: data.len(),
            });
        }
        Ok(())
    }

    /// Checks that `index` addresses a block of this store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BlockOutOfRange`].
    fn check_index(&self, index: u32) -> StorageResult<()> {
        if index >= self.block_count() {
            return Err(StorageError::BlockOutOfRange {
                index,
                count: self.block_count(),
            });
        }
        Ok(())
    }
}

impl<S: BlockStore + ?Sized> BlockStore for Box<S> {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn block_count(&self) -> u32 {
        (**self).block_count()
    }

    fn write_block(&mut self, index: u32, data: &[u8]) -> StorageResult<()> {
        (**self).write_block(index, data)
    }

    fn block(&self, index: u32) -> StorageResult<&[u8]> {
        (**self).block(index)
    }

    fn flush(&mut self) -> StorageResult<()> {
        (**self).flush()
    }
}
