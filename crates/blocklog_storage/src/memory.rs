//! In-memory block store for testing.

use crate::backend::BlockStore;
use crate::error::{StorageError, StorageResult};

/// An in-memory block store.
///
/// All blocks live in one contiguous byte array, laid out exactly like a
/// memory-mapped flash region. This store is suitable for:
/// - Unit tests
/// - Integration tests (including cold restarts via [`Self::into_bytes`])
/// - Logs kept in RAM that does not need persistence
///
/// # Example
///
/// ```rust
/// use blocklog_storage::{BlockStore, InMemoryBlockStore};
///
/// let store = InMemoryBlockStore::new(512, 2).unwrap();
/// assert_eq!(store.block_count(), 2);
/// assert_eq!(store.as_bytes().len(), 1024);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBlockStore {
    block_size: usize,
    block_count: u32,
    data: Vec<u8>,
}

impl InMemoryBlockStore {
    /// Creates a zero-filled store of `block_count` blocks.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidGeometry`] if either dimension is zero.
    pub fn new(block_size: usize, block_count: u32) -> StorageResult<Self> {
        let len = image_len(block_size, block_count)?;
        Ok(Self {
            block_size,
            block_count,
            data: vec![0; len],
        })
    }

    /// Creates a store over a pre-existing image.
    ///
    /// Useful for testing recovery scenarios.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidGeometry`] if `data` is not a whole,
    /// non-zero number of blocks.
    pub fn from_bytes(block_size: usize, data: Vec<u8>) -> StorageResult<Self> {
        if block_size == 0 || data.is_empty() || data.len() % block_size != 0 {
            return Err(StorageError::InvalidGeometry(format!(
                "image of {} bytes is not a whole number of {}-byte blocks",
                data.len(),
                block_size
            )));
        }
        let block_count = u32::try_from(data.len() / block_size)
            .map_err(|_| StorageError::InvalidGeometry("too many blocks".into()))?;
        Ok(Self {
            block_size,
            block_count,
            data,
        })
    }

    /// Returns the whole image.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns a mutable view of the whole image.
    ///
    /// Bypasses the write path; used to inject corruption in tests.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the store and returns the image.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn range(&self, index: u32) -> std::ops::Range<usize> {
        let start = index as usize * self.block_size;
        start..start + self.block_size
    }
}

impl BlockStore for InMemoryBlockStore {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn write_block(&mut self, index: u32, data: &[u8]) -> StorageResult<()> {
        self.check_write(index, data)?;
        let range = self.range(index);
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    fn block(&self, index: u32) -> StorageResult<&[u8]> {
        self.check_index(index)?;
        Ok(&self.data[self.range(index)])
    }
}

pub(crate) fn image_len(block_size: usize, block_count: u32) -> StorageResult<usize> {
    if block_size == 0 || block_count == 0 {
        return Err(StorageError::InvalidGeometry(format!(
            "{block_count} blocks of {block_size} bytes"
        )));
    }
    block_size
        .checked_mul(block_count as usize)
        .ok_or_else(|| StorageError::InvalidGeometry("image size overflows".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_zeroed() {
        let store = InMemoryBlockStore::new(64, 4).unwrap();
        assert_eq!(store.block_size(), 64);
        assert_eq!(store.block_count(), 4);
        assert!(store.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn memory_zero_geometry_fails() {
        assert!(matches!(
            InMemoryBlockStore::new(0, 4),
            Err(StorageError::InvalidGeometry(_))
        ));
        assert!(matches!(
            InMemoryBlockStore::new(64, 0),
            Err(StorageError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn memory_write_then_view() {
        let mut store = InMemoryBlockStore::new(8, 3).unwrap();
        store.write_block(1, b"abcdefgh").unwrap();

        assert_eq!(store.block(1).unwrap(), b"abcdefgh");
        assert_eq!(store.block(0).unwrap(), &[0; 8]);
        assert_eq!(store.block(2).unwrap(), &[0; 8]);
        assert_eq!(&store.as_bytes()[8..16], b"abcdefgh");
    }

    #[test]
    fn memory_write_out_of_range_fails() {
        let mut store = InMemoryBlockStore::new(8, 2).unwrap();
        let result = store.write_block(2, &[0; 8]);
        assert!(matches!(
            result,
            Err(StorageError::BlockOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn memory_write_wrong_length_fails() {
        let mut store = InMemoryBlockStore::new(8, 2).unwrap();
        let result = store.write_block(0, &[1; 7]);
        assert!(matches!(
            result,
            Err(StorageError::BlockSizeMismatch {
                expected: 8,
                actual: 7
            })
        ));
        assert_eq!(store.block(0).unwrap(), &[0; 8]);
    }

    #[test]
    fn memory_view_out_of_range_fails() {
        let store = InMemoryBlockStore::new(8, 2).unwrap();
        assert!(store.block(5).is_err());
    }

    #[test]
    fn memory_from_bytes_round_trips_image() {
        let mut store = InMemoryBlockStore::new(4, 2).unwrap();
        store.write_block(0, b"wxyz").unwrap();

        let image = store.into_bytes();
        let reopened = InMemoryBlockStore::from_bytes(4, image).unwrap();
        assert_eq!(reopened.block_count(), 2);
        assert_eq!(reopened.block(0).unwrap(), b"wxyz");
    }

    #[test]
    fn memory_from_partial_image_fails() {
        let result = InMemoryBlockStore::from_bytes(4, vec![0; 10]);
        assert!(matches!(result, Err(StorageError::InvalidGeometry(_))));
    }

    #[test]
    fn memory_flush_succeeds() {
        let mut store = InMemoryBlockStore::new(4, 1).unwrap();
        assert!(store.flush().is_ok());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn views_show_last_write(
                writes in prop::collection::vec((0u32..4, any::<u8>()), 0..32)
            ) {
                let mut store = InMemoryBlockStore::new(16, 4).unwrap();
                let mut model = [0u8; 4];
                for (index, fill) in writes {
                    store.write_block(index, &[fill; 16]).unwrap();
                    model[index as usize] = fill;
                }
                for (index, fill) in model.iter().enumerate() {
                    prop_assert_eq!(store.block(index as u32).unwrap(), &[*fill; 16][..]);
                }
            }
        }
    }
}
