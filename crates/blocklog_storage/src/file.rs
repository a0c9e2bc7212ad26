//! File-backed block store holding a flash image.

use crate::backend::BlockStore;
use crate::error::{StorageError, StorageResult};
use crate::memory::image_len;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A block store persisted in a pre-sized image file.
///
/// The whole image is mirrored in memory so [`BlockStore::block`] can hand
/// out direct views, the way a memory-mapped flash part does. Writes go to
/// the file first; the mirror takes the new bytes once the file write
/// succeeded, and is re-read from the file after a failed one.
///
/// # Durability
///
/// - `write_block()` writes the block through to the OS
/// - `flush()` calls `File::sync_all()` to ensure data is on disk
/// - a file cannot make a block write atomic: if `write_block()` fails part
///   way, the view is re-read from the file and may show a torn block
///
/// # Example
///
/// ```no_run
/// use blocklog_storage::{BlockStore, FileBlockStore};
/// use std::path::Path;
///
/// let mut store = FileBlockStore::create(Path::new("flash.img"), 4096, 16).unwrap();
/// store.write_block(0, &[0u8; 4096]).unwrap();
/// store.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBlockStore {
    path: PathBuf,
    file: File,
    block_size: usize,
    block_count: u32,
    mirror: Vec<u8>,
}

impl FileBlockStore {
    /// Creates a new zero-filled image, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the geometry is invalid or the file cannot be
    /// created.
    pub fn create(path: &Path, block_size: usize, block_count: u32) -> StorageResult<Self> {
        let len = image_len(block_size, block_count)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mirror = vec![0u8; len];
        file.write_all(&mirror)?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            block_size,
            block_count,
            mirror,
        })
    }

    /// Opens an existing image of `block_size`-byte blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its length is not a
    /// whole, non-zero number of blocks.
    pub fn open(path: &Path, block_size: usize) -> StorageResult<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut mirror = Vec::new();
        file.read_to_end(&mut mirror)?;

        if block_size == 0 || mirror.is_empty() || mirror.len() % block_size != 0 {
            return Err(StorageError::InvalidGeometry(format!(
                "{} is {} bytes, not a whole number of {}-byte blocks",
                path.display(),
                mirror.len(),
                block_size
            )));
        }
        let block_count = u32::try_from(mirror.len() / block_size)
            .map_err(|_| StorageError::InvalidGeometry("too many blocks".into()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            block_size,
            block_count,
            mirror,
        })
    }

    fn write_through(&mut self, start: usize, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(start as u64))?;
        self.file.write_all(data)?;
        self.file.flush()
    }

    /// Refreshes the mirror of the block at byte offset `start` from the file.
    fn reload(&mut self, start: usize) -> io::Result<()> {
        let mut block = vec![0u8; self.block_size];
        self.file.seek(SeekFrom::Start(start as u64))?;
        self.file.read_exact(&mut block)?;
        self.mirror[start..start + self.block_size].copy_from_slice(&block);
        Ok(())
    }

    /// Returns the path to the image file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockStore for FileBlockStore {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn write_block(&mut self, index: u32, data: &[u8]) -> StorageResult<()> {
        self.check_write(index, data)?;

        let start = index as usize * self.block_size;
        if let Err(err) = self.write_through(start, data) {
            // a torn write may have reached the file; show what is there now.
            // If the file cannot be read either, the old view is kept.
            let _ = self.reload(start);
            return Err(err.into());
        }

        self.mirror[start..start + self.block_size].copy_from_slice(data);
        Ok(())
    }

    fn block(&self, index: u32) -> StorageResult<&[u8]> {
        self.check_index(index)?;
        let start = index as usize * self.block_size;
        Ok(&self.mirror[start..start + self.block_size])
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
