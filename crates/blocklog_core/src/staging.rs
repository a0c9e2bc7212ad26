//! Volatile staging block.

use crate::error::LogResult;
use crate::format::{part_at, BlockHeader, Part, PartHeader, BLOCK_HEADER_SIZE, PART_HEADER_SIZE};
use crate::seq::BlockSeq;

/// The block currently being filled, kept in RAM until it is committed.
///
/// Holds the exact on-flash layout so committing is one raw block write.
/// The block header is only stamped by [`Self::seal`]; until then its bytes
/// stay zero. Parts are appended at the back and consumed from the front
/// when a reader catches up with the writer.
#[derive(Debug, Clone)]
pub(crate) struct StagingBuffer {
    block: Vec<u8>,
    used: usize,
}

impl StagingBuffer {
    pub(crate) fn new(block_size: usize) -> Self {
        Self {
            block: vec![0; block_size],
            used: 0,
        }
    }

    /// Bytes of part data staged.
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Bytes still free for parts, headers included.
    pub(crate) fn space(&self) -> usize {
        self.block.len() - BLOCK_HEADER_SIZE - self.used
    }

    /// Appends a part. The caller sizes it to fit [`Self::space`].
    pub(crate) fn append(&mut self, header: &PartHeader, payload: &[u8]) {
        debug_assert_eq!(header.part_size as usize, payload.len());
        debug_assert!(header.encoded_len() <= self.space());

        let at = BLOCK_HEADER_SIZE + self.used;
        header.encode_into(&mut self.block[at..at + PART_HEADER_SIZE]);
        let data_at = at + PART_HEADER_SIZE;
        self.block[data_at..data_at + payload.len()].copy_from_slice(payload);
        self.used += header.encoded_len();
    }

    /// Returns the oldest staged part, if any.
    pub(crate) fn front(&self) -> Option<LogResult<Part<'_>>> {
        if self.is_empty() {
            return None;
        }
        Some(part_at(self.data(), 0))
    }

    /// Removes the first `len` bytes of part data, shifting the rest forward.
    pub(crate) fn consume_front(&mut self, len: usize) {
        let len = len.min(self.used);
        let start = BLOCK_HEADER_SIZE;
        let end = start + self.used;
        self.block.copy_within(start + len..end, start);
        self.used -= len;
        self.block[start + self.used..end].fill(0);
    }

    /// Drops everything after the first `used` bytes of part data.
    pub(crate) fn truncate(&mut self, used: usize) {
        if used < self.used {
            let start = BLOCK_HEADER_SIZE;
            self.block[start + used..start + self.used].fill(0);
            self.used = used;
        }
    }

    /// Stamps the block header and returns the full block image.
    pub(crate) fn seal(&mut self, sequence: BlockSeq) -> &[u8] {
        BlockHeader {
            sequence,
            used_size: self.used as u32,
        }
        .encode_into(&mut self.block);
        &self.block
    }

    /// Resets to an empty block.
    pub(crate) fn clear(&mut self) {
        self.block.fill(0);
        self.used = 0;
    }

    fn data(&self) -> &[u8] {
        &self.block[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + self.used]
    }
}
