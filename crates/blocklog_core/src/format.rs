//! On-flash block and part layout.
//!
//! A block and the staging buffer share one byte-identical layout, which is
//! what makes a commit a single raw block write:
//!
//! ```text
//! | BlockHeader (16) | PartHeader (16) | payload | PartHeader (16) | payload | ... | unused |
//! ```
//!
//! ```text
//! BlockHeader: | sequence u32 | used_size u32 | reserved (8) |
//! PartHeader:  | seq u32 | total_size u32 | part_index u32 | part_size u32 |
//! ```
//!
//! All integers are little-endian. `used_size` counts the bytes of parts
//! following the block header. A `sequence` of `0` marks a block that was
//! never written or has been fully read.

use crate::error::{LogError, LogResult};
use crate::seq::{BlockSeq, MessageSeq};

/// Size of the block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 16;

/// Size of a part header in bytes.
pub const PART_HEADER_SIZE: usize = 16;

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(word)
}

fn write_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Header at the start of every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    /// Commit sequence, `0` if empty or consumed.
    pub sequence: BlockSeq,
    /// Bytes of part data after the header.
    pub used_size: u32,
}

impl BlockHeader {
    /// Reads only the sequence of a block.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Corrupted`] if the block is shorter than a header.
    pub fn sequence_of(block: &[u8]) -> LogResult<BlockSeq> {
        Ok(Self::decode(block)?.sequence)
    }

    /// Decodes the header at the start of `block`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Corrupted`] if the block is shorter than a header.
    pub fn decode(block: &[u8]) -> LogResult<Self> {
        if block.len() < BLOCK_HEADER_SIZE {
            return Err(LogError::corrupted(format!(
                "block of {} bytes cannot hold a header",
                block.len()
            )));
        }
        Ok(Self {
            sequence: read_u32(block, 0),
            used_size: read_u32(block, 4),
        })
    }

    /// Encodes the header into the first [`BLOCK_HEADER_SIZE`] bytes of `block`.
    pub fn encode_into(&self, block: &mut [u8]) {
        write_u32(block, 0, self.sequence);
        write_u32(block, 4, self.used_size);
        block[8..BLOCK_HEADER_SIZE].fill(0);
    }
}

/// Header in front of every part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartHeader {
    /// Sequence of the owning message.
    pub seq: MessageSeq,
    /// Total size of the owning message across all parts.
    pub total_size: u32,
    /// Index of this part within the message, starting at 0.
    pub part_index: u32,
    /// Payload bytes following this header.
    pub part_size: u32,
}

impl PartHeader {
    /// Decodes the part header at `offset` in `data`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Corrupted`] if the header does not fit.
    pub fn decode_at(data: &[u8], offset: usize) -> LogResult<Self> {
        if offset + PART_HEADER_SIZE > data.len() {
            return Err(LogError::corrupted(format!(
                "part header at offset {offset} overruns {} used bytes",
                data.len()
            )));
        }
        Ok(Self {
            seq: read_u32(data, offset),
            total_size: read_u32(data, offset + 4),
            part_index: read_u32(data, offset + 8),
            part_size: read_u32(data, offset + 12),
        })
    }

    /// Encodes the header into `out[..PART_HEADER_SIZE]`.
    pub fn encode_into(&self, out: &mut [u8]) {
        write_u32(out, 0, self.seq);
        write_u32(out, 4, self.total_size);
        write_u32(out, 8, self.part_index);
        write_u32(out, 12, self.part_size);
    }

    /// Bytes the part occupies, header included.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        PART_HEADER_SIZE + self.part_size as usize
    }
}

/// A part found inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part<'a> {
    /// Offset of the part header relative to the end of the block header.
    pub offset: usize,
    /// The decoded part header.
    pub header: PartHeader,
    /// The payload bytes.
    pub payload: &'a [u8],
}

/// Walks the parts packed into a used region.
///
/// Stops after the first structural error, so iteration always terminates.
#[derive(Debug, Clone)]
pub struct PartIter<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> PartIter<'a> {
    /// Iterates over the parts of a whole block (header included).
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Corrupted`] if the header's `used_size` overruns
    /// the block.
    pub fn new(block: &'a [u8]) -> LogResult<Self> {
        Ok(Self::over(used_region(block)?))
    }

    /// Iterates over an already extracted used region.
    #[must_use]
    pub fn over(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            failed: false,
        }
    }

    /// Offset of the next part to be yielded.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for PartIter<'a> {
    type Item = LogResult<Part<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        match part_at(self.data, self.offset) {
            Ok(part) => {
                self.offset += part.header.encoded_len();
                Some(Ok(part))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Returns the used region of a block: the part bytes after its header.
///
/// # Errors
///
/// Returns [`LogError::Corrupted`] if `used_size` overruns the block.
pub fn used_region(block: &[u8]) -> LogResult<&[u8]> {
    let header = BlockHeader::decode(block)?;
    let end = BLOCK_HEADER_SIZE + header.used_size as usize;
    if end > block.len() {
        return Err(LogError::corrupted(format!(
            "block used size {} overruns block of {} bytes",
            header.used_size,
            block.len()
        )));
    }
    Ok(&block[BLOCK_HEADER_SIZE..end])
}

/// Decodes the part at `offset` in a used region, payload included.
///
/// # Errors
///
/// Returns [`LogError::Corrupted`] if the header or payload overruns `data`.
pub fn part_at(data: &[u8], offset: usize) -> LogResult<Part<'_>> {
    let header = PartHeader::decode_at(data, offset)?;
    let start = offset + PART_HEADER_SIZE;
    let end = start + header.part_size as usize;
    if end > data.len() {
        return Err(LogError::corrupted(format!(
            "part {} of message {} ({} bytes at offset {offset}) overruns {} used bytes",
            header.part_index,
            header.seq,
            header.part_size,
            data.len()
        )));
    }
    Ok(Part {
        offset,
        header,
        payload: &data[start..end],
    })
}
