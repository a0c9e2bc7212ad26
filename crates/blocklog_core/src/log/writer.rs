//! Packing messages into parts and committing the staging block.

use super::BlockLog;
use crate::error::{LogError, LogResult};
use crate::format::{PartHeader, PART_HEADER_SIZE};
use crate::seq::{self, MessageSeq};
use blocklog_storage::BlockStore;
use tracing::{debug, warn};

impl<S: BlockStore> BlockLog<S> {
    /// Appends one message and returns its sequence number.
    ///
    /// The message is split into parts that fill the staging block; each
    /// time the staging block runs out of room it is committed to the next
    /// slot of the ring. A part smaller than [`crate::Config::min_part_size`]
    /// is never started at the end of a block unless it is the message tail.
    ///
    /// # Errors
    ///
    /// - [`LogError::InvalidArgument`] if `data` is empty or longer than
    ///   [`crate::Config::max_msg_size`]
    /// - [`LogError::NoSpaceLeftInBuffer`] if the ring cannot take the
    ///   commits this message needs; nothing is written
    /// - [`LogError::Storage`] if a commit fails
    pub fn write(&mut self, data: &[u8]) -> LogResult<MessageSeq> {
        if data.is_empty() {
            return Err(LogError::invalid_argument("cannot write an empty message"));
        }
        if data.len() > self.config.max_msg_size {
            return Err(LogError::invalid_argument(format!(
                "message of {} bytes exceeds maximum of {} bytes",
                data.len(),
                self.config.max_msg_size
            )));
        }
        // validated config keeps max_msg_size within u32
        let total_size = data.len() as u32;

        let commits = self.commits_needed(data.len());
        if commits > self.free_blocks() {
            warn!(
                size = data.len(),
                commits,
                free_blocks = self.free_blocks(),
                "ring full, message rejected"
            );
            return Err(LogError::NoSpaceLeftInBuffer);
        }

        let seq = seq::next(self.last_msg_seq);
        let staged_before = self.staging.used();
        let commits_before = self.commit_count;

        if let Err(err) = self.pack(seq, total_size, data) {
            if self.commit_count == commits_before {
                self.staging.truncate(staged_before);
            } else {
                // a prefix reached flash; retire the sequence so the
                // reader reports it instead of splicing the next message
                self.staging.clear();
                self.last_msg_seq = seq;
            }
            return Err(err);
        }

        self.last_msg_seq = seq;
        debug!(seq, size = data.len(), "wrote message");
        Ok(seq)
    }

    /// Commits the staging block to the next slot of the ring.
    ///
    /// Does nothing if nothing is staged.
    ///
    /// # Errors
    ///
    /// - [`LogError::NoSpaceLeftInBuffer`] if the next slot still holds
    ///   unread data
    /// - [`LogError::Storage`] if the block write fails; no cursor moves
    pub fn sync(&mut self) -> LogResult<()> {
        if self.staging.is_empty() {
            return Ok(());
        }
        let next_index = self.next_index(self.write_index);
        if next_index == self.read_index {
            warn!(
                write_index = self.write_index,
                read_index = self.read_index,
                "ring full, cannot commit staging block"
            );
            return Err(LogError::NoSpaceLeftInBuffer);
        }

        let sequence = seq::next(self.last_block_seq);
        let used = self.staging.used();
        let block = self.staging.seal(sequence);
        self.store.write_block(self.write_index, block)?;

        debug!(
            block = self.write_index,
            seq = sequence,
            used,
            "committed staging block"
        );

        self.last_block_seq = sequence;
        self.commit_count += 1;
        self.write_index = next_index;
        self.staging.clear();
        Ok(())
    }

    fn pack(&mut self, seq: MessageSeq, total_size: u32, data: &[u8]) -> LogResult<()> {
        let mut remaining = data;
        let mut part_index = 0u32;

        while !remaining.is_empty() {
            let wanted = PART_HEADER_SIZE + self.config.min_part_size.min(remaining.len());
            if wanted > self.staging.space() {
                self.sync()?;
            }

            let room = self.staging.space() - PART_HEADER_SIZE;
            let (payload, rest) = remaining.split_at(remaining.len().min(room));
            let header = PartHeader {
                seq,
                total_size,
                part_index,
                part_size: payload.len() as u32,
            };
            self.staging.append(&header, payload);

            remaining = rest;
            part_index += 1;
        }
        Ok(())
    }

    /// Number of commits packing `len` more bytes would trigger.
    fn commits_needed(&self, len: usize) -> u32 {
        let capacity = self.config.block_capacity();
        let mut used = self.staging.used();
        let mut remaining = len;
        let mut commits = 0;

        while remaining > 0 {
            let wanted = PART_HEADER_SIZE + self.config.min_part_size.min(remaining);
            if wanted > capacity - used {
                if used > 0 {
                    commits += 1;
                }
                used = 0;
            }
            let part = remaining.min(capacity - used - PART_HEADER_SIZE);
            used += PART_HEADER_SIZE + part;
            remaining -= part;
        }
        commits
    }
}

#[cfg(test)]
mod tests {
    use crate::format::{BlockHeader, PartIter, BLOCK_HEADER_SIZE, PART_HEADER_SIZE};
    use crate::{BlockLog, Config, LogError};
    use blocklog_storage::{BlockStore, InMemoryBlockStore};

    fn open(block_size: usize, nr_blocks: u32, min_part: usize) -> BlockLog<InMemoryBlockStore> {
        let config = Config::new()
            .block_size(block_size)
            .nr_blocks(nr_blocks)
            .max_msg_size(block_size)
            .min_part_size(min_part);
        let store = InMemoryBlockStore::new(block_size, nr_blocks).unwrap();
        BlockLog::open(config, store).unwrap()
    }

    #[test]
    fn write_assigns_increasing_sequences() {
        let mut log = open(512, 2, 16);
        assert_eq!(log.write(b"This is a test message1\0").unwrap(), 1);
        assert_eq!(log.write(b"This is diff len test message2\0").unwrap(), 2);
        assert_eq!(log.commit_count(), 0);
        assert_eq!(log.stats().staged_bytes, 2 * PART_HEADER_SIZE + 24 + 31);
    }

    #[test]
    fn write_rejects_empty_and_oversized() {
        let mut log = open(64, 4, 8);
        assert!(matches!(
            log.write(b""),
            Err(LogError::InvalidArgument { .. })
        ));
        assert!(matches!(
            log.write(&[0u8; 65]),
            Err(LogError::InvalidArgument { .. })
        ));
        assert_eq!(log.stats().last_msg_seq, 0);
    }

    #[test]
    fn span_commits_first_part_and_stages_tail() {
        let mut log = open(64, 4, 32);
        let message = [0x5Au8; 51];
        log.write(&message).unwrap();

        assert_eq!(log.commit_count(), 1);
        let block = log.store().block(0).unwrap();
        let header = BlockHeader::decode(block).unwrap();
        assert_eq!(header.sequence, 1);
        assert_eq!(header.used_size as usize, 48);

        let parts: Vec<_> = PartIter::new(block).unwrap().map(Result::unwrap).collect();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].header.part_index, 0);
        assert_eq!(parts[0].header.part_size, 32);
        assert_eq!(parts[0].header.total_size, 51);
        assert_eq!(log.stats().staged_bytes, PART_HEADER_SIZE + 19);
    }

    #[test]
    fn min_part_size_moves_message_to_fresh_block() {
        let mut log = open(64, 4, 16);
        // leaves 48 - 36 = 12 bytes, too few for a 16-byte part plus header
        log.write(&[1u8; 20]).unwrap();
        log.write(&[2u8; 10]).unwrap();

        assert_eq!(log.commit_count(), 1);
        let block = log.store().block(0).unwrap();
        assert_eq!(BlockHeader::decode(block).unwrap().used_size, 36);
        assert_eq!(log.stats().staged_bytes, PART_HEADER_SIZE + 10);
    }

    #[test]
    fn short_tail_uses_leftover_space() {
        let mut log = open(64, 4, 16);
        log.write(&[1u8; 10]).unwrap();
        // 22 bytes left: below min part size, but the whole message fits
        log.write(&[2u8; 5]).unwrap();

        assert_eq!(log.commit_count(), 0);
        assert_eq!(log.stats().staged_bytes, 26 + 21);
    }

    #[test]
    fn sync_without_data_is_noop() {
        let mut log = open(64, 4, 8);
        log.sync().unwrap();
        assert_eq!(log.commit_count(), 0);
        assert!(log.store().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn sync_advances_write_index_and_sequence() {
        let mut log = open(64, 4, 8);
        log.write(b"one").unwrap();
        log.sync().unwrap();
        log.write(b"two").unwrap();
        log.sync().unwrap();

        let stats = log.stats();
        assert_eq!(stats.write_index, 2);
        assert_eq!(stats.last_block_seq, 2);
        assert_eq!(stats.staged_bytes, 0);
        assert_eq!(
            BlockHeader::sequence_of(log.store().block(1).unwrap()).unwrap(),
            2
        );
    }

    #[test]
    fn sync_refuses_to_overwrite_unread_block() {
        let mut log = open(64, 3, 8);
        log.write(b"a").unwrap();
        log.sync().unwrap();
        log.write(b"b").unwrap();
        log.sync().unwrap();
        log.write(b"c").unwrap();

        assert!(matches!(log.sync(), Err(LogError::NoSpaceLeftInBuffer)));
        assert_eq!(log.stats().write_index, 2);
        assert_eq!(log.stats().staged_bytes, PART_HEADER_SIZE + 1);
    }

    #[test]
    fn write_fails_cleanly_when_ring_full() {
        let mut log = open(64, 2, 8);
        log.write(&[7u8; 32]).unwrap();
        log.write(&[8u8; 32]).unwrap();
        assert_eq!(log.commit_count(), 1);

        let before = log.stats();
        assert!(matches!(
            log.write(&[9u8; 32]),
            Err(LogError::NoSpaceLeftInBuffer)
        ));
        assert_eq!(log.stats(), before);
    }

    #[test]
    fn staged_layout_matches_committed_block() {
        let mut log = open(64, 4, 8);
        log.write(b"abc").unwrap();
        log.sync().unwrap();

        let block = log.store().block(0).unwrap();
        let used = &block[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + PART_HEADER_SIZE + 3];
        assert_eq!(&used[0..4], &1u32.to_le_bytes());
        assert_eq!(&used[4..8], &3u32.to_le_bytes());
        assert_eq!(&used[8..12], &0u32.to_le_bytes());
        assert_eq!(&used[12..16], &3u32.to_le_bytes());
        assert_eq!(&used[16..], b"abc");
    }
}
