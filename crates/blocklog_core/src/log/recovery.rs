//! Cold-start recovery of the cursors from the blocks on flash.

use super::BlockLog;
use crate::error::{LogError, LogResult};
use crate::format::{BlockHeader, PartIter};
use crate::seq::{self, BlockSeq};
use blocklog_storage::BlockStore;
use tracing::{debug, warn};

impl<S: BlockStore> BlockLog<S> {
    /// Rebuilds every cursor from the block headers and parts on flash.
    pub(super) fn recover(&mut self) -> LogResult<()> {
        let mut live: Vec<(BlockSeq, u32)> = Vec::new();
        let (mut min_idx, mut min_seq): (u32, BlockSeq) = (0, 0);
        let (mut max_idx, mut max_seq): (u32, BlockSeq) = (0, 0);

        for index in 0..self.config.nr_blocks {
            let sequence = BlockHeader::sequence_of(self.store.block(index)?)?;
            if sequence == 0 {
                continue;
            }
            if min_seq == 0 || seq::is_newer(min_seq, sequence) {
                min_idx = index;
                min_seq = sequence;
            }
            if max_seq == 0 || seq::is_newer(sequence, max_seq) {
                max_idx = index;
                max_seq = sequence;
            }
            live.push((sequence, index));
        }

        // both or neither
        if (min_seq > 0) != (max_seq > 0) {
            return Err(LogError::corrupted(format!(
                "min(seq={min_seq}, idx={min_idx}), max(seq={max_seq}, idx={max_idx}): \
                 expected both or neither sequence to be set"
            )));
        }
        // equal sequences only for one and the same block
        if (min_seq == max_seq) != (min_idx == max_idx) {
            return Err(LogError::corrupted(format!(
                "min(seq={min_seq}, idx={min_idx}), max(seq={max_seq}, idx={max_idx}): \
                 expected both or neither to coincide"
            )));
        }
        live.sort_unstable();
        if let Some(pair) = live.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(LogError::corrupted(format!(
                "blocks {} and {} both carry sequence {}",
                pair[0].1, pair[1].1, pair[0].0
            )));
        }

        if min_seq == 0 {
            return Ok(());
        }
        // a full ring is indistinguishable from an empty one
        if live.len() == self.config.nr_blocks as usize {
            return Err(LogError::corrupted(format!(
                "all {} blocks are live, no free slot left",
                live.len()
            )));
        }

        self.read_index = min_idx;
        self.write_index = self.next_index(max_idx);
        self.last_block_seq = max_seq;

        self.skip_consumed_parts()?;
        self.recover_last_msg_seq(max_idx)?;
        Ok(())
    }

    /// Moves the read cursor past continuation parts at the head of the
    /// oldest block; their messages started in blocks read before shutdown.
    fn skip_consumed_parts(&mut self) -> LogResult<()> {
        while self.read_index != self.write_index {
            let block = self.store.block(self.read_index)?;
            let mut parts = match PartIter::new(block) {
                Ok(parts) => parts,
                // leave it to the reader to report and step over
                Err(_) => return Ok(()),
            };

            loop {
                let offset = parts.offset();
                match parts.next() {
                    Some(Ok(part)) if part.header.part_index > 0 => {
                        debug!(
                            block = self.read_index,
                            seq = part.header.seq,
                            part = part.header.part_index,
                            "skipping part of a message read before shutdown"
                        );
                    }
                    Some(Ok(_)) | Some(Err(_)) => {
                        self.read_offset = offset;
                        return Ok(());
                    }
                    None => break,
                }
            }

            // every part continued an earlier message
            debug!(block = self.read_index, "block holds no message start");
            self.read_index = self.next_index(self.read_index);
            self.read_offset = 0;
        }
        Ok(())
    }

    /// Continues message numbering after the last part of the newest block.
    fn recover_last_msg_seq(&mut self, newest: u32) -> LogResult<()> {
        let block = self.store.block(newest)?;
        let parts = match PartIter::new(block) {
            Ok(parts) => parts,
            Err(err) => {
                warn!(block = newest, error = %err, "newest block unreadable");
                return Ok(());
            }
        };
        for part in parts {
            match part {
                Ok(part) => self.last_msg_seq = part.header.seq,
                Err(err) => {
                    warn!(block = newest, error = %err, "newest block truncated");
                    break;
                }
            }
        }
        Ok(())
    }
}
