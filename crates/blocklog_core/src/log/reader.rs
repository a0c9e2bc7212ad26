//! Reassembling messages from committed blocks and the staging block.

use super::BlockLog;
use crate::error::{LogError, LogResult};
use crate::format::{self, BlockHeader, PartHeader, BLOCK_HEADER_SIZE, PART_HEADER_SIZE};
use crate::seq::MessageSeq;
use blocklog_storage::BlockStore;
use tracing::{debug, error, warn};

/// Sequence and size of a message returned by [`BlockLog::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadInfo {
    /// Sequence assigned when the message was written.
    pub seq: MessageSeq,
    /// Size of the message in bytes.
    pub size: usize,
}

/// A message returned by [`BlockLog::read_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sequence assigned when the message was written.
    pub seq: MessageSeq,
    /// The message bytes.
    pub data: Vec<u8>,
}

/// Where the next part comes from.
#[derive(Debug, Clone, Copy)]
enum Source {
    Flash { used_size: usize },
    Staging,
}

/// Message being reassembled.
#[derive(Debug, Clone, Copy)]
struct Assembly {
    seq: MessageSeq,
    total_size: u32,
    parts: u32,
    filled: usize,
}

impl<S: BlockStore> BlockLog<S> {
    /// Reads the oldest unread message into `buf`.
    ///
    /// Parts in committed blocks are read in place; a block is invalidated
    /// on flash once its last part has been read. Parts in the staging block
    /// are removed from it as they are read.
    ///
    /// # Errors
    ///
    /// - [`LogError::InvalidArgument`] if `buf` is empty
    /// - [`LogError::ReadAll`] if nothing is left to read
    /// - [`LogError::BufferTooSmall`] if the message does not fit; no cursor
    ///   moves, so a retry with a larger buffer succeeds
    /// - [`LogError::Corrupted`] if the parts do not line up; the read cursor
    ///   steps over the offending block and the message is lost
    /// - [`LogError::Storage`] if the store fails
    pub fn read(&mut self, buf: &mut [u8]) -> LogResult<ReadInfo> {
        if buf.is_empty() {
            return Err(LogError::invalid_argument("read buffer is empty"));
        }

        let mut assembly: Option<Assembly> = None;
        loop {
            let (source, header) = self.next_part(assembly.is_some())?;

            if assembly.is_none() && self.skip_continuations {
                if header.part_index > 0 {
                    debug!(
                        seq = header.seq,
                        part = header.part_index,
                        "skipping part of a message lost to corruption"
                    );
                    self.advance(source, &header)?;
                    continue;
                }
                self.skip_continuations = false;
            }

            if let Err(message) = check_continuity(assembly.as_ref(), &header) {
                return Err(self.corrupted(source, assembly.as_ref(), &header, message));
            }

            let mut current = match assembly {
                Some(current) => current,
                None => {
                    let needed = header.total_size as usize;
                    if needed > buf.len() {
                        return Err(LogError::BufferTooSmall {
                            needed,
                            available: buf.len(),
                        });
                    }
                    Assembly {
                        seq: header.seq,
                        total_size: header.total_size,
                        parts: 0,
                        filled: 0,
                    }
                }
            };

            let len = header.part_size as usize;
            self.copy_payload(source, &mut buf[current.filled..current.filled + len])?;
            self.advance(source, &header)?;

            current.filled += len;
            current.parts += 1;
            if current.filled >= current.total_size as usize {
                debug!(seq = current.seq, size = current.filled, "read message");
                return Ok(ReadInfo {
                    seq: current.seq,
                    size: current.filled,
                });
            }
            assembly = Some(current);
        }
    }

    /// Reads the oldest unread message into a new buffer.
    ///
    /// # Errors
    ///
    /// Same as [`Self::read`], except that the buffer is always large enough.
    pub fn read_message(&mut self) -> LogResult<Message> {
        let mut data = vec![0u8; self.config.max_msg_size];
        let info = self.read(&mut data)?;
        data.truncate(info.size);
        Ok(Message {
            seq: info.seq,
            data,
        })
    }

    /// Locates the next part header, from flash if a committed block is
    /// unread, otherwise from the staging block.
    fn next_part(&mut self, in_message: bool) -> LogResult<(Source, PartHeader)> {
        if self.read_index != self.write_index {
            let block = self.store.block(self.read_index)?;
            let lookup = format::used_region(block).and_then(|used| {
                let part = format::part_at(used, self.read_offset)?;
                Ok((used.len(), part.header))
            });
            return match lookup {
                Ok((used_size, header)) => Ok((Source::Flash { used_size }, header)),
                Err(err) => {
                    error!(
                        block = self.read_index,
                        offset = self.read_offset,
                        error = %err,
                        "malformed part on flash"
                    );
                    self.skip_block();
                    Err(err)
                }
            };
        }

        match self.staging.front() {
            None if in_message => {
                error!("data corruption: message ends before its last part");
                Err(LogError::corrupted(
                    "message ends before its last part was written",
                ))
            }
            None => Err(LogError::ReadAll),
            Some(Ok(part)) => Ok((Source::Staging, part.header)),
            Some(Err(err)) => {
                error!(error = %err, "malformed part in staging block");
                self.staging.clear();
                Err(err)
            }
        }
    }

    fn copy_payload(&self, source: Source, out: &mut [u8]) -> LogResult<()> {
        match source {
            Source::Flash { .. } => {
                let block = self.store.block(self.read_index)?;
                let start = BLOCK_HEADER_SIZE + self.read_offset + PART_HEADER_SIZE;
                out.copy_from_slice(&block[start..start + out.len()]);
            }
            Source::Staging => {
                if let Some(Ok(part)) = self.staging.front() {
                    out.copy_from_slice(part.payload);
                }
            }
        }
        Ok(())
    }

    /// Moves the read cursor past a part that has been copied out.
    fn advance(&mut self, source: Source, header: &PartHeader) -> LogResult<()> {
        match source {
            Source::Flash { used_size } => {
                let end = self.read_offset + header.encoded_len();
                if end >= used_size {
                    self.invalidate_block(self.read_index)?;
                    self.read_offset = 0;
                    self.read_index = self.next_index(self.read_index);
                } else {
                    self.read_offset = end;
                }
            }
            Source::Staging => self.staging.consume_front(header.encoded_len()),
        }
        Ok(())
    }

    /// Marks a fully read block as consumed on flash.
    fn invalidate_block(&mut self, index: u32) -> LogResult<()> {
        let mut block = self.store.block(index)?.to_vec();
        let mut header = BlockHeader::decode(&block)?;
        header.sequence = 0;
        header.encode_into(&mut block);
        self.store.write_block(index, &block)?;
        debug!(block = index, "block invalidated");
        Ok(())
    }

    /// Steps the flash cursor over a damaged block.
    ///
    /// The block is invalidated as well, so recovery never starts from it
    /// again. If that write fails the cursor still moves.
    fn skip_block(&mut self) {
        if let Err(err) = self.invalidate_block(self.read_index) {
            warn!(block = self.read_index, error = %err, "could not invalidate damaged block");
        }
        self.read_index = self.next_index(self.read_index);
        self.read_offset = 0;
        self.skip_continuations = true;
    }

    /// Reports a continuity violation and moves past the offending data.
    fn corrupted(
        &mut self,
        source: Source,
        assembly: Option<&Assembly>,
        header: &PartHeader,
        message: String,
    ) -> LogError {
        let (seq, total, parts, filled) =
            assembly.map_or((0, 0, 0, 0), |a| (a.seq, a.total_size, a.parts, a.filled));
        error!(
            seq,
            total,
            parts,
            filled,
            next_seq = header.seq,
            next_total = header.total_size,
            next_part = header.part_index,
            next_size = header.part_size,
            "data corruption: {message}"
        );

        match source {
            Source::Flash { .. } => self.skip_block(),
            // a stray part at the head would block every later read
            Source::Staging if assembly.is_none() => {
                self.staging.consume_front(header.encoded_len());
            }
            Source::Staging => {}
        }
        LogError::corrupted(message)
    }
}

/// Checks that `header` continues the message being assembled.
fn check_continuity(assembly: Option<&Assembly>, header: &PartHeader) -> Result<(), String> {
    match assembly {
        None if header.part_index != 0 => {
            return Err(format!(
                "message {} starts with part {}",
                header.seq, header.part_index
            ));
        }
        None if header.total_size == 0 => {
            return Err(format!("message {} has no data", header.seq));
        }
        None => {}
        Some(current)
            if header.seq != current.seq
                || header.total_size != current.total_size
                || header.part_index != current.parts =>
        {
            return Err(format!(
                "expected part {} of message {} ({} bytes), found part {} of message {} ({} bytes)",
                current.parts,
                current.seq,
                current.total_size,
                header.part_index,
                header.seq,
                header.total_size
            ));
        }
        Some(_) => {}
    }

    let filled = assembly.map_or(0, |a| a.filled);
    if filled + header.part_size as usize > header.total_size as usize {
        return Err(format!(
            "part {} of message {} overruns its {} bytes",
            header.part_index, header.seq, header.total_size
        ));
    }
    Ok(())
}
