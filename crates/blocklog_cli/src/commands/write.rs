//! Write command implementation.

use super::{open_log, Geometry};
use crate::error::CliResult;
use blocklog_core::MessageSeq;
use blocklog_storage::BlockStore;
use std::path::Path;
use tracing::warn;

/// A message accepted by the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Written {
    /// Assigned sequence number.
    pub seq: MessageSeq,
    /// Size in bytes.
    pub size: usize,
}

/// Writes `messages` in order and commits them to the image.
///
/// Messages accepted before a failure are still committed.
pub fn append(path: &Path, geometry: &Geometry, messages: &[String]) -> CliResult<Vec<Written>> {
    let mut log = open_log(path, geometry)?;
    let mut written = Vec::with_capacity(messages.len());

    for message in messages {
        match log.write(message.as_bytes()) {
            Ok(seq) => written.push(Written {
                seq,
                size: message.len(),
            }),
            Err(err) => {
                if err.is_transient() {
                    warn!(error = %err, "write refused; read messages to free blocks");
                }
                if let Err(sync_err) = log.sync() {
                    warn!(error = %sync_err, "could not commit earlier messages");
                }
                return Err(err.into());
            }
        }
    }

    log.sync()?;
    let mut store = log.close().map_err(|err| err.into_parts().1)?;
    store.flush()?;
    Ok(written)
}

/// Runs the write command.
pub fn run(path: &Path, geometry: &Geometry, messages: &[String]) -> CliResult<()> {
    for written in append(path, geometry, messages)? {
        println!("wrote #{} ({} bytes)", written.seq, written.size);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init;
    use crate::error::CliError;
    use blocklog_core::LogError;
    use tempfile::tempdir;

    fn geometry() -> Geometry {
        Geometry {
            block_size: 64,
            nr_blocks: Some(4),
            max_msg_size: None,
            min_part_size: None,
        }
    }

    #[test]
    fn sequences_continue_across_invocations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flash.img");
        init::create(&path, &geometry(), false).unwrap();

        let first = append(&path, &geometry(), &["one".into(), "two".into()]).unwrap();
        assert_eq!(first[0], Written { seq: 1, size: 3 });
        assert_eq!(first[1].seq, 2);

        let second = append(&path, &geometry(), &["three".into()]).unwrap();
        assert_eq!(second[0], Written { seq: 3, size: 5 });
    }

    #[test]
    fn oversized_message_keeps_earlier_ones() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flash.img");
        init::create(&path, &geometry(), false).unwrap();

        let messages = vec!["kept".to_string(), "x".repeat(500)];
        assert!(matches!(
            append(&path, &geometry(), &messages),
            Err(CliError::Log(LogError::InvalidArgument { .. }))
        ));

        let next = append(&path, &geometry(), &["after".into()]).unwrap();
        assert_eq!(next[0].seq, 2);
    }
}
