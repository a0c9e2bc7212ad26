//! Read command implementation.

use super::{open_log, Geometry, OutputFormat};
use crate::error::CliResult;
use blocklog_core::{LogError, MessageSeq};
use blocklog_storage::BlockStore;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// A message as reported by the read command.
#[derive(Debug, Serialize)]
pub struct ReadRecord {
    /// Sequence number.
    pub seq: MessageSeq,
    /// Size in bytes.
    pub size: usize,
    /// Message bytes as text, invalid UTF-8 replaced.
    pub text: String,
}

/// Outcome of a read run.
#[derive(Debug, Default, Serialize)]
pub struct ReadReport {
    /// Messages read, oldest first.
    pub messages: Vec<ReadRecord>,
    /// Messages lost to corruption along the way.
    pub corrupted: usize,
}

/// Reads up to `count` messages, or all of them.
///
/// Blocks read to their end are invalidated on the image. Messages read
/// from a block that still holds unread data are read again next time.
pub fn consume(path: &Path, geometry: &Geometry, count: Option<usize>) -> CliResult<ReadReport> {
    let mut log = open_log(path, geometry)?;
    let mut report = ReadReport::default();
    let limit = count.unwrap_or(usize::MAX);

    while report.messages.len() < limit {
        match log.read_message() {
            Ok(message) => report.messages.push(ReadRecord {
                seq: message.seq,
                size: message.data.len(),
                text: String::from_utf8_lossy(&message.data).into_owned(),
            }),
            Err(LogError::ReadAll) => break,
            Err(LogError::Corrupted { message }) => {
                warn!(%message, "skipped corrupted message");
                report.corrupted += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    let mut store = log.close().map_err(|err| err.into_parts().1)?;
    store.flush()?;
    Ok(report)
}

/// Runs the read command.
pub fn run(
    path: &Path,
    geometry: &Geometry,
    count: Option<usize>,
    format: OutputFormat,
) -> CliResult<()> {
    let report = consume(path, geometry, count)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for record in &report.messages {
                println!(
                    "#{} ({} bytes): {}",
                    record.seq,
                    record.size,
                    record.text.trim_end_matches('\0')
                );
            }
            if report.corrupted > 0 {
                println!("{} corrupted message(s) skipped", report.corrupted);
            }
        }
    }
    Ok(())
}
