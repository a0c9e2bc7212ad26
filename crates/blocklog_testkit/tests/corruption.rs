//! Damaged images: the reader reports corruption and moves on.

use blocklog_core::{BlockLog, LogError, BLOCK_HEADER_SIZE};
use blocklog_storage::InMemoryBlockStore;
use blocklog_testkit::prelude::*;

const BLOCK: usize = 64;

/// Writes the standard three-block image: a 40-byte message spanning
/// blocks 0 and 1, "bee" after its tail in block 1, and "sea" in block 2.
fn three_blocks() -> BlockLog<InMemoryBlockStore> {
    let mut log = memory_log(small_config());
    log.write(&[0xA5; 40]).unwrap();
    log.write(b"bee").unwrap();
    log.sync().unwrap();
    log.write(b"sea").unwrap();
    log.sync().unwrap();
    assert_eq!(log.commit_count(), 3);
    log
}

fn patched(
    log: BlockLog<InMemoryBlockStore>,
    patch: impl FnOnce(&mut [u8]),
) -> BlockLog<InMemoryBlockStore> {
    let config = log.config().clone();
    let mut image = log.close().unwrap().into_bytes();
    patch(&mut image);
    let store = InMemoryBlockStore::from_bytes(BLOCK, image).unwrap();
    BlockLog::open(config, store).unwrap()
}

/// Offset of the first part header of `block` in the image.
fn first_part(block: usize) -> usize {
    block * BLOCK + BLOCK_HEADER_SIZE
}

#[test]
fn mismatched_sequence_skips_to_next_block() {
    let mut log = patched(three_blocks(), |image| {
        let at = first_part(1);
        image[at..at + 4].copy_from_slice(&99u32.to_le_bytes());
    });

    assert!(matches!(
        log.read_message(),
        Err(LogError::Corrupted { .. })
    ));
    let next = log.read_message().unwrap();
    assert_eq!(next.data, b"sea");
    assert_eq!(next.seq, 3);
    assert!(matches!(log.read_message(), Err(LogError::ReadAll)));
}

#[test]
fn mismatched_part_index_skips_to_next_block() {
    let mut log = patched(three_blocks(), |image| {
        let at = first_part(1) + 8;
        image[at..at + 4].copy_from_slice(&7u32.to_le_bytes());
    });

    let outcomes = drain(&mut log);
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], Err(LogError::Corrupted { .. })));
    assert_eq!(outcomes[1].as_ref().unwrap().data, b"sea");
}

#[test]
fn used_size_overrun_is_reported_not_panicked() {
    let mut log = patched(three_blocks(), |image| {
        image[4..8].copy_from_slice(&999u32.to_le_bytes());
    });

    let outcomes = drain(&mut log);
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], Err(LogError::Corrupted { .. })));
    assert_eq!(outcomes[1].as_ref().unwrap().data, b"bee");
    assert_eq!(outcomes[2].as_ref().unwrap().data, b"sea");
}

#[test]
fn part_overrunning_its_message_is_corrupted() {
    let mut log = patched(three_blocks(), |image| {
        // claim the first message is only 10 bytes long
        let at = first_part(0) + 4;
        image[at..at + 4].copy_from_slice(&10u32.to_le_bytes());
    });

    // the tail of the lost message in block 1 is passed over quietly
    let outcomes = drain(&mut log);
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], Err(LogError::Corrupted { .. })));
    let bee = outcomes[1].as_ref().unwrap();
    assert_eq!((bee.seq, bee.data.as_slice()), (2, &b"bee"[..]));
    let sea = outcomes[2].as_ref().unwrap();
    assert_eq!((sea.seq, sea.data.as_slice()), (3, &b"sea"[..]));
}

#[test]
fn skipped_block_is_invalidated() {
    let mut log = patched(three_blocks(), |image| {
        let at = first_part(0) + 4;
        image[at..at + 4].copy_from_slice(&10u32.to_le_bytes());
    });

    assert!(matches!(
        log.read_message(),
        Err(LogError::Corrupted { .. })
    ));
    assert_eq!(log.store().as_bytes()[..4], [0; 4]);
}

#[test]
fn read_messages_stay_consumed_after_reopen() {
    let mut log = memory_log(small_config().nr_blocks(5));
    for message in [b"AAAA", b"BBBB", b"CCCC"] {
        log.write(message).unwrap();
        log.sync().unwrap();
    }
    let mut log = patched(log, |image| {
        let at = first_part(0) + 4;
        image[at..at + 4].copy_from_slice(&1u32.to_le_bytes());
    });

    let outcomes = drain(&mut log);
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], Err(LogError::Corrupted { .. })));
    assert_eq!(outcomes[1].as_ref().unwrap().data, b"BBBB");
    assert_eq!(outcomes[2].as_ref().unwrap().data, b"CCCC");

    log.write(b"DDDD").unwrap();
    log.sync().unwrap();
    let mut log = reopen(log);

    let messages = drain_ok(&mut log);
    assert_eq!(messages.len(), 1);
    assert_eq!((messages[0].seq, messages[0].data.as_slice()), (4, &b"DDDD"[..]));
}

#[test]
fn commit_after_skipped_block_survives_reopen() {
    let mut log = patched(three_blocks(), |image| {
        let at = first_part(0) + 4;
        image[at..at + 4].copy_from_slice(&10u32.to_le_bytes());
    });
    let _ = drain(&mut log);

    log.write(b"late").unwrap();
    log.sync().unwrap();
    let mut log = reopen(log);

    let stats = log.stats();
    assert_eq!((stats.read_index, stats.write_index), (3, 0));
    assert_eq!(stats.pending_blocks, 1);
    let messages = drain_ok(&mut log);
    assert_eq!(messages.len(), 1);
    assert_eq!((messages[0].seq, messages[0].data.as_slice()), (4, &b"late"[..]));
}

#[test]
fn writes_continue_after_corruption() {
    let mut log = patched(three_blocks(), |image| {
        let at = first_part(1);
        image[at..at + 4].copy_from_slice(&99u32.to_le_bytes());
    });
    let _ = drain(&mut log);

    let seq = log.write(b"fresh").unwrap();
    assert_eq!(seq, 4);
    let message = log.read_message().unwrap();
    assert_eq!((message.seq, message.data.as_slice()), (4, &b"fresh"[..]));
}
