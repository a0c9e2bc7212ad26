//! Ring exhaustion and store failures.

use blocklog_core::{BlockLog, LogError};
use blocklog_storage::InMemoryBlockStore;
use blocklog_testkit::prelude::*;

type FaultyLog = BlockLog<FaultyBlockStore<InMemoryBlockStore>>;

fn faulty_log() -> (FaultyLog, FaultSwitch) {
    let config = small_config();
    let store = FaultyBlockStore::new(InMemoryBlockStore::new(64, 4).unwrap());
    let switch = store.switch();
    (BlockLog::open(config, store).unwrap(), switch)
}

#[test]
fn full_ring_rejects_write_until_a_block_is_read() {
    let mut log = memory_log(small_config());
    // 32 bytes fill a block exactly
    for round in 1u8..=4 {
        log.write(&[round; 32]).unwrap();
    }
    assert_eq!(log.commit_count(), 3);
    assert_eq!(log.stats().free_blocks, 0);

    let before = log.stats();
    assert!(matches!(
        log.write(&[5u8; 32]),
        Err(LogError::NoSpaceLeftInBuffer)
    ));
    assert_eq!(log.stats(), before);

    assert_eq!(log.read_message().unwrap().data, vec![1u8; 32]);
    assert_eq!(log.write(&[5u8; 32]).unwrap(), 5);

    let rest = drain_ok(&mut log);
    let seqs: Vec<_> = rest.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![2, 3, 4, 5]);
    assert_eq!(rest[3].data, vec![5u8; 32]);
}

#[test]
fn sync_on_full_ring_keeps_staging() {
    let mut log = memory_log(small_config());
    for round in 1u8..=3 {
        log.write(&[round; 8]).unwrap();
        log.sync().unwrap();
    }
    log.write(b"waiting").unwrap();

    assert!(matches!(log.sync(), Err(LogError::NoSpaceLeftInBuffer)));
    assert_eq!(log.stats().staged_bytes, 16 + 7);

    log.read_message().unwrap();
    log.sync().unwrap();
    assert_eq!(log.stats().staged_bytes, 0);
    assert_eq!(log.commit_count(), 4);
}

#[test]
fn message_larger_than_free_ring_is_rejected_whole() {
    let mut log = memory_log(small_config());
    log.write(&[1u8; 32]).unwrap();
    log.write(&[2u8; 32]).unwrap();
    log.write(&[3u8; 32]).unwrap();
    // two commits done, one free block left; 96 bytes need three
    let before = log.stats();
    assert!(matches!(
        log.write(&[4u8; 96]),
        Err(LogError::NoSpaceLeftInBuffer)
    ));
    assert_eq!(log.stats(), before);
    assert_eq!(drain_ok(&mut log).len(), 3);
}

#[test]
fn failed_commit_rolls_back_the_message() {
    let (mut log, switch) = faulty_log();
    log.write(&[1u8; 32]).unwrap();

    switch.fail_after_writes(0);
    let before = log.stats();
    assert!(matches!(log.write(b"second"), Err(LogError::Storage(_))));
    assert!(switch.has_failed());
    assert_eq!(log.stats(), before);

    switch.reset();
    assert_eq!(log.write(b"second").unwrap(), 2);
    let messages = drain_ok(&mut log);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].data, b"second");
}

#[test]
fn failure_after_partial_commit_is_reported_on_read() {
    let (mut log, switch) = faulty_log();
    switch.fail_after_writes(1);

    // 90 bytes need two commits; the second one fails
    assert!(matches!(log.write(&[7u8; 90]), Err(LogError::Storage(_))));
    assert_eq!(log.commit_count(), 1);
    assert_eq!(log.stats().staged_bytes, 0);

    switch.reset();
    assert_eq!(log.write(b"after").unwrap(), 2);

    let outcomes = drain(&mut log);
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], Err(LogError::Corrupted { .. })));
    let after = outcomes[1].as_ref().unwrap();
    assert_eq!((after.seq, after.data.as_slice()), (2, &b"after"[..]));
}

#[test]
fn failed_sync_keeps_cursors_and_staging() {
    let (mut log, switch) = faulty_log();
    log.write(b"pending").unwrap();
    let before = log.stats();

    switch.fail_after_writes(0);
    assert!(matches!(log.sync(), Err(LogError::Storage(_))));
    assert_eq!(log.stats(), before);

    switch.reset();
    log.sync().unwrap();
    assert_eq!(log.stats().write_index, 1);
    assert_eq!(log.read_message().unwrap().data, b"pending");
}

#[test]
fn failed_invalidation_leaves_message_readable() {
    let (mut log, switch) = faulty_log();
    log.write(b"kept").unwrap();
    log.sync().unwrap();
    let before = log.stats();

    switch.fail_after_writes(0);
    assert!(matches!(log.read_message(), Err(LogError::Storage(_))));
    assert_eq!(log.stats(), before);

    switch.reset();
    assert_eq!(log.read_message().unwrap().data, b"kept");
    assert!(log.is_empty());
}

#[test]
fn failed_block_read_is_a_storage_error() {
    let (mut log, switch) = faulty_log();
    log.write(b"on flash").unwrap();
    log.sync().unwrap();
    let before = log.stats();

    switch.set_fail_reads(true);
    assert!(matches!(log.read_message(), Err(LogError::Storage(_))));
    assert_eq!(log.stats(), before);

    switch.reset();
    assert_eq!(log.read_message().unwrap().data, b"on flash");
}
