//! Tests for reopening a CommitLog under various conditions.
//!
//! A log must be recovered after:
//! - A normal close
//! - A drop without close
//! - An index left at full capacity with a zero-filled tail
//! - A store cut in the middle of a frame
//! - A last segment that is already full

use std::fs::OpenOptions;

use pretty_assertions::assert_eq;

use crate::errors::LogError;
use crate::segment::Segment;
use crate::testing::payload;
use crate::tests::context::TestContext;
use crate::SegmentId;

#[test]
fn test_reopen() -> Result<(), LogError> {
    let ctx = TestContext::new()?.with_max_records(3);

    {
        let log = ctx.new_log()?;
        for i in 0..8 {
            log.append(&payload(i))?;
        }
        log.close()?;
    }

    let log = ctx.new_log()?;

    assert_eq!(0, log.lowest_offset()?);
    assert_eq!(Some(7), log.highest_offset()?);
    assert_eq!(8, log.next_offset()?);

    let stat = log.stat()?;
    let bases = stat.segments.iter().map(|s| s.base_offset).collect::<Vec<_>>();
    assert_eq!(vec![0, 3, 6], bases);

    for i in 0..8 {
        assert_eq!(payload(i), log.read(i)?);
    }

    assert_eq!(8, log.append(&payload(8))?);
    assert_eq!(payload(8), log.read(8)?);

    Ok(())
}

/// A closed index file holds exactly the written entries.
#[test]
fn test_index_file_size_after_close() -> Result<(), LogError> {
    let ctx = TestContext::new()?;

    let log = ctx.new_log()?;
    for i in 0..3 {
        log.append(&payload(i))?;
    }
    assert_eq!(ctx.config.max_index_bytes(), ctx.file_size("0.index")?);

    log.close()?;
    assert_eq!(3 * 12, ctx.file_size("0.index")?);

    let log = ctx.new_log()?;
    assert_eq!(Some(2), log.highest_offset()?);
    log.close()?;
    assert_eq!(3 * 12, ctx.file_size("0.index")?);

    Ok(())
}

#[test]
fn test_reopen_after_drop() -> Result<(), LogError> {
    let ctx = TestContext::new()?.with_max_records(4);

    {
        let log = ctx.new_log()?;
        for i in 0..6 {
            log.append(&payload(i))?;
        }
    }

    let log = ctx.new_log()?;
    assert_eq!(6, log.next_offset()?);
    for i in 0..6 {
        assert_eq!(payload(i), log.read(i)?);
    }

    Ok(())
}

/// An index that was never truncated is recovered by scanning its entries.
#[test]
fn test_reopen_index_with_zero_tail() -> Result<(), LogError> {
    let ctx = TestContext::new()?;

    {
        let log = ctx.new_log()?;
        for i in 0..5 {
            log.append(&payload(i))?;
        }
        log.close()?;
    }

    let f = OpenOptions::new()
        .write(true)
        .open(ctx.config.index_path(SegmentId(0)))?;
    f.set_len(4096)?;
    drop(f);

    let log = ctx.new_log()?;
    assert_eq!(Some(4), log.highest_offset()?);
    assert!(log.read(5).unwrap_err().is_offset_not_found());

    assert_eq!(5, log.append(b"foo")?);
    assert_eq!(b"foo".to_vec(), log.read(5)?);
    assert_eq!(payload(4), log.read(4)?);

    Ok(())
}

/// Index entries of frames cut off the store are discarded.
#[test]
fn test_reopen_truncated_store() -> Result<(), LogError> {
    let ctx = TestContext::new()?;

    {
        let log = ctx.new_log()?;
        log.append(b"foo")?;
        log.append(b"bar")?;
        log.append(b"baz")?;
        log.close()?;
    }

    let f = OpenOptions::new()
        .write(true)
        .open(ctx.config.store_path(SegmentId(0)))?;
    f.set_len(11 * 2 + 4)?;
    drop(f);

    let log = ctx.new_log()?;
    assert_eq!(Some(1), log.highest_offset()?);
    assert_eq!(b"bar".to_vec(), log.read(1)?);
    assert!(log.read(2).unwrap_err().is_offset_not_found());

    assert_eq!(2, log.append(b"qux")?);
    assert_eq!(b"qux".to_vec(), log.read(2)?);

    Ok(())
}

/// A full last segment is kept read-only and a new active segment is
/// created after it.
#[test]
fn test_reopen_full_last_segment() -> Result<(), LogError> {
    let ctx = TestContext::new()?.with_max_records(2);
    let config = ctx.arc_config();

    {
        let mut s = Segment::open(config.clone(), SegmentId(0))?;
        s.append(b"a")?;
        s.append(b"b")?;
        s.close()?;
    }

    let log = ctx.new_log()?;

    let stat = log.stat()?;
    assert_eq!(2, stat.segments.len());
    assert_eq!(2, stat.segments[1].base_offset);

    assert_eq!(2, log.append(b"c")?);
    assert_eq!(b"a".to_vec(), log.read(0)?);
    assert_eq!(b"c".to_vec(), log.read(2)?);

    Ok(())
}

#[test]
fn test_reopen_with_gap_between_segments() -> Result<(), LogError> {
    let ctx = TestContext::new()?;
    let config = ctx.arc_config();

    for (segment_id, n) in [(SegmentId(0), 2), (SegmentId(5), 1)] {
        let mut s = Segment::open(config.clone(), segment_id)?;
        for i in 0..n {
            s.append(&payload(i))?;
        }
        s.close()?;
    }

    let res = ctx.new_log();
    let err = match res {
        Ok(_) => panic!("gap must be rejected"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("Gap between segments"), "{}", err);

    Ok(())
}

#[test]
fn test_ignore_unknown_files() -> Result<(), LogError> {
    let ctx = TestContext::new()?;

    {
        let log = ctx.new_log()?;
        log.append(b"foo")?;
        log.close()?;
    }

    std::fs::write(format!("{}/notes.txt", ctx.config.dir), b"x")?;
    std::fs::write(format!("{}/1.log", ctx.config.dir), b"x")?;

    let log = ctx.new_log()?;
    assert_eq!(1, log.stat()?.segments.len());
    assert_eq!(b"foo".to_vec(), log.read(0)?);

    Ok(())
}

/// Crash after a frame reached the store but before its index entry was
/// written: the index is all zeros and the frame is not served.
#[test]
fn test_reopen_unwritten_preallocated_index() -> Result<(), LogError> {
    let ctx = TestContext::new()?;

    let mut frame = 3u64.to_be_bytes().to_vec();
    frame.extend_from_slice(b"xyz");
    std::fs::write(ctx.config.store_path(SegmentId(0)), &frame)?;
    std::fs::write(ctx.config.index_path(SegmentId(0)), vec![0u8; 1200])?;

    let log = ctx.new_log()?;
    assert_eq!(None, log.highest_offset()?);
    assert_eq!(0, log.next_offset()?);
    assert!(log.read(0).unwrap_err().is_offset_not_found());

    // The orphan frame stays in the store, new frames go after it.
    assert_eq!(0, log.append(b"abc")?);
    assert_eq!(b"abc".to_vec(), log.read(0)?);
    assert_eq!(22, log.stat()?.segments[0].store_size);
    log.close()?;

    let log = ctx.new_log()?;
    assert_eq!(Some(0), log.highest_offset()?);
    assert_eq!(b"abc".to_vec(), log.read(0)?);

    Ok(())
}

/// A single record in a cleanly closed segment survives reopen.
#[test]
fn test_reopen_single_record() -> Result<(), LogError> {
    let ctx = TestContext::new()?;

    {
        let log = ctx.new_log()?;
        log.append(b"only")?;
        log.close()?;
    }

    let log = ctx.new_log()?;
    assert_eq!(Some(0), log.highest_offset()?);
    assert_eq!(b"only".to_vec(), log.read(0)?);

    Ok(())
}
