//! This example demonstrates basic usage of CommitLog, including:
//! - Opening a CommitLog
//! - Appending records
//! - Reading records by offset
//! - Segment rollover and truncation

use std::io;
use std::sync::Arc;

use commit_log::CommitLog;
use commit_log::Config;
use commit_log::ENTRY_WIDTH;

fn main() -> io::Result<()> {
    // Create a temporary directory for the log data
    let temp_dir = tempfile::tempdir()?;
    let config = Arc::new(Config {
        dir: temp_dir.path().to_str().unwrap().to_string(),
        // Small segments: at most 3 records each
        max_index_bytes: Some(ENTRY_WIDTH * 3),
        ..Default::default()
    });

    let log = CommitLog::open(config.clone())?;

    // Append records; each one gets the next offset
    for word in ["alpha", "beta", "gamma", "delta", "epsilon"] {
        let offset = log.append(word.as_bytes())?;
        println!("appended {:?} at offset {}", word, offset);
    }

    // Read a record back
    let value = log.read(3)?;
    println!("offset 3: {}", String::from_utf8_lossy(&value));

    // Records are spread over segments of 3
    println!("{:#}", log.stat()?);

    // Remove the first segment, offsets 0..3
    log.truncate(3)?;
    println!("lowest offset after truncate: {}", log.lowest_offset()?);

    match log.read(0) {
        Ok(_) => println!("offset 0 still readable"),
        Err(e) => println!("offset 0: {}", e),
    }

    log.close()?;

    // Reopen and continue appending
    let log = CommitLog::open(config)?;
    println!(
        "reopened: lowest: {}, highest: {:?}",
        log.lowest_offset()?,
        log.highest_offset()?
    );

    let offset = log.append(b"zeta")?;
    println!("appended \"zeta\" at offset {}", offset);

    println!("{}", log.dump()?.write_to_string()?);

    log.close()?;
    Ok(())
}
