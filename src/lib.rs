//! Commit log:
//! A segmented, append-only log of byte records stored on local disk,
//! addressed by a monotonically increasing 64-bit offset.
//!
//! ## Features
//!
//! - Records are appended to the active segment and read back by offset
//! - Each segment pairs a length-prefixed store file with a memory-mapped
//!   index of fixed-width entries
//! - Segments roll over automatically when the store or index reaches its
//!   configured limit
//! - Old segments are removed in whole by [`CommitLog::truncate`]
//! - Reopening a directory reconstructs the log, tolerating an index that was
//!   not closed cleanly
//!
//! ## Example
//!
//! ```rust
//! # use std::sync::Arc;
//! use commit_log::{CommitLog, Config};
//!
//! let temp_dir = tempfile::tempdir().unwrap();
//! let config = Arc::new(Config {
//!     dir: temp_dir.path().to_str().unwrap().to_string(),
//!     ..Default::default()
//! });
//!
//! let log = CommitLog::open(config.clone()).unwrap();
//!
//! let first = log.append(b"hello").unwrap();
//! let second = log.append(b"world").unwrap();
//! assert_eq!((0, 1), (first, second));
//!
//! assert_eq!(b"world".to_vec(), log.read(1).unwrap());
//! assert!(log.read(2).unwrap_err().is_offset_not_found());
//!
//! log.close().unwrap();
//!
//! // Reopen and continue where it left off
//! let log = CommitLog::open(config).unwrap();
//! assert_eq!(Some(1), log.highest_offset().unwrap());
//! assert_eq!(2, log.append(b"again").unwrap());
//! ```

mod config;
mod index;
mod mem_log;
mod segment;
mod store;

pub(crate) mod commit_log;
pub(crate) mod file_lock;
pub(crate) mod num;
pub(crate) mod offset_reader;

#[cfg(test)]
pub(crate) mod testing;

pub mod types;
pub use codeq;

pub mod api;
pub mod dump_writer;
pub mod errors;

pub use api::record_log::RecordLog;
pub use config::Config;
pub use config::SegmentFileKind;
pub use errors::LogError;
pub use index::ENTRY_WIDTH;
pub use mem_log::MemLog;
pub use segment::segment_id::SegmentId;

pub use self::commit_log::commit_log::CommitLog;
pub use self::commit_log::dump::Dump;
pub use self::commit_log::reader::LogReader;
pub use self::commit_log::stat::SegmentStat;
pub use self::commit_log::stat::Stat;
pub use crate::types::Record;
pub use crate::types::Span;

#[cfg(test)]
mod tests;
