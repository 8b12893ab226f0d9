mod storage_errors;

use std::io;

pub use storage_errors::InvalidSegmentFileName;

/// All errors returned by the commit log.
///
/// `Io` is a failure of the underlying file system. The other variants are
/// conditions detected by the log itself.
#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum LogError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    OffsetNotFound(#[from] OffsetNotFound),

    #[error(transparent)]
    IndexFull(#[from] IndexFull),

    #[error(transparent)]
    EmptyIndex(#[from] EmptyIndex),

    #[error(transparent)]
    InvalidConfig(#[from] InvalidConfig),
}

impl LogError {
    /// Returns true if this error means the requested offset is not stored
    /// in the log, either because it is truncated or not yet written.
    pub fn is_offset_not_found(&self) -> bool {
        matches!(self, LogError::OffsetNotFound(_) | LogError::EmptyIndex(_))
    }
}

impl From<LogError> for io::Error {
    fn from(value: LogError) -> Self {
        match value {
            LogError::Io(e) => e,
            LogError::OffsetNotFound(_) | LogError::EmptyIndex(_) => {
                io::Error::new(io::ErrorKind::NotFound, value.to_string())
            }
            LogError::IndexFull(_) => {
                io::Error::new(io::ErrorKind::Other, value.to_string())
            }
            LogError::InvalidConfig(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, value.to_string())
            }
        }
    }
}

/// Error indicating that an offset is outside every live segment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
#[error("Offset not found: {offset}; live range: [{lowest}, {next})")]
pub struct OffsetNotFound {
    pub offset: u64,

    /// The lowest offset still stored.
    pub lowest: u64,

    /// The offset the next appended record will receive.
    pub next: u64,
}

impl OffsetNotFound {
    pub fn new(offset: u64, lowest: u64, next: u64) -> Self {
        Self {
            offset,
            lowest,
            next,
        }
    }
}

/// Error indicating that the pre-allocated index region has no room left.
///
/// The log consumes it internally to roll over to a new segment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
#[error("Index is full: capacity {capacity} bytes")]
pub struct IndexFull {
    pub capacity: u64,
}

impl IndexFull {
    pub fn new(capacity: u64) -> Self {
        Self { capacity }
    }
}

/// Error indicating a read from an index without any entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
#[error("Index is empty")]
pub struct EmptyIndex;

/// Error indicating an unusable configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
#[error("Invalid config: {reason}")]
pub struct InvalidConfig {
    pub reason: String,
}

impl InvalidConfig {
    pub fn new(reason: impl ToString) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}
