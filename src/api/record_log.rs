use crate::errors::LogError;
use crate::types::Record;

/// An append-only sequence of byte records addressed by offset.
///
/// Implemented by the on-disk [`CommitLog`](crate::CommitLog) and the
/// in-memory [`MemLog`](crate::MemLog), so that code built on top of a log
/// can be tested without touching the file system.
pub trait RecordLog: Send + Sync {
    /// Appends `value` and returns the offset assigned to it.
    ///
    /// Offsets are assigned consecutively without gaps.
    fn append(&self, value: &[u8]) -> Result<u64, LogError>;

    /// Returns the value stored at `offset`.
    fn read(&self, offset: u64) -> Result<Vec<u8>, LogError>;

    /// Returns the value stored at `offset` along with the offset.
    fn read_record(&self, offset: u64) -> Result<Record, LogError> {
        let value = self.read(offset)?;
        Ok(Record::new(offset, value))
    }
}
