use std::io;
use std::sync::Mutex;

use crate::api::record_log::RecordLog;
use crate::errors::LogError;
use crate::errors::OffsetNotFound;
use crate::types::Record;

/// A [`RecordLog`] that keeps every record in memory.
///
/// Offsets start at 0. Nothing is persisted and there are no segments.
#[derive(Debug, Default)]
pub struct MemLog {
    records: Mutex<Vec<Record>>,
}

impl MemLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records appended.
    pub fn len(&self) -> Result<usize, LogError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, LogError> {
        Ok(self.len()? == 0)
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Vec<Record>>, io::Error> {
        self.records.lock().map_err(|_e| {
            io::Error::new(io::ErrorKind::Other, "MemLog lock poisoned")
        })
    }
}

impl RecordLog for MemLog {
    fn append(&self, value: &[u8]) -> Result<u64, LogError> {
        let mut records = self.lock()?;

        let offset = records.len() as u64;
        records.push(Record::new(offset, value));
        Ok(offset)
    }

    fn read(&self, offset: u64) -> Result<Vec<u8>, LogError> {
        let records = self.lock()?;

        let record = records.get(offset as usize).ok_or_else(|| {
            OffsetNotFound::new(offset, 0, records.len() as u64)
        })?;

        Ok(record.value.clone())
    }
}
