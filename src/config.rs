use std::format;

use crate::errors::InvalidConfig;
use crate::errors::InvalidSegmentFileName;
use crate::index::ENTRY_WIDTH;
use crate::SegmentId;

/// Kind of a file belonging to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentFileKind {
    Store,
    Index,
}

impl SegmentFileKind {
    pub(crate) fn suffix(&self) -> &'static str {
        match self {
            SegmentFileKind::Store => ".store",
            SegmentFileKind::Index => ".index",
        }
    }
}

/// Configuration for the commit log.
///
/// Optional parameters are `Option<T>` in this struct, and default values is
/// evaluated when a getter method is called.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Directory storing the segment files.
    pub dir: String,

    /// A segment is rolled over once its store reaches this size in bytes.
    pub max_store_bytes: Option<u64>,

    /// Capacity of a segment index in bytes; must be a multiple of the index
    /// entry width(12). A segment is rolled over once its index is full.
    pub max_index_bytes: Option<u64>,

    /// Base offset of the first segment of a newly created log.
    pub initial_offset: Option<u64>,

    /// Capacity of the buffered writer in front of each store file.
    pub write_buffer_size: Option<usize>,

    /// Size of the read buffer used when scanning a whole store file.
    pub read_buffer_size: Option<usize>,
}

impl Config {
    /// Creates a new Config with the specified directory and default values for
    /// other fields
    pub fn new(dir: impl ToString) -> Self {
        Self {
            dir: dir.to_string(),
            ..Default::default()
        }
    }

    /// Creates a new Config with the segment size limits.
    pub fn new_full(
        dir: impl ToString,
        max_store_bytes: Option<u64>,
        max_index_bytes: Option<u64>,
        initial_offset: Option<u64>,
    ) -> Self {
        Self {
            dir: dir.to_string(),
            max_store_bytes,
            max_index_bytes,
            initial_offset,
            ..Default::default()
        }
    }

    /// Returns the store rollover threshold (defaults to 1GB)
    pub fn max_store_bytes(&self) -> u64 {
        self.max_store_bytes.unwrap_or(1024 * 1024 * 1024)
    }

    /// Returns the index capacity in bytes (defaults to 1M entries)
    pub fn max_index_bytes(&self) -> u64 {
        self.max_index_bytes.unwrap_or(ENTRY_WIDTH * 1024 * 1024)
    }

    /// Returns the offset a new log starts at (defaults to 0)
    pub fn initial_offset(&self) -> u64 {
        self.initial_offset.unwrap_or(0)
    }

    /// Returns the store write buffer size (defaults to 64KB)
    pub fn write_buffer_size(&self) -> usize {
        self.write_buffer_size.unwrap_or(64 * 1024)
    }

    /// Returns the size of read buffer in bytes (defaults to 16MB)
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size.unwrap_or(16 * 1024 * 1024)
    }

    /// Checks the segment limits before any file is touched.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.max_store_bytes() == 0 {
            return Err(InvalidConfig::new("max_store_bytes must be > 0"));
        }

        let max_index = self.max_index_bytes();
        if max_index < ENTRY_WIDTH {
            return Err(InvalidConfig::new(format!(
                "max_index_bytes {} is smaller than one index entry({})",
                max_index, ENTRY_WIDTH
            )));
        }

        if max_index % ENTRY_WIDTH != 0 {
            return Err(InvalidConfig::new(format!(
                "max_index_bytes {} is not a multiple of index entry width {}",
                max_index, ENTRY_WIDTH
            )));
        }

        Ok(())
    }

    /// Returns the full path of the store file of a segment
    pub fn store_path(&self, segment_id: SegmentId) -> String {
        self.segment_path(segment_id, SegmentFileKind::Store)
    }

    /// Returns the full path of the index file of a segment
    pub fn index_path(&self, segment_id: SegmentId) -> String {
        self.segment_path(segment_id, SegmentFileKind::Index)
    }

    pub(crate) fn segment_path(
        &self,
        segment_id: SegmentId,
        kind: SegmentFileKind,
    ) -> String {
        let file_name = Self::segment_file_name(segment_id, kind);
        format!("{}/{}", self.dir, file_name)
    }

    /// Generates the file name for a segment file.
    ///
    /// The file name format is "{base_offset}.store" or "{base_offset}.index",
    /// with the base offset in plain decimal.
    pub(crate) fn segment_file_name(
        segment_id: SegmentId,
        kind: SegmentFileKind,
    ) -> String {
        format!("{}{}", segment_id.offset(), kind.suffix())
    }

    /// Parses a segment file name and returns the base offset and file kind.
    pub(crate) fn parse_segment_file_name(
        file_name: &str,
    ) -> Result<(u64, SegmentFileKind), InvalidSegmentFileName> {
        let (digits, kind) = if let Some(d) = file_name.strip_suffix(".store") {
            (d, SegmentFileKind::Store)
        } else if let Some(d) = file_name.strip_suffix(".index") {
            (d, SegmentFileKind::Index)
        } else {
            return Err(InvalidSegmentFileName::new(
                file_name,
                "has no '.store' or '.index' suffix",
            ));
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidSegmentFileName::new(
                file_name,
                "base offset is not a decimal number",
            ));
        }

        let offset = digits.parse::<u64>().map_err(|e| {
            InvalidSegmentFileName::new(
                file_name,
                format!("cannot parse as u64: {}", e),
            )
        })?;

        Ok((offset, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use super::SegmentFileKind;
    use crate::SegmentId;

    #[test]
    fn test_parse_segment_file_name() {
        assert_eq!(
            Config::parse_segment_file_name("16.store"),
            Ok((16, SegmentFileKind::Store))
        );
        assert_eq!(
            Config::parse_segment_file_name("0.index"),
            Ok((0, SegmentFileKind::Index))
        );
        assert_eq!(
            Config::parse_segment_file_name("18446744073709551615.index"),
            Ok((u64::MAX, SegmentFileKind::Index))
        );

        assert!(Config::parse_segment_file_name("LOCK").is_err());
        assert!(Config::parse_segment_file_name(".store").is_err());
        assert!(Config::parse_segment_file_name("-1.store").is_err());
        assert!(Config::parse_segment_file_name("1.stores").is_err());
        assert!(Config::parse_segment_file_name("1_000.index").is_err());
        assert!(
            Config::parse_segment_file_name("18446744073709551616.store")
                .is_err()
        );
    }

    #[test]
    fn test_segment_path() {
        let config = Config::new("/tmp/foo");
        assert_eq!("/tmp/foo/0.store", config.store_path(SegmentId(0)));
        assert_eq!("/tmp/foo/1024.index", config.index_path(SegmentId(1024)));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::new("x");
        assert!(config.validate().is_ok());

        config.max_index_bytes = Some(11);
        assert!(config.validate().is_err());

        config.max_index_bytes = Some(25);
        assert!(config.validate().is_err());

        config.max_index_bytes = Some(24);
        assert!(config.validate().is_ok());

        config.max_store_bytes = Some(0);
        assert!(config.validate().is_err());
    }
}
