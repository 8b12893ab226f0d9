use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;

use codeq::error_context_ext::ErrorContextExt;
use fs2::FileExt;
use log::info;

use crate::Config;

/// An exclusive advisory lock on the `LOCK` file of a log directory.
///
/// Held for the whole lifetime of an open
/// [`CommitLog`](crate::CommitLog) and released on drop.
#[derive(Debug)]
pub(crate) struct FileLock {
    config: Arc<Config>,
    f: File,
}

impl FileLock {
    pub const LOCK_FILE_NAME: &'static str = "LOCK";

    pub(crate) fn new(config: Arc<Config>) -> Result<Self, io::Error> {
        let path = Self::lock_path(config.as_ref());

        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .context(|| format!("open lock file {}", path))?;

        f.try_lock_exclusive().map_err(|e| {
            io::Error::new(
                io::ErrorKind::WouldBlock,
                format!(
                    "Log directory '{}' is already opened by another \
                    CommitLog; close it before opening again; error:({})",
                    config.dir, e
                ),
            )
        })?;

        info!("Log directory locked: {}", path);

        Ok(Self { config, f })
    }

    pub(crate) fn lock_path(config: &Config) -> String {
        format!("{}/{}", config.dir, Self::LOCK_FILE_NAME)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.f.unlock();
        info!(
            "Log directory unlocked: {}",
            Self::lock_path(self.config.as_ref())
        );
    }
}
