use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::error;

/// Append-only run log shared by concurrent workers.
///
/// Every append opens the file in append mode, writes one
/// newline-terminated record and closes it again, all under an internal
/// lock, so records are never interleaved and a crash mid-run leaves
/// every completed record on disk. A failed append is reported through
/// `tracing` and never takes a worker down.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ErrorLog {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, message: &str) {
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{message}"));
        if let Err(err) = result {
            error!("could not write to log {}: {err}", self.path.display());
        }
    }
}
