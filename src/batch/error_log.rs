//! Failure log shared by all workers.
//!
//! A single task owns the log file; everything else sends entries over a
//! channel, so lines from concurrent failures never interleave.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

struct LogEntry {
    file: PathBuf,
    message: String,
}

#[derive(Clone)]
pub struct ErrorLog {
    tx: mpsc::Sender<LogEntry>,
}

impl ErrorLog {
    /// Start the collector. The file is created on the first entry, so a clean
    /// run leaves no log behind. The handle resolves to the number of lines written.
    pub fn spawn(path: PathBuf) -> (Self, JoinHandle<Result<usize>>) {
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(collect(path, rx));
        (Self { tx }, handle)
    }

    pub async fn record(&self, file: &Path, error: &Error) {
        let entry = LogEntry {
            file: file.to_path_buf(),
            message: error.to_string(),
        };
        if self.tx.send(entry).await.is_err() {
            tracing::warn!(file = %file.display(), "error log closed, entry dropped");
        }
    }
}

async fn collect(path: PathBuf, mut rx: mpsc::Receiver<LogEntry>) -> Result<usize> {
    let mut file = None;
    let mut written = 0;

    while let Some(entry) = rx.recv().await {
        if file.is_none() {
            let opened = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .await?;
            file = Some(opened);
        }
        let Some(out) = file.as_mut() else { continue };

        let name = entry
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.file.display().to_string());
        let line = format!("[ERROR] {}: {}\n", name, entry.message);
        out.write_all(line.as_bytes()).await?;
        written += 1;
    }

    if let Some(mut out) = file {
        out.flush().await?;
    }
    Ok(written)
}
