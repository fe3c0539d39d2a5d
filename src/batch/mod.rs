//! Directory batch driver.
//!
//! Files are decoded on a bounded pool of blocking workers. Progress goes out
//! as [`BatchEvent`]s; a per-file failure is logged and counted but never
//! stops the run.

pub mod error_log;
pub mod output;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::config::{BatchConfig, DecodeOptions};
use crate::error::{Error, Result};
use crate::extract::extract_file;

pub use error_log::ErrorLog;
pub use output::{collect_inputs, output_path, write_record};

#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// Record written to this path.
    Written(PathBuf),
    Failed(Error),
}

#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { total: usize },
    FileDone { index: usize, input: PathBuf, outcome: FileOutcome },
    Finished(BatchSummary),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Files never dispatched because the run was cancelled.
    pub skipped: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs();
        write!(
            f,
            "Task completed in {:02}:{:02}:{:02} with {} errors.",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            self.failed
        )?;
        if self.skipped > 0 {
            write!(f, " ({} files skipped after cancellation)", self.skipped)?;
        }
        Ok(())
    }
}

/// Decode one input and write its record next to the others.
pub fn process_file(input: &Path, output_dir: &Path, options: &DecodeOptions) -> Result<PathBuf> {
    let record = extract_file(input, options)?;
    let out = output_path(output_dir, input);
    write_record(&out, &record)?;
    Ok(out)
}

/// Run the batch described by `config`.
///
/// Once `cancel` reads `true` no further file is dispatched; files already
/// being decoded still finish and are reported. Only failing to list the
/// input directory or create the output directory is an error of the run.
pub async fn run_batch(
    config: BatchConfig,
    events: mpsc::Sender<BatchEvent>,
    cancel: watch::Receiver<bool>,
) -> Result<BatchSummary> {
    let started = Instant::now();
    let inputs = collect_inputs(&config)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let total = inputs.len();
    let workers = config.workers.max(1);
    tracing::info!(total, workers, input = %config.input_dir.display(), "batch started");
    let _ = events.send(BatchEvent::Started { total }).await;

    let (log, log_task) = ErrorLog::spawn(config.error_log_path());
    let mut summary = BatchSummary { total, ..Default::default() };
    let mut pending = inputs.into_iter().enumerate();
    let mut tasks = JoinSet::new();
    let mut cancelled = false;

    loop {
        while tasks.len() < workers && !cancelled {
            if *cancel.borrow() {
                cancelled = true;
                tracing::info!("cancellation requested, finishing in-flight files");
                break;
            }
            let Some((index, input)) = pending.next() else { break };
            let output_dir = config.output_dir.clone();
            let options = config.decode;
            tasks.spawn_blocking(move || {
                let result = process_file(&input, &output_dir, &options);
                (index, input, result)
            });
        }

        let Some(joined) = tasks.join_next().await else { break };
        let (index, input, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(error = %e, "worker task failed");
                summary.failed += 1;
                continue;
            }
        };

        let outcome = match result {
            Ok(out) => {
                summary.succeeded += 1;
                FileOutcome::Written(out)
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(file = %input.display(), error = %e, "extraction failed");
                log.record(&input, &e).await;
                FileOutcome::Failed(e)
            }
        };
        let _ = events.send(BatchEvent::FileDone { index, input, outcome }).await;
    }

    summary.skipped = pending.count();
    drop(log);
    match log_task.await {
        Ok(Ok(lines)) => tracing::debug!(lines, "error log closed"),
        Ok(Err(e)) => tracing::error!(error = %e, "failed to write error log"),
        Err(e) => tracing::error!(error = %e, "error log task failed"),
    }

    summary.elapsed = started.elapsed();
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "batch finished"
    );
    let _ = events.send(BatchEvent::Finished(summary)).await;
    Ok(summary)
}
