//! Job execution off the async runtime
//!
//! PDF work is blocking, so every job runs on tokio's blocking pool. The
//! caller awaits the `JoinHandle` while racing a timeout and Ctrl-C. Output
//! files are written here, on the main task, and only once the job has
//! returned successfully. Either all of them land or none do.

use anyhow::{Context, Result};
use pdftools_core::{JobOutput, PdfCommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("{command} timed out after {secs}s, no output written")]
    TimedOut { command: &'static str, secs: u64 },

    #[error("{command} interrupted, no output written")]
    Interrupted { command: &'static str },
}

/// `None` for a zero timeout.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Run one job on the blocking pool and wait for it.
///
/// On timeout or Ctrl-C the wait is abandoned. The worker thread cannot be
/// stopped, but its result is dropped, so nothing reaches the disk.
pub async fn run_job(command: PdfCommand, timeout: Option<Duration>) -> Result<JobOutput> {
    let name = command.name();
    let handle = tokio::task::spawn_blocking(move || command.execute());

    let wait = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, handle)
                .await
                .map_err(|_| RunError::TimedOut {
                    command: name,
                    secs: limit.as_secs(),
                }),
            None => Ok(handle.await),
        }
    };

    let joined = tokio::select! {
        joined = wait => joined?,
        _ = tokio::signal::ctrl_c() => return Err(RunError::Interrupted { command: name }.into()),
    };

    let output = joined
        .with_context(|| format!("{} worker panicked", name))?
        .with_context(|| format!("{} failed", name))?;

    for warning in &output.warnings {
        warn!("{}", warning);
    }
    Ok(output)
}

/// Write every output file, creating parent directories as needed.
///
/// All files are staged as temporary files next to their destination and
/// only renamed into place once every one of them was written. On error the
/// staged files are dropped and any already renamed ones are removed.
pub fn write_outputs(output: &JobOutput) -> Result<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(output.files.len());
    for file in &output.files {
        staged.push((stage(&file.path, &file.data)?, &file.path));
    }

    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (temp, path) in staged {
        if let Err(e) = temp.persist(path) {
            for done in &written {
                let _ = std::fs::remove_file(done);
            }
            return Err(e.error).with_context(|| format!("Failed to write {}", path.display()));
        }
        written.push(path.clone());
    }

    info!(
        "Wrote {} file(s), {} bytes in {} ms",
        written.len(),
        output.metrics.output_size_bytes,
        output.metrics.processing_time_ms
    );
    Ok(written)
}

fn stage(path: &Path, data: &[u8]) -> Result<NamedTempFile> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
            parent
        }
        None => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    temp.write_all(data)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(temp)
}
