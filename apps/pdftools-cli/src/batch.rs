//! Batch mode: a JSON array of jobs run one after another

use crate::runner::{run_job, write_outputs, RunError};
use anyhow::{Context, Result};
use pdftools_core::{PdfCommand, ProcessResult};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

pub fn load_jobs(path: &Path) -> Result<Vec<PdfCommand>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid job list in {}", path.display()))
}

/// Run jobs in order and report each one.
///
/// Stops at the first failure unless `keep_going` is set. An interrupt
/// always stops the batch.
pub async fn run_batch(
    jobs: Vec<PdfCommand>,
    timeout: Option<Duration>,
    keep_going: bool,
) -> Vec<ProcessResult> {
    let total = jobs.len();
    let mut results = Vec::with_capacity(total);

    for (i, job) in jobs.into_iter().enumerate() {
        let name = job.name();
        info!("Job {}/{}: {}", i + 1, total, name);

        let outcome = match run_job(job, timeout).await {
            Ok(output) => {
                if let Some(report) = &output.optimize_report {
                    info!("{}", crate::describe_report(report));
                }
                write_outputs(&output).map(|paths| (paths, output.metrics))
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok((paths, metrics)) => results.push(ProcessResult::succeeded(name, paths, metrics)),
            Err(e) => {
                error!("Job {} ({}) failed: {:#}", i + 1, name, e);
                let interrupted = matches!(
                    e.downcast_ref::<RunError>(),
                    Some(RunError::Interrupted { .. })
                );
                results.push(ProcessResult::failed(name, format!("{:#}", e)));
                if interrupted || !keep_going {
                    break;
                }
            }
        }
    }

    results
}
