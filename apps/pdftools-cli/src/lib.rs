//! pdftools command-line front end
//!
//! Parses arguments into jobs for `pdftools-core`, runs them off the async
//! runtime and writes their outputs.

pub mod batch;
pub mod cli;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::{Context, Result};
use cli::{Action, Cli};
use pdftools_core::{estimate_optimized_size, page_infos, OptimizeReport};
use std::path::Path;

/// Carry out a parsed command line. `Ok(false)` means some batch job failed.
pub async fn run(cli: Cli) -> Result<bool> {
    let timeout = runner::timeout_from_secs(cli.timeout_secs);

    match cli.command.into_action()? {
        Action::Job(job) => {
            let output = runner::run_job(job, timeout).await?;
            for path in runner::write_outputs(&output)? {
                println!("{}", path.display());
            }
            if let Some(report) = &output.optimize_report {
                println!("{}", describe_report(report));
            }
            Ok(true)
        }
        Action::Info(input) => {
            print_info(&input).await?;
            Ok(true)
        }
        Action::Estimate { input, level } => {
            let size = tokio::fs::metadata(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?
                .len();
            println!(
                "Original: {:.1} KB, estimated at level {}: {:.1} KB",
                size as f64 / 1024.0,
                level,
                estimate_optimized_size(size, level)
            );
            Ok(true)
        }
        Action::Batch { jobs, keep_going } => {
            let jobs = batch::load_jobs(&jobs)?;
            let results = batch::run_batch(jobs, timeout, keep_going).await;
            println!("{}", serde_json::to_string_pretty(&results)?);

            Ok(results.iter().all(|r| r.success))
        }
    }
}

async fn print_info(input: &Path) -> Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let pages = page_infos(&bytes).with_context(|| format!("Failed to parse {}", input.display()))?;

    println!("{}: {} pages, {} bytes", input.display(), pages.len(), bytes.len());
    for page in pages {
        println!(
            "  page {:>3}: {:.0} x {:.0} pt, rotated {:>3}, {:?}",
            page.page_num, page.width, page.height, page.rotation, page.orientation
        );
    }
    Ok(())
}

/// One-line size summary of an optimize job.
pub fn describe_report(report: &OptimizeReport) -> String {
    let mut line = format!(
        "Original: {:.1} KB, optimized: {:.1} KB ({:.0}% smaller)",
        report.original_size as f64 / 1024.0,
        report.optimized_size as f64 / 1024.0,
        report.savings() * 100.0
    );
    if report.pages_rasterized > 0 {
        line.push_str(&format!(", {} pages rasterized", report.pages_rasterized));
    } else {
        line.push_str(&format!(", {} images recompressed", report.images_recompressed));
    }
    line
}
