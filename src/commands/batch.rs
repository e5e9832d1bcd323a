use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use masothue::batch::{BatchCoordinator, BatchReport, ItemOutcome};
use masothue::client::Client;
use masothue::config::Config;

use super::user_error;

pub struct BatchParams {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub stop_on_captcha: bool,
}

/// One query per line; blank lines and `#` comments are ignored
fn read_queries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub async fn batch(config: &Config, params: BatchParams) -> Result<()> {
    let content = tokio::fs::read_to_string(&params.input)
        .await
        .with_context(|| format!("Failed to read input file: {}", params.input.display()))?;
    let queries = read_queries(&content);
    let total = queries.len();

    println!("Looking up {} queries from {}", queries.len(), params.input.display());
    println!("================================");

    let client = Client::from_config(config).map_err(user_error)?;
    let mut batch_config = config.batch_config();
    batch_config.stop_on_captcha |= params.stop_on_captcha;

    let coordinator = BatchCoordinator::new(Arc::new(client), batch_config);
    let mut handle = coordinator.start(queries);

    // Ctrl-C cancels between items
    let cancel = handle.cancel_handle();
    let job_id = handle.job_id();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(job_id = %job_id, "Interrupted, finishing the current item");
            cancel.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        let line = match &event.outcome {
            ItemOutcome::Success { record } => format!(
                "OK   {} [{}]",
                record.name.as_deref().unwrap_or("-"),
                record.tax_id.as_ref().map(|t| t.as_str()).unwrap_or("-")
            ),
            ItemOutcome::Skipped { reason } => format!("SKIP {reason}"),
            ItemOutcome::Failed { kind, message } => format!("FAIL {kind}: {message}"),
        };
        println!("[{}/{}] {} -> {line}", event.index, event.total, event.query);
    }

    let report = handle.wait().await;

    println!("================================");
    println!("Batch {} {}", report.job_id, report.state);
    println!("  {}", counts_line(total, &report));
    println!("  Duration: {}s", report.duration().num_seconds());

    if let Some(output) = &params.output {
        write_report(output, &report).await?;
        println!("  Report: {}", output.display());
    }

    Ok(())
}

/// Per-outcome counts; `total` is the number of queries submitted
fn counts_line(total: usize, report: &BatchReport) -> String {
    format!(
        "Success: {} | Failed: {} | Skipped: {} | Not processed: {}",
        report.success_count(),
        report.failed_count(),
        report.skipped_count(),
        total.saturating_sub(report.outcomes.len())
    )
}

/// Write the report as JSON (temp file, then rename)
async fn write_report(path: &Path, report: &BatchReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, json)
        .await
        .with_context(|| format!("Failed to write report: {}", temp_path.display()))?;

    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to rename report file: {}", path.display()))?;

    Ok(())
}
