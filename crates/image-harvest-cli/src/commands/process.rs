use std::path::{Path, PathBuf};

use anyhow::Context as _;

use image_harvest::{BatchReport, ParameterSet};

use super::Context;

pub async fn process(
    ctx: &Context,
    folder: &Path,
    steps: &[String],
    params: ParameterSet,
) -> anyhow::Result<BatchReport> {
    let report = run_batch(ctx, folder.to_path_buf(), steps.to_vec(), params).await?;
    ctx.emit(&report, || summary(&report))?;
    Ok(report)
}

/// Run the batch on the blocking pool with progress attached.
async fn run_batch(
    ctx: &Context,
    folder: PathBuf,
    steps: Vec<String>,
    params: ParameterSet,
) -> anyhow::Result<BatchReport> {
    let progress = ctx.progress();
    let tx = progress.sender();
    let config = ctx.config.clone();

    let result = tokio::task::spawn_blocking(move || {
        image_harvest::process_folder(&folder, steps.as_slice(), &params, &config, tx)
    })
    .await
    .context("batch task panicked");
    progress.finish().await;

    Ok(result??)
}

pub(crate) fn summary(report: &BatchReport) -> String {
    let mut text = format!(
        "Processed {} image(s) into {} ({} file(s) written)",
        report.processed,
        report.output_dir.display(),
        report.artifacts
    );
    if report.skipped > 0 {
        text.push_str(&format!("\n  skipped {} unreadable file(s)", report.skipped));
    }
    if report.failed > 0 {
        text.push_str(&format!("\n  {} image(s) failed to write", report.failed));
    }
    text
}
