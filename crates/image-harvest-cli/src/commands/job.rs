use std::path::Path;

use image_harvest::{HarvestJob, JobReport};

use super::{acquire, process, Context};

/// Acquire images for `query`, then process the acquired folder.
pub async fn run(ctx: &Context, job: &HarvestJob) -> anyhow::Result<JobReport> {
    let progress = ctx.progress();
    let result = job.run(&ctx.config, progress.sender()).await;
    progress.finish().await;
    let report = result?;

    ctx.emit(&report, || {
        format!(
            "{}\n{}",
            acquire::summary(&report.acquisition),
            process::summary(&report.batch)
        )
    })?;
    Ok(report)
}

/// Run a job description read from a JSON file.
pub async fn job(ctx: &Context, path: &Path) -> anyhow::Result<JobReport> {
    let job = HarvestJob::from_file(path)
        .map_err(|e| anyhow::anyhow!("invalid job file {}: {e}", path.display()))?;
    run(ctx, &job).await
}
