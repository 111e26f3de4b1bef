use image_harvest::AcquisitionReport;

use super::Context;

pub async fn acquire(ctx: &Context, query: &str, count: usize) -> anyhow::Result<AcquisitionReport> {
    let progress = ctx.progress();
    let result = image_harvest::acquire(query, count, &ctx.config, progress.sender()).await;
    progress.finish().await;

    let report = result?;
    ctx.emit(&report, || summary(&report))?;
    Ok(report)
}

pub(crate) fn summary(report: &AcquisitionReport) -> String {
    let mut lines = vec![format!(
        "Saved {} of {} image(s) to {}",
        report.obtained,
        report.requested,
        report.folder.display()
    )];
    for source in &report.sources {
        lines.push(format!(
            "  {:<10} {} saved, {} found",
            source.source_name,
            source.saved_count,
            source.urls.len()
        ));
    }
    if !report.is_complete() {
        lines.push(format!(
            "  warning: sources exhausted, {} short",
            report.requested - report.obtained
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_harvest::SourceResult;
    use std::path::PathBuf;

    #[test]
    fn test_summary_mentions_shortfall() {
        let report = AcquisitionReport {
            folder: PathBuf::from("out/images_cats"),
            requested: 5,
            obtained: 3,
            sources: vec![SourceResult {
                source_name: "picjumbo".into(),
                urls: vec!["a".into(); 3],
                saved_count: 3,
            }],
        };
        let text = summary(&report);
        assert!(text.contains("Saved 3 of 5"));
        assert!(text.contains("picjumbo"));
        assert!(text.contains("2 short"));
    }
}
