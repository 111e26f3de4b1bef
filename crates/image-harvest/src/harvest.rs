//! Top-level entry points tying acquisition and transformation together.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionController;
use crate::config::HarvestConfig;
use crate::progress::ProgressSender;
use crate::transform::{BatchRunner, ParameterSet, StepRegistry};
use crate::types::{AcquisitionReport, BatchReport, HarvestError, HarvestResult, Query};

/// Acquire `count` images for `text` into `<output_root>/images_<text>`.
pub async fn acquire(
    text: &str,
    count: usize,
    config: &HarvestConfig,
    progress: Option<ProgressSender>,
) -> HarvestResult<AcquisitionReport> {
    let query = Query::new(text, count)?;
    AcquisitionController::from_config(config, progress)
        .acquire(&query, &config.output_root)
        .await
}

/// Output folder for a processed source folder: `<output_root>/processed_<name>`.
pub fn processed_folder(output_root: &Path, source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "images".to_string());
    output_root.join(format!("processed_{name}"))
}

/// Run `chain` over every eligible image in `folder` with the standard registry.
///
/// Blocking; call through `spawn_blocking` from async code.
pub fn process_folder<S: AsRef<str>>(
    folder: &Path,
    chain: &[S],
    params: &ParameterSet,
    config: &HarvestConfig,
    progress: Option<ProgressSender>,
) -> HarvestResult<BatchReport> {
    let dest = processed_folder(&config.output_root, folder);
    BatchRunner::from_config(config)
        .with_progress(progress)
        .run(folder, &dest, chain, &StepRegistry::standard(), params)
}

/// A full request from a front end: what to fetch and how to transform it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestJob {
    pub query: String,
    pub num_images: usize,
    #[serde(default)]
    pub selected_steps: Vec<String>,
    #[serde(default)]
    pub params: ParameterSet,
}

/// Reports from both phases of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub acquisition: AcquisitionReport,
    pub batch: BatchReport,
}

impl HarvestJob {
    pub fn from_json(raw: &str) -> HarvestResult<Self> {
        let job: HarvestJob = serde_json::from_str(raw)?;
        job.validate()?;
        Ok(job)
    }

    pub fn from_file(path: &Path) -> HarvestResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Check the query and resolve the chain so a bad job fails before any
    /// network traffic.
    pub fn validate(&self) -> HarvestResult<()> {
        Query::new(self.query.as_str(), self.num_images)?;
        crate::transform::TransformPipeline::build(
            self.selected_steps.as_slice(),
            &StepRegistry::standard(),
            &self.params,
        )?;
        Ok(())
    }

    /// Acquire, then process the acquired folder.
    pub async fn run(
        &self,
        config: &HarvestConfig,
        progress: Option<ProgressSender>,
    ) -> HarvestResult<JobReport> {
        self.validate()?;
        let acquisition = acquire(&self.query, self.num_images, config, progress.clone()).await?;

        let folder = acquisition.folder.clone();
        let chain = self.selected_steps.clone();
        let params = self.params.clone();
        let config = config.clone();
        let batch = tokio::task::spawn_blocking(move || {
            process_folder(&folder, chain.as_slice(), &params, &config, progress)
        })
        .await
        .map_err(|e| HarvestError::InvalidInput(format!("batch task failed: {e}")))??;

        Ok(JobReport { acquisition, batch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_folder_name() {
        let out = processed_folder(Path::new("/data"), Path::new("/data/images_red_panda"));
        assert_eq!(out, PathBuf::from("/data/processed_images_red_panda"));
    }

    #[test]
    fn test_job_parses_front_end_payload() {
        let job = HarvestJob::from_json(
            r#"{"query": "sunset", "num_images": 10, "selected_steps": ["1", "8"],
                "params": {"resize": [256, 256], "flip": 1}}"#,
        )
        .unwrap();
        assert_eq!(job.num_images, 10);
        assert_eq!(job.selected_steps, vec!["1", "8"]);
    }

    #[test]
    fn test_job_rejects_missing_parameter() {
        let err = HarvestJob::from_json(
            r#"{"query": "sunset", "num_images": 3, "selected_steps": ["4"]}"#,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_job_rejects_zero_images() {
        let err = HarvestJob::from_json(r#"{"query": "sunset", "num_images": 0}"#).unwrap_err();
        assert!(matches!(err, HarvestError::InvalidInput(_)));
    }

    #[test]
    fn test_process_folder_uses_output_root() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("images_cats");
        std::fs::create_dir(&src).unwrap();
        image::RgbImage::new(4, 4).save(src.join("1.png")).unwrap();

        let config = HarvestConfig {
            output_root: root.path().to_path_buf(),
            max_workers: 1,
            ..HarvestConfig::default()
        };
        let params = ParameterSet::new().with_rotate(90.0);
        let report = process_folder(&src, &["4"], &params, &config, None).unwrap();

        assert_eq!(report.output_dir, root.path().join("processed_images_cats"));
        assert!(report.output_dir.join("1_rotate.jpg").exists());
    }

    #[tokio::test]
    async fn test_run_validates_before_acquiring() {
        let root = tempfile::tempdir().unwrap();
        let config = HarvestConfig {
            output_root: root.path().to_path_buf(),
            ..HarvestConfig::default()
        };
        let job = HarvestJob {
            query: "sunset".to_string(),
            num_images: 3,
            selected_steps: vec!["7".to_string()],
            params: ParameterSet::new(),
        };

        let err = job.run(&config, None).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(!root.path().join("images_sunset").exists());
    }

    #[tokio::test]
    async fn test_run_chains_both_phases() {
        let root = tempfile::tempdir().unwrap();
        let config = HarvestConfig {
            output_root: root.path().to_path_buf(),
            sources: Vec::new(),
            max_workers: 1,
            ..HarvestConfig::default()
        };
        let job = HarvestJob {
            query: "sunset".to_string(),
            num_images: 2,
            selected_steps: vec!["8".to_string()],
            params: ParameterSet::new().with_flip(crate::transform::FlipAxis::Both),
        };

        let (tx, mut rx) = crate::progress::channel();
        let report = job.run(&config, Some(tx)).await.unwrap();

        assert_eq!(report.acquisition.obtained, 0);
        assert_eq!(report.acquisition.folder, root.path().join("images_sunset"));
        assert_eq!(report.batch.processed, 0);
        assert_eq!(report.batch.output_dir, root.path().join("processed_images_sunset"));
        assert!(report.batch.output_dir.is_dir());
        assert!(matches!(
            rx.try_recv().unwrap(),
            crate::progress::ProgressEvent::BatchStarted { total: 0 }
        ));
    }
}
