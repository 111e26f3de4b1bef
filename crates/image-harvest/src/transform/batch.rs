//! Parallel batch processing of a folder of images.
//!
//! Every eligible file is decoded once, copied to `<stem>_original.<ext>`,
//! then run through the pipeline with one JPEG written per chain prefix.
//! Files are independent: a corrupt or unwritable file never stops the rest.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use rayon::prelude::*;

use crate::config::HarvestConfig;
use crate::progress::{self, ProgressEvent, ProgressSender};
use crate::types::{BatchReport, HarvestError, HarvestResult};

use super::params::ParameterSet;
use super::pipeline::TransformPipeline;
use super::step::StepRegistry;

/// Extensions picked up from the source folder, compared case-insensitively.
pub const ELIGIBLE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Per-file result, folded into a [`BatchReport`] at the end.
#[derive(Debug)]
enum FileOutcome {
    Processed { artifacts: usize },
    Skipped,
    Failed { artifacts: usize },
}

pub struct BatchRunner {
    workers: usize,
    jpeg_quality: u8,
    progress: Option<ProgressSender>,
}

impl BatchRunner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            progress: None,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.effective_workers()).with_jpeg_quality(config.jpeg_quality)
    }

    pub fn with_progress(mut self, tx: Option<ProgressSender>) -> Self {
        self.progress = tx;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Resolve `chain` and process every eligible file in `source` into `dest`.
    ///
    /// Chain resolution happens before any file is touched, so a missing or
    /// invalid parameter fails the whole batch up front.
    pub fn run<S: AsRef<str>>(
        &self,
        source: &Path,
        dest: &Path,
        chain: &[S],
        registry: &StepRegistry,
        params: &ParameterSet,
    ) -> HarvestResult<BatchReport> {
        let pipeline = TransformPipeline::build(chain, registry, params)?;
        self.run_pipeline(source, dest, &pipeline)
    }

    pub fn run_pipeline(
        &self,
        source: &Path,
        dest: &Path,
        pipeline: &TransformPipeline,
    ) -> HarvestResult<BatchReport> {
        let files = eligible_files(source)?;
        let stems = output_stems(&files, &pipeline.labels());
        std::fs::create_dir_all(dest)?;

        tracing::info!(
            "Processing {} image(s) from {} with {} step(s) on {} worker(s)",
            files.len(),
            source.display(),
            pipeline.len(),
            self.workers
        );
        progress::emit(&self.progress, ProgressEvent::BatchStarted { total: files.len() });

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| HarvestError::Config(format!("cannot start worker pool: {e}")))?;

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .zip(stems.par_iter())
                .map(|(path, stem)| self.process_file(path, stem, dest, pipeline))
                .collect()
        });

        let mut report = BatchReport {
            output_dir: dest.to_path_buf(),
            ..BatchReport::default()
        };
        for outcome in outcomes {
            match outcome {
                FileOutcome::Processed { artifacts } => {
                    report.processed += 1;
                    report.artifacts += artifacts;
                }
                FileOutcome::Skipped => report.skipped += 1,
                FileOutcome::Failed { artifacts } => {
                    report.failed += 1;
                    report.artifacts += artifacts;
                }
            }
        }

        tracing::info!(
            "Batch done: {} processed, {} skipped, {} failed, {} file(s) written to {}",
            report.processed,
            report.skipped,
            report.failed,
            report.artifacts,
            dest.display()
        );
        progress::emit(
            &self.progress,
            ProgressEvent::BatchComplete {
                processed: report.processed,
                skipped: report.skipped,
                failed: report.failed,
            },
        );
        Ok(report)
    }

    fn process_file(
        &self,
        path: &Path,
        stem: &str,
        dest: &Path,
        pipeline: &TransformPipeline,
    ) -> FileOutcome {
        let file = display_name(path);

        let image = match decode(path) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Skipping {file}: {e}");
                self.skipped(&file, e.to_string());
                return FileOutcome::Skipped;
            }
        };

        let mut written = 0usize;
        let result = copy_original(path, stem, dest).and_then(|_| {
            written += 1;
            pipeline.run(&image, |label, artifact| {
                save_jpeg(artifact, &dest.join(format!("{stem}_{label}.jpg")), self.jpeg_quality)?;
                written += 1;
                Ok::<(), HarvestError>(())
            })
        });

        match result {
            Ok(_) => {
                tracing::debug!("Processed {file} ({written} file(s))");
                progress::emit(
                    &self.progress,
                    ProgressEvent::ImageProcessed {
                        file,
                        artifacts: written,
                    },
                );
                FileOutcome::Processed { artifacts: written }
            }
            Err(e) => {
                tracing::warn!("Failed to write outputs for {file}: {e}");
                self.skipped(&file, e.to_string());
                FileOutcome::Failed { artifacts: written }
            }
        }
    }

    fn skipped(&self, file: &str, reason: String) {
        progress::emit(
            &self.progress,
            ProgressEvent::ImageSkipped {
                file: file.to_string(),
                reason,
            },
        );
    }
}

/// Eligible image files directly inside `dir`, sorted by path.
pub fn eligible_files(dir: &Path) -> HarvestResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(HarvestError::InvalidInput(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_eligible(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_eligible(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ELIGIBLE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Write `image` as a baseline JPEG. Color images are flattened to RGB;
/// single-channel images stay grayscale.
pub fn save_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> HarvestResult<()> {
    let writer = BufWriter::new(File::create(path)?);
    let encoder = JpegEncoder::new_with_quality(writer, quality);
    match image {
        DynamicImage::ImageLuma8(_) => image.write_with_encoder(encoder)?,
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            DynamicImage::ImageLuma8(image.to_luma8()).write_with_encoder(encoder)?
        }
        _ => DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?,
    }
    Ok(())
}

/// Decode by content rather than extension; acquired assets are always
/// named `.jpg` whatever the server sent.
fn decode(path: &Path) -> HarvestResult<DynamicImage> {
    let bytes = std::fs::read(path)?;
    image::load_from_memory(&bytes).map_err(|e| HarvestError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn copy_original(path: &Path, stem: &str, dest: &Path) -> HarvestResult<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
    let target = dest.join(format!("{stem}_original.{ext}"));
    std::fs::copy(path, target)?;
    Ok(())
}

/// Output name prefix for each file, in the same order.
///
/// Files sharing a stem (`a.png`, `a.jpg`) get `<stem>_<ext>`. A prefix
/// whose outputs would still clash with names already claimed by an earlier
/// file gets a numeric suffix: with chain `flip,resize,flip`, `a_flip_resize`
/// and `a` would both write `a_flip_resize_flip.jpg`.
pub fn output_stems(files: &[PathBuf], labels: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for path in files {
        *counts.entry(file_stem(path)).or_default() += 1;
    }

    let mut claimed: HashSet<String> = HashSet::new();
    files
        .iter()
        .map(|path| {
            let stem = file_stem(path);
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            let base = if counts[&stem] > 1 {
                format!("{stem}_{}", ext.to_ascii_lowercase())
            } else {
                stem
            };

            let outputs = |prefix: &str| -> Vec<String> {
                std::iter::once(format!("{prefix}_original.{ext}"))
                    .chain(labels.iter().map(|label| format!("{prefix}_{label}.jpg")))
                    .collect()
            };

            let mut prefix = base.clone();
            let mut n = 2;
            while outputs(&prefix).iter().any(|name| claimed.contains(name)) {
                prefix = format!("{base}_{n}");
                n += 1;
            }
            claimed.extend(outputs(&prefix));
            prefix
        })
        .collect()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
