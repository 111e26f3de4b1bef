//! Image Harvest — core library for multi-source image acquisition with fallback and ordered transformation pipelines.

pub mod acquisition;
pub mod config;
pub mod harvest;
pub mod progress;
pub mod transform;
pub mod types;

pub use acquisition::{AcquisitionController, ScrapeAdapter, SourceAdapter, SourceKind};
pub use config::HarvestConfig;
pub use harvest::{acquire, process_folder, processed_folder, HarvestJob, JobReport};
pub use progress::{ProgressEvent, ProgressReceiver, ProgressSender};
pub use transform::{BatchRunner, ParameterSet, StepKind, StepRegistry, TransformPipeline};
pub use types::*;
