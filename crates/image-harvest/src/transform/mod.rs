//! Image transformation: the step registry, per-step operations, prefix
//! pipelines and the parallel batch runner.

pub mod batch;
pub mod ops;
pub mod params;
pub mod pipeline;
pub mod step;

pub use batch::{eligible_files, save_jpeg, BatchRunner, ELIGIBLE_EXTENSIONS};
pub use params::{ColorSpace, FlipAxis, ParamCode, ParameterSet};
pub use pipeline::{apply, Artifact, TransformPipeline};
pub use step::{Step, StepKind, StepRegistry};
