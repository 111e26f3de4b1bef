//! Ordered step chains with one artifact per chain prefix.

use std::convert::Infallible;

use image::DynamicImage;

use crate::types::HarvestResult;

use super::params::ParameterSet;
use super::step::{Step, StepRegistry};

/// The image produced by one chain prefix.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Underscore-joined names of the steps applied so far, e.g. `resize_flip`.
    pub label: String,
    pub image: DynamicImage,
}

/// A step chain resolved against a registry and parameter set.
///
/// Unknown ids are dropped at build time. Each step sees the output of the
/// previous one, and prefix `k` is emitted right after step `k` runs.
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    steps: Vec<Step>,
}

impl TransformPipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Resolve `chain` in order. A known id whose parameters are missing or
    /// invalid fails the whole build.
    pub fn build<S: AsRef<str>>(
        chain: &[S],
        registry: &StepRegistry,
        params: &ParameterSet,
    ) -> HarvestResult<Self> {
        let mut steps = Vec::with_capacity(chain.len());
        for id in chain {
            let id = id.as_ref();
            match registry.get(id) {
                Some(kind) => steps.push(params.resolve(kind)?),
                None => tracing::debug!("Skipping unknown step id '{id}'"),
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Prefix labels in emission order.
    pub fn labels(&self) -> Vec<String> {
        let mut names: Vec<&str> = Vec::with_capacity(self.steps.len());
        self.steps
            .iter()
            .map(|step| {
                names.push(step.name());
                names.join("_")
            })
            .collect()
    }

    /// Run the chain, handing every prefix result to `sink` as soon as it is
    /// computed. A sink error stops the remaining steps.
    pub fn run<E, F>(&self, image: &DynamicImage, mut sink: F) -> Result<usize, E>
    where
        F: FnMut(&str, &DynamicImage) -> Result<(), E>,
    {
        let mut current = image.clone();
        let mut names: Vec<&str> = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            current = step.apply(&current);
            names.push(step.name());
            sink(&names.join("_"), &current)?;
        }
        Ok(self.steps.len())
    }

    /// Run the chain and collect every prefix artifact in memory.
    pub fn apply(&self, image: &DynamicImage) -> Vec<Artifact> {
        let mut artifacts = Vec::with_capacity(self.steps.len());
        let collected = self.run(image, |label, img| {
            artifacts.push(Artifact {
                label: label.to_string(),
                image: img.clone(),
            });
            Ok::<(), Infallible>(())
        });
        match collected {
            Ok(_) => artifacts,
            Err(never) => match never {},
        }
    }
}

/// Resolve `chain` and apply it to one image.
pub fn apply<S: AsRef<str>>(
    image: &DynamicImage,
    chain: &[S],
    registry: &StepRegistry,
    params: &ParameterSet,
) -> HarvestResult<Vec<Artifact>> {
    Ok(TransformPipeline::build(chain, registry, params)?.apply(image))
}
