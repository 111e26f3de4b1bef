//! Step kinds, the step registry, and resolved steps.

use std::collections::BTreeMap;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::ops;
use super::params::{ColorSpace, FlipAxis};

/// The closed set of transformation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Resize,
    ColorConvert,
    GaussianBlur,
    Rotate,
    Brightness,
    Contrast,
    Saturation,
    Flip,
}

impl StepKind {
    pub const ALL: [StepKind; 8] = [
        StepKind::Resize,
        StepKind::ColorConvert,
        StepKind::GaussianBlur,
        StepKind::Rotate,
        StepKind::Brightness,
        StepKind::Contrast,
        StepKind::Saturation,
        StepKind::Flip,
    ];

    /// Canonical lowercase name, used in artifact filenames and parameter keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::ColorConvert => "colorconvert",
            Self::GaussianBlur => "gaussianblur",
            Self::Rotate => "rotate",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Flip => "flip",
        }
    }

    /// Numeric id in the standard registry.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Resize => "1",
            Self::ColorConvert => "2",
            Self::GaussianBlur => "3",
            Self::Rotate => "4",
            Self::Brightness => "5",
            Self::Contrast => "6",
            Self::Saturation => "7",
            Self::Flip => "8",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Resize => "scale to exact width x height",
            Self::ColorConvert => "convert to grayscale or HSV",
            Self::GaussianBlur => "gaussian smoothing with an odd kernel size",
            Self::Rotate => "rotate about the center, same canvas size",
            Self::Brightness => "scale pixel intensities by a factor",
            Self::Contrast => "scale pixel intensities by a factor",
            Self::Saturation => "scale HSV saturation by a factor",
            Self::Flip => "mirror vertically, horizontally, or both",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only mapping from caller-facing step ids to step kinds.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    entries: BTreeMap<String, StepKind>,
}

impl StepRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Numeric ids `"1".."8"` plus every canonical name.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for kind in StepKind::ALL {
            registry.insert(kind.id(), kind);
            registry.insert(kind.name(), kind);
        }
        registry
    }

    pub fn insert(&mut self, id: &str, kind: StepKind) {
        self.entries.insert(id.to_string(), kind);
    }

    pub fn get(&self, id: &str) -> Option<StepKind> {
        self.entries.get(id.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, StepKind)> {
        self.entries.iter().map(|(id, kind)| (id.as_str(), *kind))
    }
}

/// A step kind bound to its validated parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Resize { width: u32, height: u32 },
    ColorConvert(ColorSpace),
    GaussianBlur { kernel: u32 },
    Rotate { degrees: f32 },
    Brightness { factor: f32 },
    Contrast { factor: f32 },
    Saturation { factor: f32 },
    Flip(FlipAxis),
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Resize { .. } => StepKind::Resize,
            Self::ColorConvert(_) => StepKind::ColorConvert,
            Self::GaussianBlur { .. } => StepKind::GaussianBlur,
            Self::Rotate { .. } => StepKind::Rotate,
            Self::Brightness { .. } => StepKind::Brightness,
            Self::Contrast { .. } => StepKind::Contrast,
            Self::Saturation { .. } => StepKind::Saturation,
            Self::Flip(_) => StepKind::Flip,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Apply this step. Pure: the input is never modified.
    pub fn apply(&self, img: &DynamicImage) -> DynamicImage {
        match *self {
            Self::Resize { width, height } => ops::resize(img, width, height),
            Self::ColorConvert(space) => ops::color_convert(img, space),
            Self::GaussianBlur { kernel } => ops::gaussian_blur(img, kernel),
            Self::Rotate { degrees } => ops::rotate(img, degrees),
            // Brightness and contrast share the same linear scale-and-clip.
            Self::Brightness { factor } | Self::Contrast { factor } => {
                ops::scale_intensity(img, factor)
            }
            Self::Saturation { factor } => ops::adjust_saturation(img, factor),
            Self::Flip(axis) => ops::flip(img, axis),
        }
    }
}
