//! Per-step parameters and their validation.
//!
//! The wire format is a JSON object keyed by step name, e.g.
//! `{"resize": [256, 256], "colorconvert": 40, "flip": -1}`. Numbers may
//! arrive as floats. Validation happens when a step is resolved, so a
//! parameter set may hold entries for steps that are never used.

use serde::{Deserialize, Serialize};

use crate::types::{HarvestError, HarvestResult};

use super::step::{Step, StepKind};

/// Target color space for `colorconvert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Gray,
    Hsv,
}

impl ColorSpace {
    fn from_code(code: ParamCode) -> Result<Self, String> {
        match code {
            // OpenCV BGR2GRAY / RGB2GRAY and BGR2HSV / RGB2HSV.
            ParamCode::Number(n) if n == 6.0 || n == 7.0 => Ok(Self::Gray),
            ParamCode::Number(n) if n == 40.0 || n == 41.0 => Ok(Self::Hsv),
            ParamCode::Number(n) => Err(format!("unsupported color code {n}")),
            ParamCode::Name(s) => match s.trim().to_lowercase().as_str() {
                "gray" | "grey" | "grayscale" => Ok(Self::Gray),
                "hsv" => Ok(Self::Hsv),
                other => Err(format!("unsupported color space '{other}'")),
            },
        }
    }
}

/// Mirror axis for `flip`. Numeric codes: 0 vertical, positive horizontal,
/// negative both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    Vertical,
    Horizontal,
    Both,
}

impl FlipAxis {
    fn from_code(code: ParamCode) -> Result<Self, String> {
        match code {
            ParamCode::Number(n) if n.fract() != 0.0 => Err(format!("flip code {n} is not an integer")),
            ParamCode::Number(n) if n == 0.0 => Ok(Self::Vertical),
            ParamCode::Number(n) if n > 0.0 => Ok(Self::Horizontal),
            ParamCode::Number(_) => Ok(Self::Both),
            ParamCode::Name(s) => match s.trim().to_lowercase().as_str() {
                "vertical" | "v" => Ok(Self::Vertical),
                "horizontal" | "h" => Ok(Self::Horizontal),
                "both" | "hv" => Ok(Self::Both),
                other => Err(format!("unsupported flip axis '{other}'")),
            },
        }
    }
}

/// A code given either as a number or a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamCode {
    Number(f64),
    Name(String),
}

/// Parameters for every step a chain may reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colorconvert: Option<ParamCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaussianblur: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flip: Option<ParamCode>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> HarvestResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with_resize(mut self, width: u32, height: u32) -> Self {
        self.resize = Some([width as f64, height as f64]);
        self
    }

    pub fn with_colorconvert(mut self, space: ColorSpace) -> Self {
        let name = match space {
            ColorSpace::Gray => "gray",
            ColorSpace::Hsv => "hsv",
        };
        self.colorconvert = Some(ParamCode::Name(name.to_string()));
        self
    }

    pub fn with_gaussianblur(mut self, kernel: u32) -> Self {
        self.gaussianblur = Some(kernel as f64);
        self
    }

    pub fn with_rotate(mut self, degrees: f64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    pub fn with_brightness(mut self, factor: f64) -> Self {
        self.brightness = Some(factor);
        self
    }

    pub fn with_contrast(mut self, factor: f64) -> Self {
        self.contrast = Some(factor);
        self
    }

    pub fn with_saturation(mut self, factor: f64) -> Self {
        self.saturation = Some(factor);
        self
    }

    pub fn with_flip(mut self, axis: FlipAxis) -> Self {
        let name = match axis {
            FlipAxis::Vertical => "vertical",
            FlipAxis::Horizontal => "horizontal",
            FlipAxis::Both => "both",
        };
        self.flip = Some(ParamCode::Name(name.to_string()));
        self
    }

    /// Bind a step kind to its validated parameters.
    pub fn resolve(&self, kind: StepKind) -> HarvestResult<Step> {
        let step = kind.name();
        let missing = || HarvestError::MissingParameter(step.to_string());
        let invalid = |reason: String| HarvestError::InvalidParameter {
            step: step.to_string(),
            reason,
        };

        match kind {
            StepKind::Resize => {
                let [w, h] = self.resize.ok_or_else(missing)?;
                Ok(Step::Resize {
                    width: positive_dimension(w).map_err(invalid)?,
                    height: positive_dimension(h).map_err(invalid)?,
                })
            }
            StepKind::ColorConvert => {
                let code = self.colorconvert.clone().ok_or_else(missing)?;
                Ok(Step::ColorConvert(ColorSpace::from_code(code).map_err(invalid)?))
            }
            StepKind::GaussianBlur => {
                let k = self.gaussianblur.ok_or_else(missing)?;
                Ok(Step::GaussianBlur {
                    kernel: odd_kernel(k).map_err(invalid)?,
                })
            }
            StepKind::Rotate => Ok(Step::Rotate {
                degrees: finite(self.rotate.ok_or_else(missing)?).map_err(invalid)?,
            }),
            StepKind::Brightness => Ok(Step::Brightness {
                factor: finite(self.brightness.ok_or_else(missing)?).map_err(invalid)?,
            }),
            StepKind::Contrast => Ok(Step::Contrast {
                factor: finite(self.contrast.ok_or_else(missing)?).map_err(invalid)?,
            }),
            StepKind::Saturation => Ok(Step::Saturation {
                factor: finite(self.saturation.ok_or_else(missing)?).map_err(invalid)?,
            }),
            StepKind::Flip => {
                let code = self.flip.clone().ok_or_else(missing)?;
                Ok(Step::Flip(FlipAxis::from_code(code).map_err(invalid)?))
            }
        }
    }
}

fn positive_dimension(v: f64) -> Result<u32, String> {
    if !v.is_finite() || v < 1.0 || v > u32::MAX as f64 {
        return Err(format!("dimension {v} must be a positive integer"));
    }
    Ok(v.round() as u32)
}

/// Kernel sizes must be odd; even sizes are bumped to the next odd size.
fn odd_kernel(v: f64) -> Result<u32, String> {
    if !v.is_finite() || v < 1.0 {
        return Err(format!("kernel size {v} must be a positive integer"));
    }
    let k = v.round() as u32;
    if k % 2 == 0 {
        tracing::warn!("Gaussian kernel size {k} is even, using {}", k + 1);
        return Ok(k + 1);
    }
    Ok(k)
}

fn finite(v: f64) -> Result<f32, String> {
    if v.is_finite() {
        Ok(v as f32)
    } else {
        Err(format!("{v} is not a finite number"))
    }
}
