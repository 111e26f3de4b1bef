//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::acquisition::SourceKind;
use crate::types::{HarvestError, HarvestResult};

/// Env var naming a config file.
pub const CONFIG_ENV: &str = "IMAGE_HARVEST_CONFIG";

/// Env var overriding the output root.
pub const OUTPUT_ENV: &str = "IMAGE_HARVEST_OUTPUT";

/// Config file picked up from the working directory.
const LOCAL_CONFIG: &str = "image-harvest.json";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/131.0.0.0 Safari/537.36";

/// Hard ceiling on batch workers regardless of configuration.
pub const MAX_WORKERS: usize = 8;

/// Runtime settings for acquisition and batch processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub output_root: PathBuf,
    pub http_timeout_ms: u64,
    pub user_agent: String,
    /// Adapter priority order.
    pub sources: Vec<SourceKind>,
    pub picjumbo_max_pages: u32,
    pub wikimedia_max_rounds: u32,
    pub yahoo_max_rounds: u32,
    pub yahoo_stagnation_limit: u32,
    pub max_workers: usize,
    pub jpeg_quality: u8,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            http_timeout_ms: 10_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sources: vec![SourceKind::Picjumbo, SourceKind::Wikimedia, SourceKind::Yahoo],
            picjumbo_max_pages: 20,
            wikimedia_max_rounds: 50,
            yahoo_max_rounds: 30,
            yahoo_stagnation_limit: 3,
            max_workers: MAX_WORKERS,
            jpeg_quality: 95,
        }
    }
}

impl HarvestConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> HarvestResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HarvestError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: HarvestConfig = serde_json::from_str(&raw)
            .map_err(|e| HarvestError::Config(format!("invalid {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the effective config: explicit path, then env var, then the
    /// working-directory file, then defaults. The output env var is applied last.
    pub fn load(explicit: Option<&Path>) -> HarvestResult<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        if let Ok(root) = std::env::var(OUTPUT_ENV) {
            if !root.is_empty() {
                config.output_root = PathBuf::from(root);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> HarvestResult<()> {
        if self.http_timeout_ms == 0 {
            return Err(HarvestError::Config(
                "http_timeout_ms must be positive".to_string(),
            ));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(HarvestError::Config(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.sources.is_empty() {
            return Err(HarvestError::Config(
                "at least one source is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Worker count for the batch pool: min(max_workers, 8, available parallelism), at least 1.
    pub fn effective_workers(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        self.max_workers.min(MAX_WORKERS).min(available).max(1)
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }

    None
}
