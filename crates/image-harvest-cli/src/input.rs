//! Parsing of step lists and parameter sets from command-line arguments.

use std::path::Path;

use anyhow::Context as _;

use image_harvest::ParameterSet;

/// Split a step list such as `1,8` or `resize, flip` into ids.
///
/// Order and duplicates are kept; empty entries are dropped.
pub fn parse_steps(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a parameter set given inline as JSON or as `@path` to a JSON file.
/// No argument means an empty set.
pub fn load_params(raw: Option<&str>) -> anyhow::Result<ParameterSet> {
    let Some(raw) = raw else {
        return Ok(ParameterSet::new());
    };

    if let Some(path) = raw.strip_prefix('@') {
        let path = Path::new(path);
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read parameter file {}", path.display()))?;
        return ParameterSet::from_json(&body)
            .with_context(|| format!("invalid parameter file {}", path.display()));
    }

    ParameterSet::from_json(raw).context("invalid --params JSON")
}
