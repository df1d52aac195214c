//! Command implementations.

pub mod loop_cmd;
pub mod markets;

use std::path::Path;

use anyhow::{Context, Result};
use lendloop_core::ScenarioConfig;

pub use loop_cmd::run_loop;
pub use markets::run_markets;

/// Read and parse a scenario file.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
    ScenarioConfig::from_json(&json)
        .with_context(|| format!("Invalid scenario file: {}", path.display()))
}
