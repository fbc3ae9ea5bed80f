// crates/runner/src/settings.rs
use common::{AllocationConfig, Error, Result, ScoringConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/scoring.toml";

/// Where the input snapshot lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSnapshot {
    pub data_dir: PathBuf,
    pub metrics_file: String,
    /// Optional project list carrying `is_eligible`
    #[serde(default)]
    pub projects_file: Option<String>,
}

impl DataSnapshot {
    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerSettings {
    pub data: DataSnapshot,
    pub simulation: ScoringConfig,
    #[serde(default)]
    pub allocation: Option<AllocationConfig>,
}

pub fn parse_settings(s: &str) -> Result<RunnerSettings> {
    let settings: RunnerSettings = toml::from_str(s)?;
    Ok(settings)
}

/// Read settings from a TOML file, then apply environment overrides
pub fn load_settings(path: &Path) -> Result<RunnerSettings> {
    let config_str = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::MissingInput(format!("config file {}", path.display()))
        }
        _ => Error::Config(format!("Failed to read config {}: {}", path.display(), e)),
    })?;

    let mut settings = parse_settings(&config_str)?;

    // Override from environment
    if let Ok(dir) = std::env::var("SCORER_DATA_DIR") {
        settings.data.data_dir = PathBuf::from(dir);
    }

    if let Some(allocation) = &settings.allocation {
        allocation.validate()?;
    }

    Ok(settings)
}

/// Output file name derived from the config file stem, e.g. `goldilocks_results.json`
pub fn output_path(snapshot: &DataSnapshot, config_path: &Path, suffix: &str) -> PathBuf {
    let stem = config_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scoring");
    snapshot.path(&format!("{}_{}.json", stem, suffix))
}
