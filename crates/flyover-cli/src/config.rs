//! CLI configuration from environment.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use flyover_core::FlightConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub fps: f64,
    /// JSON file holding a [`FlightConfig`]
    pub flight_config: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            fps: env::var("FLYOVER_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|fps: &f64| fps.is_finite() && *fps > 0.0)
                .unwrap_or(60.0),
            flight_config: env::var_os("FLYOVER_CONFIG").map(PathBuf::from),
        }
    }

    /// Load the flight configuration, falling back to defaults when no file is set.
    pub fn load_flight_config(&self) -> anyhow::Result<FlightConfig> {
        match &self.flight_config {
            Some(path) => read_flight_config(path),
            None => Ok(FlightConfig::default()),
        }
    }
}

/// Parse a [`FlightConfig`] JSON file. Missing fields take their defaults.
pub fn read_flight_config(path: &Path) -> anyhow::Result<FlightConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading flight config {}", path.display()))?;
    let config: FlightConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing flight config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
