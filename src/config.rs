use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::condition::Score;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Spelled the same in the config file and on the command line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum SolverKind {
    #[default]
    Anneal,
    Greedy,
    Exact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "SearchConfig::default_trials")]
    pub trials: usize,
    /// Ships weighing this much or less never enter the graph.
    #[serde(default)]
    pub min_weight: Option<Score>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "SearchConfig::default_report_every")]
    pub report_every: usize,
    #[serde(default)]
    pub solver: SolverKind,
}

impl SearchConfig {
    fn default_trials() -> usize {
        500
    }
    fn default_report_every() -> usize {
        50
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            trials: Self::default_trials(),
            min_weight: None,
            seed: None,
            parallel: false,
            report_every: Self::default_report_every(),
            solver: SolverKind::default(),
        }
    }
}

/// Temperatures and penalty are relative to the heaviest ship in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnealConfig {
    #[serde(default = "AnnealConfig::default_initial_temperature")]
    pub initial_temperature: f64,
    #[serde(default = "AnnealConfig::default_final_temperature")]
    pub final_temperature: f64,
    /// Moves per node in one run.
    #[serde(default = "AnnealConfig::default_sweeps")]
    pub sweeps: usize,
    #[serde(default = "AnnealConfig::default_penalty")]
    pub penalty: f64,
    #[serde(default = "AnnealConfig::default_swap_probability")]
    pub swap_probability: f64,
}

impl AnnealConfig {
    fn default_initial_temperature() -> f64 {
        1.0
    }
    fn default_final_temperature() -> f64 {
        0.001
    }
    fn default_sweeps() -> usize {
        1000
    }
    fn default_penalty() -> f64 {
        2.0
    }
    fn default_swap_probability() -> f64 {
        0.5
    }
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            initial_temperature: Self::default_initial_temperature(),
            final_temperature: Self::default_final_temperature(),
            sweeps: Self::default_sweeps(),
            penalty: Self::default_penalty(),
            swap_probability: Self::default_swap_probability(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FilterConfig {
    /// Participants whose ships are dropped at load time, matched case-insensitively.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub titlecase: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FleetConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub anneal: AnnealConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl FleetConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Missing file means defaults; an unreadable or malformed one is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let anneal = &self.anneal;
        if !(anneal.initial_temperature > 0.0 && anneal.final_temperature > 0.0) {
            return Err(ConfigError::Invalid("temperatures must be positive".into()));
        }
        if anneal.final_temperature > anneal.initial_temperature {
            return Err(ConfigError::Invalid(
                "final_temperature must not exceed initial_temperature".into(),
            ));
        }
        if !(anneal.penalty > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "penalty must exceed 1.0, got {}",
                anneal.penalty
            )));
        }
        if !(0.0..=1.0).contains(&anneal.swap_probability) {
            return Err(ConfigError::Invalid(format!(
                "swap_probability must be within [0, 1], got {}",
                anneal.swap_probability
            )));
        }
        if self.search.min_weight.is_some_and(f64::is_nan) {
            return Err(ConfigError::Invalid("min_weight is NaN".into()));
        }
        Ok(())
    }
}
