//! TOML-based planner configuration.
//!
//! Holds the tunables the engine consumes: the coaching failure threshold
//! and the global high-energy window used by the scheduler heuristic. The
//! config is an explicit value passed into scheduler and coach calls, so
//! tests can override thresholds deterministically.
//!
//! Stored at `~/.config/flowday/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;

/// Scheduler tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Start hour of the global high-energy window.
    #[serde(default = "default_high_energy_start")]
    pub high_energy_start: u32,
    /// End hour of the global high-energy window.
    #[serde(default = "default_high_energy_end")]
    pub high_energy_end: u32,
}

/// Coaching tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Rolling failure count at which structural suggestions kick in.
    #[serde(default = "default_fail_threshold")]
    pub fail_threshold: i64,
}

/// Planner configuration.
///
/// Serialized to/from TOML at `~/.config/flowday/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub coach: CoachConfig,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_high_energy_start() -> u32 {
    9
}
fn default_high_energy_end() -> u32 {
    13
}
fn default_fail_threshold() -> i64 {
    3
}
fn default_timezone() -> String {
    "America/Argentina/Buenos_Aires".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            high_energy_start: default_high_energy_start(),
            high_energy_end: default_high_energy_end(),
        }
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            fail_threshold: default_fail_threshold(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            coach: CoachConfig::default(),
            timezone: default_timezone(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Load from disk, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_tunables() {
        let cfg = Config::default();
        assert_eq!(cfg.coach.fail_threshold, 3);
        assert_eq!(cfg.scheduler.high_energy_start, 9);
        assert_eq!(cfg.scheduler.high_energy_end, 13);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: Config = toml::from_str("[coach]\nfail_threshold = 5\n").unwrap();
        assert_eq!(cfg.coach.fail_threshold, 5);
        assert_eq!(cfg.scheduler.high_energy_start, 9);
    }
}
