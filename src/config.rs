//! Workload configuration for the demo driver and CLI.
//!
//! This module provides:
//! - [`WorkloadConfig`]: how many readers and writers to run, for how long
//! - [`DemoProfile`]: presets matching the two classic demo shapes
//! - [`ConfigLoader`]: layered loading (profile + file + env + overrides)
//!
//! The file format is a minimal `[section]` / `key = value` text format:
//!
//! ```text
//! [workload]
//! policy = "fair"
//! readers = 5
//! writers = 5
//! iterations = 100
//! read_hold_ms = 1
//! ```
//!
//! Environment variables use the `RWGATE_` prefix followed by the upper-case
//! key, e.g. `RWGATE_READERS=8` or `RWGATE_POLICY=fair`.

use crate::rwlock::Policy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "RWGATE_";

/// Shape of a reader/writer workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadConfig {
    /// Lock policy to run.
    pub policy: Policy,
    /// Number of reader participants.
    pub readers: usize,
    /// Number of writer participants.
    pub writers: usize,
    /// Entry/exit cycles per participant.
    pub iterations: usize,
    /// Time a reader spends inside the critical section.
    pub read_hold: Duration,
    /// Time a writer spends inside the critical section.
    pub write_hold: Duration,
    /// Pause between exit and the next entry.
    pub remainder: Duration,
}

impl WorkloadConfig {
    /// Validates the configuration for basic sanity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.readers == 0 && self.writers == 0 {
            return Err(ConfigError::NoParticipants);
        }
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }

    /// Total participants.
    #[must_use]
    pub fn participants(&self) -> usize {
        self.readers + self.writers
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        DemoProfile::Classical.to_config()
    }
}

/// Preset workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemoProfile {
    /// Two readers and one writer on the classical lock.
    #[default]
    Classical,
    /// Five readers and five writers on the fair lock.
    Fair,
}

impl DemoProfile {
    /// Builds the configuration for this profile.
    #[must_use]
    pub fn to_config(self) -> WorkloadConfig {
        match self {
            Self::Classical => WorkloadConfig {
                policy: Policy::Classical,
                readers: 2,
                writers: 1,
                iterations: 100,
                read_hold: Duration::ZERO,
                write_hold: Duration::ZERO,
                remainder: Duration::ZERO,
            },
            Self::Fair => WorkloadConfig {
                policy: Policy::Fair,
                readers: 5,
                writers: 5,
                iterations: 100,
                read_hold: Duration::ZERO,
                write_hold: Duration::ZERO,
                remainder: Duration::ZERO,
            },
        }
    }
}

impl From<Policy> for DemoProfile {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Classical => Self::Classical,
            Policy::Fair => Self::Fair,
        }
    }
}

/// Configuration loader with layered sources.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    profile: DemoProfile,
    file_path: Option<PathBuf>,
    overrides: BTreeMap<String, String>,
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a new loader with the classical profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base profile.
    #[must_use]
    pub fn profile(mut self, profile: DemoProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets a file path for config loading.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Adds a programmatic override (highest precedence).
    ///
    /// Keys are the file keys (`readers`) or their environment form
    /// (`RWGATE_READERS`).
    #[must_use]
    pub fn override_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Ignores `RWGATE_*` environment variables.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads configuration with precedence:
    /// 1. Profile defaults (lowest)
    /// 2. File config
    /// 3. Environment variables
    /// 4. Programmatic overrides (highest)
    pub fn load(&self) -> Result<WorkloadConfig, ConfigError> {
        let mut config = if let Some(path) = &self.file_path {
            load_from_file(path, self.profile)?
        } else {
            self.profile.to_config()
        };

        if !self.skip_env {
            apply_env_overrides(&mut config)?;
        }
        apply_overrides(&mut config, &self.overrides)?;
        config.validate()?;
        tracing::debug!(
            policy = %config.policy,
            readers = config.readers,
            writers = config.writers,
            iterations = config.iterations,
            "workload config loaded"
        );
        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error while reading configuration.
    Io(std::io::Error),
    /// Parse error.
    Parse(String),
    /// Invalid env or programmatic override.
    InvalidOverride(String),
    /// Neither readers nor writers configured.
    NoParticipants,
    /// Zero iterations per participant.
    ZeroIterations,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "config I/O error: {err}"),
            Self::Parse(err) => write!(f, "config parse error: {err}"),
            Self::InvalidOverride(key) => write!(f, "invalid override: {key}"),
            Self::NoParticipants => write!(f, "at least one reader or writer is required"),
            Self::ZeroIterations => write!(f, "iterations must be > 0"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

fn load_from_file(path: &Path, profile: DemoProfile) -> Result<WorkloadConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents, profile.to_config())
}

fn apply_env_overrides(config: &mut WorkloadConfig) -> Result<(), ConfigError> {
    let overrides: BTreeMap<String, String> = std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect();
    apply_overrides(config, &overrides)
}

fn apply_overrides(
    config: &mut WorkloadConfig,
    overrides: &BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    for (key, value) in overrides {
        let field = key
            .strip_prefix(ENV_PREFIX)
            .map_or_else(|| key.to_lowercase(), str::to_lowercase);
        if !apply_workload_kv(config, &field, value)? {
            return Err(ConfigError::InvalidOverride(key.clone()));
        }
    }
    Ok(())
}

/// Applies one key; returns `Ok(false)` for an unknown key.
fn apply_workload_kv(
    config: &mut WorkloadConfig,
    key: &str,
    value: &str,
) -> Result<bool, ConfigError> {
    match key {
        "policy" => {
            config.policy = value
                .parse()
                .map_err(|err| ConfigError::Parse(format!("{key}: {err}")))?;
        }
        "readers" => config.readers = parse_usize(value, key)?,
        "writers" => config.writers = parse_usize(value, key)?,
        "iterations" => config.iterations = parse_usize(value, key)?,
        "read_hold_ms" => config.read_hold = parse_duration_ms(value, key)?,
        "write_hold_ms" => config.write_hold = parse_duration_ms(value, key)?,
        "remainder_ms" => config.remainder = parse_duration_ms(value, key)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_config(contents: &str, base: WorkloadConfig) -> Result<WorkloadConfig, ConfigError> {
    let mut config = base;
    let mut section = String::new();

    for (line_idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len() - 1].trim().to_lowercase();
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::Parse(format!("line {}: {}", line_idx + 1, line)))?;
        let key = key.trim();
        let value = value.trim().trim_matches('"');

        if section != "workload" {
            return Err(ConfigError::Parse(format!(
                "line {}: key {key:?} outside [workload] section",
                line_idx + 1
            )));
        }
        if !apply_workload_kv(&mut config, key, value)? {
            return Err(ConfigError::Parse(format!(
                "line {}: unknown key {key:?}",
                line_idx + 1
            )));
        }
    }

    Ok(config)
}

fn parse_usize(value: &str, key: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Parse(format!("{key}: expected unsigned integer, got {value:?}")))
}

fn parse_duration_ms(value: &str, key: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::Parse(format!("{key}: expected milliseconds, got {value:?}")))
}
