//! Layered configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, `SITEFLOW_*`
//! environment variables, then programmatic [`ConfigOverrides`]. The result
//! is validated before it is returned. `${VAR}` expressions in the file are
//! replaced from the environment before parsing.

use crate::task::domain::{PmRejectionTarget, ReviewPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILE_NAME: &str = "siteflow.toml";

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SiteflowConfig {
    /// Review workflow policy.
    pub review: ReviewPolicy,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `siteflow=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Single-line human-readable output.
    Compact,
    /// Multi-line human-readable output.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Returns the configuration representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// Programmatic overrides applied after the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Overrides `review.pm_rejection_target`.
    pub pm_rejection_target: Option<PmRejectionTarget>,
    /// Overrides `logging.level`.
    pub log_level: Option<String>,
    /// Overrides `logging.format`.
    pub log_format: Option<LogFormat>,
}

/// Options for [`SiteflowConfig::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit file path. When absent, `siteflow.toml` and
    /// `config/siteflow.toml` are tried in turn.
    pub config_path: Option<PathBuf>,
    /// Fail when no file is found.
    pub require_file: bool,
    /// Overrides applied last.
    pub overrides: ConfigOverrides,
}

/// Read access to environment variables.
pub trait EnvSource {
    /// Returns the variable's value, or `None` when unset or not unicode.
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<S: std::hash::BuildHasher> EnvSource for HashMap<String, String, S> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("could not read config file `{path}`: {source}")]
    ReadFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile {
        /// File path.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },
    /// A required file was not found.
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    /// A `${VAR}` expression named an unset variable.
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation {
        /// Variable name.
        var: String,
    },
    /// A `${` was never closed.
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    /// An environment override could not be parsed.
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
    /// The resolved configuration is invalid.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl SiteflowConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, an
    /// override is malformed, or validation fails.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        Self::load_with_env(options, &ProcessEnv)
    }

    /// Loads configuration reading variables from `env`.
    ///
    /// # Errors
    ///
    /// See [`SiteflowConfig::load`].
    pub fn load_with_env(options: LoadOptions, env: &impl EnvSource) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = resolve_config_path(options.config_path.as_deref()) {
            let patch = read_patch(&path, env)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options
                .config_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides(env)?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    /// Checks the resolved values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.level.trim();
        if level.is_empty() {
            return Err(ConfigError::Validation(
                "logging.level must not be empty".to_owned(),
            ));
        }
        EnvFilter::try_new(level).map_err(|err| {
            ConfigError::Validation(format!("logging.level `{level}` is not a valid filter: {err}"))
        })?;
        Ok(())
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(review) = patch.review {
            if let Some(target) = review.pm_rejection_target {
                self.review.pm_rejection_target = target;
            }
        }
        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self, env: &impl EnvSource) -> Result<(), ConfigError> {
        let target_key = "SITEFLOW_REVIEW_PM_REJECTION_TARGET";
        if let Some(value) = read_env(env, target_key) {
            self.review.pm_rejection_target =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: target_key.to_owned(),
                    value,
                })?;
        }

        let log_level =
            read_env(env, "SITEFLOW_LOGGING_LEVEL").or_else(|| read_env(env, "SITEFLOW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }

        let log_format = read_env(env, "SITEFLOW_LOGGING_FORMAT")
            .or_else(|| read_env(env, "SITEFLOW_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(target) = overrides.pm_rejection_target {
            self.review.pm_rejection_target = target;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }
}

fn read_env(env: &impl EnvSource, key: &str) -> Option<String> {
    env.var(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }
    [
        PathBuf::from(DEFAULT_FILE_NAME),
        Path::new("config").join(DEFAULT_FILE_NAME),
    ]
    .into_iter()
    .find(|path| path.exists())
}

fn read_patch(path: &Path, env: &impl EnvSource) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let interpolated = interpolate_env_vars(&raw, env)?;
    toml::from_str::<ConfigPatch>(&interpolated).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

fn interpolate_env_vars(input: &str, env: &impl EnvSource) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }
            let value = env
                .var(&key)
                .ok_or(ConfigError::MissingEnvInterpolation { var: key })?;
            output.push_str(&value);
            continue;
        }
        output.push(ch);
    }

    Ok(output)
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    review: Option<ReviewPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReviewPatch {
    pm_rejection_target: Option<PmRejectionTarget>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
