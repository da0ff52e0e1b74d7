// Configuration loading and parsing (config/dvp.toml).

use crate::dvp::{BaselineMode, UndersFilter};
use crate::positions::FillPolicy;
use crate::records::Statistic;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Name of the single config file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "dvp.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// dvp.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    pub dvp: DvpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub path: String,
    /// Metadata lines before the CSV header row.
    #[serde(default = "default_skip_rows")]
    pub skip_rows: usize,
}

fn default_skip_rows() -> usize {
    3
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub fill: FillPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DvpConfig {
    #[serde(default)]
    pub baseline: BaselineMode,
    /// Minimum share (whole percent) of an opponent's rows a role must hold.
    pub min_sample_pct: u32,
    /// Statistics to report, in display order.
    pub stats: Vec<StatSettings>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatSettings {
    pub stat: Statistic,
    /// Largest delta (inclusive) that counts as an under.
    pub threshold: f64,
}

impl DvpConfig {
    /// Filter bounds for one configured statistic.
    pub fn filter_for(&self, settings: &StatSettings) -> UndersFilter {
        UndersFilter {
            threshold: settings.threshold,
            min_sample_pct: self.min_sample_pct,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate config text. `path` is only used in error messages.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Load and validate configuration from `config/dvp.toml` relative to
/// `base_dir`. Does not copy defaults; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Copy `defaults/dvp.toml` to `config/dvp.toml` if the latter is missing.
/// Returns the path written, or `None` when the config file already exists.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither config/{CONFIG_FILE} nor defaults/{CONFIG_FILE} found in {}; \
                 run from the project root or pass --base-dir",
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let content = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read {}: {e}", source.display()),
    })?;
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(Some(target))
        }
        // Another process created it between the check and the open.
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Copy the default config into `base_dir/config` if needed, then load.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    if let Some(path) = ensure_config_file(base_dir)? {
        info!("copied default config to {}", path.display());
    }
    load_config_from(base_dir)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.data.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data.path".into(),
            message: "must not be empty".into(),
        });
    }

    let dvp = &config.dvp;
    if dvp.min_sample_pct > 100 {
        return Err(ConfigError::ValidationError {
            field: "dvp.min_sample_pct".into(),
            message: format!("must be between 0 and 100 inclusive, got {}", dvp.min_sample_pct),
        });
    }

    if dvp.stats.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "dvp.stats".into(),
            message: "at least one statistic must be configured".into(),
        });
    }

    let mut seen = HashSet::new();
    for settings in &dvp.stats {
        let field = format!("dvp.stats.{}.threshold", settings.stat.key());
        if !settings.threshold.is_finite() {
            return Err(ConfigError::ValidationError {
                field,
                message: format!("must be a finite number, got {}", settings.threshold),
            });
        }
        if !seen.insert(settings.stat) {
            return Err(ConfigError::ValidationError {
                field: "dvp.stats".into(),
                message: format!("statistic `{}` is listed more than once", settings.stat.key()),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
