//! Bootstrap configuration loading and config file resolution
//!
//! The configuration file is optional. When no file can be found the
//! compiled defaults are used and a warning is logged; a file that exists
//! but cannot be parsed is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "EPLAYER_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Resampler tuning for the decode/resample bridge
    #[serde(default)]
    pub resampler: ResamplerConfig,

    /// Player / playback thread settings
    #[serde(default)]
    pub player: PlayerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Resampler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ResamplerConfig {
    /// Input frames handed to the resampler per processing step
    #[serde(default = "default_chunk_frames")]
    pub chunk_frames: usize,

    /// Output rate used when no preferred rate relates evenly to the input
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: u32,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            chunk_frames: default_chunk_frames(),
            fallback_rate: default_fallback_rate(),
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    /// Name given to the playback thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// Interval between "still waiting" diagnostics while Stop waits for
    /// the playback thread to exit
    #[serde(default = "default_stop_poll_ms")]
    pub stop_poll_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            stop_poll_ms: default_stop_poll_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chunk_frames() -> usize {
    1024
}

fn default_fallback_rate() -> u32 {
    44100
}

fn default_thread_name() -> String {
    "playthread".to_string()
}

fn default_stop_poll_ms() -> u64 {
    100
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Resolve and load configuration, falling back to compiled defaults
    /// when no configuration file exists.
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
            Some(path) => Self::load(&path),
            None => {
                warn!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.resampler.chunk_frames == 0 {
            return Err(Error::Config(
                "resampler.chunk_frames must be greater than 0".to_string(),
            ));
        }
        if self.resampler.fallback_rate == 0 {
            return Err(Error::Config(
                "resampler.fallback_rate must be greater than 0".to_string(),
            ));
        }
        if self.player.thread_name.is_empty() {
            return Err(Error::Config("player.thread_name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. User config directory (`~/.config/eplayer/config.toml`)
/// 4. System-wide file (`/etc/eplayer/config.toml`)
///
/// Returns `None` when no candidate exists.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: user config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("eplayer").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }

    // Priority 4: system-wide file
    let system_config = PathBuf::from("/etc/eplayer/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}
