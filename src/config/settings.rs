//! TOML-based configuration.
//!
//! Supports a config file (cohort.toml) with environment variable
//! expansion for secrets.
//!
//! Example configuration:
//! ```toml
//! [digest]
//! max_chars = 2000
//! max_filters = 5
//! max_metrics = 10
//!
//! [segmentation]
//! default_clusters = 8
//! min_small_dataset_k = 2
//! min_customers = 10
//! gpu_row_threshold = 10000
//! scaling_mode = 1
//!
//! [worker]
//! path = "./cohort-worker"
//! timeout_secs = 60
//!
//! [model]
//! endpoint = "https://api.example.com/v1"
//! model = "gpt-4o-mini"
//! api_key = "${COHORT_MODEL_API_KEY}"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::digest::DigestLimits;
use crate::rfm::limits;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Digest budget configuration.
    pub digest: DigestLimits,

    /// Segmentation configuration.
    pub segmentation: SegmentationSettings,

    /// Numeric worker configuration.
    pub worker: WorkerSettings,

    /// External model configuration.
    pub model: ModelSettings,
}

/// Segmentation knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SegmentationSettings {
    /// Default cluster count (K).
    pub default_clusters: usize,

    /// Floor for the small-population K reduction.
    pub min_small_dataset_k: usize,

    /// Minimum customers required to segment.
    pub min_customers: u64,

    /// Population at which `auto` compute strategy requests the GPU.
    pub gpu_row_threshold: usize,

    /// Feature scaling mode passed to the worker (1 = standard scaling).
    pub scaling_mode: i32,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        Self {
            default_clusters: 8,
            min_small_dataset_k: 2,
            min_customers: limits::MIN_CUSTOMERS,
            gpu_row_threshold: 10_000,
            scaling_mode: 1,
        }
    }
}

/// Numeric worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Path to the worker binary.
    pub path: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            path: None,
            timeout_secs: 60,
        }
    }
}

impl WorkerSettings {
    /// Worker binary path with environment variables expanded, searching
    /// common locations when unconfigured.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            let expanded = expand_env_vars(path).ok()?;
            return Some(PathBuf::from(expanded));
        }

        let candidates = ["cohort-worker", "./cohort-worker", "./worker/cohort-worker"];
        for candidate in candidates {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External model configuration. The HTTP client lives outside this
/// crate; these values parameterize whichever implementation is wired in.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Enable the model fallback for weak keyword classifications.
    pub enabled: bool,

    /// Chat-completions endpoint.
    pub endpoint: Option<String>,

    /// Model name.
    pub model: String,

    /// API key (supports ${ENV_VAR} expansion).
    pub api_key: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            model: String::new(),
            api_key: None,
        }
    }
}

impl ModelSettings {
    /// API key with environment variables expanded.
    pub fn resolved_api_key(&self) -> Result<Option<String>, SettingsError> {
        self.api_key
            .as_deref()
            .map(expand_env_vars)
            .transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `COHORT_CONFIG`
    /// 2. `./cohort.toml`
    /// 3. `~/.config/cohort/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("COHORT_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("cohort.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cohort").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(chars.next().unwrap());
                }
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            } else {
                // $VAR (ends at non-alphanumeric/underscore)
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(chars.next().unwrap());
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    // Just a lone $, keep it
                    result.push('$');
                } else {
                    let value = env::var(&var_name)
                        .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                    result.push_str(&value);
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
