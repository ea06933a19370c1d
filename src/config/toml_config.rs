use crate::core::backoff::{BackoffPolicy, DEFAULT_MAX_SLEEP_SECS};
use crate::core::drive::{DriveSettings, DEFAULT_API_BASE};
use crate::utils::error::{CopytoolError, Result};
use crate::utils::validation::{validate_chunk_size, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Optional tuning file passed with `--config`. Every key has a default, so
/// an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub upload_base: Option<String>,
    #[serde(default = "default_chunk_size_mb")]
    pub chunk_size_mb: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_one_second")]
    pub base_seconds: f64,
    #[serde(default = "default_one_second")]
    pub jitter_seconds: f64,
    #[serde(default = "default_max_sleep")]
    pub max_sleep_seconds: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_chunk_size_mb() -> usize {
    16
}

fn default_request_timeout() -> u64 {
    300
}

fn default_one_second() -> f64 {
    1.0
}

fn default_max_sleep() -> u64 {
    DEFAULT_MAX_SLEEP_SECS
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            upload_base: None,
            chunk_size_mb: default_chunk_size_mb(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_seconds: default_one_second(),
            jitter_seconds: default_one_second(),
            max_sleep_seconds: default_max_sleep(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CopytoolError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| CopytoolError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_RE: OnceLock<Regex> = OnceLock::new();
        let re = ENV_RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn drive_settings(&self) -> DriveSettings {
        let api_base = self.drive.api_base.trim_end_matches('/').to_string();
        let upload_base = self
            .drive
            .upload_base
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| api_base.clone());
        DriveSettings {
            api_base,
            upload_base,
            chunk_size: self.drive.chunk_size_mb * 1024 * 1024,
            request_timeout: Duration::from_secs(self.drive.request_timeout_seconds),
        }
    }

    /// Backoff timing from `[retry]`. Values `validate` rejects fall back to
    /// the defaults instead of panicking.
    pub fn backoff_policy(&self) -> BackoffPolicy {
        let defaults = BackoffPolicy::default();
        BackoffPolicy {
            base: Duration::try_from_secs_f64(self.retry.base_seconds).unwrap_or(defaults.base),
            jitter: Duration::try_from_secs_f64(self.retry.jitter_seconds).unwrap_or(defaults.jitter),
            max_sleep: Duration::from_secs(self.retry.max_sleep_seconds),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("drive.api_base", &self.drive.api_base)?;
        if let Some(upload_base) = &self.drive.upload_base {
            validate_url("drive.upload_base", upload_base)?;
        }
        validate_range("drive.chunk_size_mb", self.drive.chunk_size_mb, 1, 1024)?;
        validate_chunk_size("drive.chunk_size_mb", self.drive.chunk_size_mb * 1024 * 1024)?;
        validate_range("drive.request_timeout_seconds", self.drive.request_timeout_seconds, 1, 86400)?;
        validate_range("retry.base_seconds", self.retry.base_seconds, 0.0, 3600.0)?;
        validate_range("retry.jitter_seconds", self.retry.jitter_seconds, 0.0, 3600.0)?;
        validate_range("retry.max_sleep_seconds", self.retry.max_sleep_seconds, 0, 86400)?;
        Ok(())
    }
}
