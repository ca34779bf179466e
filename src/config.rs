//! Environment flags and the JSON interview configuration.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use model_gateway::GenerationParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use transcript_store::StoreDirectories;

use crate::script::InterviewScript;

pub const CONFIG_PATH_ENV_VAR: &str = "INTERVIEWER_CONFIG_PATH";
pub const LOG_FILTER_ENV_VAR: &str = "INTERVIEWER_LOG";

pub const DEFAULT_MODEL: &str = "gpt-4o-2024-05-13";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
pub const DEFAULT_CANCEL_MESSAGE: &str = "You have cancelled the interview.";
pub const DEFAULT_INTERVIEWER_AVATAR: &str = "\u{1F393}";
pub const DEFAULT_RESPONDENT_AVATAR: &str = "\u{1F9D1}\u{200D}\u{1F4BB}";

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub config_path: Option<String>,
    pub log_filter: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            config_path: env_string_opt(CONFIG_PATH_ENV_VAR),
            log_filter: env_string_opt(LOG_FILTER_ENV_VAR),
        }
    }
}

/// Reads a non-blank environment variable.
pub fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("unsupported model '{0}'; the model name must contain 'gpt' or 'claude', or be 'mock'")]
    UnsupportedModel(String),

    #[error("API key is missing; set {env_var}")]
    MissingSecret { env_var: String },

    #[error("failed to initialize {component}: {message}")]
    Init {
        component: &'static str,
        message: String,
    },
}

/// Remote archive destination; the token is read from `token_env` at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    pub endpoint: String,
    pub folder: String,
    pub token_env: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterviewConfig {
    /// Selects the backend: names containing `gpt` or `claude`, or `mock`.
    pub model: String,
    /// Left out of model requests when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub max_output_tokens: u32,
    pub transcripts_directory: PathBuf,
    pub times_directory: PathBuf,
    pub backups_directory: PathBuf,
    pub logins: bool,
    /// Username to password, consulted only when `logins` is on.
    pub credentials: BTreeMap<String, String>,
    pub interviewer_avatar: String,
    pub respondent_avatar: String,
    pub script: InterviewScript,
    pub cancel_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Overrides the default `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveConfig>,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        let dirs = StoreDirectories::default();
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            transcripts_directory: dirs.transcripts,
            times_directory: dirs.times,
            backups_directory: dirs.backups,
            logins: false,
            credentials: BTreeMap::new(),
            interviewer_avatar: DEFAULT_INTERVIEWER_AVATAR.to_string(),
            respondent_avatar: DEFAULT_RESPONDENT_AVATAR.to_string(),
            script: InterviewScript::default(),
            cancel_message: DEFAULT_CANCEL_MESSAGE.to_string(),
            base_url: None,
            api_key_env: None,
            timeout_sec: None,
            archive: None,
        }
    }
}

impl InterviewConfig {
    /// Loads the file named by `INTERVIEWER_CONFIG_PATH`, or the defaults when it is unset.
    pub fn load(env: &EnvConfig) -> Result<Self, ConfigError> {
        let config = match env.config_path.as_deref() {
            Some(path) => Self::from_path(Path::new(path))?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }

        if self.max_output_tokens == 0 {
            return Err(ConfigError::Invalid(
                "max_output_tokens must be > 0".to_string(),
            ));
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::Invalid(format!(
                    "temperature must be within 0..=2, got {temperature}"
                )));
            }
        }

        if self.timeout_sec == Some(0) {
            return Err(ConfigError::Invalid("timeout_sec must be > 0".to_string()));
        }

        if self.logins && self.credentials.is_empty() {
            return Err(ConfigError::Invalid(
                "logins are enabled but no credentials are configured".to_string(),
            ));
        }

        if let Some(archive) = &self.archive {
            if archive.endpoint.trim().is_empty() || archive.token_env.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "archive requires a non-empty endpoint and token_env".to_string(),
                ));
            }
        }

        self.script.codes.validate().map_err(ConfigError::Invalid)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }

    pub fn store_directories(&self) -> StoreDirectories {
        StoreDirectories::new(
            &self.transcripts_directory,
            &self.times_directory,
            &self.backups_directory,
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_sec.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, OnceLock};

    use pretty_assertions::assert_eq;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp config file");
        file.write_all(contents.as_bytes()).expect("config written");
        file
    }

    #[test]
    fn env_defaults_are_unset() {
        let _lock = env_lock();
        let _g1 = set_env_guard(CONFIG_PATH_ENV_VAR, None);
        let _g2 = set_env_guard(LOG_FILTER_ENV_VAR, None);

        let env = EnvConfig::from_env();
        assert!(env.config_path.is_none());
        assert!(env.log_filter.is_none());
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let _lock = env_lock();
        let _g1 = set_env_guard(CONFIG_PATH_ENV_VAR, Some("  "));
        let _g2 = set_env_guard(LOG_FILTER_ENV_VAR, Some("interviewer=debug"));

        let env = EnvConfig::from_env();
        assert!(env.config_path.is_none());
        assert_eq!(env.log_filter.as_deref(), Some("interviewer=debug"));
    }

    #[test]
    fn missing_config_path_loads_defaults() {
        let config = InterviewConfig::load(&EnvConfig {
            config_path: None,
            log_filter: None,
        })
        .expect("defaults are valid");

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_output_tokens, 2048);
        assert_eq!(config.temperature, None);
        assert!(!config.logins);
        assert_eq!(config.transcripts_directory, PathBuf::from("data/transcripts"));
        assert_eq!(config.cancel_message, "You have cancelled the interview.");
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let file = write_config(
            r#"{
                "model": "claude-3-5-sonnet-20240620",
                "temperature": 0.7,
                "timeout_sec": 30,
                "script": { "outline": "Ask about commuting." }
            }"#,
        );

        let config = InterviewConfig::load(&EnvConfig {
            config_path: Some(file.path().display().to_string()),
            log_filter: None,
        })
        .expect("config loads");

        assert_eq!(config.model, "claude-3-5-sonnet-20240620");
        assert_eq!(
            config.generation_params(),
            GenerationParams {
                max_tokens: 2048,
                temperature: Some(0.7),
            }
        );
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.script.outline, "Ask about commuting.");
        assert_eq!(config.script.codes.complete.code, "x7y8");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let file = write_config(r#"{ "model": "gpt-4o", "stream": false }"#);

        let error = InterviewConfig::from_path(file.path()).expect_err("must fail");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let cases = [
            InterviewConfig {
                max_output_tokens: 0,
                ..InterviewConfig::default()
            },
            InterviewConfig {
                temperature: Some(2.5),
                ..InterviewConfig::default()
            },
            InterviewConfig {
                timeout_sec: Some(0),
                ..InterviewConfig::default()
            },
            InterviewConfig {
                model: " ".to_string(),
                ..InterviewConfig::default()
            },
            InterviewConfig {
                logins: true,
                ..InterviewConfig::default()
            },
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn validation_rejects_overlapping_codes() {
        let mut config = InterviewConfig::default();
        config.script.codes.problematic.code = "x7y8".to_string();

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
