//! Configuration loading for the Shiftdesk CLI.
//!
//! The config file is TOML. Sections other than `provider` and `user` are
//! optional and fall back to the library defaults.

use serde::Deserialize;
use shiftdesk_core::{ProviderConfig, RetryConfig};
use shiftdesk_llm::note_edits::DEFAULT_NOTE_EDIT_ATTEMPTS;
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "SHIFTDESK_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Model used for tool calling
    pub provider: ProviderConfig,
    /// Model used for note edits; the tool-calling model when absent
    #[serde(default)]
    pub note_edit_provider: Option<ProviderConfig>,
    pub user: UserConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub note_edit: NoteEditConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Notes available to `update_note_description`
    #[serde(default)]
    pub notes: Vec<NoteEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub user_id: String,
    pub org_id: String,
    #[serde(default)]
    pub timezone_offset_minutes: i32,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteEditConfig {
    pub max_retries: u32,
}

impl Default for NoteEditConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_NOTE_EDIT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub json: bool,
    /// Filter used when `RUST_LOG` is unset
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteEntry {
    pub id: String,
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or SHIFTDESK_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] shiftdesk_core::ConfigError),
}

impl CliConfig {
    /// Load from `--config <path>` or `SHIFTDESK_CONFIG`, then validate.
    pub fn load(args: &[String]) -> Result<Self, ConfigError> {
        let path = config_path_from_args(args).or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        if let Some(provider) = &self.note_edit_provider {
            provider.validate()?;
        }
        self.retry.validate()?;
        if self.user.user_id.trim().is_empty() {
            return Err(invalid("user.user_id", "must not be empty"));
        }
        if self.user.org_id.trim().is_empty() {
            return Err(invalid("user.org_id", "must not be empty"));
        }
        if !(-720..=840).contains(&self.user.timezone_offset_minutes) {
            return Err(invalid("user.timezone_offset_minutes", "must be within -720..=840"));
        }
        if self.note_edit.max_retries == 0 {
            return Err(invalid("note_edit.max_retries", "must be > 0"));
        }
        if let Some(note) = self.notes.iter().find(|note| note.id.trim().is_empty()) {
            return Err(invalid(
                "notes.id",
                &format!("must not be empty (description: {:?})", note.description),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid(shiftdesk_core::ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    })
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args(args: &[String]) -> Option<PathBuf> {
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[provider]
provider_type = "openai"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"
requests_per_minute = 60

[user]
user_id = "u-1"
org_id = "org-1"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = CliConfig::from_toml(MINIMAL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.note_edit.max_retries, DEFAULT_NOTE_EDIT_ATTEMPTS);
        assert!(!config.logging.json);
        assert!(config.note_edit_provider.is_none());
        assert!(config.notes.is_empty());
    }

    #[test]
    fn test_full_config() {
        let toml = format!(
            "{MINIMAL}
[retry]
max_retries = 5
fallback_stage = \"supervisor\"
attempt_timeout_ms = 20000

[retry.transport_backoff]
initial_ms = 250
max_ms = 4000
multiplier = 2.0

[note_edit_provider]
provider_type = \"anthropic\"
model = \"claude-3-5-haiku-latest\"
api_key_env = \"ANTHROPIC_API_KEY\"
requests_per_minute = 30
max_tokens = 2048

[logging]
json = true

[[notes]]
id = \"n-1\"
description = \"milk\"
"
        );
        let config = CliConfig::from_toml(&toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.fallback_stage, "supervisor");
        assert!(config.retry.transport_backoff.is_some());
        assert_eq!(config.notes.len(), 1);
        assert!(config.logging.json);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let toml = format!("{MINIMAL}\nsurprise = true\n");
        assert!(matches!(CliConfig::from_toml(&toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_errors_name_the_field() {
        let mut config = CliConfig::from_toml(MINIMAL).unwrap();
        config.retry.max_retries = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry.max_retries"));

        let mut config = CliConfig::from_toml(MINIMAL).unwrap();
        config.user.org_id = " ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("user.org_id"));
    }

    #[test]
    fn test_config_path_from_args() {
        let args = vec!["--config".to_string(), "/tmp/shiftdesk.toml".to_string()];
        assert_eq!(
            config_path_from_args(&args),
            Some(PathBuf::from("/tmp/shiftdesk.toml"))
        );
        assert_eq!(config_path_from_args(&["--config".to_string()]), None);
    }
}
