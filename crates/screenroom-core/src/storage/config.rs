//! TOML-based application configuration.
//!
//! Stores:
//! - Remote service endpoint and timeout
//! - Interview defaults (role, fallback answer, completed linger)
//! - Trial backend seeding
//!
//! Configuration is stored at `~/.config/screenroom/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::candidate::DEFAULT_ROLE;
use crate::error::ConfigError;
use crate::session::FALLBACK_ANSWER;

const CONFIG_FILE: &str = "config.toml";

/// Remote grading/directory service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Interview behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    #[serde(default = "default_role_value")]
    pub default_role: String,
    /// Answer recorded when the countdown expires with nothing typed.
    #[serde(default = "default_fallback_answer")]
    pub fallback_answer: String,
    /// How long a completed session lingers before it is cleared on load.
    #[serde(default = "default_completed_reset_secs")]
    pub completed_reset_secs: u64,
}

/// Trial (anonymous) backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrialConfig {
    /// Fixed seed for the trial question/grade generator. Unset means a
    /// fresh sequence each session.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/screenroom/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub interview: InterviewConfig,
    #[serde(default)]
    pub trial: TrialConfig,
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:8000/api".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_role_value() -> String {
    DEFAULT_ROLE.into()
}
fn default_fallback_answer() -> String {
    FALLBACK_ANSWER.into()
}
fn default_completed_reset_secs() -> u64 {
    3
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            default_role: default_role_value(),
            fallback_answer: default_fallback_answer(),
            completed_reset_secs: default_completed_reset_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            interview: InterviewConfig::default(),
            trial: TrialConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: e.to_string(),
                        })?,
                    ),
                    serde_json::Value::Number(_) => Self::parse_number(key, value)?,
                    // Optional fields serialize as null; "null" clears them
                    // again, numbers land as numbers.
                    serde_json::Value::Null => {
                        if value == "null" {
                            serde_json::Value::Null
                        } else if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            serde_json::Value::String(value.into())
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: e.to_string(),
                        })?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn parse_number(key: &str, value: &str) -> Result<serde_json::Value, ConfigError> {
        if let Ok(n) = value.parse::<u64>() {
            return Ok(serde_json::Value::Number(n.into()));
        }
        if let Ok(n) = value.parse::<f64>() {
            return serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("cannot parse '{value}' as number"),
                });
        }
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{value}' as number"),
        })
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from(CONFIG_FILE),
            message: e.to_string(),
        })?;
        Ok(dir.join(CONFIG_FILE))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
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
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// into the field's type, or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_whole_surface() {
        let cfg = Config::default();
        assert_eq!(
            cfg.get("remote.base_url").as_deref(),
            Some("http://localhost:8000/api")
        );
        assert_eq!(cfg.get("remote.timeout_secs").as_deref(), Some("30"));
        assert_eq!(
            cfg.get("interview.default_role").as_deref(),
            Some(DEFAULT_ROLE)
        );
        assert_eq!(
            cfg.get("interview.fallback_answer").as_deref(),
            Some(FALLBACK_ANSWER)
        );
        assert_eq!(
            cfg.get("interview.completed_reset_secs").as_deref(),
            Some("3")
        );
        assert_eq!(cfg.get("trial.seed").as_deref(), Some("null"));
        assert_eq!(cfg.get("no.such.key"), None);
    }

    #[test]
    fn set_preserves_field_types() {
        let cfg = Config::default();
        let mut json = serde_json::to_value(&cfg).unwrap();

        Config::set_json_value_by_path(&mut json, "remote.timeout_secs", "45").unwrap();
        Config::set_json_value_by_path(&mut json, "interview.default_role", "Data Engineer")
            .unwrap();
        Config::set_json_value_by_path(&mut json, "trial.seed", "42").unwrap();

        let updated: Config = serde_json::from_value(json).unwrap();
        assert_eq!(updated.remote.timeout_secs, 45);
        assert_eq!(updated.interview.default_role, "Data Engineer");
        assert_eq!(updated.trial.seed, Some(42));
    }

    #[test]
    fn seed_clears_back_to_null() {
        let cfg = Config {
            trial: TrialConfig { seed: Some(7) },
            ..Config::default()
        };
        let mut json = serde_json::to_value(&cfg).unwrap();
        Config::set_json_value_by_path(&mut json, "trial.seed", "null").unwrap();
        let updated: Config = serde_json::from_value(json).unwrap();
        assert_eq!(updated.trial.seed, None);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        let cfg = Config::default();
        let mut json = serde_json::to_value(&cfg).unwrap();

        assert!(matches!(
            Config::set_json_value_by_path(&mut json, "remote.nope", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            Config::set_json_value_by_path(&mut json, "remote.timeout_secs", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
