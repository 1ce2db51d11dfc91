//! Runtime settings: optional YAML file, then `TILEWATCH_*` environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::Deserialize;
use thiserror::Error;

use crate::data::access::{DEFAULT_ACCESS_LIST_PATH, DEFAULT_LANGUAGE_PREFS_PATH};
use crate::data::store::DEFAULT_STORE_PATH;
use crate::report::{HeaderGrammar, ReportGrammar, STANDARD_VERSION};

pub const DEFAULT_CONFIG_PATH: &str = "tilewatch.yaml";
const DEFAULT_BIND: &str = "127.0.0.1:3000";
/// America/Havana standard time.
const DEFAULT_UTC_OFFSET_MINUTES: i32 = -300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
    #[error("utc offset of {0} minutes is out of range")]
    InvalidOffset(i32),
    #[error("invalid report pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub store_path: PathBuf,
    pub access_list_path: PathBuf,
    pub language_prefs_path: PathBuf,
    /// Offset of the reference zone that timestamps are written and read in.
    pub utc_offset_minutes: i32,
    pub require_authorization: bool,
    /// Replaces the standard report grammar when set.
    pub report_pattern: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: DEFAULT_BIND.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            access_list_path: PathBuf::from(DEFAULT_ACCESS_LIST_PATH),
            language_prefs_path: PathBuf::from(DEFAULT_LANGUAGE_PREFS_PATH),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            require_authorization: true,
            report_pattern: None,
        }
    }
}

impl Config {
    /// Reads `TILEWATCH_CONFIG` (or `tilewatch.yaml` when present), then applies env overrides.
    pub fn load() -> Result<Config, ConfigError> {
        let explicit = env::var("TILEWATCH_CONFIG").ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if explicit.is_some() || Path::new(&path).exists() {
            Config::from_file(&path)?
        } else {
            Config::default()
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        config.zone()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Config::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Config, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Applies `TILEWATCH_*` values from `lookup` over the current settings.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("TILEWATCH_BIND") {
            self.bind = bind;
        }
        if let Some(path) = lookup("TILEWATCH_STORE") {
            self.store_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("TILEWATCH_ACCESS_LIST") {
            self.access_list_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("TILEWATCH_LANGUAGES") {
            self.language_prefs_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("TILEWATCH_UTC_OFFSET_MINUTES") {
            self.utc_offset_minutes =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    name: "TILEWATCH_UTC_OFFSET_MINUTES",
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup("TILEWATCH_REQUIRE_AUTH") {
            self.require_authorization =
                parse_flag(&raw).ok_or_else(|| ConfigError::InvalidValue {
                    name: "TILEWATCH_REQUIRE_AUTH",
                    value: raw.clone(),
                })?;
        }
        if let Some(pattern) = lookup("TILEWATCH_REPORT_PATTERN") {
            self.report_pattern = Some(pattern);
        }
        Ok(())
    }

    pub fn zone(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidOffset(self.utc_offset_minutes))
    }

    pub fn grammar(&self) -> Result<Box<dyn ReportGrammar>, ConfigError> {
        let grammar = match &self.report_pattern {
            Some(pattern) => HeaderGrammar::from_pattern("custom", pattern)?,
            None => HeaderGrammar::standard(),
        };
        log::debug!(
            "report grammar: {}",
            if self.report_pattern.is_some() { "custom" } else { STANDARD_VERSION }
        );
        Ok(Box::new(grammar))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let config = Config::from_yaml("bind: 0.0.0.0:8080\nrequire_authorization: false\n")
            .expect("valid yaml");
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert!(!config.require_authorization);
        assert_eq!(config.store_path, PathBuf::from(DEFAULT_STORE_PATH));
        assert_eq!(config.utc_offset_minutes, -300);
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("TILEWATCH_STORE", "/tmp/t.csv"),
            ("TILEWATCH_UTC_OFFSET_MINUTES", "-240"),
            ("TILEWATCH_REQUIRE_AUTH", "off"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .expect("overrides apply");
        assert_eq!(config.store_path, PathBuf::from("/tmp/t.csv"));
        assert_eq!(config.utc_offset_minutes, -240);
        assert!(!config.require_authorization);
        assert_eq!(
            config.zone().expect("valid zone"),
            FixedOffset::west_opt(4 * 3600).expect("offset")
        );
    }

    #[test]
    fn bad_override_values_are_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(|name| {
            (name == "TILEWATCH_REQUIRE_AUTH").then(|| "maybe".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let config = Config {
            utc_offset_minutes: 24 * 60,
            ..Config::default()
        };
        assert!(matches!(config.zone(), Err(ConfigError::InvalidOffset(1440))));
    }

    #[test]
    fn custom_pattern_replaces_standard_grammar() {
        let config = Config {
            report_pattern: Some("^scout".to_string()),
            ..Config::default()
        };
        let grammar = config.grammar().expect("valid pattern");
        assert!(grammar.is_valid_report("scout R1"));
        assert!(!grammar.is_valid_report("You looked to the R1"));
    }
}
