use std::path::PathBuf;

use thiserror::Error;

use crate::repository::DEFAULT_NAMESPACE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {var}: expected true or false")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `RUST_LOG`-style directive
    pub filter: String,
    pub json: bool,
    /// When set, logs go to a daily-rolling file here instead of stderr
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "adotadog=info".to_string(),
            json: false,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub namespace: String,
    /// Seed sample users/dogs on first run
    pub seed: bool,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("adotadog_data"),
            namespace: DEFAULT_NAMESPACE.to_string(),
            seed: true,
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let seed = match lookup("ADOTADOG_SEED") {
            Some(value) => parse_bool("ADOTADOG_SEED", &value)?,
            None => defaults.seed,
        };
        Ok(Self {
            data_dir: lookup("ADOTADOG_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            namespace: lookup("ADOTADOG_NAMESPACE")
                .filter(|ns| !ns.trim().is_empty())
                .unwrap_or(defaults.namespace),
            seed,
            log: LogConfig {
                filter: lookup("RUST_LOG").unwrap_or(defaults.log.filter),
                json: lookup("LOG_FORMAT").is_some_and(|v| v == "json"),
                dir: lookup("ADOTADOG_LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        assert_eq!(from_pairs(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = from_pairs(&[
            ("ADOTADOG_DATA_DIR", "/tmp/adotadog"),
            ("ADOTADOG_NAMESPACE", "demo"),
            ("ADOTADOG_SEED", "off"),
            ("RUST_LOG", "adotadog=debug"),
            ("LOG_FORMAT", "json"),
            ("ADOTADOG_LOG_DIR", "/var/log/adotadog"),
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/adotadog"));
        assert_eq!(config.namespace, "demo");
        assert!(!config.seed);
        assert_eq!(config.log.filter, "adotadog=debug");
        assert!(config.log.json);
        assert_eq!(config.log.dir, Some(PathBuf::from("/var/log/adotadog")));
    }

    #[test]
    fn test_blank_namespace_falls_back_to_default() {
        let config = from_pairs(&[("ADOTADOG_NAMESPACE", " ")]).unwrap();
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_invalid_seed_flag_is_rejected() {
        let err = from_pairs(&[("ADOTADOG_SEED", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("ADOTADOG_SEED"));
    }
}
