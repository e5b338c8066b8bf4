//! Layered configuration.
//!
//! Sources, highest priority first:
//! 1. Environment variables with the `PREP_` prefix (`PREP_DATABASE_PATH`, `PREP_USER_ID`, ...)
//! 2. `./prep.toml`
//! 3. `<config dir>/prep/config.toml`
//! 4. Built-in defaults

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Overrides the default database location under the data directory.
    pub database_path: Option<PathBuf>,
    /// Single-user stand-in for authentication; every query is scoped to it.
    pub user_id: i64,
    /// Default `tracing` filter when `PREP_LOG` is not set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            user_id: 1,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        figment
            .merge(Toml::file("prep.toml"))
            .merge(Env::prefixed("PREP_").ignore(&["log"]))
    }

    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "prep")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "user_id".to_string(),
                reason: format!("must be positive, got {}", self.user_id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    /// Resolve the per-user config directory inside the jail.
    fn isolate_user_dirs(jail: &mut Jail) {
        let dir = jail.directory().display().to_string();
        jail.set_env("HOME", &dir);
        jail.set_env("XDG_CONFIG_HOME", &dir);
    }

    #[test]
    fn defaults_without_files_or_env() {
        Jail::expect_with(|jail| {
            isolate_user_dirs(jail);
            let config = Config::load().expect("config loads");
            assert_eq!(config.user_id, 1);
            assert_eq!(config.log_level, "warn");
            Ok(())
        });
    }

    #[test]
    fn local_file_then_env() {
        Jail::expect_with(|jail| {
            isolate_user_dirs(jail);
            jail.create_file(
                "prep.toml",
                r#"
                user_id = 7
                database_path = "/tmp/from-file.db"
                "#,
            )?;
            jail.set_env("PREP_DATABASE_PATH", "/tmp/from-env.db");

            let config = Config::load().expect("config loads");
            assert_eq!(config.user_id, 7);
            assert_eq!(config.database_path, Some(PathBuf::from("/tmp/from-env.db")));
            Ok(())
        });
    }

    #[test]
    fn rejects_non_positive_user() {
        Jail::expect_with(|jail| {
            isolate_user_dirs(jail);
            jail.set_env("PREP_USER_ID", "0");
            let err = Config::load().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref field, .. } if field == "user_id"
            ));
            Ok(())
        });
    }

    #[test]
    fn user_config_sits_below_local_file_and_env() {
        Jail::expect_with(|jail| {
            isolate_user_dirs(jail);
            let user_file = Config::global_config_path().expect("config dir resolves");
            assert!(user_file.starts_with(jail.directory()));
            std::fs::create_dir_all(user_file.parent().unwrap()).unwrap();
            std::fs::write(
                &user_file,
                r#"
                user_id = 5
                log_level = "info"
                database_path = "/tmp/from-user.db"
                "#,
            )
            .unwrap();

            assert_eq!(
                Config::load().expect("config loads"),
                Config {
                    database_path: Some(PathBuf::from("/tmp/from-user.db")),
                    user_id: 5,
                    log_level: "info".to_string(),
                }
            );

            jail.create_file("prep.toml", "user_id = 7")?;
            let config = Config::load().expect("config loads");
            assert_eq!(config.user_id, 7);
            assert_eq!(config.log_level, "info");

            jail.set_env("PREP_USER_ID", "9");
            jail.set_env("PREP_LOG_LEVEL", "debug");
            let config = Config::load().expect("config loads");
            assert_eq!(config.user_id, 9);
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.database_path, Some(PathBuf::from("/tmp/from-user.db")));
            Ok(())
        });
    }
}
