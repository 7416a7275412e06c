//! Configuration for the rental store.
//!
//! Every value is read from the environment once at startup, with a
//! compile-time default where one makes sense:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `RENTEASE_ENV` | `development`; `production` selects database mode |
//! | `RENTEASE_DATA_DIR` | platform data dir (`directories`), then `./data` |
//! | `RENTEASE_DATABASE_PATH` | `<data dir>/rentease.db` |
//! | `RENTEASE_JWT_SECRET` | a fixed development secret; required in production |
//! | `RENTEASE_SESSION_RECOVERY` | off |

use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use crate::persistence::DB_FILE_NAME;

const DEV_DATA_DIR: &str = "./data";
const DATABASE_FILE_NAME: &str = "rentease.db";
const DEV_JWT_SECRET: &str = "rentease-development-secret";
const PRODUCTION_ENV: &str = "production";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Which storage engine backs the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// One JSON file in the data directory.
    File,
    /// SQLite database.
    Database,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::File => "file",
            BackendKind::Database => "database",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(BackendKind::File),
            "database" | "db" | "sqlite" => Ok(BackendKind::Database),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    /// Recreate users from valid session credentials when their record is
    /// missing.
    pub session_recovery: bool,
}

impl StoreConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of an
    /// environment variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = backend_for_env(lookup("RENTEASE_ENV").as_deref());

        let data_dir = lookup("RENTEASE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let database_path = lookup("RENTEASE_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DATABASE_FILE_NAME));

        let jwt_secret = match lookup("RENTEASE_JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ if backend == BackendKind::Database => {
                return Err(ConfigError::MissingVar("RENTEASE_JWT_SECRET"));
            }
            _ => {
                warn!("RENTEASE_JWT_SECRET is not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let session_recovery = match lookup("RENTEASE_SESSION_RECOVERY") {
            Some(value) => parse_flag(&value)
                .ok_or(ConfigError::InvalidValue("RENTEASE_SESSION_RECOVERY", value))?,
            None => false,
        };

        Ok(Self {
            backend,
            data_dir,
            database_path,
            jwt_secret,
            session_recovery,
        })
    }

    /// Path of the file-mode store.
    pub fn json_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

/// `production` selects the database; anything else, or nothing, the file.
pub fn backend_for_env(env: Option<&str>) -> BackendKind {
    match env {
        Some(env) if env.eq_ignore_ascii_case(PRODUCTION_ENV) => BackendKind::Database,
        _ => BackendKind::File,
    }
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "rentease", "rentease").map_or_else(
        || PathBuf::from(DEV_DATA_DIR),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_select_file_mode() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert!(!config.session_recovery);
        assert!(!config.data_dir.as_os_str().is_empty());
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let result = StoreConfig::from_lookup(lookup_from(&[("RENTEASE_ENV", "production")]));
        assert!(matches!(
            result,
            Err(ConfigError::MissingVar("RENTEASE_JWT_SECRET"))
        ));
    }

    #[test]
    fn test_production_selects_database() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("RENTEASE_ENV", "Production"),
            ("RENTEASE_JWT_SECRET", "s3cret"),
            ("RENTEASE_DATA_DIR", "/srv/rentease"),
        ]))
        .unwrap();
        assert_eq!(config.backend, BackendKind::Database);
        assert_eq!(config.database_path, PathBuf::from("/srv/rentease/rentease.db"));
        assert_eq!(config.json_path(), PathBuf::from("/srv/rentease/db.json"));
    }

    #[test]
    fn test_database_path_override() {
        let config = StoreConfig::from_lookup(lookup_from(&[(
            "RENTEASE_DATABASE_PATH",
            "/tmp/other.db",
        )]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn test_session_recovery_flag() {
        let config =
            StoreConfig::from_lookup(lookup_from(&[("RENTEASE_SESSION_RECOVERY", "true")]))
                .unwrap();
        assert!(config.session_recovery);

        let result =
            StoreConfig::from_lookup(lookup_from(&[("RENTEASE_SESSION_RECOVERY", "maybe")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_, _))));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("2"), None);
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("sqlite".parse::<BackendKind>(), Ok(BackendKind::Database));
        assert_eq!("JSON".parse::<BackendKind>(), Ok(BackendKind::File));
        assert!("mongo".parse::<BackendKind>().is_err());
    }
}
