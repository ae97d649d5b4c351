//! Optional per-project defaults, read from a `sqldelta.toml` in the working
//! directory or any of its ancestors.
//!
//! ```toml
//! dialect = "postgresql"
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::dialect::{Dialect, UnsupportedDialectError};

pub const CONFIG_FILENAME: &str = "sqldelta.toml";

/// Used when neither the command line nor a config file names a dialect.
pub const DEFAULT_DIALECT: &str = "sqlite";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub dialect: Option<String>,
}
impl Config {
    /// The configured dialect, validated.
    pub fn dialect(&self) -> Result<Option<Dialect>, UnsupportedDialectError> {
        self.dialect.as_deref().map(str::parse).transpose()
    }
}

pub fn read_config(path: &Path) -> Result<Config, ReadConfigError> {
    let content = fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content)?;
    match table.try_into() {
        Ok(config) => Ok(config),
        Err(e) => Err(ReadConfigError::Invalid(e)),
    }
}

/// Finds the nearest config file at or above `directory`.
pub fn find_config(directory: &Path) -> Option<PathBuf> {
    directory
        .ancestors()
        .map(|d| d.join(CONFIG_FILENAME))
        .find(|p| p.is_file())
}

/// Loads the nearest config file, or the defaults if there is none.
pub fn load_config(directory: &Path) -> Result<Config, ReadConfigError> {
    match find_config(directory) {
        Some(path) => {
            debug!("Reading configuration from {}", path.display());
            read_config(&path).map_err(|e| ReadConfigError::At(path, Box::new(e)))
        }
        None => Ok(Config::default()),
    }
}

#[derive(Debug, Error)]
pub enum ReadConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML syntax error: {0}")]
    SyntaxError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(toml::de::Error),
    #[error("{0}: {1}")]
    At(PathBuf, Box<ReadConfigError>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_config_in_an_ancestor() {
        let root = tempdir().unwrap();
        let nested = root.path().join("db").join("schemas");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join(CONFIG_FILENAME), "dialect = \"postgresql\"\n").unwrap();

        let config = load_config(&nested).unwrap();
        assert_eq!(config.dialect.as_deref(), Some("postgresql"));
        assert_eq!(config.dialect().unwrap(), Some(Dialect::Postgres));
    }

    #[test]
    fn missing_config_is_the_default() {
        let root = tempdir().unwrap();
        let config = load_config(root.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.dialect().unwrap(), None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let root = tempdir().unwrap();
        fs::write(root.path().join(CONFIG_FILENAME), "dialects = \"sqlite\"\n").unwrap();

        let err = load_config(root.path()).unwrap_err();
        assert!(matches!(err, ReadConfigError::At(_, ref inner) if matches!(**inner, ReadConfigError::Invalid(_))));
    }

    #[test]
    fn bad_dialect_is_reported_when_used() {
        let config = Config {
            dialect: Some("oracle".to_string()),
        };
        assert_eq!(
            config.dialect(),
            Err(UnsupportedDialectError("oracle".to_string()))
        );
    }

    #[test]
    fn syntax_errors_are_reported() {
        let root = tempdir().unwrap();
        let path = root.path().join(CONFIG_FILENAME);
        fs::write(&path, "dialect = ").unwrap();

        assert!(matches!(
            read_config(&path),
            Err(ReadConfigError::SyntaxError(_))
        ));
    }
}
