//! Store configuration.
//!
//! # Responsibility
//! - Describe which document store backend to open and where.
//! - Read that description from the process environment.
//!
//! # Invariants
//! - Unknown backend names are rejected, never defaulted.

use crate::db::{DbError, DbResult};
use crate::model::contact::Fields;
use crate::store::{DocId, Document, DocumentStore, JsonFileStore, SqliteDocumentStore};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_STORE_BACKEND: &str = "CONTACTBOOK_STORE_BACKEND";
pub const ENV_STORE_PATH: &str = "CONTACTBOOK_STORE_PATH";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Json,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }

    fn default_path(self) -> PathBuf {
        match self {
            Self::Sqlite => PathBuf::from("contactbook.db"),
            Self::Json => PathBuf::from("contactbook.json"),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    UnknownBackend(String),
    EmptyPath,
    Db(DbError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownBackend(name) => {
                write!(f, "unknown store backend `{name}`; expected sqlite|json")
            }
            Self::EmptyPath => write!(f, "store path cannot be empty"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UnknownBackend(_) | Self::EmptyPath => None,
        }
    }
}

impl From<DbError> for ConfigError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Where and how the contact store is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let backend = StoreBackend::default();
        Self {
            backend,
            path: backend.default_path(),
        }
    }
}

impl StoreConfig {
    pub fn new(backend: StoreBackend, path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            path: path.into(),
        }
    }

    /// Reads `CONTACTBOOK_STORE_BACKEND` and `CONTACTBOOK_STORE_PATH`.
    ///
    /// Unset variables fall back to the sqlite backend and a file in the
    /// working directory named after the backend.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`StoreConfig::from_env`] with a caller-provided lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup(ENV_STORE_BACKEND) {
            Some(value) => StoreBackend::parse(&value)?,
            None => StoreBackend::default(),
        };
        let path = match lookup(ENV_STORE_PATH) {
            Some(value) if value.trim().is_empty() => return Err(ConfigError::EmptyPath),
            Some(value) => PathBuf::from(value.trim()),
            None => backend.default_path(),
        };
        Ok(Self { backend, path })
    }

    /// Opens the configured backend.
    pub fn open(&self) -> Result<ConfiguredStore, ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        info!(
            "event=store_open module=config status=start backend={:?} path={}",
            self.backend,
            self.path.display()
        );
        let store = match self.backend {
            StoreBackend::Sqlite => ConfiguredStore::Sqlite(SqliteDocumentStore::open(&self.path)?),
            StoreBackend::Json => ConfiguredStore::Json(JsonFileStore::open(&self.path)?),
        };
        Ok(store)
    }
}

/// Store handle for whichever backend a [`StoreConfig`] selected.
pub enum ConfiguredStore {
    Sqlite(SqliteDocumentStore),
    Json(JsonFileStore),
}

impl ConfiguredStore {
    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::Sqlite(_) => StoreBackend::Sqlite,
            Self::Json(_) => StoreBackend::Json,
        }
    }

    /// Closes the underlying backend handle.
    pub fn close(self) -> DbResult<()> {
        match self {
            Self::Sqlite(store) => store.close(),
            Self::Json(store) => store.close(),
        }
    }
}

impl DocumentStore for ConfiguredStore {
    fn insert(&mut self, fields: &Fields) -> DbResult<DocId> {
        match self {
            Self::Sqlite(store) => store.insert(fields),
            Self::Json(store) => store.insert(fields),
        }
    }

    fn find_one(&self, predicate: &dyn Fn(&Fields) -> bool) -> DbResult<Option<Document>> {
        match self {
            Self::Sqlite(store) => store.find_one(predicate),
            Self::Json(store) => store.find_one(predicate),
        }
    }

    fn delete(&mut self, ids: &[DocId]) -> DbResult<Vec<DocId>> {
        match self {
            Self::Sqlite(store) => store.delete(ids),
            Self::Json(store) => store.delete(ids),
        }
    }

    fn all(&self) -> DbResult<Vec<Document>> {
        match self {
            Self::Sqlite(store) => store.all(),
            Self::Json(store) => store.all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreBackend, StoreConfig, ENV_STORE_BACKEND, ENV_STORE_PATH};
    use std::path::PathBuf;

    #[test]
    fn missing_variables_fall_back_to_sqlite_defaults() {
        let config = StoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.path, PathBuf::from("contactbook.db"));
    }

    #[test]
    fn json_backend_uses_json_default_path() {
        let config = StoreConfig::from_lookup(|name| {
            (name == ENV_STORE_BACKEND).then(|| " JSON ".to_string())
        })
        .unwrap();
        assert_eq!(config.backend, StoreBackend::Json);
        assert_eq!(config.path, PathBuf::from("contactbook.json"));
    }

    #[test]
    fn rejects_unknown_backend_and_blank_path() {
        let unknown = StoreConfig::from_lookup(|name| {
            (name == ENV_STORE_BACKEND).then(|| "tinydb".to_string())
        });
        assert!(matches!(unknown, Err(ConfigError::UnknownBackend(name)) if name == "tinydb"));

        let blank =
            StoreConfig::from_lookup(|name| (name == ENV_STORE_PATH).then(|| "  ".to_string()));
        assert!(matches!(blank, Err(ConfigError::EmptyPath)));
    }

    #[test]
    fn deserializes_from_json_with_default_backend() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"path": "/tmp/contacts.db"}"#).unwrap();
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.path, PathBuf::from("/tmp/contacts.db"));
    }
}
