//! Contact records over a persistent, key-less document store.
//!
//! `Contact` values carry their own validation rules; `ContactRepository`
//! enforces natural-key uniqueness on top of any `DocumentStore` backend.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use config::{ConfigError, ConfiguredStore, StoreBackend, StoreConfig};
pub use db::{DbError, DbResult};
pub use logging::{init_logging, logging_status, LoggingError};
pub use model::contact::{Contact, ContactKey, ContactValidationError, Fields};
pub use repo::contact_repo::{
    list_all, ContactRepository, RepoError, RepoResult, ReplaceOutcome, SaveOptions, SaveOutcome,
};
pub use store::{DocId, Document, DocumentStore, JsonFileStore, SqliteDocumentStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
