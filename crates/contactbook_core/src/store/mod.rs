//! Minimal document store contract and its backends.
//!
//! # Responsibility
//! - Define the key-less persistence contract used by repositories.
//! - Provide SQLite and JSON-file implementations of that contract.
//!
//! # Invariants
//! - Stores never enforce uniqueness; callers check before inserting.
//! - Identifiers are assigned by the store and never reused.
//! - `all`/`find_one` observe rows in insertion order.
//! - Every write is durable when the call returns.

use crate::db::DbResult;
use crate::model::contact::Fields;

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteDocumentStore;

/// Store-assigned row identifier.
pub type DocId = u64;

/// One stored row together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocId,
    pub fields: Fields,
}

/// Key-less persistent collection of schemaless rows.
pub trait DocumentStore {
    /// Appends a row and returns its new identifier.
    fn insert(&mut self, fields: &Fields) -> DbResult<DocId>;

    /// Returns the first row, in storage order, accepted by `predicate`.
    fn find_one(&self, predicate: &dyn Fn(&Fields) -> bool) -> DbResult<Option<Document>>;

    /// Removes the given rows and returns the identifiers actually removed.
    ///
    /// Unknown identifiers are skipped.
    fn delete(&mut self, ids: &[DocId]) -> DbResult<Vec<DocId>>;

    /// Returns every row in storage order.
    fn all(&self) -> DbResult<Vec<Document>>;
}
