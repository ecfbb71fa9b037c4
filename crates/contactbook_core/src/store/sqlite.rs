//! SQLite-backed document store.
//!
//! Rows live in the `documents` table as JSON text. Lookups decode every
//! row in `id` order and filter in Rust; there is no index on row content.

use super::{DocId, Document, DocumentStore};
use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::contact::Fields;
use log::debug;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

const DOCUMENT_SELECT_SQL: &str = "SELECT id, body FROM documents ORDER BY id ASC;";

/// Document store handle owning one SQLite connection.
pub struct SqliteDocumentStore {
    conn: Connection,
}

impl SqliteDocumentStore {
    /// Opens (creating if needed) a database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Closes the underlying connection, reporting any close failure.
    pub fn close(self) -> DbResult<()> {
        self.conn.close().map_err(|(_, err)| DbError::Sqlite(err))
    }

    fn location(&self) -> PathBuf {
        PathBuf::from(
            self.conn
                .path()
                .filter(|path| !path.is_empty())
                .unwrap_or(":memory:"),
        )
    }

    fn scan(&self, mut visit: impl FnMut(Document) -> bool) -> DbResult<()> {
        let mut stmt = self.conn.prepare(DOCUMENT_SELECT_SQL)?;
        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            let rowid: i64 = row.get(0)?;
            let body: String = row.get(1)?;
            let document = self.decode(rowid, &body)?;
            if !visit(document) {
                break;
            }
        }

        Ok(())
    }

    fn decode(&self, rowid: i64, body: &str) -> DbResult<Document> {
        let id = DocId::try_from(rowid).map_err(|_| DbError::Corrupt {
            location: self.location(),
            message: format!("negative document id {rowid}"),
        })?;
        let fields: Fields = serde_json::from_str(body).map_err(|err| DbError::Corrupt {
            location: self.location(),
            message: format!("document {id} is not a JSON object: {err}"),
        })?;
        Ok(Document { id, fields })
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn insert(&mut self, fields: &Fields) -> DbResult<DocId> {
        let body = serde_json::to_string(fields)?;
        self.conn
            .execute("INSERT INTO documents (body) VALUES (?1);", params![body])?;

        let rowid = self.conn.last_insert_rowid();
        let id = DocId::try_from(rowid).map_err(|_| DbError::Corrupt {
            location: self.location(),
            message: format!("negative document id {rowid}"),
        })?;
        debug!("event=doc_insert module=store backend=sqlite status=ok id={id}");
        Ok(id)
    }

    fn find_one(&self, predicate: &dyn Fn(&Fields) -> bool) -> DbResult<Option<Document>> {
        let mut found = None;
        self.scan(|document| {
            if predicate(&document.fields) {
                found = Some(document);
                return false;
            }
            true
        })?;
        Ok(found)
    }

    fn delete(&mut self, ids: &[DocId]) -> DbResult<Vec<DocId>> {
        let tx = self.conn.transaction()?;
        let mut removed = Vec::new();
        for &id in ids {
            let Ok(rowid) = i64::try_from(id) else {
                continue;
            };
            let changed = tx.execute("DELETE FROM documents WHERE id = ?1;", params![rowid])?;
            if changed > 0 {
                removed.push(id);
            }
        }
        tx.commit()?;

        debug!(
            "event=doc_delete module=store backend=sqlite status=ok requested={} removed={}",
            ids.len(),
            removed.len()
        );
        Ok(removed)
    }

    fn all(&self) -> DbResult<Vec<Document>> {
        let mut documents = Vec::new();
        self.scan(|document| {
            documents.push(document);
            true
        })?;
        Ok(documents)
    }
}
