//! Single-file JSON document store.
//!
//! # Responsibility
//! - Keep every row in one human-readable JSON file.
//! - Rewrite the file atomically after each mutation.
//!
//! # Invariants
//! - On-disk shape is `{"last_id": N, "documents": {"<id>": {row}}}`.
//! - `last_id` only grows, so identifiers are never reused.
//! - In-memory state matches the file after every successful call; a failed
//!   write rolls the in-memory change back.

use super::{DocId, Document, DocumentStore};
use crate::db::{DbError, DbResult};
use crate::model::contact::Fields;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const INDENT: &[u8] = b"    ";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    last_id: DocId,
    documents: BTreeMap<DocId, Fields>,
}

/// Document store handle backed by one JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: StoreFile,
}

impl JsonFileStore {
    /// Opens the store at `path`, creating an empty file when missing.
    ///
    /// # Errors
    /// - `Corrupt` when the file exists but is not a store document.
    /// - `Io` when the file or its parent directory cannot be accessed.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        info!(
            "event=db_open module=store backend=json status=start path={}",
            path.display()
        );

        let state = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => StoreFile::default(),
            Ok(text) => parse_store_file(&path, &text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(err) => {
                error!(
                    "event=db_open module=store backend=json status=error error_code=read_failed error={err}"
                );
                return Err(err.into());
            }
        };

        let store = Self { path, state };
        if !store.path.exists() {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            store.persist()?;
        }

        info!(
            "event=db_open module=store backend=json status=ok documents={}",
            store.state.documents.len()
        );
        Ok(store)
    }

    /// Releases the handle. Every write is already on disk.
    pub fn close(self) -> DbResult<()> {
        Ok(())
    }

    fn persist(&self) -> DbResult<()> {
        let mut buffer = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(INDENT));
        self.state.serialize(&mut serializer)?;

        let tmp_path = temp_path(&self.path);
        let written = write_synced(&tmp_path, &buffer)
            .and_then(|()| fs::rename(&tmp_path, &self.path));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn insert(&mut self, fields: &Fields) -> DbResult<DocId> {
        let previous_last_id = self.state.last_id;
        let id = previous_last_id
            .checked_add(1)
            .ok_or_else(|| DbError::Corrupt {
                location: self.path.clone(),
                message: format!("last_id {previous_last_id} cannot be incremented"),
            })?;
        self.state.last_id = id;
        self.state.documents.insert(id, fields.clone());

        if let Err(err) = self.persist() {
            self.state.documents.remove(&id);
            self.state.last_id = previous_last_id;
            error!("event=doc_insert module=store backend=json status=error error={err}");
            return Err(err);
        }

        debug!("event=doc_insert module=store backend=json status=ok id={id}");
        Ok(id)
    }

    fn find_one(&self, predicate: &dyn Fn(&Fields) -> bool) -> DbResult<Option<Document>> {
        Ok(self
            .state
            .documents
            .iter()
            .find(|(_, fields)| predicate(fields))
            .map(|(&id, fields)| Document {
                id,
                fields: fields.clone(),
            }))
    }

    fn delete(&mut self, ids: &[DocId]) -> DbResult<Vec<DocId>> {
        let removed: Vec<(DocId, Fields)> = ids
            .iter()
            .filter_map(|id| self.state.documents.remove(id).map(|fields| (*id, fields)))
            .collect();

        if removed.is_empty() {
            return Ok(Vec::new());
        }

        if let Err(err) = self.persist() {
            self.state.documents.extend(removed);
            error!("event=doc_delete module=store backend=json status=error error={err}");
            return Err(err);
        }

        let removed_ids: Vec<DocId> = removed.into_iter().map(|(id, _)| id).collect();
        debug!(
            "event=doc_delete module=store backend=json status=ok requested={} removed={}",
            ids.len(),
            removed_ids.len()
        );
        Ok(removed_ids)
    }

    fn all(&self) -> DbResult<Vec<Document>> {
        Ok(self
            .state
            .documents
            .iter()
            .map(|(&id, fields)| Document {
                id,
                fields: fields.clone(),
            })
            .collect())
    }
}

fn parse_store_file(path: &Path, text: &str) -> DbResult<StoreFile> {
    let mut state: StoreFile = serde_json::from_str(text).map_err(|err| DbError::Corrupt {
        location: path.to_path_buf(),
        message: err.to_string(),
    })?;

    if let Some(&max_id) = state.documents.keys().next_back() {
        state.last_id = state.last_id.max(max_id);
    }
    Ok(state)
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
