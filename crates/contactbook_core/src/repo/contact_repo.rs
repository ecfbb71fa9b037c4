//! Contact repository over a key-less document store.
//!
//! # Responsibility
//! - Enforce natural-key uniqueness the store itself cannot express.
//! - Translate between `Contact` values and stored rows.
//!
//! # Invariants
//! - Existence checks and the writes that depend on them run under one lock.
//! - "Already exists" and "not found" are outcomes, never errors.
//! - Validation runs only when the caller asks for it, and always before any
//!   write.

use crate::db::DbError;
use crate::model::contact::{Contact, ContactKey, ContactValidationError, Fields};
use crate::store::{DocId, Document, DocumentStore};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for contact persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ContactValidationError),
    Db(DbError),
    /// A stored row cannot be turned back into a `Contact`.
    InvalidData { id: DocId, message: String },
    /// A thread panicked while holding the store lock.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData { id, message } => {
                write!(f, "invalid persisted contact {id}: {message}")
            }
            Self::LockPoisoned => write!(f, "contact store lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData { .. } | Self::LockPoisoned => None,
        }
    }
}

impl From<ContactValidationError> for RepoError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Options for [`ContactRepository::save`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Run `Contact::validate()` before touching the store.
    pub validate: bool,
}

impl SaveOptions {
    pub const fn validated() -> Self {
        Self { validate: true }
    }
}

/// Result of a save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new row was written under this identifier.
    Inserted(DocId),
    /// A row with the same natural key was already present; nothing written.
    AlreadyExists,
}

impl SaveOutcome {
    pub fn inserted_id(self) -> Option<DocId> {
        match self {
            Self::Inserted(id) => Some(id),
            Self::AlreadyExists => None,
        }
    }

    pub fn is_inserted(self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Result of replacing one stored contact with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced { removed: DocId, inserted: DocId },
    /// The contact to replace is not stored.
    NotFound,
    /// The replacement's key differs and is already taken.
    Conflict,
}

/// Contact repository owning a document store handle.
///
/// Safe to share across threads when `S: Send`; every operation takes the
/// store lock for its full duration.
pub struct ContactRepository<S: DocumentStore> {
    store: Mutex<S>,
}

impl<S: DocumentStore> ContactRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Gives the store handle back, e.g. to close it explicitly.
    pub fn into_store(self) -> RepoResult<S> {
        self.store.into_inner().map_err(|_| RepoError::LockPoisoned)
    }

    /// Returns whether a row with this contact's natural key is stored.
    pub fn exists(&self, contact: &Contact) -> RepoResult<bool> {
        let store = self.lock()?;
        Ok(find_by_key(&*store, &contact.key())?.is_some())
    }

    /// Looks up the stored snapshot for a natural key.
    pub fn find(&self, key: &ContactKey) -> RepoResult<Option<(DocId, Contact)>> {
        let store = self.lock()?;
        match find_by_key(&*store, key)? {
            Some(document) => {
                let contact = contact_from_document(&document)?;
                Ok(Some((document.id, contact)))
            }
            None => Ok(None),
        }
    }

    /// Saves a contact unless its natural key is already stored.
    ///
    /// # Errors
    /// - `Validation` when `options.validate` is set and the contact is
    ///   invalid. Nothing is written in that case.
    /// - `Db` on storage failure.
    pub fn save(&self, contact: &Contact, options: SaveOptions) -> RepoResult<SaveOutcome> {
        if options.validate {
            contact.validate()?;
        }

        let mut store = self.lock()?;
        let outcome = insert_if_absent(&mut *store, contact)?;
        match outcome {
            SaveOutcome::Inserted(id) => {
                info!("event=contact_save module=repo status=ok outcome=inserted id={id}");
            }
            SaveOutcome::AlreadyExists => {
                debug!("event=contact_save module=repo status=ok outcome=already_exists");
            }
        }
        Ok(outcome)
    }

    /// Deletes the stored row matching this contact's natural key.
    ///
    /// Returns the removed identifiers: empty when nothing was stored,
    /// otherwise exactly one.
    pub fn delete(&self, contact: &Contact) -> RepoResult<Vec<DocId>> {
        let mut store = self.lock()?;
        let Some(document) = find_by_key(&*store, &contact.key())? else {
            debug!("event=contact_delete module=repo status=ok outcome=absent");
            return Ok(Vec::new());
        };

        let removed = store.delete(&[document.id])?;
        info!(
            "event=contact_delete module=repo status=ok outcome=removed count={}",
            removed.len()
        );
        Ok(removed)
    }

    /// Replaces a stored contact by deleting it and saving `replacement`.
    ///
    /// Both steps run under one lock. When `options.validate` is set the
    /// replacement is validated before anything is removed. If the insert
    /// fails, the removed row is re-inserted before the error is returned.
    pub fn replace(
        &self,
        current: &Contact,
        replacement: &Contact,
        options: SaveOptions,
    ) -> RepoResult<ReplaceOutcome> {
        if options.validate {
            replacement.validate()?;
        }

        let mut store = self.lock()?;
        let Some(existing) = find_by_key(&*store, &current.key())? else {
            return Ok(ReplaceOutcome::NotFound);
        };

        let replacement_key = replacement.key();
        if replacement_key != current.key() && find_by_key(&*store, &replacement_key)?.is_some() {
            debug!("event=contact_replace module=repo status=ok outcome=conflict");
            return Ok(ReplaceOutcome::Conflict);
        }

        store.delete(&[existing.id])?;
        let inserted = match store.insert(&replacement.to_fields()) {
            Ok(id) => id,
            Err(err) => {
                restore_after_failed_replace(&mut *store, &existing);
                return Err(err.into());
            }
        };
        info!(
            "event=contact_replace module=repo status=ok removed={} inserted={inserted}",
            existing.id
        );
        Ok(ReplaceOutcome::Replaced {
            removed: existing.id,
            inserted,
        })
    }

    /// Reconstructs every stored contact in storage order, unvalidated.
    pub fn list_all(&self) -> RepoResult<Vec<Contact>> {
        let store = self.lock()?;
        list_all(&*store)
    }

    pub fn count(&self) -> RepoResult<usize> {
        let store = self.lock()?;
        Ok(store.all()?.len())
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, S>> {
        self.store.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

/// Reconstructs every contact held by `store`, in storage order.
///
/// No validation is applied to the rebuilt values.
pub fn list_all<S: DocumentStore + ?Sized>(store: &S) -> RepoResult<Vec<Contact>> {
    store
        .all()?
        .iter()
        .map(contact_from_document)
        .collect()
}

fn find_by_key<S: DocumentStore + ?Sized>(
    store: &S,
    key: &ContactKey,
) -> RepoResult<Option<Document>> {
    Ok(store.find_one(&|fields: &Fields| key.matches(fields))?)
}

fn insert_if_absent<S: DocumentStore + ?Sized>(
    store: &mut S,
    contact: &Contact,
) -> RepoResult<SaveOutcome> {
    if find_by_key(&*store, &contact.key())?.is_some() {
        return Ok(SaveOutcome::AlreadyExists);
    }
    let id = store.insert(&contact.to_fields())?;
    Ok(SaveOutcome::Inserted(id))
}

// Puts the removed row back under a new id. The insert error is what the
// caller sees either way.
fn restore_after_failed_replace<S: DocumentStore + ?Sized>(store: &mut S, removed: &Document) {
    match store.insert(&removed.fields) {
        Ok(id) => warn!(
            "event=contact_replace module=repo status=error outcome=restored removed={} restored={id}",
            removed.id
        ),
        Err(err) => error!(
            "event=contact_replace module=repo status=error outcome=lost removed={} error={err}",
            removed.id
        ),
    }
}

fn contact_from_document(document: &Document) -> RepoResult<Contact> {
    Contact::from_fields(&document.fields).map_err(|message| RepoError::InvalidData {
        id: document.id,
        message,
    })
}
