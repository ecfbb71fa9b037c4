//! Repository layer over document stores.
//!
//! # Responsibility
//! - Expose use-case oriented contact persistence.
//! - Keep storage details behind the `DocumentStore` contract.
//!
//! # Invariants
//! - Uniqueness of the natural key is enforced here, not in the store.

pub mod contact_repo;
