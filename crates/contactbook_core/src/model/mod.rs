//! Domain model for contact records.
//!
//! # Responsibility
//! - Define the contact value type and its natural key.
//! - Own field-level validation rules.
//!
//! # Invariants
//! - Model types hold no storage handles.

pub mod contact;
