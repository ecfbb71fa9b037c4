//! Contact domain model.
//!
//! # Responsibility
//! - Define the canonical contact record and its natural key.
//! - Validate names and phone numbers on request.
//! - Map contacts to and from the schemaless row shape stored on disk.
//!
//! # Invariants
//! - Identity is the exact `(first_name, last_name)` pair, never phone/address.
//! - Validation is opt-in; construction never rejects input.
//! - Persisted rows carry exactly `first_name`, `last_name`, `phone_number`
//!   and `address`. `full_name` is derived and never stored.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Schemaless row payload as handed to a document store.
pub type Fields = Map<String, Value>;

pub const FIELD_FIRST_NAME: &str = "first_name";
pub const FIELD_LAST_NAME: &str = "last_name";
pub const FIELD_PHONE_NUMBER: &str = "phone_number";
pub const FIELD_ADDRESS: &str = "address";

const MIN_PHONE_DIGITS: usize = 10;

static PHONE_DECORATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+()\s]").expect("valid phone decoration regex"));

/// Validation failures reported by [`Contact::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    /// A name part is empty or contains a digit/punctuation character.
    InvalidName { full_name: String },
    /// Phone number is shorter than 10 digits or contains non-digits after
    /// stripping `+`, `(`, `)` and whitespace. Carries the original input.
    InvalidPhoneNumber { phone_number: String },
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName { full_name } => write!(f, "invalid name `{full_name}`"),
            Self::InvalidPhoneNumber { phone_number } => {
                write!(f, "invalid phone number `{phone_number}`")
            }
        }
    }
}

impl Error for ContactValidationError {}

/// Natural key of a contact, compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactKey {
    pub first_name: String,
    pub last_name: String,
}

impl ContactKey {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Returns whether a stored row carries exactly this key.
    ///
    /// Rows with missing or non-string name fields never match.
    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(FIELD_FIRST_NAME).and_then(Value::as_str) == Some(self.first_name.as_str())
            && fields.get(FIELD_LAST_NAME).and_then(Value::as_str)
                == Some(self.last_name.as_str())
    }
}

/// Contact record value.
///
/// Treated as an immutable snapshot by persistence code; change a stored
/// contact by replacing it as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub address: String,
}

impl Contact {
    /// Creates a contact with empty phone number and address.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone_number: String::new(),
            address: String::new(),
        }
    }

    /// Creates a contact with every field provided.
    pub fn with_details(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone_number: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone_number: phone_number.into(),
            address: address.into(),
        }
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = phone_number.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// `"<first_name> <last_name>"`, for display only.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn key(&self) -> ContactKey {
        ContactKey::new(self.first_name.as_str(), self.last_name.as_str())
    }

    /// Checks names first, then the phone number.
    ///
    /// # Errors
    /// - `InvalidName` when either name part is empty or the concatenated
    ///   names contain an ASCII digit or ASCII punctuation character.
    /// - `InvalidPhoneNumber` when the stripped phone number is shorter than
    ///   10 characters or not made only of decimal digits.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        self.validate_names()?;
        self.validate_phone_number()
    }

    fn validate_names(&self) -> Result<(), ContactValidationError> {
        let empty = self.first_name.is_empty() || self.last_name.is_empty();
        let forbidden = self
            .first_name
            .chars()
            .chain(self.last_name.chars())
            .any(|c| c.is_ascii_digit() || c.is_ascii_punctuation());

        if empty || forbidden {
            return Err(ContactValidationError::InvalidName {
                full_name: self.full_name(),
            });
        }
        Ok(())
    }

    fn validate_phone_number(&self) -> Result<(), ContactValidationError> {
        let stripped = strip_phone_decoration(&self.phone_number);
        let long_enough = stripped.chars().count() >= MIN_PHONE_DIGITS;
        let digits_only = stripped.chars().all(|c| c.is_ascii_digit());

        if !(long_enough && digits_only) {
            return Err(ContactValidationError::InvalidPhoneNumber {
                phone_number: self.phone_number.clone(),
            });
        }
        Ok(())
    }

    /// Builds the persisted row, field by field.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            FIELD_FIRST_NAME.to_string(),
            Value::String(self.first_name.clone()),
        );
        fields.insert(
            FIELD_LAST_NAME.to_string(),
            Value::String(self.last_name.clone()),
        );
        fields.insert(
            FIELD_PHONE_NUMBER.to_string(),
            Value::String(self.phone_number.clone()),
        );
        fields.insert(
            FIELD_ADDRESS.to_string(),
            Value::String(self.address.clone()),
        );
        fields
    }

    /// Rebuilds a contact from a persisted row without validating it.
    ///
    /// Name fields are required; `phone_number` and `address` default to
    /// empty when absent. Returns a description of the first bad field.
    pub fn from_fields(fields: &Fields) -> Result<Self, String> {
        Ok(Self {
            first_name: required_text(fields, FIELD_FIRST_NAME)?,
            last_name: required_text(fields, FIELD_LAST_NAME)?,
            phone_number: optional_text(fields, FIELD_PHONE_NUMBER)?,
            address: optional_text(fields, FIELD_ADDRESS)?,
        })
    }
}

fn required_text(fields: &Fields, name: &str) -> Result<String, String> {
    match fields.get(name) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(format!("field `{name}` must be a string, got `{other}`")),
        None => Err(format!("missing required field `{name}`")),
    }
}

fn optional_text(fields: &Fields, name: &str) -> Result<String, String> {
    match fields.get(name) {
        None => Ok(String::new()),
        Some(_) => required_text(fields, name),
    }
}

fn strip_phone_decoration(phone_number: &str) -> String {
    PHONE_DECORATION_RE.replace_all(phone_number, "").into_owned()
}
