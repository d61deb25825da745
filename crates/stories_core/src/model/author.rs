//! Author domain model.
//!
//! # Responsibility
//! - Define the content-creator record and its registration input shape.
//! - Normalize and validate contact handles before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another author.
//! - `contact_handle` is stored trimmed and lowercased; uniqueness across
//!   all authors is enforced by storage.
//! - Authors are never hard-deleted; `is_active` is the deactivation flag.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for an author.
pub type AuthorId = Uuid;

/// Maximum display name length in characters.
pub const DISPLAY_NAME_MAX_CHARS: usize = 80;

static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid handle regex"));

/// Validation failures for author input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorValidationError {
    NilId,
    EmptyDisplayName,
    DisplayNameTooLong { length: usize, max: usize },
    InvalidHandle(String),
}

impl Display for AuthorValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "author id must not be the nil uuid"),
            Self::EmptyDisplayName => write!(f, "display_name must not be empty"),
            Self::DisplayNameTooLong { length, max } => {
                write!(f, "display_name has {length} chars, maximum is {max}")
            }
            Self::InvalidHandle(value) => {
                write!(f, "contact_handle `{value}` is not a valid handle")
            }
        }
    }
}

impl Error for AuthorValidationError {}

/// Persisted author record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Stable global ID used for ownership references and auditing.
    pub id: AuthorId,
    /// Human-readable name shown alongside authored stories.
    pub display_name: String,
    /// Unique contact handle, normalized to trimmed lowercase.
    pub contact_handle: String,
    /// Soft-deactivation flag; inactive authors keep their stories.
    pub is_active: bool,
    /// Creation time in epoch milliseconds, assigned by storage.
    pub created_at: i64,
}

impl Author {
    /// Marks this author as deactivated.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Clears the deactivation flag.
    pub fn reactivate(&mut self) {
        self.is_active = true;
    }
}

/// Registration input for one author.
///
/// Timestamps are assigned by storage on insert; this shape carries only
/// caller-supplied fields plus the generated stable ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub id: AuthorId,
    pub display_name: String,
    pub contact_handle: String,
}

impl NewAuthor {
    /// Creates a registration input with a generated stable ID.
    ///
    /// The contact handle is normalized (trimmed, lowercased) here so every
    /// later comparison operates on the canonical form.
    pub fn new(display_name: impl Into<String>, contact_handle: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            contact_handle: normalize_handle(contact_handle),
        }
    }

    /// Creates a registration input with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: AuthorId,
        display_name: impl Into<String>,
        contact_handle: &str,
    ) -> Result<Self, AuthorValidationError> {
        if id.is_nil() {
            return Err(AuthorValidationError::NilId);
        }
        Ok(Self {
            id,
            display_name: display_name.into(),
            contact_handle: normalize_handle(contact_handle),
        })
    }

    /// Validates all caller-supplied fields.
    pub fn validate(&self) -> Result<(), AuthorValidationError> {
        if self.id.is_nil() {
            return Err(AuthorValidationError::NilId);
        }
        let name = self.display_name.trim();
        if name.is_empty() {
            return Err(AuthorValidationError::EmptyDisplayName);
        }
        let length = name.chars().count();
        if length > DISPLAY_NAME_MAX_CHARS {
            return Err(AuthorValidationError::DisplayNameTooLong {
                length,
                max: DISPLAY_NAME_MAX_CHARS,
            });
        }
        if !HANDLE_RE.is_match(&self.contact_handle) {
            return Err(AuthorValidationError::InvalidHandle(
                self.contact_handle.clone(),
            ));
        }
        Ok(())
    }
}

/// Normalizes a contact handle to its canonical stored form.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().to_lowercase()
}
