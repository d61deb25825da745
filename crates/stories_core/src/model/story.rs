//! Story domain model and visibility state machine.
//!
//! # Responsibility
//! - Define the authored content record and its creation input shape.
//! - Own the Draft/Published/Archived transition rules.
//!
//! # Invariants
//! - `id` is stable and never reused for another story.
//! - Archived is terminal: no transition leaves it.
//! - `updated_at` moves strictly forward on every mutation and doubles as
//!   the optimistic-concurrency token.

use crate::model::author::AuthorId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a story.
pub type StoryId = Uuid;

/// Maximum title length in characters.
pub const TITLE_MAX_CHARS: usize = 200;

/// Visibility state of one story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Initial state; work in progress, body may be empty.
    Draft,
    /// Publicly readable.
    Published,
    /// Soft-deleted terminal state kept for audit history.
    Archived,
}

impl Visibility {
    /// Stable string form used in storage and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Parses the stable string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Returns whether the state machine permits `self -> target`.
    ///
    /// Same-state moves are not transitions; archive idempotency is handled
    /// by the archive operation itself, not here.
    pub fn can_transition_to(self, target: Visibility) -> bool {
        match (self, target) {
            (Self::Draft, Self::Published)
            | (Self::Draft, Self::Archived)
            | (Self::Published, Self::Draft)
            | (Self::Published, Self::Archived) => true,
            _ => false,
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for story fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryValidationError {
    NilId,
    EmptyTitle,
    TitleTooLong { length: usize, max: usize },
    EmptyBody,
}

impl Display for StoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "story id must not be the nil uuid"),
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::TitleTooLong { length, max } => {
                write!(f, "title has {length} chars, maximum is {max}")
            }
            Self::EmptyBody => write!(f, "body must not be empty for a published story"),
        }
    }
}

impl Error for StoryValidationError {}

/// Persisted story record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Stable global ID.
    pub id: StoryId,
    /// Owning author; ownership is a back-reference, not containment.
    pub author_id: AuthorId,
    /// Non-empty title, at most [`TITLE_MAX_CHARS`] characters.
    pub title: String,
    /// Body text; may be empty while the story is a draft.
    pub body: String,
    /// Current visibility state.
    pub visibility: Visibility,
    /// Creation time in epoch milliseconds, assigned by storage.
    pub created_at: i64,
    /// Last mutation time in epoch milliseconds; optimistic write token.
    pub updated_at: i64,
}

impl Story {
    pub fn is_published(&self) -> bool {
        self.visibility == Visibility::Published
    }

    pub fn is_archived(&self) -> bool {
        self.visibility == Visibility::Archived
    }

    /// Returns whether the given author owns this story.
    pub fn owned_by(&self, author_id: AuthorId) -> bool {
        self.author_id == author_id
    }
}

/// Creation input for one story. New stories always start as drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStory {
    pub id: StoryId,
    pub author_id: AuthorId,
    pub title: String,
    pub body: String,
}

impl NewStory {
    /// Creates a story input with a generated stable ID.
    pub fn new(author_id: AuthorId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Creates a story input with a caller-provided stable ID.
    pub fn with_id(
        id: StoryId,
        author_id: AuthorId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, StoryValidationError> {
        if id.is_nil() {
            return Err(StoryValidationError::NilId);
        }
        Ok(Self {
            id,
            author_id,
            title: title.into(),
            body: body.into(),
        })
    }

    /// Validates caller-supplied fields for the draft state.
    pub fn validate(&self) -> Result<(), StoryValidationError> {
        if self.id.is_nil() {
            return Err(StoryValidationError::NilId);
        }
        validate_title(&self.title)
    }
}

/// Validates a story title against the non-empty and length rules.
pub fn validate_title(title: &str) -> Result<(), StoryValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StoryValidationError::EmptyTitle);
    }
    let length = trimmed.chars().count();
    if length > TITLE_MAX_CHARS {
        return Err(StoryValidationError::TitleTooLong {
            length,
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(())
}

/// Validates a story body for the published state. Drafts may be empty.
pub fn validate_body_for_publish(body: &str) -> Result<(), StoryValidationError> {
    if body.trim().is_empty() {
        return Err(StoryValidationError::EmptyBody);
    }
    Ok(())
}
