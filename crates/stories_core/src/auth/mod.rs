//! Authorization policy for story operations.
//!
//! # Responsibility
//! - Decide whether a principal may perform an operation on a story.
//! - Record every denial as an audit event, even when the caller will
//!   surface it as not-found.
//!
//! # Invariants
//! - Published stories are readable by any principal, anonymous included.
//! - Draft/archived reads and all mutations require ownership or elevation.
//! - This module never formats user-facing messages; callers decide how a
//!   denial is presented.

use crate::model::author::AuthorId;
use crate::model::story::Story;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// The authenticated actor performing an operation.
///
/// Identity comes from an external authentication provider; the core only
/// needs a stable author id and the elevation flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    /// No authenticated identity.
    Anonymous,
    /// Authenticated author, optionally with moderator privilege.
    Author { id: AuthorId, elevated: bool },
}

impl Principal {
    /// Convenience constructor for a regular authenticated author.
    pub fn author(id: AuthorId) -> Self {
        Self::Author {
            id,
            elevated: false,
        }
    }

    /// Convenience constructor for an elevated (moderator) author.
    pub fn elevated(id: AuthorId) -> Self {
        Self::Author { id, elevated: true }
    }

    /// Returns the author identity, if authenticated.
    pub fn author_id(&self) -> Option<AuthorId> {
        match self {
            Self::Anonymous => None,
            Self::Author { id, .. } => Some(*id),
        }
    }

    /// Returns whether this principal overrides ownership checks.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Author { elevated: true, .. })
    }

    fn audit_label(&self) -> String {
        match self {
            Self::Anonymous => "anonymous".to_string(),
            Self::Author { id, .. } => id.to_string(),
        }
    }
}

/// Story operation kinds subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryAction {
    Read,
    Create,
    Update,
    Transition,
    Archive,
}

impl StoryAction {
    /// Stable string id used in audit log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Transition => "transition",
            Self::Archive => "archive",
        }
    }
}

/// Denied operation; distinct from not-found so callers can choose how
/// much to reveal at their own boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied {
    pub action: StoryAction,
}

impl Display for AccessDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation not permitted: {}", self.action.as_str())
    }
}

impl Error for AccessDenied {}

/// Applies the ownership policy for `(principal, action, story)`.
///
/// # Side effects
/// - Emits an `event=access_denied` audit line on every denial. The audit
///   trail keeps the permission/not-found distinction even where the
///   transport boundary deliberately collapses it.
pub fn authorize_story(
    principal: &Principal,
    action: StoryAction,
    story: &Story,
) -> Result<(), AccessDenied> {
    let allowed = match action {
        StoryAction::Read => story.is_published() || is_owner_or_elevated(principal, story),
        StoryAction::Create => principal.author_id().is_some(),
        StoryAction::Update | StoryAction::Transition | StoryAction::Archive => {
            is_owner_or_elevated(principal, story)
        }
    };

    if allowed {
        return Ok(());
    }

    warn!(
        "event=access_denied module=auth status=denied action={} story_id={} owner={} principal={}",
        action.as_str(),
        story.id,
        story.author_id,
        principal.audit_label()
    );
    Err(AccessDenied { action })
}

/// Requires an authenticated author identity for operations that have no
/// target story yet (creation).
///
/// # Side effects
/// - Emits an `event=access_denied` audit line on denial.
pub fn require_author(
    principal: &Principal,
    action: StoryAction,
) -> Result<AuthorId, AccessDenied> {
    match principal.author_id() {
        Some(id) => Ok(id),
        None => {
            warn!(
                "event=access_denied module=auth status=denied action={} story_id=none principal={}",
                action.as_str(),
                principal.audit_label()
            );
            Err(AccessDenied { action })
        }
    }
}

fn is_owner_or_elevated(principal: &Principal, story: &Story) -> bool {
    if principal.is_elevated() {
        return true;
    }
    principal
        .author_id()
        .is_some_and(|id| story.owned_by(id))
}
