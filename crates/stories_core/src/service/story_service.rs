//! Story use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/update/transition/archive entry points.
//! - Enforce the visibility state machine and publish validation.
//! - Apply authorization before every operation and conceal restricted
//!   reads as not-found.
//!
//! # Invariants
//! - New stories always start as drafts owned by the calling principal.
//! - Archived stories accept no content edits and no transitions.
//! - Mutations require the caller's `expected_updated_at` token; a stale
//!   token fails with `EditConflict` and never silently clobbers.

use crate::auth::{authorize_story, require_author, AccessDenied, Principal, StoryAction};
use crate::model::author::AuthorId;
use crate::model::story::{
    validate_body_for_publish, validate_title, NewStory, Story, StoryId, StoryValidationError,
    Visibility,
};
use crate::repo::story_repo::{normalize_list_limit, StoryListQuery, StoryRepository};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for story use-cases.
#[derive(Debug)]
pub enum StoryServiceError {
    /// Field-level validation failure.
    Validation(StoryValidationError),
    /// State machine violation.
    InvalidTransition { from: Visibility, to: Visibility },
    /// Content edits are not allowed once a story is archived.
    ArchivedImmutable(StoryId),
    /// Operation denied by the authorization policy.
    AccessDenied(AccessDenied),
    /// Target story does not exist, or the caller may not know it does.
    StoryNotFound(StoryId),
    /// Optimistic token was stale; re-read and retry.
    EditConflict { id: StoryId, expected_updated_at: i64 },
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for StoryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid visibility transition: {from} -> {to}")
            }
            Self::ArchivedImmutable(id) => {
                write!(f, "archived story cannot be edited: {id}")
            }
            Self::AccessDenied(err) => write!(f, "{err}"),
            Self::StoryNotFound(id) => write!(f, "story not found: {id}"),
            Self::EditConflict {
                id,
                expected_updated_at,
            } => write!(
                f,
                "edit conflict for {id}: story changed since updated_at={expected_updated_at}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent story state: {details}")
            }
        }
    }
}

impl Error for StoryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::AccessDenied(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoryServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::StoryNotFound(id),
            RepoError::StaleWrite {
                id,
                expected_updated_at,
            } => Self::EditConflict {
                id,
                expected_updated_at,
            },
            RepoError::StoryValidation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<AccessDenied> for StoryServiceError {
    fn from(value: AccessDenied) -> Self {
        Self::AccessDenied(value)
    }
}

impl From<StoryValidationError> for StoryServiceError {
    fn from(value: StoryValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Input for story creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStoryRequest {
    pub title: String,
    pub body: String,
}

/// Input for partial content updates.
///
/// `None` fields keep their current value; `expected_updated_at` is the
/// token from the caller's last read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStoryRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub expected_updated_at: i64,
}

/// Input for story listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStoriesRequest {
    /// Optional owning-author filter.
    pub author_id: Option<AuthorId>,
    /// Optional visibility scope; non-privileged callers are clamped to
    /// published.
    pub visibility: Option<Visibility>,
    /// 1-based page number; defaults to 1.
    pub page: Option<u32>,
    /// Page size; defaults to 20 and clamps to 100.
    pub page_size: Option<u32>,
}

/// List result envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoriesPage {
    /// Items ordered by `created_at DESC, id ASC`.
    pub items: Vec<Story>,
    /// Effective 1-based page number.
    pub page: u32,
    /// Effective normalized page size.
    pub page_size: u32,
}

/// Story service facade over repository implementations.
pub struct StoryService<R: StoryRepository> {
    repo: R,
}

impl<R: StoryRepository> StoryService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a draft story owned by the calling principal.
    pub fn create_story(
        &mut self,
        principal: &Principal,
        request: CreateStoryRequest,
    ) -> Result<Story, StoryServiceError> {
        let author_id = require_author(principal, StoryAction::Create)?;
        let story = NewStory::new(author_id, request.title, request.body);
        let id = self.repo.create_story(&story)?;
        self.repo
            .get_story(id)?
            .ok_or(StoryServiceError::InconsistentState(
                "created story not found in read-back",
            ))
    }

    /// Gets one story, applying the read policy.
    ///
    /// A denied read is reported as `StoryNotFound` so restricted stories
    /// are indistinguishable from missing ones; the authorization layer has
    /// already logged the denial for audit.
    pub fn get_story(
        &self,
        principal: &Principal,
        id: StoryId,
    ) -> Result<Story, StoryServiceError> {
        let story = self
            .repo
            .get_story(id)?
            .ok_or(StoryServiceError::StoryNotFound(id))?;

        match authorize_story(principal, StoryAction::Read, &story) {
            Ok(()) => Ok(story),
            Err(_) => Err(StoryServiceError::StoryNotFound(id)),
        }
    }

    /// Lists stories with pagination, clamped to what the caller may see.
    ///
    /// Callers without access to the filtered owner's private stories get
    /// published results only; an explicit draft/archived scope they cannot
    /// see yields an empty page rather than an error or an existence leak.
    pub fn list_stories(
        &self,
        principal: &Principal,
        request: ListStoriesRequest,
    ) -> Result<StoriesPage, StoryServiceError> {
        let page = request.page.unwrap_or(1).max(1);
        let page_size = normalize_list_limit(request.page_size);

        let sees_private = principal.is_elevated()
            || (request.author_id.is_some() && request.author_id == principal.author_id());

        let visibility = if sees_private {
            request.visibility
        } else {
            match request.visibility {
                None | Some(Visibility::Published) => Some(Visibility::Published),
                Some(_) => {
                    return Ok(StoriesPage {
                        items: Vec::new(),
                        page,
                        page_size,
                    });
                }
            }
        };

        let query = StoryListQuery {
            author_id: request.author_id,
            visibility,
            limit: Some(page_size),
            offset: (page - 1).saturating_mul(page_size),
        };
        let items = self.repo.list_stories(&query)?;
        Ok(StoriesPage {
            items,
            page,
            page_size,
        })
    }

    /// Updates title and/or body under an optimistic token.
    pub fn update_story(
        &mut self,
        principal: &Principal,
        id: StoryId,
        request: UpdateStoryRequest,
    ) -> Result<Story, StoryServiceError> {
        let current = self
            .repo
            .get_story(id)?
            .ok_or(StoryServiceError::StoryNotFound(id))?;
        authorize_story(principal, StoryAction::Update, &current)?;

        if current.is_archived() {
            return Err(StoryServiceError::ArchivedImmutable(id));
        }

        let published = current.is_published();
        let title = request.title.unwrap_or(current.title);
        let body = request.body.unwrap_or(current.body);
        validate_title(&title)?;
        if published {
            validate_body_for_publish(&body)?;
        }

        self.repo
            .update_story_content(id, &title, &body, request.expected_updated_at)?;
        self.repo
            .get_story(id)?
            .ok_or(StoryServiceError::InconsistentState(
                "updated story not found in read-back",
            ))
    }

    /// Moves a story to `target` under an optimistic token.
    ///
    /// Publishing validates that title and body are present; archival via
    /// transition follows the same rules as any other move. Use
    /// [`Self::archive_story`] for the idempotent archive operation.
    pub fn transition_story(
        &mut self,
        principal: &Principal,
        id: StoryId,
        target: Visibility,
        expected_updated_at: i64,
    ) -> Result<Story, StoryServiceError> {
        let current = self
            .repo
            .get_story(id)?
            .ok_or(StoryServiceError::StoryNotFound(id))?;
        authorize_story(principal, StoryAction::Transition, &current)?;

        if !current.visibility.can_transition_to(target) {
            return Err(StoryServiceError::InvalidTransition {
                from: current.visibility,
                to: target,
            });
        }

        if target == Visibility::Published {
            validate_title(&current.title)?;
            validate_body_for_publish(&current.body)?;
        }

        self.repo.set_visibility(id, target, expected_updated_at)?;
        self.repo
            .get_story(id)?
            .ok_or(StoryServiceError::InconsistentState(
                "transitioned story not found in read-back",
            ))
    }

    /// Archives a story. Idempotent: archiving an archived story returns
    /// its current state without error.
    pub fn archive_story(
        &mut self,
        principal: &Principal,
        id: StoryId,
    ) -> Result<Story, StoryServiceError> {
        let current = self
            .repo
            .get_story(id)?
            .ok_or(StoryServiceError::StoryNotFound(id))?;
        authorize_story(principal, StoryAction::Archive, &current)?;

        Ok(self.repo.archive_story(id)?)
    }
}
