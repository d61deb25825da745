//! Author use-case service.
//!
//! # Responsibility
//! - Provide registration, get-or-create, lookup and deactivation APIs.
//! - Keep handle normalization in one place ahead of storage uniqueness.
//!
//! # Invariants
//! - Registration conflicts surface as `HandleTaken`, never as raw DB
//!   errors.
//! - Deactivation is restricted to the author themself or an elevated
//!   principal, and never removes the row.

use crate::auth::Principal;
use crate::model::author::{normalize_handle, Author, AuthorId, AuthorValidationError, NewAuthor};
use crate::repo::author_repo::AuthorRepository;
use crate::repo::RepoError;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for author use-cases.
#[derive(Debug)]
pub enum AuthorServiceError {
    /// Field-level validation failure.
    Validation(AuthorValidationError),
    /// Another author already registered this contact handle.
    HandleTaken(String),
    /// Target author does not exist.
    AuthorNotFound(AuthorId),
    /// Caller is neither the target author nor elevated.
    NotPermitted(AuthorId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for AuthorServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::HandleTaken(handle) => {
                write!(f, "contact handle already registered: {handle}")
            }
            Self::AuthorNotFound(id) => write!(f, "author not found: {id}"),
            Self::NotPermitted(id) => {
                write!(f, "operation not permitted on author {id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent author state: {details}")
            }
        }
    }
}

impl Error for AuthorServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AuthorServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::AuthorValidation(err) => Self::Validation(err),
            RepoError::HandleConflict(handle) => Self::HandleTaken(handle),
            RepoError::NotFound(id) => Self::AuthorNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Author service facade over repository implementations.
pub struct AuthorService<R: AuthorRepository> {
    repo: R,
}

impl<R: AuthorRepository> AuthorService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers one author explicitly.
    pub fn register_author(
        &self,
        display_name: impl Into<String>,
        contact_handle: &str,
    ) -> Result<Author, AuthorServiceError> {
        let author = NewAuthor::new(display_name, contact_handle);
        let id = self.repo.create_author(&author)?;
        self.repo
            .get_author(id)?
            .ok_or(AuthorServiceError::InconsistentState(
                "registered author not found in read-back",
            ))
    }

    /// Gets or creates the author for an authenticated identity.
    ///
    /// Supports the created-on-first-authenticated-access lifecycle: when
    /// the handle is already known the existing record wins and the passed
    /// display name is ignored. A registration that loses a concurrent race
    /// on the same handle resolves to the winner's record instead of
    /// surfacing the conflict.
    pub fn ensure_author(
        &self,
        display_name: impl Into<String>,
        contact_handle: &str,
    ) -> Result<Author, AuthorServiceError> {
        let normalized = normalize_handle(contact_handle);
        if let Some(existing) = self.repo.find_author_by_handle(&normalized)? {
            return Ok(existing);
        }
        match self.register_author(display_name, &normalized) {
            Err(AuthorServiceError::HandleTaken(_)) => self
                .repo
                .find_author_by_handle(&normalized)?
                .ok_or(AuthorServiceError::InconsistentState(
                    "conflicting author not found in re-read",
                )),
            other => other,
        }
    }

    /// Gets one author by id.
    pub fn get_author(&self, id: AuthorId) -> Result<Author, AuthorServiceError> {
        self.repo
            .get_author(id)?
            .ok_or(AuthorServiceError::AuthorNotFound(id))
    }

    /// Soft-deactivates an author; allowed for the author themself or an
    /// elevated principal. Idempotent on already-inactive authors.
    pub fn deactivate_author(
        &self,
        principal: &Principal,
        id: AuthorId,
    ) -> Result<Author, AuthorServiceError> {
        let permitted = principal.is_elevated() || principal.author_id() == Some(id);
        if !permitted {
            warn!(
                "event=access_denied module=author status=denied action=deactivate author_id={id} principal={}",
                principal
                    .author_id()
                    .map_or_else(|| "anonymous".to_string(), |p| p.to_string())
            );
            return Err(AuthorServiceError::NotPermitted(id));
        }

        self.repo.deactivate_author(id)?;
        self.repo
            .get_author(id)?
            .ok_or(AuthorServiceError::InconsistentState(
                "deactivated author not found in read-back",
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthorService, AuthorServiceError};
    use crate::model::author::{Author, AuthorId, NewAuthor};
    use crate::repo::author_repo::AuthorRepository;
    use crate::repo::{RepoError, RepoResult};
    use std::cell::Cell;
    use uuid::Uuid;

    /// Repository where another writer registers the handle between the
    /// initial lookup and the insert.
    struct RacingRepo {
        winner: Author,
        lookups: Cell<u32>,
    }

    impl AuthorRepository for RacingRepo {
        fn create_author(&self, author: &NewAuthor) -> RepoResult<AuthorId> {
            Err(RepoError::HandleConflict(author.contact_handle.clone()))
        }

        fn get_author(&self, _id: AuthorId) -> RepoResult<Option<Author>> {
            Ok(Some(self.winner.clone()))
        }

        fn find_author_by_handle(&self, _handle: &str) -> RepoResult<Option<Author>> {
            let calls = self.lookups.get();
            self.lookups.set(calls + 1);
            if calls == 0 {
                return Ok(None);
            }
            Ok(Some(self.winner.clone()))
        }

        fn deactivate_author(&self, _id: AuthorId) -> RepoResult<()> {
            Ok(())
        }
    }

    #[test]
    fn ensure_author_resolves_to_winner_when_registration_races() {
        let winner = Author {
            id: Uuid::new_v4(),
            display_name: "First Writer".to_string(),
            contact_handle: "ada@x.com".to_string(),
            is_active: true,
            created_at: 1,
        };
        let service = AuthorService::new(RacingRepo {
            winner: winner.clone(),
            lookups: Cell::new(0),
        });

        let resolved = service.ensure_author("Second Writer", "ada@x.com").unwrap();
        assert_eq!(resolved, winner);
    }

    #[test]
    fn explicit_registration_still_surfaces_the_conflict() {
        let winner = Author {
            id: Uuid::new_v4(),
            display_name: "First Writer".to_string(),
            contact_handle: "ada@x.com".to_string(),
            is_active: true,
            created_at: 1,
        };
        let service = AuthorService::new(RacingRepo {
            winner,
            lookups: Cell::new(0),
        });

        let err = service.register_author("Second Writer", "ada@x.com").unwrap_err();
        assert!(matches!(err, AuthorServiceError::HandleTaken(_)));
    }
}
