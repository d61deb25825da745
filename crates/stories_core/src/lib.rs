//! Core domain logic for the stories API.
//! This crate is the single source of truth for business invariants.

pub mod auth;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::{authorize_story, AccessDenied, Principal, StoryAction};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::author::{Author, AuthorId, AuthorValidationError, NewAuthor};
pub use model::story::{
    NewStory, Story, StoryId, StoryValidationError, Visibility, TITLE_MAX_CHARS,
};
pub use repo::author_repo::{AuthorRepository, SqliteAuthorRepository};
pub use repo::story_repo::{SqliteStoryRepository, StoryListQuery, StoryRepository};
pub use repo::{RepoError, RepoResult};
pub use service::author_service::{AuthorService, AuthorServiceError};
pub use service::story_service::{
    CreateStoryRequest, ListStoriesRequest, StoriesPage, StoryService, StoryServiceError,
    UpdateStoryRequest,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
