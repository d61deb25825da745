//! Request dispatch and status-code mapping.
//!
//! # Responsibility
//! - Translate operation requests into core service calls.
//! - Serialize results and map error kinds onto status codes.
//!
//! # Invariants
//! - Each request runs on its own freshly opened, migrated connection.
//! - NotFound maps to 404, validation and transition failures to 400,
//!   conflicts to 409; denial presentation follows the configured policy.
//! - Internal failures surface as opaque 500 responses and are logged with
//!   detail server-side only.

use crate::config::{ApiConfig, DenialPolicy};
use log::error;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Display;
use stories_core::db::open_db;
use stories_core::{
    AuthorService, AuthorServiceError, CreateStoryRequest, ListStoriesRequest, Principal,
    SqliteAuthorRepository, SqliteStoryRepository, StoryService, StoryServiceError,
    UpdateStoryRequest, Visibility,
};
use uuid::Uuid;

/// One operation request at the transport boundary.
///
/// The tag doubles as the operation name; parameters mirror the data-model
/// attributes one-to-one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApiRequest {
    RegisterAuthor {
        display_name: String,
        contact_handle: String,
    },
    GetAuthor {
        author_id: Uuid,
    },
    DeactivateAuthor {
        author_id: Uuid,
    },
    CreateStory {
        title: String,
        #[serde(default)]
        body: String,
    },
    GetStory {
        story_id: Uuid,
    },
    ListStories {
        #[serde(default)]
        author_id: Option<Uuid>,
        #[serde(default)]
        visibility: Option<Visibility>,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        page_size: Option<u32>,
    },
    UpdateStory {
        story_id: Uuid,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        body: Option<String>,
        expected_updated_at: i64,
    },
    TransitionStory {
        story_id: Uuid,
        target: Visibility,
        expected_updated_at: i64,
    },
    ArchiveStory {
        story_id: Uuid,
    },
}

/// Response envelope: an HTTP-style status code plus a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn created(body: Value) -> Self {
        Self { status: 201, body }
    }

    fn error(status: u16, code: &str, message: impl Display) -> Self {
        Self {
            status,
            body: json!({
                "error": {
                    "code": code,
                    "message": message.to_string(),
                }
            }),
        }
    }
}

/// Stateless request adapter over the stories core.
pub struct Api {
    config: ApiConfig,
}

impl Api {
    /// Creates an adapter from explicit startup configuration.
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    /// Handles one request on behalf of `principal`.
    ///
    /// The principal comes from the external authentication provider; this
    /// adapter never derives identity from request payloads.
    pub fn handle(&self, principal: &Principal, request: ApiRequest) -> ApiResponse {
        let mut conn = match open_db(&self.config.db_path) {
            Ok(conn) => conn,
            Err(err) => return internal_error("db_open", &err),
        };

        match request {
            ApiRequest::RegisterAuthor {
                display_name,
                contact_handle,
            } => self.register_author(&conn, &display_name, &contact_handle),
            ApiRequest::GetAuthor { author_id } => self.get_author(&conn, principal, author_id),
            ApiRequest::DeactivateAuthor { author_id } => {
                self.deactivate_author(&conn, principal, author_id)
            }
            ApiRequest::CreateStory { title, body } => {
                self.create_story(&mut conn, principal, title, body)
            }
            ApiRequest::GetStory { story_id } => self.get_story(&mut conn, principal, story_id),
            ApiRequest::ListStories {
                author_id,
                visibility,
                page,
                page_size,
            } => self.list_stories(
                &mut conn,
                principal,
                ListStoriesRequest {
                    author_id,
                    visibility,
                    page,
                    page_size,
                },
            ),
            ApiRequest::UpdateStory {
                story_id,
                title,
                body,
                expected_updated_at,
            } => self.update_story(
                &mut conn,
                principal,
                story_id,
                UpdateStoryRequest {
                    title,
                    body,
                    expected_updated_at,
                },
            ),
            ApiRequest::TransitionStory {
                story_id,
                target,
                expected_updated_at,
            } => self.transition_story(
                &mut conn,
                principal,
                story_id,
                target,
                expected_updated_at,
            ),
            ApiRequest::ArchiveStory { story_id } => {
                self.archive_story(&mut conn, principal, story_id)
            }
        }
    }

    fn register_author(
        &self,
        conn: &Connection,
        display_name: &str,
        contact_handle: &str,
    ) -> ApiResponse {
        let service = match author_service(conn) {
            Ok(service) => service,
            Err(response) => return response,
        };
        match service.register_author(display_name, contact_handle) {
            Ok(author) => match serde_json::to_value(&author) {
                Ok(body) => ApiResponse::created(body),
                Err(err) => internal_error("serialize_author", &err),
            },
            Err(err) => self.author_error(err),
        }
    }

    /// Author records are readable by anyone, but the contact handle is an
    /// email-shaped identifier and is only revealed to the author themself
    /// or an elevated principal.
    fn get_author(&self, conn: &Connection, principal: &Principal, author_id: Uuid) -> ApiResponse {
        let service = match author_service(conn) {
            Ok(service) => service,
            Err(response) => return response,
        };
        match service.get_author(author_id) {
            Ok(author) => {
                let reveal_handle =
                    principal.is_elevated() || principal.author_id() == Some(author.id);
                match serde_json::to_value(&author) {
                    Ok(mut body) => {
                        if !reveal_handle {
                            if let Value::Object(fields) = &mut body {
                                fields.remove("contact_handle");
                            }
                        }
                        ApiResponse::ok(body)
                    }
                    Err(err) => internal_error("serialize_author", &err),
                }
            }
            Err(err) => self.author_error(err),
        }
    }

    fn deactivate_author(
        &self,
        conn: &Connection,
        principal: &Principal,
        author_id: Uuid,
    ) -> ApiResponse {
        let service = match author_service(conn) {
            Ok(service) => service,
            Err(response) => return response,
        };
        match service.deactivate_author(principal, author_id) {
            Ok(author) => match serde_json::to_value(&author) {
                Ok(body) => ApiResponse::ok(body),
                Err(err) => internal_error("serialize_author", &err),
            },
            Err(err) => self.author_error(err),
        }
    }

    fn create_story(
        &self,
        conn: &mut Connection,
        principal: &Principal,
        title: String,
        body: String,
    ) -> ApiResponse {
        let mut service = match story_service(conn) {
            Ok(service) => service,
            Err(response) => return response,
        };
        match service.create_story(principal, CreateStoryRequest { title, body }) {
            Ok(story) => match serde_json::to_value(&story) {
                Ok(body) => ApiResponse::created(body),
                Err(err) => internal_error("serialize_story", &err),
            },
            Err(err) => self.story_error(err),
        }
    }

    fn get_story(
        &self,
        conn: &mut Connection,
        principal: &Principal,
        story_id: Uuid,
    ) -> ApiResponse {
        let service = match story_service(conn) {
            Ok(service) => service,
            Err(response) => return response,
        };
        match service.get_story(principal, story_id) {
            Ok(story) => match serde_json::to_value(&story) {
                Ok(body) => ApiResponse::ok(body),
                Err(err) => internal_error("serialize_story", &err),
            },
            Err(err) => self.story_error(err),
        }
    }

    fn list_stories(
        &self,
        conn: &mut Connection,
        principal: &Principal,
        request: ListStoriesRequest,
    ) -> ApiResponse {
        let service = match story_service(conn) {
            Ok(service) => service,
            Err(response) => return response,
        };
        match service.list_stories(principal, request) {
            Ok(page) => match serde_json::to_value(&page.items) {
                Ok(items) => ApiResponse::ok(json!({
                    "items": items,
                    "page": page.page,
                    "page_size": page.page_size,
                })),
                Err(err) => internal_error("serialize_stories", &err),
            },
            Err(err) => self.story_error(err),
        }
    }

    fn update_story(
        &self,
        conn: &mut Connection,
        principal: &Principal,
        story_id: Uuid,
        request: UpdateStoryRequest,
    ) -> ApiResponse {
        let mut service = match story_service(conn) {
            Ok(service) => service,
            Err(response) => return response,
        };
        match service.update_story(principal, story_id, request) {
            Ok(story) => match serde_json::to_value(&story) {
                Ok(body) => ApiResponse::ok(body),
                Err(err) => internal_error("serialize_story", &err),
            },
            Err(err) => self.story_error(err),
        }
    }

    fn transition_story(
        &self,
        conn: &mut Connection,
        principal: &Principal,
        story_id: Uuid,
        target: Visibility,
        expected_updated_at: i64,
    ) -> ApiResponse {
        let mut service = match story_service(conn) {
            Ok(service) => service,
            Err(response) => return response,
        };
        match service.transition_story(principal, story_id, target, expected_updated_at) {
            Ok(story) => match serde_json::to_value(&story) {
                Ok(body) => ApiResponse::ok(body),
                Err(err) => internal_error("serialize_story", &err),
            },
            Err(err) => self.story_error(err),
        }
    }

    fn archive_story(
        &self,
        conn: &mut Connection,
        principal: &Principal,
        story_id: Uuid,
    ) -> ApiResponse {
        let mut service = match story_service(conn) {
            Ok(service) => service,
            Err(response) => return response,
        };
        match service.archive_story(principal, story_id) {
            Ok(story) => match serde_json::to_value(&story) {
                Ok(body) => ApiResponse::ok(body),
                Err(err) => internal_error("serialize_story", &err),
            },
            Err(err) => self.story_error(err),
        }
    }

    fn story_error(&self, err: StoryServiceError) -> ApiResponse {
        match err {
            StoryServiceError::Validation(err) => {
                ApiResponse::error(400, "validation_failed", err)
            }
            StoryServiceError::InvalidTransition { .. } => {
                ApiResponse::error(400, "invalid_transition", err)
            }
            StoryServiceError::ArchivedImmutable(_) => {
                ApiResponse::error(400, "invalid_transition", err)
            }
            StoryServiceError::StoryNotFound(_) => ApiResponse::error(404, "not_found", err),
            StoryServiceError::EditConflict { .. } => ApiResponse::error(409, "conflict", err),
            StoryServiceError::AccessDenied(_) => match self.config.denial_policy {
                DenialPolicy::Conceal => {
                    ApiResponse::error(404, "not_found", "story not found")
                }
                DenialPolicy::Reveal => ApiResponse::error(403, "permission_denied", err),
            },
            StoryServiceError::Repo(err) => internal_error("story_repo", &err),
            StoryServiceError::InconsistentState(details) => {
                internal_error("story_state", &details)
            }
        }
    }

    fn author_error(&self, err: AuthorServiceError) -> ApiResponse {
        match err {
            AuthorServiceError::Validation(err) => {
                ApiResponse::error(400, "validation_failed", err)
            }
            AuthorServiceError::HandleTaken(_) => ApiResponse::error(409, "conflict", err),
            AuthorServiceError::AuthorNotFound(_) => ApiResponse::error(404, "not_found", err),
            AuthorServiceError::NotPermitted(_) => match self.config.denial_policy {
                DenialPolicy::Conceal => {
                    ApiResponse::error(404, "not_found", "author not found")
                }
                DenialPolicy::Reveal => ApiResponse::error(403, "permission_denied", err),
            },
            AuthorServiceError::Repo(err) => internal_error("author_repo", &err),
            AuthorServiceError::InconsistentState(details) => {
                internal_error("author_state", &details)
            }
        }
    }
}

fn author_service(
    conn: &Connection,
) -> Result<AuthorService<SqliteAuthorRepository<'_>>, ApiResponse> {
    match SqliteAuthorRepository::try_new(conn) {
        Ok(repo) => Ok(AuthorService::new(repo)),
        Err(err) => Err(internal_error("author_repo_init", &err)),
    }
}

fn story_service(
    conn: &mut Connection,
) -> Result<StoryService<SqliteStoryRepository<'_>>, ApiResponse> {
    match SqliteStoryRepository::try_new(conn) {
        Ok(repo) => Ok(StoryService::new(repo)),
        Err(err) => Err(internal_error("story_repo_init", &err)),
    }
}

/// Logs the detailed failure server-side and returns an opaque 500.
fn internal_error(context: &str, err: &dyn Display) -> ApiResponse {
    error!("event=api_error module=api status=error context={context} error={err}");
    ApiResponse::error(500, "internal", "internal error")
}
