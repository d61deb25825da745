use rusqlite::Connection;
use stories_core::db::open_db_in_memory;
use stories_core::{
    AuthorRepository, CreateStoryRequest, NewAuthor, Principal, SqliteAuthorRepository,
    SqliteStoryRepository, StoryService, StoryServiceError, StoryValidationError,
    UpdateStoryRequest, Visibility,
};
use uuid::Uuid;

#[test]
fn publishing_an_empty_draft_fails_until_body_is_set() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let bob = seed_author(&conn, "b@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    // Draft with empty body is valid work-in-progress.
    let story = service
        .create_story(
            &owner,
            CreateStoryRequest {
                title: "Draft Title".to_string(),
                body: String::new(),
            },
        )
        .unwrap();
    assert_eq!(story.visibility, Visibility::Draft);

    // Publishing without a body is rejected.
    let err = service
        .transition_story(&owner, story.id, Visibility::Published, story.updated_at)
        .unwrap_err();
    assert!(matches!(
        err,
        StoryServiceError::Validation(StoryValidationError::EmptyBody)
    ));

    // Set the body, then publish.
    let updated = service
        .update_story(
            &owner,
            story.id,
            UpdateStoryRequest {
                title: None,
                body: Some("hello".to_string()),
                expected_updated_at: story.updated_at,
            },
        )
        .unwrap();
    let published = service
        .transition_story(&owner, story.id, Visibility::Published, updated.updated_at)
        .unwrap();
    assert_eq!(published.visibility, Visibility::Published);

    // A different author cannot touch it.
    let err = service
        .update_story(
            &Principal::author(bob),
            story.id,
            UpdateStoryRequest {
                title: Some("hijack".to_string()),
                body: None,
                expected_updated_at: published.updated_at,
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoryServiceError::AccessDenied(_)));
}

#[test]
fn published_stories_can_be_unpublished_for_editing() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let published = create_published(&mut service, &owner, "Title", "body");
    let draft = service
        .transition_story(
            &owner,
            published.id,
            Visibility::Draft,
            published.updated_at,
        )
        .unwrap();
    assert_eq!(draft.visibility, Visibility::Draft);
}

#[test]
fn archived_stories_accept_no_transitions() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let story = create_published(&mut service, &owner, "Title", "body");
    let archived = service.archive_story(&owner, story.id).unwrap();
    assert_eq!(archived.visibility, Visibility::Archived);

    for target in [Visibility::Draft, Visibility::Published, Visibility::Archived] {
        let err = service
            .transition_story(&owner, story.id, target, archived.updated_at)
            .unwrap_err();
        assert!(
            matches!(
                err,
                StoryServiceError::InvalidTransition {
                    from: Visibility::Archived,
                    ..
                }
            ),
            "transition to {target:?} must be rejected"
        );
    }
}

#[test]
fn archived_stories_accept_no_content_edits() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let story = create_draft(&mut service, &owner, "Title", "body");
    let archived = service.archive_story(&owner, story.id).unwrap();

    let err = service
        .update_story(
            &owner,
            story.id,
            UpdateStoryRequest {
                title: Some("new title".to_string()),
                body: None,
                expected_updated_at: archived.updated_at,
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoryServiceError::ArchivedImmutable(id) if id == story.id));
}

#[test]
fn archive_is_idempotent_at_the_service_level() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let story = create_draft(&mut service, &owner, "Title", "");
    let first = service.archive_story(&owner, story.id).unwrap();
    let second = service.archive_story(&owner, story.id).unwrap();

    assert_eq!(first.visibility, Visibility::Archived);
    assert_eq!(second, first);
}

#[test]
fn same_state_moves_are_rejected_as_transitions() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let story = create_draft(&mut service, &owner, "Title", "");
    let err = service
        .transition_story(&owner, story.id, Visibility::Draft, story.updated_at)
        .unwrap_err();
    assert!(matches!(
        err,
        StoryServiceError::InvalidTransition {
            from: Visibility::Draft,
            to: Visibility::Draft,
        }
    ));
}

#[test]
fn elevated_principals_can_manage_other_authors_stories() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let moderator = seed_author(&conn, "mod@x.com");
    let mut service = story_service(&mut conn);

    let story = create_published(&mut service, &Principal::author(ada), "Title", "body");
    let archived = service
        .archive_story(&Principal::elevated(moderator), story.id)
        .unwrap();
    assert_eq!(archived.visibility, Visibility::Archived);
}

fn story_service(conn: &mut Connection) -> StoryService<SqliteStoryRepository<'_>> {
    StoryService::new(SqliteStoryRepository::try_new(conn).unwrap())
}

fn create_draft(
    service: &mut StoryService<SqliteStoryRepository<'_>>,
    owner: &Principal,
    title: &str,
    body: &str,
) -> stories_core::Story {
    service
        .create_story(
            owner,
            CreateStoryRequest {
                title: title.to_string(),
                body: body.to_string(),
            },
        )
        .unwrap()
}

fn create_published(
    service: &mut StoryService<SqliteStoryRepository<'_>>,
    owner: &Principal,
    title: &str,
    body: &str,
) -> stories_core::Story {
    let draft = create_draft(service, owner, title, body);
    service
        .transition_story(owner, draft.id, Visibility::Published, draft.updated_at)
        .unwrap()
}

fn seed_author(conn: &Connection, handle: &str) -> Uuid {
    let repo = SqliteAuthorRepository::try_new(conn).unwrap();
    repo.create_author(&NewAuthor::new("Seed Author", handle))
        .unwrap()
}
