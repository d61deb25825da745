use rusqlite::Connection;
use stories_core::db::open_db_in_memory;
use stories_core::{
    AuthorRepository, CreateStoryRequest, ListStoriesRequest, NewAuthor, Principal,
    SqliteAuthorRepository, SqliteStoryRepository, StoryService, StoryServiceError, Visibility,
};
use uuid::Uuid;

#[test]
fn published_stories_are_readable_by_anyone() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let story = create_story(&mut service, &owner, "Public", "body");
    let published = service
        .transition_story(&owner, story.id, Visibility::Published, story.updated_at)
        .unwrap();

    let read = service.get_story(&Principal::Anonymous, published.id).unwrap();
    assert_eq!(read.id, story.id);
}

#[test]
fn draft_reads_by_strangers_are_indistinguishable_from_missing() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let bob = seed_author(&conn, "b@x.com");
    let mut service = story_service(&mut conn);

    let story = create_story(&mut service, &Principal::author(ada), "Secret draft", "");

    for principal in [Principal::Anonymous, Principal::author(bob)] {
        let err = service.get_story(&principal, story.id).unwrap_err();
        assert!(
            matches!(err, StoryServiceError::StoryNotFound(id) if id == story.id),
            "denied read must use not-found semantics"
        );
    }

    // Owner and elevated principals still see it.
    assert!(service.get_story(&Principal::author(ada), story.id).is_ok());
    assert!(service
        .get_story(&Principal::elevated(bob), story.id)
        .is_ok());
}

#[test]
fn missing_story_and_restricted_story_yield_the_same_error() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);

    let draft = create_story(&mut service, &Principal::author(ada), "Draft", "");
    let missing = Uuid::new_v4();

    let restricted_err = service
        .get_story(&Principal::Anonymous, draft.id)
        .unwrap_err();
    let missing_err = service.get_story(&Principal::Anonymous, missing).unwrap_err();

    assert!(matches!(restricted_err, StoryServiceError::StoryNotFound(_)));
    assert!(matches!(missing_err, StoryServiceError::StoryNotFound(_)));
}

#[test]
fn listing_clamps_strangers_to_published_stories() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let draft = create_story(&mut service, &owner, "Draft", "");
    let to_publish = create_story(&mut service, &owner, "Published", "body");
    service
        .transition_story(
            &owner,
            to_publish.id,
            Visibility::Published,
            to_publish.updated_at,
        )
        .unwrap();

    let page = service
        .list_stories(
            &Principal::Anonymous,
            ListStoriesRequest {
                author_id: Some(ada),
                ..ListStoriesRequest::default()
            },
        )
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, to_publish.id);
    assert!(page.items.iter().all(|story| story.id != draft.id));
}

#[test]
fn listing_private_scope_without_access_yields_an_empty_page() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);

    create_story(&mut service, &Principal::author(ada), "Draft", "");

    let page = service
        .list_stories(
            &Principal::Anonymous,
            ListStoriesRequest {
                author_id: Some(ada),
                visibility: Some(Visibility::Draft),
                ..ListStoriesRequest::default()
            },
        )
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.page, 1);
}

#[test]
fn owners_and_elevated_principals_see_private_scopes() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let moderator = seed_author(&conn, "mod@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let draft = create_story(&mut service, &owner, "Draft", "");

    let own_view = service
        .list_stories(
            &owner,
            ListStoriesRequest {
                author_id: Some(ada),
                visibility: Some(Visibility::Draft),
                ..ListStoriesRequest::default()
            },
        )
        .unwrap();
    assert_eq!(own_view.items.len(), 1);
    assert_eq!(own_view.items[0].id, draft.id);

    let moderated_view = service
        .list_stories(
            &Principal::elevated(moderator),
            ListStoriesRequest {
                author_id: Some(ada),
                visibility: Some(Visibility::Draft),
                ..ListStoriesRequest::default()
            },
        )
        .unwrap();
    assert_eq!(moderated_view.items.len(), 1);
}

#[test]
fn anonymous_principals_cannot_create_stories() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = story_service(&mut conn);

    let err = service
        .create_story(
            &Principal::Anonymous,
            CreateStoryRequest {
                title: "nope".to_string(),
                body: String::new(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoryServiceError::AccessDenied(_)));
}

fn story_service(conn: &mut Connection) -> StoryService<SqliteStoryRepository<'_>> {
    StoryService::new(SqliteStoryRepository::try_new(conn).unwrap())
}

fn create_story(
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

fn seed_author(conn: &Connection, handle: &str) -> Uuid {
    let repo = SqliteAuthorRepository::try_new(conn).unwrap();
    repo.create_author(&NewAuthor::new("Seed Author", handle))
        .unwrap()
}
