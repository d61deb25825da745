use rusqlite::Connection;
use stories_core::db::open_db_in_memory;
use stories_core::{
    AuthorRepository, CreateStoryRequest, NewAuthor, Principal, SqliteAuthorRepository,
    SqliteStoryRepository, StoryService, StoryServiceError, UpdateStoryRequest, Visibility,
};
use uuid::Uuid;

#[test]
fn second_update_with_a_stale_token_conflicts() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let story = create_story(&mut service, &owner, "Title", "body");
    let stale_token = story.updated_at;

    // Two writers both read the same state; the first one wins.
    let first = service
        .update_story(
            &owner,
            story.id,
            UpdateStoryRequest {
                title: None,
                body: Some("first writer".to_string()),
                expected_updated_at: stale_token,
            },
        )
        .unwrap();
    assert!(first.updated_at > stale_token);

    let err = service
        .update_story(
            &owner,
            story.id,
            UpdateStoryRequest {
                title: None,
                body: Some("second writer".to_string()),
                expected_updated_at: stale_token,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StoryServiceError::EditConflict { id, expected_updated_at }
            if id == story.id && expected_updated_at == stale_token
    ));

    // The losing write did not clobber anything.
    let current = service.get_story(&owner, story.id).unwrap();
    assert_eq!(current.body, "first writer");

    // Retrying with a refreshed token succeeds.
    let retried = service
        .update_story(
            &owner,
            story.id,
            UpdateStoryRequest {
                title: None,
                body: Some("second writer".to_string()),
                expected_updated_at: current.updated_at,
            },
        )
        .unwrap();
    assert_eq!(retried.body, "second writer");
}

#[test]
fn transitions_also_honor_the_optimistic_token() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let story = create_story(&mut service, &owner, "Title", "body");
    let stale_token = story.updated_at;

    service
        .update_story(
            &owner,
            story.id,
            UpdateStoryRequest {
                title: Some("Edited".to_string()),
                body: None,
                expected_updated_at: stale_token,
            },
        )
        .unwrap();

    let err = service
        .transition_story(&owner, story.id, Visibility::Published, stale_token)
        .unwrap_err();
    assert!(matches!(err, StoryServiceError::EditConflict { .. }));
}

#[test]
fn updated_at_moves_strictly_forward_on_every_mutation() {
    let mut conn = open_db_in_memory().unwrap();
    let ada = seed_author(&conn, "a@x.com");
    let mut service = story_service(&mut conn);
    let owner = Principal::author(ada);

    let story = create_story(&mut service, &owner, "Title", "body");
    let mut token = story.updated_at;

    // Back-to-back mutations land within the same millisecond; the token
    // must still advance on each one.
    for round in 0..5 {
        let updated = service
            .update_story(
                &owner,
                story.id,
                UpdateStoryRequest {
                    title: None,
                    body: Some(format!("round {round}")),
                    expected_updated_at: token,
                },
            )
            .unwrap();
        assert!(updated.updated_at > token);
        token = updated.updated_at;
    }
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
