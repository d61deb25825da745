//! Story repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the `stories` table.
//! - Own optimistic-concurrency write semantics and the archive soft delete.
//!
//! # Invariants
//! - Write paths validate model input before SQL mutations.
//! - Every mutation bumps `updated_at` to `MAX(now_ms, updated_at + 1)`, so
//!   the optimistic token moves strictly forward per record.
//! - Archiving an already-archived story is a no-op returning current state.

use crate::model::author::AuthorId;
use crate::model::story::{validate_title, NewStory, Story, StoryId, Visibility};
use crate::repo::{ensure_schema_current, ensure_table_shape, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const STORY_SELECT_SQL: &str = "SELECT
    id,
    author_id,
    title,
    body,
    visibility,
    created_at,
    updated_at
FROM stories";

const STORY_COLUMNS: &[&str] = &[
    "id",
    "author_id",
    "title",
    "body",
    "visibility",
    "created_at",
    "updated_at",
];

// Strictly monotonic bump; a wall-clock-only value could repeat within one
// millisecond and defeat the stale-token comparison.
const TOUCH_UPDATED_AT_SQL: &str = "MAX((strftime('%s', 'now') * 1000), updated_at + 1)";

const LIST_DEFAULT_LIMIT: u32 = 20;
const LIST_LIMIT_MAX: u32 = 100;

/// Query options for listing stories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryListQuery {
    /// Optional owning-author filter.
    pub author_id: Option<AuthorId>,
    /// Optional visibility filter.
    pub visibility: Option<Visibility>,
    /// Maximum rows to return. Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Repository interface for story persistence.
pub trait StoryRepository {
    /// Creates one draft story; fails with `NotFound(author_id)` when the
    /// owning author does not exist.
    fn create_story(&mut self, story: &NewStory) -> RepoResult<StoryId>;
    /// Gets one story by id regardless of visibility.
    fn get_story(&self, id: StoryId) -> RepoResult<Option<Story>>;
    /// Lists stories ordered by `created_at DESC, id ASC`.
    fn list_stories(&self, query: &StoryListQuery) -> RepoResult<Vec<Story>>;
    /// Replaces title and body under an optimistic `updated_at` token.
    fn update_story_content(
        &self,
        id: StoryId,
        title: &str,
        body: &str,
        expected_updated_at: i64,
    ) -> RepoResult<()>;
    /// Moves the story to `visibility` under an optimistic token.
    fn set_visibility(
        &self,
        id: StoryId,
        visibility: Visibility,
        expected_updated_at: i64,
    ) -> RepoResult<()>;
    /// Soft-deletes by moving to archived; idempotent.
    fn archive_story(&mut self, id: StoryId) -> RepoResult<Story>;
}

/// SQLite-backed story repository.
///
/// Holds a mutable connection borrow because creation and archival run
/// inside immediate transactions.
pub struct SqliteStoryRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteStoryRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        ensure_table_shape(conn, "stories", STORY_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl StoryRepository for SqliteStoryRepository<'_> {
    fn create_story(&mut self, story: &NewStory) -> RepoResult<StoryId> {
        story.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !author_exists_in_tx(&tx, story.author_id)? {
            return Err(RepoError::NotFound(story.author_id));
        }

        tx.execute(
            "INSERT INTO stories (id, author_id, title, body)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                story.id.to_string(),
                story.author_id.to_string(),
                story.title.trim(),
                story.body.as_str(),
            ],
        )?;
        tx.commit()?;

        Ok(story.id)
    }

    fn get_story(&self, id: StoryId) -> RepoResult<Option<Story>> {
        get_story_on(self.conn, id)
    }

    fn list_stories(&self, query: &StoryListQuery) -> RepoResult<Vec<Story>> {
        let mut sql = format!("{STORY_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(author_id) = query.author_id {
            sql.push_str(" AND author_id = ?");
            bind_values.push(Value::Text(author_id.to_string()));
        }

        if let Some(visibility) = query.visibility {
            sql.push_str(" AND visibility = ?");
            bind_values.push(Value::Text(visibility.as_str().to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC");

        let limit = normalize_list_limit(query.limit);
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut stories = Vec::new();
        while let Some(row) = rows.next()? {
            stories.push(parse_story_row(row)?);
        }

        Ok(stories)
    }

    fn update_story_content(
        &self,
        id: StoryId,
        title: &str,
        body: &str,
        expected_updated_at: i64,
    ) -> RepoResult<()> {
        validate_title(title)?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE stories
                 SET
                    title = ?2,
                    body = ?3,
                    updated_at = {TOUCH_UPDATED_AT_SQL}
                 WHERE id = ?1
                   AND updated_at = ?4;"
            ),
            params![id.to_string(), title.trim(), body, expected_updated_at],
        )?;

        if changed == 0 {
            return Err(stale_or_missing(self.conn, id, expected_updated_at)?);
        }

        Ok(())
    }

    fn set_visibility(
        &self,
        id: StoryId,
        visibility: Visibility,
        expected_updated_at: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE stories
                 SET
                    visibility = ?2,
                    updated_at = {TOUCH_UPDATED_AT_SQL}
                 WHERE id = ?1
                   AND updated_at = ?3;"
            ),
            params![id.to_string(), visibility.as_str(), expected_updated_at],
        )?;

        if changed == 0 {
            return Err(stale_or_missing(self.conn, id, expected_updated_at)?);
        }

        Ok(())
    }

    fn archive_story(&mut self, id: StoryId) -> RepoResult<Story> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(current) = get_story_on(&tx, id)? else {
            return Err(RepoError::NotFound(id));
        };
        if current.is_archived() {
            return Ok(current);
        }

        tx.execute(
            &format!(
                "UPDATE stories
                 SET
                    visibility = 'archived',
                    updated_at = {TOUCH_UPDATED_AT_SQL}
                 WHERE id = ?1;"
            ),
            [id.to_string()],
        )?;

        let archived = get_story_on(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;
        Ok(archived)
    }
}

/// Normalizes list limit according to the listing contract.
pub fn normalize_list_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) => LIST_DEFAULT_LIMIT,
        Some(value) if value > LIST_LIMIT_MAX => LIST_LIMIT_MAX,
        Some(value) => value,
        None => LIST_DEFAULT_LIMIT,
    }
}

fn get_story_on(conn: &Connection, id: StoryId) -> RepoResult<Option<Story>> {
    let mut stmt = conn.prepare(&format!("{STORY_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_story_row(row)?));
    }
    Ok(None)
}

/// Resolves a zero-row optimistic update into its semantic error.
fn stale_or_missing(
    conn: &Connection,
    id: StoryId,
    expected_updated_at: i64,
) -> RepoResult<RepoError> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM stories WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;

    if exists == 1 {
        Ok(RepoError::StaleWrite {
            id,
            expected_updated_at,
        })
    } else {
        Ok(RepoError::NotFound(id))
    }
}

fn parse_story_row(row: &Row<'_>) -> RepoResult<Story> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "stories.id")?;

    let author_text: String = row.get("author_id")?;
    let author_id = parse_uuid(&author_text, "stories.author_id")?;

    let visibility_text: String = row.get("visibility")?;
    let visibility = Visibility::parse(&visibility_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid visibility value `{visibility_text}` in stories.visibility"
        ))
    })?;

    Ok(Story {
        id,
        author_id,
        title: row.get("title")?,
        body: row.get("body")?,
        visibility,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn author_exists_in_tx(tx: &Transaction<'_>, author_id: AuthorId) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM authors WHERE id = ?1);",
        [author_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
