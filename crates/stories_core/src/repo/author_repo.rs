//! Author repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable persistence APIs over the `authors` table.
//! - Enforce contact-handle uniqueness at the storage boundary.
//!
//! # Invariants
//! - Write paths call `NewAuthor::validate()` before SQL mutations.
//! - Deactivation is soft and idempotent; author rows are never deleted.

use crate::model::author::{Author, AuthorId, NewAuthor};
use crate::repo::{ensure_schema_current, ensure_table_shape, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, ErrorCode, Row};

const AUTHOR_SELECT_SQL: &str = "SELECT
    id,
    display_name,
    contact_handle,
    is_active,
    created_at
FROM authors";

const AUTHOR_COLUMNS: &[&str] = &[
    "id",
    "display_name",
    "contact_handle",
    "is_active",
    "created_at",
];

/// Repository interface for author persistence.
pub trait AuthorRepository {
    /// Creates one author and returns its stable id.
    fn create_author(&self, author: &NewAuthor) -> RepoResult<AuthorId>;
    /// Gets one author by id, active or not.
    fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>>;
    /// Finds one author by normalized contact handle.
    fn find_author_by_handle(&self, handle: &str) -> RepoResult<Option<Author>>;
    /// Soft-deactivates an author. Idempotent on already-inactive rows.
    fn deactivate_author(&self, id: AuthorId) -> RepoResult<()>;
}

/// SQLite-backed author repository.
pub struct SqliteAuthorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuthorRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        ensure_table_shape(conn, "authors", AUTHOR_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl AuthorRepository for SqliteAuthorRepository<'_> {
    fn create_author(&self, author: &NewAuthor) -> RepoResult<AuthorId> {
        author.validate()?;

        let result = self.conn.execute(
            "INSERT INTO authors (id, display_name, contact_handle)
             VALUES (?1, ?2, ?3);",
            params![
                author.id.to_string(),
                author.display_name.trim(),
                author.contact_handle.as_str(),
            ],
        );

        match result {
            Ok(_) => Ok(author.id),
            Err(err) if is_constraint_violation(&err) => {
                Err(RepoError::HandleConflict(author.contact_handle.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{AUTHOR_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_author_row(row)?));
        }
        Ok(None)
    }

    fn find_author_by_handle(&self, handle: &str) -> RepoResult<Option<Author>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{AUTHOR_SELECT_SQL} WHERE contact_handle = ?1;"))?;
        let mut rows = stmt.query([handle])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_author_row(row)?));
        }
        Ok(None)
    }

    fn deactivate_author(&self, id: AuthorId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE authors SET is_active = 0 WHERE id = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_author_row(row: &Row<'_>) -> RepoResult<Author> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "authors.id")?;

    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_active value `{other}` in authors.is_active"
            )));
        }
    };

    Ok(Author {
        id,
        display_name: row.get("display_name")?,
        contact_handle: row.get("contact_handle")?,
        is_active,
        created_at: row.get("created_at")?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    )
}
