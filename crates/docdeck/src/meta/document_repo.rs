//! Document repository — CRUD operations for the `documents` table.
//!
//! Records are keyed by `(scope_id, title)`: at most one metadata record
//! per document title within a taxonomy scope.

use chrono::Utc;
use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw document row from the database.
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: String,
    pub scope_id: String,
    pub title: String,
    pub file_name: String,
    pub pages: Option<u32>,
    pub chunks: Option<u32>,
    pub created_at: String,
    pub updated_at: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            scope_id: row.get("scope_id")?,
            title: row.get("title")?,
            file_name: row.get("file_name")?,
            pages: row.get("pages")?,
            chunks: row.get("chunks")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Descriptive fields for a document about to be registered.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub file_name: String,
    pub pages: Option<u32>,
    pub chunks: Option<u32>,
}

/// Inserts a new document row.
pub fn insert(db: &Database, doc: &DocumentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (id, scope_id, title, file_name, pages, chunks,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                doc.id,
                doc.scope_id,
                doc.title,
                doc.file_name,
                doc.pages,
                doc.chunks,
                doc.created_at,
                doc.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Updates an existing document row. All fields except `id`, `scope_id`,
/// `title` and `created_at` are overwritten.
pub fn update(db: &Database, doc: &DocumentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE documents SET file_name=?2, pages=?3, chunks=?4, updated_at=?5
             WHERE id=?1",
            params![doc.id, doc.file_name, doc.pages, doc.chunks, doc.updated_at],
        )?;
        Ok(())
    })
}

/// Finds a document by its scope and title.
pub fn find_by_scope_and_title(
    db: &Database,
    scope_id: &str,
    title: &str,
) -> Result<Option<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM documents WHERE scope_id = ?1 AND title = ?2")?;
        let mut rows = stmt.query_map(params![scope_id, title], DocumentRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Returns all document titles registered under a scope.
pub fn find_titles_in_scope(db: &Database, scope_id: &str) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT title FROM documents WHERE scope_id = ?1")?;
        let titles: Vec<String> = stmt
            .query_map(params![scope_id], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(titles)
    })
}

/// Lists all documents under a scope, newest first.
pub fn list_by_scope(db: &Database, scope_id: &str) -> Result<Vec<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare("SELECT * FROM documents WHERE scope_id = ?1 ORDER BY created_at DESC")?;
        let rows: Vec<DocumentRow> = stmt
            .query_map(params![scope_id], DocumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes all documents under a scope (cascade when a taxonomy node is
/// removed). Returns the number of deleted rows.
pub fn delete_by_scope(db: &Database, scope_id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM documents WHERE scope_id = ?1", params![scope_id])?;
        Ok(deleted)
    })
}

/// Deletes one document by scope and title. Returns true if a row existed.
pub fn delete_by_scope_and_title(
    db: &Database,
    scope_id: &str,
    title: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM documents WHERE scope_id = ?1 AND title = ?2",
            params![scope_id, title],
        )?;
        Ok(deleted > 0)
    })
}

/// Registers a document record unless one already exists for the
/// `(scope_id, title)` pair. Returns whether a row was inserted.
///
/// Read-then-write with a narrow race window; the orchestrator calls this
/// once per successful file per run, and the UNIQUE index backstops the
/// window by turning the losing insert into "already present".
pub fn register_if_absent(
    db: &Database,
    scope_id: &str,
    title: &str,
    meta: &NewDocument,
) -> Result<bool, DatabaseError> {
    if find_by_scope_and_title(db, scope_id, title)?.is_some() {
        log::debug!("document '{}' already registered in scope {}", title, scope_id);
        return Ok(false);
    }

    let now = Utc::now().to_rfc3339();
    let row = DocumentRow {
        id: uuid::Uuid::new_v4().to_string(),
        scope_id: scope_id.to_string(),
        title: title.to_string(),
        file_name: meta.file_name.clone(),
        pages: meta.pages,
        chunks: meta.chunks,
        created_at: now.clone(),
        updated_at: now,
    };

    match insert(db, &row) {
        Ok(()) => Ok(true),
        Err(DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            // Lost the race window; the record exists, which is all we wanted.
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
