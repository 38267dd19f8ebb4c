//! JSON document database operations.

use rusqlite::{params, ErrorCode, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

use super::{Database, DbError, DbResult};

/// A document as stored, with its bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub body: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl Database {
    /// Insert a document under a freshly generated ID. Returns the ID.
    pub fn insert_document(&self, collection: &str, body: &Value) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        self.insert_document_with_id(collection, &id, body)?;
        Ok(id)
    }

    /// Insert a document under a caller-chosen ID.
    pub fn insert_document_with_id(&self, collection: &str, id: &str, body: &Value) -> DbResult<()> {
        let body_json = object_body(body)?;

        self.conn
            .execute(
                r#"
                INSERT INTO documents (collection, doc_id, body)
                VALUES (?1, ?2, ?3)
                "#,
                params![collection, id, body_json],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => {
                    DbError::Constraint(format!("{}/{} already exists", collection, id))
                }
                _ => DbError::Sqlite(e),
            })?;
        Ok(())
    }

    /// Replace a document body wholesale. Returns false if no such document.
    pub fn replace_document(&self, collection: &str, id: &str, body: &Value) -> DbResult<bool> {
        let body_json = object_body(body)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE documents SET
                body = ?3,
                updated_at = datetime('now')
            WHERE collection = ?1 AND doc_id = ?2
            "#,
            params![collection, id, body_json],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a document by ID.
    pub fn get_document(&self, collection: &str, id: &str) -> DbResult<Option<StoredDocument>> {
        self.conn
            .query_row(
                r#"
                SELECT doc_id, body, created_at, updated_at
                FROM documents
                WHERE collection = ?1 AND doc_id = ?2
                "#,
                params![collection, id],
                DocumentRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List every document in a collection, in insertion order.
    pub fn list_documents(&self, collection: &str) -> DbResult<Vec<StoredDocument>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT doc_id, body, created_at, updated_at
            FROM documents
            WHERE collection = ?
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([collection], DocumentRow::from_row)?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(row?.try_into()?);
        }
        Ok(documents)
    }

    /// List documents whose top-level `field` equals `value`.
    pub fn find_documents_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> DbResult<Vec<StoredDocument>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT doc_id, body, created_at, updated_at
            FROM documents
            WHERE collection = ?1
              AND json_extract(body, ?2) = ?3
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map(
            params![collection, field_path(field), value],
            DocumentRow::from_row,
        )?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(row?.try_into()?);
        }
        Ok(documents)
    }
}

fn object_body(body: &Value) -> DbResult<String> {
    if !body.is_object() {
        return Err(DbError::Constraint(
            "document body must be a JSON object".to_string(),
        ));
    }
    Ok(serde_json::to_string(body)?)
}

/// JSON path for a top-level key, quoted so any key is addressable.
fn field_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

/// Raw row from database.
struct DocumentRow {
    id: String,
    body: String,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            body: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

impl TryFrom<DocumentRow> for StoredDocument {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(StoredDocument {
            id: row.id,
            body: serde_json::from_str(&row.body)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
