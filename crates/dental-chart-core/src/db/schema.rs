//! SQLite schema definition.

/// Value stored in `PRAGMA user_version` once [`SCHEMA`] is applied.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete database schema for the clinic document store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Documents
-- ============================================================================

-- One row per document. Bodies are JSON objects; the shape is owned by the
-- collection (procedures, patientDetails, doctors).
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    doc_id TEXT NOT NULL,
    body TEXT NOT NULL,                           -- JSON object
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (collection, doc_id),
    CHECK (json_valid(body))
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, created_at);
"#;
