//! Document store abstraction.
//!
//! The clinic data lives in three collections of JSON documents. Callers go
//! through [`DocumentStore`] and gate every access on [`Readiness`] so a
//! store that is still initializing is never touched.

mod readiness;
mod sqlite;

pub use readiness::*;
pub use sqlite::*;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::db::{DbError, StoredDocument};

/// Document collections used by the clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Procedures,
    PatientDetails,
    Doctors,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Procedures => "procedures",
            Collection::PatientDetails => "patientDetails",
            Collection::Doctors => "doctors",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document and its ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

impl From<StoredDocument> for Document {
    fn from(stored: StoredDocument) -> Self {
        Self {
            id: stored.id,
            body: stored.body,
        }
    }
}

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: Collection, id: String },

    #[error("Store not ready after {0:?}")]
    InitializationTimeout(Duration),

    #[error("Store unavailable")]
    Unavailable,

    #[error("Store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Async access to the clinic document collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document. Missing documents are `NotFound`.
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Document>;

    /// Add a document and return its generated ID.
    async fn add(&self, collection: Collection, body: Value) -> StoreResult<String>;

    /// Replace a document body wholesale. Missing documents are `NotFound`.
    async fn update(&self, collection: Collection, id: &str, body: Value) -> StoreResult<()>;

    /// Every document in a collection.
    async fn list(&self, collection: Collection) -> StoreResult<Vec<Document>>;

    /// Documents whose top-level `field` equals `value`.
    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>>;
}
