//! SQLite-backed document store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{Collection, Document, DocumentStore, StoreError, StoreResult};
use crate::db::Database;

/// [`DocumentStore`] over a shared [`Database`].
///
/// Each call takes the lock for a single synchronous query.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteDocumentStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Insert a document under a known ID (fixtures, imports).
    pub fn insert_with_id(&self, collection: Collection, id: &str, body: &Value) -> StoreResult<()> {
        self.lock()?
            .insert_document_with_id(collection.as_str(), id, body)?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Document> {
        self.lock()?
            .get_document(collection.as_str(), id)?
            .map(Document::from)
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })
    }

    async fn add(&self, collection: Collection, body: Value) -> StoreResult<String> {
        let id = self.lock()?.insert_document(collection.as_str(), &body)?;
        tracing::debug!(collection = %collection, id = %id, "Document added");
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, body: Value) -> StoreResult<()> {
        let replaced = self
            .lock()?
            .replace_document(collection.as_str(), id, &body)?;
        if !replaced {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        let documents = self.lock()?.list_documents(collection.as_str())?;
        Ok(documents.into_iter().map(Document::from).collect())
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>> {
        let documents = self
            .lock()?
            .find_documents_by_field(collection.as_str(), field, value)?;
        Ok(documents.into_iter().map(Document::from).collect())
    }
}
