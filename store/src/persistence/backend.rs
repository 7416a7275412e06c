//! Startup-time choice between the two storage engines.

use std::fmt;
use tracing::info;

use super::sqlite::{Database, SqliteDocumentStore};
use super::{CollectionCounts, Document, DocumentStore, Filter, JsonFileStore, PersistenceError};
use crate::config::{BackendKind, StoreConfig};

/// The configured storage engine. Fixed for the life of the process.
pub enum Backend {
    File(JsonFileStore),
    Database(SqliteDocumentStore),
}

impl Backend {
    /// Open the backend `config` selects. File mode seeds an empty store
    /// file if none exists; database mode creates the database and runs
    /// migrations.
    pub async fn open(config: &StoreConfig) -> Result<Self, PersistenceError> {
        let backend = match config.backend {
            BackendKind::File => {
                let store = JsonFileStore::new(config.json_path());
                store.init().await?;
                Backend::File(store)
            }
            BackendKind::Database => {
                let db = Database::open(&config.database_path).await?;
                Backend::Database(SqliteDocumentStore::new(db.pool().clone()))
            }
        };
        info!(backend = backend.kind().as_str(), location = %backend, "Storage backend ready");
        Ok(backend)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::File(_) => BackendKind::File,
            Backend::Database(_) => BackendKind::Database,
        }
    }
}

/// Where the data lives, for logs and operator output.
impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::File(store) => write!(f, "{}", store.path().display()),
            Backend::Database(store) => {
                let options = store.pool().connect_options();
                write!(f, "sqlite:{}", options.get_filename().display())
            }
        }
    }
}

impl DocumentStore for Backend {
    async fn insert<T: Document>(&self, doc: &T) -> Result<(), PersistenceError> {
        match self {
            Backend::File(s) => s.insert(doc).await,
            Backend::Database(s) => s.insert(doc).await,
        }
    }

    async fn insert_unless<T: Document>(
        &self,
        doc: &T,
        unique: &Filter,
    ) -> Result<(), PersistenceError> {
        match self {
            Backend::File(s) => s.insert_unless(doc, unique).await,
            Backend::Database(s) => s.insert_unless(doc, unique).await,
        }
    }

    async fn get<T: Document>(&self, id: &str) -> Result<Option<T>, PersistenceError> {
        match self {
            Backend::File(s) => s.get(id).await,
            Backend::Database(s) => s.get(id).await,
        }
    }

    async fn list<T: Document>(&self) -> Result<Vec<T>, PersistenceError> {
        match self {
            Backend::File(s) => s.list().await,
            Backend::Database(s) => s.list().await,
        }
    }

    async fn find<T: Document>(&self, filter: &Filter) -> Result<Vec<T>, PersistenceError> {
        match self {
            Backend::File(s) => s.find(filter).await,
            Backend::Database(s) => s.find(filter).await,
        }
    }

    async fn update<T, F>(&self, id: &str, f: F) -> Result<Option<T>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        match self {
            Backend::File(s) => s.update(id, f).await,
            Backend::Database(s) => s.update(id, f).await,
        }
    }

    async fn update_unless<T, F>(
        &self,
        id: &str,
        unique: &Filter,
        f: F,
    ) -> Result<Option<T>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        match self {
            Backend::File(s) => s.update_unless(id, unique, f).await,
            Backend::Database(s) => s.update_unless(id, unique, f).await,
        }
    }

    async fn update_where<T, F>(&self, filter: &Filter, f: F) -> Result<Vec<T>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        match self {
            Backend::File(s) => s.update_where(filter, f).await,
            Backend::Database(s) => s.update_where(filter, f).await,
        }
    }

    async fn remove<T: Document>(&self, id: &str) -> Result<bool, PersistenceError> {
        match self {
            Backend::File(s) => s.remove::<T>(id).await,
            Backend::Database(s) => s.remove::<T>(id).await,
        }
    }

    async fn counts(&self) -> Result<CollectionCounts, PersistenceError> {
        match self {
            Backend::File(s) => s.counts().await,
            Backend::Database(s) => s.counts().await,
        }
    }
}
