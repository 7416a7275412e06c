//! File mode: the whole store as one JSON document on disk.
//!
//! Every operation re-reads the file. Mutations read, change and rewrite the
//! entire document while holding the store's write lock, so two writers in
//! this process can no longer drop each other's changes. The lock is not
//! shared with other processes: two processes pointed at the same file still
//! race, and the last write wins.
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so a crash mid-write leaves the previous contents intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::traits::DocumentStore;
use super::{CollectionCounts, Document, Filter, PersistenceError, StoreSchema};

/// File name used inside a data directory.
pub const DB_FILE_NAME: &str = "db.json";

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(DB_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the parent directory and seed an empty store if no file exists.
    pub async fn init(&self) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if !tokio::fs::try_exists(&self.path).await? {
            self.write(&StoreSchema::default()).await?;
            info!(path = %self.path.display(), "Created empty store file");
        }
        Ok(())
    }

    /// Load the store, treating a missing, empty or syntactically broken file
    /// as an empty store.
    ///
    /// A file that parses but does not fit the store layout is not recovered
    /// from: records of the wrong shape are kept aside (see
    /// [`StoreSchema::from_value`]) and anything worse is returned as an
    /// error, so a later write never replaces data this process cannot read.
    pub async fn read(&self) -> Result<StoreSchema, PersistenceError> {
        match self.read_strict().await {
            Ok(schema) => Ok(schema),
            Err(PersistenceError::Json(e)) if e.is_syntax() || e.is_eof() => {
                warn!(path = %self.path.display(), error = %e, "Store file is not valid JSON, treating it as empty");
                Ok(StoreSchema::default())
            }
            Err(PersistenceError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), error = %e, "Store file is not UTF-8, treating it as empty");
                Ok(StoreSchema::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Load the store, surfacing parse errors instead of recovering from them.
    pub async fn read_strict(&self) -> Result<StoreSchema, PersistenceError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Store file does not exist yet");
                return Ok(StoreSchema::default());
            }
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(StoreSchema::default());
        }
        let value: serde_json::Value = serde_json::from_str(&contents)?;
        Ok(StoreSchema::from_value(value)?)
    }

    /// Replace the whole file with `schema`.
    pub async fn write(&self, schema: &StoreSchema) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.write_unlocked(schema).await
    }

    async fn write_unlocked(&self, schema: &StoreSchema) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(&schema.to_value()?)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(|e| PersistenceError::Io(std::io::Error::other(e)))?
    }

    /// One locked read-modify-write cycle. `f` returns its result and whether
    /// the schema changed; the file is rewritten only in the latter case.
    async fn mutate<R, F>(&self, f: F) -> Result<R, PersistenceError>
    where
        R: Send,
        F: FnOnce(&mut StoreSchema) -> Result<(R, bool), PersistenceError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut schema = self.read().await?;
        let (result, changed) = f(&mut schema)?;
        if changed {
            self.write_unlocked(&schema).await?;
        }
        Ok(result)
    }

    async fn append<T: Document>(
        &self,
        doc: &T,
        unique: Option<&Filter>,
    ) -> Result<(), PersistenceError> {
        let doc = doc.clone();
        self.mutate(move |schema| {
            let items = T::items_mut(schema);
            if items.iter().any(|existing| existing.id() == doc.id()) {
                return Err(PersistenceError::Conflict {
                    collection: T::COLLECTION,
                    reason: format!("id {} already exists", doc.id()),
                });
            }
            if let Some(filter) = unique {
                for existing in items.iter() {
                    if filter.matches(existing)? {
                        return Err(PersistenceError::Conflict {
                            collection: T::COLLECTION,
                            reason: format!("a record with {filter} already exists"),
                        });
                    }
                }
            }
            items.push(doc);
            Ok(((), true))
        })
        .await
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl DocumentStore for JsonFileStore {
    async fn insert<T: Document>(&self, doc: &T) -> Result<(), PersistenceError> {
        self.append(doc, None).await
    }

    async fn insert_unless<T: Document>(
        &self,
        doc: &T,
        unique: &Filter,
    ) -> Result<(), PersistenceError> {
        self.append(doc, Some(unique)).await
    }

    async fn get<T: Document>(&self, id: &str) -> Result<Option<T>, PersistenceError> {
        let schema = self.read().await?;
        Ok(T::items(&schema).iter().find(|d| d.id() == id).cloned())
    }

    async fn list<T: Document>(&self) -> Result<Vec<T>, PersistenceError> {
        let mut schema = self.read().await?;
        Ok(std::mem::take(T::items_mut(&mut schema)))
    }

    async fn find<T: Document>(&self, filter: &Filter) -> Result<Vec<T>, PersistenceError> {
        let mut matching = Vec::new();
        for item in self.list::<T>().await? {
            if filter.matches(&item)? {
                matching.push(item);
            }
        }
        Ok(matching)
    }

    async fn update<T, F>(&self, id: &str, mut f: F) -> Result<Option<T>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        self.mutate(move |schema| {
            let Some(item) = T::items_mut(schema).iter_mut().find(|d| d.id() == id) else {
                return Ok((None, false));
            };
            let changed = f(item);
            Ok((Some(item.clone()), changed))
        })
        .await
    }

    async fn update_unless<T, F>(
        &self,
        id: &str,
        unique: &Filter,
        mut f: F,
    ) -> Result<Option<T>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        self.mutate(move |schema| {
            let items = T::items_mut(schema);
            let Some(pos) = items.iter().position(|d| d.id() == id) else {
                return Ok((None, false));
            };
            let mut doc = items[pos].clone();
            if !f(&mut doc) {
                return Ok((Some(doc), false));
            }
            for (i, other) in items.iter().enumerate() {
                if i != pos && unique.matches(other)? {
                    return Err(PersistenceError::Conflict {
                        collection: T::COLLECTION,
                        reason: format!("a record with {unique} already exists"),
                    });
                }
            }
            items[pos] = doc.clone();
            Ok((Some(doc), true))
        })
        .await
    }

    async fn update_where<T, F>(&self, filter: &Filter, mut f: F) -> Result<Vec<T>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        self.mutate(move |schema| {
            let mut changed = Vec::new();
            for item in T::items_mut(schema).iter_mut() {
                if filter.matches(&*item)? && f(item) {
                    changed.push(item.clone());
                }
            }
            let any = !changed.is_empty();
            Ok((changed, any))
        })
        .await
    }

    async fn remove<T: Document>(&self, id: &str) -> Result<bool, PersistenceError> {
        self.mutate(move |schema| {
            let items = T::items_mut(schema);
            let before = items.len();
            items.retain(|d| d.id() != id);
            let removed = items.len() != before;
            Ok((removed, removed))
        })
        .await
    }

    async fn counts(&self) -> Result<CollectionCounts, PersistenceError> {
        Ok(self.read().await?.counts())
    }
}
