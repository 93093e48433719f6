use super::engine::{AllDocsQuery, DocumentStore};
use super::memory::InMemoryStore;
use super::persistence::{DurabilityMode, JournalEntry, PersistenceManager};
use crate::config::StoreConfig;
use crate::core::{Document, Result, Revision};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{Level, event};

/// Document store that survives restarts.
///
/// Reads are served from memory. Every write is journaled before it becomes
/// visible; the journal is folded into a snapshot every
/// `checkpoint_threshold` writes or on an explicit [`DurableStore::checkpoint`].
pub struct DurableStore {
    memory: InMemoryStore,
    persistence: Mutex<PersistenceManager>,
}

impl DurableStore {
    /// Open (or create) the store in `config.data_dir`, recovering any
    /// previous snapshot and journal.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let mut persistence = PersistenceManager::new(&config.data_dir, config.durability)?;
        persistence
            .journal_mut()
            .set_checkpoint_threshold(config.checkpoint_threshold);

        let documents = persistence.recover()?;
        event!(
            Level::INFO,
            data_dir = %config.data_dir.display(),
            doc_count = documents.len(),
            "document store opened"
        );

        Ok(Self {
            memory: InMemoryStore::from_documents(documents),
            persistence: Mutex::new(persistence),
        })
    }

    /// Write a snapshot of the whole store and truncate the journal.
    pub async fn checkpoint(&self) -> Result<()> {
        // Same lock order as `put`: documents first, then the journal.
        self.memory
            .with_documents(|documents| self.persistence.lock()?.checkpoint(documents))
            .await
    }

    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        Ok(self.persistence.lock()?.durability_mode())
    }

    async fn maybe_checkpoint(&self) -> Result<()> {
        let due = self.persistence.lock()?.needs_checkpoint();
        if due {
            self.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for DurableStore {
    async fn get(&self, id: &str) -> Result<Document> {
        self.memory.get(id).await
    }

    async fn put(&self, doc: Document) -> Result<Revision> {
        let rev = self
            .memory
            .put_with(doc, |stamped| {
                let mut persistence = self.persistence.lock()?;
                persistence.log(&JournalEntry::Put {
                    doc: stamped.clone(),
                })
            })
            .await?;
        self.maybe_checkpoint().await?;
        Ok(rev)
    }

    async fn all_docs(&self, query: &AllDocsQuery) -> Result<Vec<Document>> {
        self.memory.all_docs(query).await
    }

    async fn doc_count(&self) -> Result<usize> {
        self.memory.doc_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path()).durability(DurabilityMode::Sync);

        let rev = {
            let store = DurableStore::open(&config).unwrap();
            store
                .put(Document::new("task_1", json!({"title": "pack"})))
                .await
                .unwrap()
        };

        let store = DurableStore::open(&config).unwrap();
        assert_eq!(store.durability_mode().unwrap(), DurabilityMode::Sync);
        let doc = store.get("task_1").await.unwrap();
        assert_eq!(doc.body["title"], "pack");
        assert_eq!(doc.rev, Some(rev));
    }

    #[tokio::test]
    async fn test_threshold_triggers_checkpoint() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path())
            .durability(DurabilityMode::Sync)
            .checkpoint_threshold(2);

        let store = DurableStore::open(&config).unwrap();
        store.put(Document::new("task_1", json!({}))).await.unwrap();
        store.put(Document::new("task_2", json!({}))).await.unwrap();

        let persistence = store.persistence.lock().unwrap();
        assert!(persistence.snapshot().exists());
        assert_eq!(persistence.journal().entries_since_checkpoint(), 0);
    }

    #[tokio::test]
    async fn test_none_durability_keeps_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path()).durability(DurabilityMode::None);

        {
            let store = DurableStore::open(&config).unwrap();
            store.put(Document::new("task_1", json!({}))).await.unwrap();
        }

        let store = DurableStore::open(&config).unwrap();
        assert_eq!(store.doc_count().await.unwrap(), 0);
    }
}
