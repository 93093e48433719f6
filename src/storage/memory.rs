use super::engine::{AllDocsQuery, DocumentStore};
use crate::core::{Document, Result, Revision, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use tokio::sync::RwLock;
use tracing::{Level, event};

/// Documents keyed by id, kept in key order so prefix scans are range reads.
pub type DocumentMap = BTreeMap<String, Document>;

pub struct InMemoryStore {
    docs: RwLock<DocumentMap>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn from_documents(docs: DocumentMap) -> Self {
        Self {
            docs: RwLock::new(docs),
        }
    }

    /// Write a document, running `before_commit` on the stamped document while
    /// the write lock is held. The document only becomes visible if the hook
    /// succeeds; the durable store uses this to journal first.
    pub async fn put_with<F>(&self, mut doc: Document, before_commit: F) -> Result<Revision>
    where
        F: FnOnce(&Document) -> Result<()>,
    {
        let mut docs = self.docs.write().await;
        let rev = stamp_revision(docs.get(&doc.id), &mut doc)?;
        before_commit(&doc)?;

        event!(Level::TRACE, id = %doc.id, rev = %rev, "document written");
        docs.insert(doc.id.clone(), doc);
        Ok(rev)
    }

    /// Run `f` over every document with the read lock held, so no write can
    /// land until it returns (used to snapshot a consistent state).
    pub async fn with_documents<R>(&self, f: impl FnOnce(&DocumentMap) -> R) -> R {
        let docs = self.docs.read().await;
        f(&docs)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates the incoming revision against the stored document and assigns
/// the next revision token.
pub(crate) fn stamp_revision(existing: Option<&Document>, doc: &mut Document) -> Result<Revision> {
    let next = match (existing, doc.rev.as_ref()) {
        (None, None) => Revision::first(),
        (Some(current), Some(given)) if current.rev.as_ref() == Some(given) => given.next(),
        (current, given) => {
            return Err(StoreError::Conflict {
                id: doc.id.clone(),
                expected: given.map(|rev| rev.to_string()),
                actual: current.and_then(|d| d.rev.as_ref()).map(|rev| rev.to_string()),
            });
        }
    };
    doc.rev = Some(next.clone());
    Ok(next)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Document> {
        let docs = self.docs.read().await;
        docs.get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn put(&self, doc: Document) -> Result<Revision> {
        self.put_with(doc, |_| Ok(())).await
    }

    async fn all_docs(&self, query: &AllDocsQuery) -> Result<Vec<Document>> {
        let docs = self.docs.read().await;
        let lower = match &query.start_after {
            Some(after) if after.as_str() >= query.prefix.as_str() => {
                Bound::Excluded(after.clone())
            }
            _ => Bound::Included(query.prefix.clone()),
        };

        Ok(docs
            .range((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(&query.prefix))
            .filter(|(key, _)| query.matches(key))
            .take(query.limit)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn doc_count(&self) -> Result<usize> {
        Ok(self.docs.read().await.len())
    }
}
