use crate::core::{Document, Result, Revision};
use async_trait::async_trait;

/// A key-range query over documents sharing a key prefix.
///
/// Results are returned in key order. Pass the last key of a page as
/// `start_after` to fetch the following page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllDocsQuery {
    pub prefix: String,
    pub start_after: Option<String>,
    pub limit: usize,
}

impl AllDocsQuery {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            start_after: None,
            limit: usize::MAX,
        }
    }

    pub fn start_after(mut self, key: impl Into<String>) -> Self {
        self.start_after = Some(key.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
            && self
                .start_after
                .as_deref()
                .is_none_or(|after| key > after)
    }
}

/// Storage engine trait - the document store collaborator every migration
/// and the runner work against.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by key. Fails with `StoreError::NotFound` when absent.
    async fn get(&self, id: &str) -> Result<Document>;

    /// Write a document.
    ///
    /// A document without `rev` is created and must not exist yet. A document
    /// carrying `rev` replaces the stored one only if the token still matches.
    /// Either violation fails with `StoreError::Conflict`.
    async fn put(&self, doc: Document) -> Result<Revision>;

    /// One page of documents matching the query, in key order.
    async fn all_docs(&self, query: &AllDocsQuery) -> Result<Vec<Document>>;

    /// Number of documents in the store.
    async fn doc_count(&self) -> Result<usize>;
}
