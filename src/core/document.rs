use super::{Result, StoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use uuid::Uuid;

/// Key prefix shared by every task document.
pub const TASK_PREFIX: &str = "task_";
/// Key prefix shared by every context document.
pub const CONTEXT_PREFIX: &str = "context_";
/// Singleton id of the user preferences document.
pub const PREFERENCES_ID: &str = "preferences";
/// Singleton id of the schema version document.
pub const VERSION_DOCUMENT_ID: &str = "migrations";

/// Opaque optimistic-concurrency token.
///
/// Formatted as `<generation>-<hex>`. The generation increases by one on every
/// successful write of the same document, the suffix is random so two writers
/// racing from the same parent never produce the same token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn first() -> Self {
        Self::with_generation(1)
    }

    pub fn next(&self) -> Self {
        Self::with_generation(self.generation() + 1)
    }

    pub fn generation(&self) -> u64 {
        self.0
            .split_once('-')
            .and_then(|(generation, _)| generation.parse().ok())
            .unwrap_or(0)
    }

    fn with_generation(generation: u64) -> Self {
        Self(format!("{}-{}", generation, Uuid::new_v4().simple()))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document: key, revision token and JSON body.
///
/// `rev` is `None` only for a document that has never been written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub rev: Option<Revision>,
    pub body: Value,
}

impl Document {
    /// A document that does not exist in the store yet.
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            rev: None,
            body,
        }
    }

    pub fn with_rev(mut self, rev: Revision) -> Self {
        self.rev = Some(rev);
        self
    }

    pub fn fields(&self) -> Result<&Map<String, Value>> {
        self.body
            .as_object()
            .ok_or_else(|| StoreError::transform(&self.id, "document body is not an object"))
    }

    pub fn fields_mut(&mut self) -> Result<&mut Map<String, Value>> {
        let id = self.id.clone();
        self.body
            .as_object_mut()
            .ok_or_else(|| StoreError::transform(id, "document body is not an object"))
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.as_object().and_then(|fields| fields.get(name))
    }
}

/// Generates a task key that sorts by creation time.
pub fn new_task_id() -> String {
    new_prefixed_id(TASK_PREFIX)
}

/// Generates a context key that sorts by creation time.
pub fn new_context_id() -> String {
    new_prefixed_id(CONTEXT_PREFIX)
}

/// Per-process sequence that orders ids minted within the same millisecond.
static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);
/// Highest timestamp handed out so far, so a clock step backwards cannot
/// reorder ids.
static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(0);

/// `<prefix><13-digit millis>_<12-digit sequence>_<8 hex>`. Key order is
/// creation order within a process; the random tail keeps ids from different
/// devices apart.
fn new_prefixed_id(prefix: &str) -> String {
    let now = Utc::now().timestamp_millis().max(0);
    let millis = LAST_ID_MILLIS.fetch_max(now, Ordering::SeqCst).max(now);
    let sequence = ID_SEQUENCE.fetch_add(1, Ordering::SeqCst);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{:013}_{:012}_{}", prefix, millis, sequence, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_revision_generations_increase() {
        let first = Revision::first();
        assert_eq!(first.generation(), 1);

        let second = first.next();
        assert_eq!(second.generation(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn test_revision_from_same_parent_differs() {
        let parent = Revision::first();
        assert_ne!(parent.next(), parent.next());
    }

    #[test]
    fn test_task_ids_share_prefix_and_sort_by_time() {
        let a = new_task_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = new_task_id();

        assert!(a.starts_with(TASK_PREFIX));
        assert!(a < b);
        assert!(new_context_id().starts_with(CONTEXT_PREFIX));
    }

    #[test]
    fn test_back_to_back_ids_keep_creation_order() {
        let ids: Vec<String> = (0..2000).map(|_| new_task_id()).collect();

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn test_fields_rejects_non_object_body() {
        let doc = Document::new("task_1", json!([1, 2, 3]));
        let err = doc.fields().unwrap_err();
        assert!(matches!(err, StoreError::Transform { .. }));
    }
}
