use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use taskstore::core::new_task_id;
use taskstore::migration::{steps, version};
use taskstore::{
    AllDocsQuery, Document, DocumentStore, InMemoryStore, MigrationConfig, MigrationRegistry,
    MigrationRunner, Result, Revision, StoreError, builtin_registry,
};

async fn put(store: &dyn DocumentStore, id: &str, body: serde_json::Value) {
    store.put(Document::new(id, body)).await.unwrap();
}

async fn revisions(store: &InMemoryStore) -> HashMap<String, Option<Revision>> {
    store
        .all_docs(&AllDocsQuery::prefix(""))
        .await
        .unwrap()
        .into_iter()
        .map(|doc| (doc.id, doc.rev))
        .collect()
}

#[tokio::test]
async fn test_sort_order_follows_insertion_order() {
    let store = InMemoryStore::new();
    let mut ids = Vec::new();
    for title in ["buy milk", "call mum", "file taxes"] {
        let id = new_task_id();
        put(&store, &id, json!({ "title": title })).await;
        ids.push(id);
    }

    let registry = MigrationRegistry::new(vec![
        steps::create_version_document(),
        steps::add_task_sort_order(),
    ]);
    let report = MigrationRunner::new(registry).run(&store).await.unwrap();

    assert_eq!(report.final_version, Some(2));
    assert_eq!(version::read(&store).await.unwrap().version, 2);
    for (index, id) in ids.iter().enumerate() {
        let doc = store.get(id).await.unwrap();
        assert_eq!(doc.body["sortOrder"], json!(index as u64 * 10));
    }
}

#[tokio::test]
async fn test_sort_order_pages_through_large_collections() {
    let store = InMemoryStore::new();
    for i in 0..250 {
        put(&store, &format!("task_{:05}", i), json!({ "title": i })).await;
    }

    let registry = MigrationRegistry::new(vec![
        steps::create_version_document(),
        steps::add_task_sort_order(),
    ]);
    MigrationRunner::new(registry)
        .with_config(MigrationConfig::default().page_size(7))
        .run(&store)
        .await
        .unwrap();

    let last = store.get("task_00249").await.unwrap();
    assert_eq!(last.body["sortOrder"], json!(2490));
    let untouched_count = store
        .all_docs(&AllDocsQuery::prefix("task_"))
        .await
        .unwrap()
        .iter()
        .filter(|doc| doc.field("sortOrder").is_none())
        .count();
    assert_eq!(untouched_count, 0);
}

#[tokio::test]
async fn test_existing_sort_order_is_kept() {
    let store = InMemoryStore::new();
    put(&store, "task_1", json!({ "sortOrder": 55 })).await;
    put(&store, "task_2", json!({})).await;
    let kept_rev = store.get("task_1").await.unwrap().rev;

    let registry = MigrationRegistry::new(vec![
        steps::create_version_document(),
        steps::add_task_sort_order(),
    ]);
    MigrationRunner::new(registry).run(&store).await.unwrap();

    let first = store.get("task_1").await.unwrap();
    assert_eq!(first.body["sortOrder"], 55);
    assert_eq!(first.rev, kept_rev);
    assert_eq!(store.get("task_2").await.unwrap().body["sortOrder"], 10);
}

#[tokio::test]
async fn test_zero_priority_is_stripped_from_contexts() {
    let store = InMemoryStore::new();
    version::write(&store, 5).await.unwrap();
    put(&store, "context_home", json!({ "name": "home", "priority": 0 })).await;
    put(&store, "context_work", json!({ "name": "work", "priority": 5 })).await;
    let work_rev = store.get("context_work").await.unwrap().rev;

    let registry = MigrationRegistry::new(vec![steps::strip_zero_context_priority()]);
    MigrationRunner::new(registry).run(&store).await.unwrap();

    let home = store.get("context_home").await.unwrap();
    assert_eq!(home.body, json!({ "name": "home" }));
    let work = store.get("context_work").await.unwrap();
    assert_eq!(work.body, json!({ "name": "work", "priority": 5 }));
    assert_eq!(work.rev, work_rev);
    assert_eq!(version::read(&store).await.unwrap().version, 9);
}

#[tokio::test]
async fn test_defunct_step_only_bumps_version() {
    let store = InMemoryStore::new();
    version::write(&store, 2).await.unwrap();
    put(&store, "task_1", json!({ "title": "a", "sortOrder": 0 })).await;
    put(&store, "context_home", json!({ "name": "home" })).await;
    put(&store, "preferences", json!({ "weekStartsOn": 0 })).await;
    let before = revisions(&store).await;

    let registry = MigrationRegistry::new(vec![steps::fractional_sort_keys()]);
    let report = MigrationRunner::new(registry).run(&store).await.unwrap();

    assert_eq!(report.applied, vec![3]);
    let after = revisions(&store).await;
    for (id, rev) in &before {
        if id == "migrations" {
            assert_ne!(after[id], *rev);
        } else {
            assert_eq!(after[id], *rev, "{} was rewritten", id);
        }
    }
    assert_eq!(after.len(), before.len());
    assert_eq!(version::read(&store).await.unwrap().version, 3);
}

#[tokio::test]
async fn test_status_becomes_completed_flag() {
    let store = InMemoryStore::new();
    version::write(&store, 3).await.unwrap();
    put(&store, "task_1", json!({ "status": "done" })).await;
    put(&store, "task_2", json!({ "status": "open" })).await;
    put(&store, "task_3", json!({})).await;
    put(&store, "task_4", json!({ "completed": true, "status": "open" })).await;

    let registry = MigrationRegistry::new(vec![steps::task_status_to_completed()]);
    MigrationRunner::new(registry).run(&store).await.unwrap();

    assert_eq!(store.get("task_1").await.unwrap().body, json!({ "completed": true }));
    assert_eq!(store.get("task_2").await.unwrap().body, json!({ "completed": false }));
    assert_eq!(store.get("task_3").await.unwrap().body, json!({ "completed": false }));
    assert_eq!(store.get("task_4").await.unwrap().body, json!({ "completed": true }));
}

#[tokio::test]
async fn test_non_string_status_is_transform_error() {
    let store = InMemoryStore::new();
    version::write(&store, 3).await.unwrap();
    put(&store, "task_1", json!({ "status": 42 })).await;

    let registry = MigrationRegistry::new(vec![steps::task_status_to_completed()]);
    let err = MigrationRunner::new(registry).run(&store).await.unwrap_err();

    assert!(matches!(err, StoreError::Transform { .. }));
    assert_eq!(version::read(&store).await.unwrap().version, 3);
}

#[tokio::test]
async fn test_preferences_are_created_or_backfilled() {
    let fresh = InMemoryStore::new();
    version::write(&fresh, 4).await.unwrap();
    let registry = MigrationRegistry::new(vec![steps::create_default_preferences()]);
    MigrationRunner::new(registry.clone()).run(&fresh).await.unwrap();
    let prefs = fresh.get("preferences").await.unwrap();
    assert_eq!(
        prefs.body,
        serde_json::Value::Object(steps::default_preferences())
    );

    let existing = InMemoryStore::new();
    version::write(&existing, 4).await.unwrap();
    put(&existing, "preferences", json!({ "weekStartsOn": 0 })).await;
    MigrationRunner::new(registry).run(&existing).await.unwrap();
    let prefs = existing.get("preferences").await.unwrap();
    assert_eq!(prefs.body["weekStartsOn"], 0);
    assert_eq!(prefs.body["showCompletedTasks"], false);
}

#[tokio::test]
async fn test_full_builtin_history_on_legacy_store() {
    let store = InMemoryStore::new();
    put(&store, "task_0001", json!({ "title": "a", "status": "done" })).await;
    put(&store, "task_0002", json!({ "title": "b" })).await;
    put(&store, "context_errands", json!({ "name": "errands", "priority": 0 })).await;

    let runner = MigrationRunner::new(builtin_registry());
    let report = runner.run(&store).await.unwrap();

    assert_eq!(report.applied, vec![1, 2, 3, 4, 5, 9]);
    assert_eq!(report.final_version, Some(9));
    assert_eq!(
        store.get("task_0001").await.unwrap().body,
        json!({ "title": "a", "sortOrder": 0, "completed": true })
    );
    assert_eq!(
        store.get("task_0002").await.unwrap().body,
        json!({ "title": "b", "sortOrder": 10, "completed": false })
    );
    assert!(store.get("context_errands").await.unwrap().field("priority").is_none());
    assert!(store.get("preferences").await.is_ok());

    assert!(runner.run(&store).await.unwrap().is_noop());
}

/// Store whose first task update loses a race against a replicated write.
struct RacingStore {
    inner: InMemoryStore,
    raced: AtomicBool,
}

#[async_trait]
impl DocumentStore for RacingStore {
    async fn get(&self, id: &str) -> Result<Document> {
        self.inner.get(id).await
    }

    async fn put(&self, doc: Document) -> Result<Revision> {
        let is_task_update = doc.id.starts_with("task_") && doc.rev.is_some();
        if is_task_update && !self.raced.swap(true, Ordering::SeqCst) {
            let remote = self.inner.get(&doc.id).await?;
            self.inner.put(remote).await?;
        }
        self.inner.put(doc).await
    }

    async fn all_docs(&self, query: &AllDocsQuery) -> Result<Vec<Document>> {
        self.inner.all_docs(query).await
    }

    async fn doc_count(&self) -> Result<usize> {
        self.inner.doc_count().await
    }
}

#[tokio::test]
async fn test_revision_conflict_is_fatal_and_retry_succeeds() {
    let store = RacingStore {
        inner: InMemoryStore::new(),
        raced: AtomicBool::new(false),
    };
    put(&store, "task_1", json!({ "title": "a" })).await;

    let registry = MigrationRegistry::new(vec![
        steps::create_version_document(),
        steps::add_task_sort_order(),
    ]);
    let runner = MigrationRunner::new(registry);

    let err = runner.run(&store).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(version::read(&store).await.unwrap().version, 1);

    let report = runner.run(&store).await.unwrap();
    assert_eq!(report.applied, vec![2]);
    assert_eq!(store.get("task_1").await.unwrap().body["sortOrder"], 0);
}
