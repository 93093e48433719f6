//! Accessor for the singleton document that records the schema version.

use super::step::MigrationContext;
use crate::core::{Document, Result, StoreError, VERSION_DOCUMENT_ID};
use crate::storage::DocumentStore;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Body of the version document: the highest fully applied migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDocument {
    pub version: u32,
}

impl VersionDocument {
    fn from_document(doc: &Document) -> Result<Self> {
        serde_json::from_value(doc.body.clone())
            .map_err(|err| StoreError::transform(&doc.id, err.to_string()))
    }
}

/// Read the version document. Fails with `StoreError::NotFound` when absent.
pub async fn read(store: &dyn DocumentStore) -> Result<VersionDocument> {
    let doc = store.get(VERSION_DOCUMENT_ID).await?;
    VersionDocument::from_document(&doc)
}

/// The stored version, or `None` if the version document does not exist.
pub async fn stored_version(store: &dyn DocumentStore) -> Result<Option<u32>> {
    match read(store).await {
        Ok(doc) => Ok(Some(doc.version)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Advance the stored version to `version`, creating the document if needed.
///
/// The document is re-read right before the write so the freshest revision
/// token is used. Writing a lower version than the stored one fails with
/// `StoreError::VersionRegression`; writing the same version is a no-op.
/// Fields other than `version` are preserved.
pub async fn write(store: &dyn DocumentStore, version: u32) -> Result<()> {
    let doc = match store.get(VERSION_DOCUMENT_ID).await {
        Ok(doc) => doc,
        Err(err) if err.is_not_found() => {
            store
                .put(Document::new(VERSION_DOCUMENT_ID, json!({ "version": version })))
                .await?;
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let stored = VersionDocument::from_document(&doc)?.version;
    if version < stored {
        return Err(StoreError::VersionRegression {
            stored,
            requested: version,
        });
    }
    if version == stored {
        return Ok(());
    }

    let mut doc = doc;
    doc.fields_mut()?
        .insert("version".to_string(), Value::from(version));
    store.put(doc).await?;
    Ok(())
}

/// Predicate for regular steps: the version document must exist.
pub fn needs_version(ctx: MigrationContext<'_>) -> BoxFuture<'_, Result<bool>> {
    async move { Ok(read(ctx.store).await?.version < ctx.target_version) }.boxed()
}

/// Predicate for the bootstrap step: a missing version document means the
/// store has never been migrated.
pub fn needs_bootstrap(ctx: MigrationContext<'_>) -> BoxFuture<'_, Result<bool>> {
    async move {
        Ok(stored_version(ctx.store)
            .await?
            .is_none_or(|stored| stored < ctx.target_version))
    }
    .boxed()
}
