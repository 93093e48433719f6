use crate::core::{Document, PREFERENCES_ID, Result, StoreError};
use crate::migration::step::{Migration, MigrationContext};
use crate::migration::version;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value, json};

/// Preferences a fresh install starts with.
pub fn default_preferences() -> Map<String, Value> {
    match json!({
        "showCompletedTasks": false,
        "defaultContext": null,
        "weekStartsOn": 1,
        "syncEnabled": false,
    }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Creates the preferences document, or fills in keys an older one lacks.
/// Values the user already set are left alone.
pub fn create_default_preferences() -> Migration {
    Migration::new(5, "create_default_preferences", up)
}

fn up(ctx: MigrationContext<'_>) -> BoxFuture<'_, Result<()>> {
    async move {
        match ctx.store.get(PREFERENCES_ID).await {
            Ok(mut doc) => {
                let changed = {
                    let fields = doc.fields_mut()?;
                    let mut changed = false;
                    for (key, value) in default_preferences() {
                        if !fields.contains_key(&key) {
                            fields.insert(key, value);
                            changed = true;
                        }
                    }
                    changed
                };
                if changed {
                    ctx.store.put(doc).await?;
                }
            }
            Err(StoreError::NotFound(_)) => {
                let doc = Document::new(PREFERENCES_ID, Value::Object(default_preferences()));
                ctx.store.put(doc).await?;
            }
            Err(err) => return Err(err),
        }

        version::write(ctx.store, ctx.target_version).await
    }
    .boxed()
}
