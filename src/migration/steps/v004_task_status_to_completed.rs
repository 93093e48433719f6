use crate::core::{Result, StoreError, TASK_PREFIX};
use crate::migration::scan::rewrite_prefix;
use crate::migration::step::{Migration, MigrationContext};
use crate::migration::version;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

/// Replaces the legacy `status` string on tasks with a `completed` flag.
///
/// `"done"` becomes `completed: true`, any other string `false`, and a task
/// with neither field gets `false`. An existing `completed` flag wins over a
/// leftover status. A non-string status is malformed.
pub fn task_status_to_completed() -> Migration {
    Migration::new(4, "task_status_to_completed", up)
}

fn up(ctx: MigrationContext<'_>) -> BoxFuture<'_, Result<()>> {
    async move {
        rewrite_prefix(ctx.store, TASK_PREFIX, ctx.page_size, |_, doc| {
            let id = doc.id.clone();
            let fields = doc.fields_mut()?;
            if fields.contains_key("completed") {
                return Ok(fields.remove("status").is_some());
            }

            let completed = match fields.remove("status") {
                None => false,
                Some(Value::String(status)) => status.eq_ignore_ascii_case("done"),
                Some(other) => {
                    return Err(StoreError::transform(
                        id,
                        format!("status must be a string, found {}", other),
                    ));
                }
            };
            fields.insert("completed".to_string(), Value::Bool(completed));
            Ok(true)
        })
        .await?;

        version::write(ctx.store, ctx.target_version).await
    }
    .boxed()
}
