use crate::core::{Result, StoreError, TASK_PREFIX};
use crate::migration::scan::rewrite_prefix;
use crate::migration::step::{Migration, MigrationContext};
use crate::migration::version;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{Level, event};

/// Spacing between consecutive `sortOrder` values, leaving room to insert
/// between neighbours without renumbering.
pub const SORT_ORDER_STEP: u64 = 10;

/// Gives every task a numeric `sortOrder` following insertion order.
pub fn add_task_sort_order() -> Migration {
    Migration::new(2, "add_task_sort_order", up)
}

fn up(ctx: MigrationContext<'_>) -> BoxFuture<'_, Result<()>> {
    async move {
        // Task keys sort by creation time, so scan position is insertion order.
        let stats = rewrite_prefix(ctx.store, TASK_PREFIX, ctx.page_size, |position, doc| {
            match doc.field("sortOrder") {
                None => {}
                Some(Value::Number(_)) => return Ok(false),
                Some(other) => {
                    return Err(StoreError::transform(
                        &doc.id,
                        format!("sortOrder must be a number, found {}", other),
                    ));
                }
            }
            doc.fields_mut()?.insert(
                "sortOrder".to_string(),
                Value::from(position as u64 * SORT_ORDER_STEP),
            );
            Ok(true)
        })
        .await?;

        event!(
            Level::DEBUG,
            scanned = stats.scanned,
            rewritten = stats.rewritten,
            "task sort order backfilled"
        );
        version::write(ctx.store, ctx.target_version).await
    }
    .boxed()
}
