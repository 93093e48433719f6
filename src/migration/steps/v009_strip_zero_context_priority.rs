use crate::core::{CONTEXT_PREFIX, Result};
use crate::migration::scan::rewrite_prefix;
use crate::migration::step::{Migration, MigrationContext};
use crate::migration::version;
use futures::FutureExt;
use futures::future::BoxFuture;

/// Contexts used to carry a `priority` field that defaulted to 0. The field
/// is deprecated; drop it where it still holds the default and keep any value
/// a user picked.
pub fn strip_zero_context_priority() -> Migration {
    Migration::new(9, "strip_zero_context_priority", up)
}

fn up(ctx: MigrationContext<'_>) -> BoxFuture<'_, Result<()>> {
    async move {
        rewrite_prefix(ctx.store, CONTEXT_PREFIX, ctx.page_size, |_, doc| {
            let is_zero = doc
                .field("priority")
                .and_then(|priority| priority.as_f64())
                .is_some_and(|priority| priority == 0.0);
            if !is_zero {
                return Ok(false);
            }
            doc.fields_mut()?.remove("priority");
            Ok(true)
        })
        .await?;

        version::write(ctx.store, ctx.target_version).await
    }
    .boxed()
}
