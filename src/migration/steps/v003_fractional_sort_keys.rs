use crate::core::Result;
use crate::migration::step::{Migration, MigrationContext};
use crate::migration::version;
use futures::FutureExt;
use futures::future::BoxFuture;

/// Defunct: was meant to replace numeric `sortOrder` with fractional index
/// strings. That design was abandoned, so this step only bumps the version
/// and never touches task data.
pub fn fractional_sort_keys() -> Migration {
    Migration::new(3, "fractional_sort_keys (defunct, version bump only)", up)
}

fn up(ctx: MigrationContext<'_>) -> BoxFuture<'_, Result<()>> {
    async move { version::write(ctx.store, ctx.target_version).await }.boxed()
}
