use crate::core::Result;
use crate::migration::step::{Migration, MigrationContext};
use crate::migration::version;
use futures::FutureExt;
use futures::future::BoxFuture;

/// Creates the version document on a store that has never been migrated.
pub fn create_version_document() -> Migration {
    Migration::bootstrap(1, "create_version_document", up)
}

fn up(ctx: MigrationContext<'_>) -> BoxFuture<'_, Result<()>> {
    async move { version::write(ctx.store, ctx.target_version).await }.boxed()
}
