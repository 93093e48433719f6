// ============================================================================
// TaskStore Library
// ============================================================================

pub mod config;
pub mod core;
pub mod migration;
pub mod storage;

// Re-export main types for convenience
pub use config::{MigrationConfig, StoreConfig};
pub use crate::core::{Document, Result, Revision, StoreError};
pub use migration::{
    Migration, MigrationContext, MigrationRegistry, MigrationReport, MigrationRunner,
    VersionDocument, builtin_registry,
};
pub use storage::{AllDocsQuery, DocumentStore, DurabilityMode, DurableStore, InMemoryStore};

/// Open the durable store described by `config` and bring it to the latest
/// built-in schema version.
///
/// This is the boot gate: callers must not read from the store until it
/// returns `Ok`.
///
/// # Examples
///
/// ```
/// # #[tokio::main]
/// # async fn main() -> taskstore::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let config = taskstore::StoreConfig::new(dir.path());
/// let (store, report) = taskstore::open_and_migrate(&config).await?;
/// assert_eq!(report.final_version, Some(9));
/// # drop(store);
/// # Ok(())
/// # }
/// ```
pub async fn open_and_migrate(config: &StoreConfig) -> Result<(DurableStore, MigrationReport)> {
    let store = DurableStore::open(config)?;
    let report = MigrationRunner::new(builtin_registry()).run(&store).await?;
    Ok((store, report))
}
