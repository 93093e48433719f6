use super::version;
use crate::core::Result;
use crate::storage::DocumentStore;
use futures::future::BoxFuture;
use std::fmt;

/// Everything a step sees while it runs: the store handle, the version the
/// step upgrades to and the scan page size.
#[derive(Clone, Copy)]
pub struct MigrationContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub target_version: u32,
    pub page_size: usize,
}

/// Decides whether a step still has to run against the store.
pub type NeedsMigrationFn = for<'a> fn(MigrationContext<'a>) -> BoxFuture<'a, Result<bool>>;

/// Transforms the store and, as its final act, bumps the stored version.
pub type UpFn = for<'a> fn(MigrationContext<'a>) -> BoxFuture<'a, Result<()>>;

/// A single versioned upgrade step.
///
/// Steps are plain records: a version, a name, and the two behaviors the
/// runner dispatches to. The set of steps is fixed at compile time, so no
/// trait objects are involved.
#[derive(Clone, Copy)]
pub struct Migration {
    version: u32,
    name: &'static str,
    bootstrap: bool,
    needs_migration: NeedsMigrationFn,
    up: UpFn,
}

impl Migration {
    /// A regular step. It expects the version document to exist already and
    /// runs while the stored version is below `version`.
    pub fn new(version: u32, name: &'static str, up: UpFn) -> Self {
        Self {
            version,
            name,
            bootstrap: false,
            needs_migration: version::needs_version,
            up,
        }
    }

    /// The step responsible for creating the version document. A missing
    /// version document means this step has to run.
    pub fn bootstrap(version: u32, name: &'static str, up: UpFn) -> Self {
        Self {
            version,
            name,
            bootstrap: true,
            needs_migration: version::needs_bootstrap,
            up,
        }
    }

    /// Replace the applicability check.
    pub fn with_predicate(mut self, needs_migration: NeedsMigrationFn) -> Self {
        self.needs_migration = needs_migration;
        self
    }

    /// The schema version this step upgrades to.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_bootstrap(&self) -> bool {
        self.bootstrap
    }

    pub fn context<'a>(
        &self,
        store: &'a dyn DocumentStore,
        page_size: usize,
    ) -> MigrationContext<'a> {
        MigrationContext {
            store,
            target_version: self.version,
            page_size,
        }
    }

    pub async fn needs_migration(&self, ctx: MigrationContext<'_>) -> Result<bool> {
        (self.needs_migration)(ctx).await
    }

    pub async fn up(&self, ctx: MigrationContext<'_>) -> Result<()> {
        (self.up)(ctx).await
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("name", &self.name)
            .field("bootstrap", &self.bootstrap)
            .finish()
    }
}
