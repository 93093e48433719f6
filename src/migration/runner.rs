use super::registry::MigrationRegistry;
use super::version;
use crate::config::MigrationConfig;
use crate::core::Result;
use crate::storage::DocumentStore;
use tracing::{Instrument, Level, event, info_span};

/// Outcome of a successful [`MigrationRunner::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions whose `up` ran during this run, in order.
    pub applied: Vec<u32>,
    /// Versions that were already applied.
    pub skipped: Vec<u32>,
    /// Stored version after the run, `None` if the store was never bootstrapped.
    pub final_version: Option<u32>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Brings a store up to the latest registered version.
///
/// The runner keeps no state between runs. Every step re-checks the stored
/// version before running, so a rerun after a failure resumes at the first
/// step that did not complete.
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    registry: MigrationRegistry,
    config: MigrationConfig,
}

impl MigrationRunner {
    pub fn new(registry: MigrationRegistry) -> Self {
        Self {
            registry,
            config: MigrationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MigrationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Apply every pending step in registration order.
    ///
    /// The first failing step stops the run. Its error is returned as is and
    /// the stored version stays at the last step that completed.
    pub async fn run(&self, store: &dyn DocumentStore) -> Result<MigrationReport> {
        let span = info_span!(
            "migration.run",
            steps = self.registry.len(),
            latest = ?self.registry.latest_version()
        );
        self.run_steps(store).instrument(span).await
    }

    async fn run_steps(&self, store: &dyn DocumentStore) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();

        for step in self.registry.iter() {
            let ctx = step.context(store, self.config.page_size);

            if !step.needs_migration(ctx).await? {
                event!(
                    Level::DEBUG,
                    version = step.version(),
                    name = step.name(),
                    "migration already applied"
                );
                report.skipped.push(step.version());
                continue;
            }

            event!(
                Level::INFO,
                version = step.version(),
                name = step.name(),
                "applying migration"
            );
            if let Err(err) = step.up(ctx).await {
                event!(
                    Level::ERROR,
                    version = step.version(),
                    name = step.name(),
                    error = %err,
                    "migration failed"
                );
                return Err(err);
            }
            report.applied.push(step.version());
        }

        report.final_version = version::stored_version(store).await?;
        event!(
            Level::INFO,
            applied = report.applied.len(),
            final_version = ?report.final_version,
            "migrations complete"
        );
        Ok(report)
    }

    /// Versions that [`run`](Self::run) would apply, without applying them.
    ///
    /// On a store that has never been bootstrapped every step after a pending
    /// bootstrap step is reported as pending too.
    pub async fn pending(&self, store: &dyn DocumentStore) -> Result<Vec<u32>> {
        let mut pending = Vec::new();
        for step in self.registry.iter() {
            let ctx = step.context(store, self.config.page_size);
            match step.needs_migration(ctx).await {
                Ok(true) => pending.push(step.version()),
                Ok(false) => {}
                Err(err) if err.is_not_found() && !pending.is_empty() => {
                    pending.push(step.version())
                }
                Err(err) => return Err(err),
            }
        }
        Ok(pending)
    }
}
