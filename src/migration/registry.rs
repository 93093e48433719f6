use super::step::Migration;
use crate::core::{Result, StoreError};

/// Ordered, immutable list of migration steps.
///
/// Registration order is execution order. Versions must strictly increase
/// but need not be contiguous: gaps left by removed steps are fine.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    steps: Vec<Migration>,
}

impl MigrationRegistry {
    pub fn new(steps: Vec<Migration>) -> Self {
        Self { steps }
    }

    /// Fluent builder method to append a step.
    pub fn with_step(mut self, step: Migration) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[Migration] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = &Migration> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Version of the last registered step.
    pub fn latest_version(&self) -> Option<u32> {
        self.steps.last().map(Migration::version)
    }

    pub fn get(&self, version: u32) -> Option<&Migration> {
        self.steps.iter().find(|step| step.version() == version)
    }

    /// Validates the integrity of the registry.
    ///
    /// Checks for:
    /// - version validity (>= 1),
    /// - strictly increasing versions (which also rules out duplicates),
    /// - the bootstrap step, if any, being registered first.
    ///
    /// The runner does not call this; it is checked by tests and tooling.
    pub fn validate(&self) -> Result<()> {
        let mut previous: Option<&Migration> = None;
        for (index, step) in self.steps.iter().enumerate() {
            if step.version() == 0 {
                return Err(StoreError::InvalidRegistry(format!(
                    "migration '{}' has version 0",
                    step.name()
                )));
            }
            if step.is_bootstrap() && index != 0 {
                return Err(StoreError::InvalidRegistry(format!(
                    "bootstrap migration '{}' must be registered first",
                    step.name()
                )));
            }
            if let Some(prev) = previous
                && step.version() <= prev.version()
            {
                return Err(StoreError::InvalidRegistry(format!(
                    "migration '{}' (v{}) does not follow '{}' (v{})",
                    step.name(),
                    step.version(),
                    prev.name(),
                    prev.version()
                )));
            }
            previous = Some(step);
        }
        Ok(())
    }
}

impl FromIterator<Migration> for MigrationRegistry {
    fn from_iter<I: IntoIterator<Item = Migration>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::step::MigrationContext;
    use futures::FutureExt;
    use futures::future::BoxFuture;

    fn noop(_ctx: MigrationContext<'_>) -> BoxFuture<'_, Result<()>> {
        async { Ok(()) }.boxed()
    }

    #[test]
    fn test_gaps_are_allowed() {
        let registry = MigrationRegistry::default()
            .with_step(Migration::bootstrap(1, "init", noop))
            .with_step(Migration::new(2, "two", noop))
            .with_step(Migration::new(9, "nine", noop));

        assert!(registry.validate().is_ok());
        assert_eq!(registry.latest_version(), Some(9));
        assert_eq!(registry.get(9).map(Migration::name), Some("nine"));
        assert!(registry.get(5).is_none());
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let registry: MigrationRegistry = [
            Migration::new(1, "a", noop),
            Migration::new(2, "b", noop),
            Migration::new(2, "c", noop),
        ]
        .into_iter()
        .collect();

        assert!(matches!(
            registry.validate(),
            Err(StoreError::InvalidRegistry(_))
        ));
    }

    #[test]
    fn test_out_of_order_rejected() {
        let registry = MigrationRegistry::new(vec![
            Migration::new(3, "a", noop),
            Migration::new(2, "b", noop),
        ]);
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_bootstrap_must_be_first() {
        let registry = MigrationRegistry::new(vec![
            Migration::new(1, "a", noop),
            Migration::bootstrap(2, "init", noop),
        ]);
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_zero_version_rejected() {
        let registry = MigrationRegistry::new(vec![Migration::bootstrap(0, "init", noop)]);
        assert!(registry.validate().is_err());
    }
}
