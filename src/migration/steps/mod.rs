//! The task manager's migration history.
//!
//! Versions 6 to 8 belonged to steps that were removed before release; the
//! gap is expected.

mod v001_create_version_document;
mod v002_add_task_sort_order;
mod v003_fractional_sort_keys;
mod v004_task_status_to_completed;
mod v005_create_default_preferences;
mod v009_strip_zero_context_priority;

use super::registry::MigrationRegistry;

pub use v001_create_version_document::create_version_document;
pub use v002_add_task_sort_order::{SORT_ORDER_STEP, add_task_sort_order};
pub use v003_fractional_sort_keys::fractional_sort_keys;
pub use v004_task_status_to_completed::task_status_to_completed;
pub use v005_create_default_preferences::{create_default_preferences, default_preferences};
pub use v009_strip_zero_context_priority::strip_zero_context_priority;

/// Every step the application ships, in the order they run at boot.
pub fn builtin_registry() -> MigrationRegistry {
    MigrationRegistry::new(vec![
        create_version_document(),
        add_task_sort_order(),
        fractional_sort_keys(),
        task_status_to_completed(),
        create_default_preferences(),
        strip_zero_context_priority(),
    ])
}
