//! Versioned schema migrations for the local document store.
//!
//! A [`MigrationRegistry`] lists [`Migration`] steps in version order. At
//! boot the application hands its store to [`MigrationRunner::run`], which
//! applies every step the stored version says is missing and records each
//! completed step in the version document before moving on.

pub mod registry;
pub mod runner;
pub mod scan;
pub mod step;
pub mod steps;
pub mod version;

pub use registry::MigrationRegistry;
pub use runner::{MigrationReport, MigrationRunner};
pub use scan::{RewriteStats, rewrite_prefix, scan_prefix};
pub use step::{Migration, MigrationContext, NeedsMigrationFn, UpFn};
pub use steps::builtin_registry;
pub use version::VersionDocument;
