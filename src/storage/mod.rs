pub mod durable;
pub mod engine;
pub mod memory;
pub mod persistence;

pub use durable::DurableStore;
pub use engine::{AllDocsQuery, DocumentStore};
pub use memory::{DocumentMap, InMemoryStore};
pub use persistence::{DurabilityMode, PersistenceManager};
