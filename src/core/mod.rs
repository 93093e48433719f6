pub mod document;
pub mod error;

pub use document::{
    CONTEXT_PREFIX, Document, PREFERENCES_ID, Revision, TASK_PREFIX, VERSION_DOCUMENT_ID,
    new_context_id, new_task_id,
};
pub use error::{Result, StoreError};
