//! Read-only access to the external note store.

pub mod note;
pub mod repository;

pub use note::{core_data_to_utc, Note, CORE_DATA_EPOCH_OFFSET};
pub use repository::NoteRepository;
