//! Library state and its persistence, split across logical submodules.

mod error;
mod export;
mod library;
mod persistence;
mod report;

pub use error::LibraryError;
pub use export::export_message;
pub use library::{Library, DEFAULT_HISTORY_LIMIT};
pub use persistence::{JsonFiles, MemoryPersistence, Persistence, Snapshot};
