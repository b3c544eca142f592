//! Core library surface for the Digital Library TUI application.
//!
//! The store is usable without the terminal front-end, which keeps the `bin`
//! target thin and lets tests drive every operation directly.
pub mod auth;
pub mod config;
pub mod models;
pub mod store;
pub mod ui;

/// Login check used by the TUI.
pub use auth::{Authenticator, StaticCredentials};

pub use config::Config;

/// The three record types the store manipulates.
pub use models::{Book, BookStatus, HistoryEntry, Member};

/// The store and its persistence backends.
pub use store::{JsonFiles, Library, LibraryError, MemoryPersistence, Persistence};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
