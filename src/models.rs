//! Record types that mirror the JSON files on disk and get passed throughout
//! the TUI. They stay light-weight data holders: validation and the
//! borrowed/available bookkeeping live in the store so every mutation goes
//! through a single code path.

use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Format used for history timestamps, matching the microsecond precision the
/// existing data files carry.
const HISTORY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Circulation state of a book. Serialized in lowercase so the books file stays
/// readable (`"available"` / `"borrowed"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    #[default]
    Available,
    Borrowed,
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookStatus::Available => write!(f, "available"),
            BookStatus::Borrowed => write!(f, "borrowed"),
        }
    }
}

/// A single catalogued book. `borrowed_by` is populated exactly when `status`
/// is [`BookStatus::Borrowed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique key within the library.
    pub book_id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub status: BookStatus,
    /// Member identifier of the current borrower. Not checked against the
    /// members list; any non-empty id is accepted.
    #[serde(default)]
    pub borrowed_by: Option<String>,
}

impl Book {
    /// Build a freshly catalogued, available book.
    pub fn new(book_id: &str, title: &str, author: &str) -> Self {
        Self {
            book_id: book_id.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            status: BookStatus::Available,
            borrowed_by: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == BookStatus::Available
    }

    /// Whether the status and borrower fields agree with each other.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            BookStatus::Available => self.borrowed_by.is_none(),
            BookStatus::Borrowed => self.borrowed_by.is_some(),
        }
    }

    /// `Title by Author`, used in reports and the CSV export.
    pub fn display_title(&self) -> String {
        format!("{} by {}", self.title, self.author)
    }
}

/// A registered library member. The email is stored as typed; nothing checks
/// its format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: String,
    pub name: String,
    pub email: String,
}

impl Member {
    pub fn new(member_id: &str, name: &str, email: &str) -> Self {
        Self {
            member_id: member_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One line of the audit log. Entries are stored as plain strings in the books
/// file, with the timestamp already baked into the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryEntry(String);

impl HistoryEntry {
    /// Stamp `message` with the current local time.
    pub fn now(message: impl fmt::Display) -> Self {
        let stamp = Local::now().format(HISTORY_TIMESTAMP_FORMAT);
        Self(format!("{stamp}: {message}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for HistoryEntry {
    fn from(line: String) -> Self {
        Self(line)
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
