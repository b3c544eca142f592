use std::path::Path;

use indexmap::IndexMap;
use tracing::{error, info, warn};

use super::error::LibraryError;
use super::export::write_csv;
use super::persistence::Persistence;
use super::report::{history_report, inventory_report, members_report};
use crate::models::{Book, BookStatus, HistoryEntry, Member};

/// Number of history lines shown by [`Library::history_report`] unless the
/// configuration says otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// In-memory library state plus the backend it writes through to. Every
/// successful mutation appends one history entry and rewrites the affected
/// file before returning. Books and members keep the order they were added
/// in, which is the order reports, exports and saved files list them.
pub struct Library<P: Persistence> {
    persistence: P,
    books: IndexMap<String, Book>,
    members: IndexMap<String, Member>,
    history: Vec<HistoryEntry>,
    history_limit: usize,
}

impl<P: Persistence> Library<P> {
    /// Load state from `persistence`, seeding a default book and member when
    /// either collection comes back empty. Load failures are returned instead
    /// of silently starting from scratch.
    pub fn open(persistence: P) -> Result<Self, LibraryError> {
        let snapshot = persistence.load()?;
        let mut library = Self {
            persistence,
            books: snapshot
                .books
                .into_iter()
                .map(|book| (book.book_id.clone(), book))
                .collect(),
            members: snapshot
                .members
                .into_iter()
                .map(|member| (member.member_id.clone(), member))
                .collect(),
            history: snapshot.history,
            history_limit: DEFAULT_HISTORY_LIMIT,
        };
        library.seed_defaults()?;
        info!(
            books = library.books.len(),
            members = library.members.len(),
            "library opened"
        );
        Ok(library)
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    fn seed_defaults(&mut self) -> Result<(), LibraryError> {
        if self.books.is_empty() {
            let book = Book::new("B101", "The Alchemist", "Paulo Coelho");
            self.books.insert(book.book_id.clone(), book);
            self.save_books()?;
        }
        if self.members.is_empty() {
            let member = Member::new("M001", "John Doe", "john@example.com");
            self.members.insert(member.member_id.clone(), member);
            self.save_members()?;
        }
        Ok(())
    }

    pub fn add_book(&mut self, id: &str, title: &str, author: &str) -> Result<String, LibraryError> {
        if id.is_empty() || title.is_empty() {
            return reject("add_book", LibraryError::MissingBookFields);
        }
        if self.books.contains_key(id) {
            return reject("add_book", LibraryError::DuplicateBook);
        }
        if !is_letters_and_spaces(title) {
            return reject("add_book", LibraryError::InvalidTitle);
        }
        if !is_letters_and_spaces(author) {
            return reject("add_book", LibraryError::InvalidAuthor);
        }

        self.books.insert(id.to_string(), Book::new(id, title, author));
        self.record(format!("Added book '{title}' by {author}"));
        self.commit_books(|library| {
            library.books.shift_remove(id);
        })?;

        info!(book_id = id, "book added");
        Ok(format!("Success: '{title}' added."))
    }

    /// Lend a book out. The member id is stored as given; it is not required to
    /// belong to a registered member.
    pub fn borrow_book(&mut self, id: &str, member_id: &str) -> Result<String, LibraryError> {
        let Some(book) = self.books.get_mut(id) else {
            return reject("borrow_book", LibraryError::BookNotFound);
        };
        if member_id.is_empty() {
            return reject("borrow_book", LibraryError::MissingMemberId);
        }
        if book.status != BookStatus::Available {
            return reject("borrow_book", LibraryError::NotAvailable(book.status));
        }

        book.status = BookStatus::Borrowed;
        book.borrowed_by = Some(member_id.to_string());
        let title = book.title.clone();
        self.record(format!("'{title}' borrowed by {member_id}"));
        self.commit_books(|library| {
            if let Some(book) = library.books.get_mut(id) {
                book.status = BookStatus::Available;
                book.borrowed_by = None;
            }
        })?;

        info!(book_id = id, member_id, "book borrowed");
        Ok(format!("Success: '{title}' borrowed by {member_id}."))
    }

    pub fn return_book(&mut self, id: &str) -> Result<String, LibraryError> {
        let Some(book) = self.books.get_mut(id) else {
            return reject("return_book", LibraryError::BookNotFound);
        };
        if book.status != BookStatus::Borrowed {
            return reject("return_book", LibraryError::NotBorrowed);
        }

        let member = book.borrowed_by.take().unwrap_or_default();
        book.status = BookStatus::Available;
        let title = book.title.clone();
        self.record(format!("'{title}' returned from {member}"));
        let borrower = member.clone();
        self.commit_books(move |library| {
            if let Some(book) = library.books.get_mut(id) {
                book.status = BookStatus::Borrowed;
                book.borrowed_by = Some(borrower);
            }
        })?;

        info!(book_id = id, member_id = %member, "book returned");
        Ok(format!("Success: '{title}' returned from {member}."))
    }

    pub fn remove_book(&mut self, id: &str) -> Result<String, LibraryError> {
        let Some(book) = self.books.get(id) else {
            return reject("remove_book", LibraryError::BookNotFound);
        };
        if book.status == BookStatus::Borrowed {
            return reject("remove_book", LibraryError::RemoveBorrowed);
        }

        let Some((index, _, book)) = self.books.shift_remove_full(id) else {
            return reject("remove_book", LibraryError::BookNotFound);
        };
        let title = book.title.clone();
        self.record(format!("Removed book '{title}'"));
        self.commit_books(move |library| {
            library.books.shift_insert(index, book.book_id.clone(), book);
        })?;

        info!(book_id = id, "book removed");
        Ok(format!("Success: '{title}' removed."))
    }

    /// Register a member. The members file is the record of truth here; the
    /// history line is flushed to the books file right after, and a failure on
    /// that second write only costs the audit line on disk.
    pub fn add_member(&mut self, id: &str, name: &str, email: &str) -> Result<String, LibraryError> {
        if id.is_empty() || name.is_empty() {
            return reject("add_member", LibraryError::MissingMemberFields);
        }
        if self.members.contains_key(id) {
            return reject("add_member", LibraryError::DuplicateMember);
        }

        self.members.insert(id.to_string(), Member::new(id, name, email));
        if let Err(err) = self.save_members() {
            self.members.shift_remove(id);
            error!(member_id = id, error = %err, "failed to persist new member");
            return Err(err);
        }

        self.record(format!("Added member '{name}'"));
        if let Err(err) = self.save_books() {
            warn!(member_id = id, error = %err, "member saved but history was not flushed");
        }

        info!(member_id = id, "member added");
        Ok(format!("Success: '{name}' added."))
    }

    pub fn inventory_report(&self) -> String {
        inventory_report(self.books.values())
    }

    pub fn members_report(&self) -> String {
        members_report(self.members.values())
    }

    pub fn history_report(&self) -> String {
        history_report(&self.history, self.history_limit)
    }

    /// Write every book, member and history line to `path` as CSV.
    pub fn export_csv(&self, path: &Path) -> Result<String, LibraryError> {
        write_csv(path, self.books.values(), self.members.values(), &self.history)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!(path = %path.display(), "library exported");
        Ok(format!("Exported to {name}"))
    }

    pub fn book(&self, id: &str) -> Option<&Book> {
        self.books.get(id)
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    fn record(&mut self, message: String) {
        self.history.push(HistoryEntry::now(message));
    }

    /// Flush the books file after a mutation. On failure the newest history
    /// entry is dropped and `undo` restores the previous record state, so the
    /// in-memory view never runs ahead of what is on disk.
    fn commit_books(&mut self, undo: impl FnOnce(&mut Self)) -> Result<(), LibraryError> {
        if let Err(err) = self.save_books() {
            self.history.pop();
            undo(self);
            error!(error = %err, "failed to persist books");
            return Err(err);
        }
        Ok(())
    }

    fn save_books(&self) -> Result<(), LibraryError> {
        let books: Vec<&Book> = self.books.values().collect();
        self.persistence.save_books(&books, &self.history)
    }

    fn save_members(&self) -> Result<(), LibraryError> {
        let members: Vec<&Member> = self.members.values().collect();
        self.persistence.save_members(&members)
    }
}

fn reject<T>(operation: &str, err: LibraryError) -> Result<T, LibraryError> {
    warn!(operation, reason = %err, "operation rejected");
    Err(err)
}

/// Titles and authors may only hold letters and whitespace. An empty string
/// passes, which keeps the author optional. Letter-numbers such as Roman
/// numeral `Ⅷ` are alphabetic in Unicode but are not letters, so they fail.
fn is_letters_and_spaces(value: &str) -> bool {
    value
        .chars()
        .all(|c| (c.is_alphabetic() && !c.is_numeric()) || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::persistence::{JsonFiles, MemoryPersistence};
    use tempfile::TempDir;

    fn library() -> Library<MemoryPersistence> {
        Library::open(MemoryPersistence::new()).unwrap()
    }

    #[test]
    fn empty_store_is_seeded_and_persisted() {
        let library = library();
        assert_eq!(library.book("B101").unwrap().title, "The Alchemist");
        assert_eq!(library.member("M001").unwrap().email, "john@example.com");
        assert!(library.persistence().books_json().unwrap().contains("B101"));
        assert!(library.persistence().members_json().unwrap().contains("M001"));
        assert!(library.history().is_empty());
    }

    #[test]
    fn borrow_cycle_walkthrough() {
        let mut library = library();
        assert_eq!(
            library.add_book("B1", "Dune", "Frank Herbert").unwrap(),
            "Success: 'Dune' added."
        );
        assert_eq!(
            library.borrow_book("B1", "M1").unwrap(),
            "Success: 'Dune' borrowed by M1."
        );
        let book = library.book("B1").unwrap();
        assert_eq!(book.status, BookStatus::Borrowed);
        assert_eq!(book.borrowed_by.as_deref(), Some("M1"));

        assert_eq!(
            library.remove_book("B1").unwrap_err().report(),
            "Error: Cannot remove a borrowed book."
        );
        assert_eq!(
            library.return_book("B1").unwrap(),
            "Success: 'Dune' returned from M1."
        );
        assert_eq!(library.remove_book("B1").unwrap(), "Success: 'Dune' removed.");
        assert!(library.book("B1").is_none());
        assert_eq!(library.history().len(), 4);
    }

    #[test]
    fn add_book_rejects_non_letters() {
        let mut library = library();
        assert!(matches!(
            library.add_book("B2", "Catch 22", "Joseph Heller"),
            Err(LibraryError::InvalidTitle)
        ));
        assert!(matches!(
            library.add_book("B2", "Emma", "J. Austen"),
            Err(LibraryError::InvalidAuthor)
        ));
        assert!(library.book("B2").is_none());
        assert!(library.history().is_empty());
    }

    #[test]
    fn add_book_accepts_accented_letters_and_blank_author() {
        let mut library = library();
        assert!(library.add_book("B3", "Cien años de soledad", "").is_ok());
        assert!(library.add_book("B4", "Les Misérables", "Victor Hugo").is_ok());
    }

    #[test]
    fn letter_numbers_are_not_letters() {
        let mut library = library();
        assert!(matches!(
            library.add_book("B5", "Part Ⅷ", "Anon"),
            Err(LibraryError::InvalidTitle)
        ));
        assert!(matches!(
            library.add_book("B5", "Henry", "Ⅷ"),
            Err(LibraryError::InvalidAuthor)
        ));
        assert!(library.book("B5").is_none());
    }

    #[test]
    fn records_keep_insertion_order() {
        let mut library = library();
        library.add_book("Z9", "Zorba", "Nikos Kazantzakis").unwrap();
        library.add_book("A1", "Amok", "Stefan Zweig").unwrap();
        library.add_member("A0", "Ada", "ada@example.com").unwrap();

        let ids: Vec<&str> = library.books().map(|book| book.book_id.as_str()).collect();
        assert_eq!(ids, ["B101", "Z9", "A1"]);
        let report = library.inventory_report();
        let lines: Vec<&str> = report.lines().skip(1).collect();
        assert!(lines[0].starts_with("[B101]"));
        assert!(lines[1].starts_with("[Z9]"));
        assert!(lines[2].starts_with("[A1]"));

        let saved: serde_json::Value =
            serde_json::from_str(&library.persistence().books_json().unwrap()).unwrap();
        let saved_ids: Vec<&str> = saved["books"]
            .as_array()
            .unwrap()
            .iter()
            .map(|book| book["book_id"].as_str().unwrap())
            .collect();
        assert_eq!(saved_ids, ["B101", "Z9", "A1"]);

        let members: Vec<&str> = library
            .members()
            .map(|member| member.member_id.as_str())
            .collect();
        assert_eq!(members, ["M001", "A0"]);
    }

    #[test]
    fn removal_rollback_restores_position() {
        let mut library = library();
        library.add_book("Z9", "Zorba", "Nikos Kazantzakis").unwrap();
        library.persistence().set_fail_writes(true);
        assert!(library.remove_book("B101").is_err());
        let ids: Vec<&str> = library.books().map(|book| book.book_id.as_str()).collect();
        assert_eq!(ids, ["B101", "Z9"]);

        library.persistence().set_fail_writes(false);
        library.remove_book("B101").unwrap();
        let ids: Vec<&str> = library.books().map(|book| book.book_id.as_str()).collect();
        assert_eq!(ids, ["Z9"]);
    }

    #[test]
    fn add_book_requires_id_and_title() {
        let mut library = library();
        assert!(matches!(
            library.add_book("", "Dune", "Frank Herbert"),
            Err(LibraryError::MissingBookFields)
        ));
        assert!(matches!(
            library.add_book("B1", "", "Frank Herbert"),
            Err(LibraryError::MissingBookFields)
        ));
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let mut library = library();
        assert!(matches!(
            library.add_book("B101", "Dune", "Frank Herbert"),
            Err(LibraryError::DuplicateBook)
        ));
        assert!(matches!(
            library.add_member("M001", "Jane", "jane@example.com"),
            Err(LibraryError::DuplicateMember)
        ));
    }

    #[test]
    fn borrowing_twice_fails() {
        let mut library = library();
        library.borrow_book("B101", "M001").unwrap();
        assert_eq!(
            library.borrow_book("B101", "M002").unwrap_err().report(),
            "Error: Book is currently borrowed."
        );
        assert_eq!(
            library.book("B101").unwrap().borrowed_by.as_deref(),
            Some("M001")
        );
    }

    #[test]
    fn borrow_checks_book_before_member() {
        let mut library = library();
        assert!(matches!(
            library.borrow_book("nope", ""),
            Err(LibraryError::BookNotFound)
        ));
        assert!(matches!(
            library.borrow_book("B101", ""),
            Err(LibraryError::MissingMemberId)
        ));
    }

    #[test]
    fn unregistered_borrower_is_accepted() {
        let mut library = library();
        assert!(library.borrow_book("B101", "GHOST").is_ok());
        assert!(library.member("GHOST").is_none());
    }

    #[test]
    fn returning_available_book_fails() {
        let mut library = library();
        assert!(matches!(
            library.return_book("B101"),
            Err(LibraryError::NotBorrowed)
        ));
        assert!(matches!(
            library.return_book("missing"),
            Err(LibraryError::BookNotFound)
        ));
    }

    #[test]
    fn add_member_requires_id_and_name_but_not_email_format() {
        let mut library = library();
        assert!(matches!(
            library.add_member("M2", "", "x"),
            Err(LibraryError::MissingMemberFields)
        ));
        assert_eq!(
            library.add_member("M2", "Ada Lovelace", "not an email").unwrap(),
            "Success: 'Ada Lovelace' added."
        );
        assert!(library
            .persistence()
            .members_json()
            .unwrap()
            .contains("Ada Lovelace"));
        assert!(library
            .persistence()
            .books_json()
            .unwrap()
            .contains("Added member 'Ada Lovelace'"));
    }

    #[test]
    fn failed_write_rolls_back_memory() {
        let mut library = library();
        library.persistence().set_fail_writes(true);

        let err = library.add_book("B1", "Dune", "Frank Herbert").unwrap_err();
        assert!(err.report().starts_with("Exception: "));
        assert!(library.book("B1").is_none());

        assert!(library.borrow_book("B101", "M001").is_err());
        assert!(library.book("B101").unwrap().is_available());

        assert!(library.remove_book("B101").is_err());
        assert!(library.book("B101").is_some());

        assert!(library.add_member("M9", "Ada", "ada@example.com").is_err());
        assert!(library.member("M9").is_none());
        assert!(library.history().is_empty());
    }

    #[test]
    fn failed_return_keeps_borrower() {
        let mut library = library();
        library.borrow_book("B101", "M001").unwrap();
        library.persistence().set_fail_writes(true);
        assert!(library.return_book("B101").is_err());
        let book = library.book("B101").unwrap();
        assert_eq!(book.status, BookStatus::Borrowed);
        assert_eq!(book.borrowed_by.as_deref(), Some("M001"));
        assert_eq!(library.history().len(), 1);
    }

    #[test]
    fn state_survives_reopen_from_json_files() {
        let dir = TempDir::new().unwrap();
        let files = || {
            JsonFiles::new(
                dir.path().join("library_data.json"),
                dir.path().join("members_data.json"),
            )
        };

        {
            let mut library = Library::open(files()).unwrap();
            library.add_book("B1", "Dune", "Frank Herbert").unwrap();
            library.borrow_book("B1", "M001").unwrap();
            library.add_member("M2", "Ada", "ada@example.com").unwrap();
        }

        let library = Library::open(files()).unwrap();
        assert_eq!(library.books().count(), 2);
        assert_eq!(
            library.book("B1").unwrap().borrowed_by.as_deref(),
            Some("M001")
        );
        assert!(library.member("M2").is_some());
        assert_eq!(library.history().len(), 3);
    }

    #[test]
    fn history_report_shows_latest_entries_only() {
        let mut library = library().with_history_limit(2);
        library.add_book("B1", "Dune", "Frank Herbert").unwrap();
        library.add_book("B2", "Emma", "Jane Austen").unwrap();
        library.add_book("B3", "Ulysses", "James Joyce").unwrap();

        let report = library.history_report();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Added book 'Emma' by Jane Austen"));
        assert!(lines[1].ends_with("Added book 'Ulysses' by James Joyce"));
    }
}
