use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::LibraryError;
use crate::models::{Book, HistoryEntry, Member};

/// Everything read back from storage at startup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub books: Vec<Book>,
    pub history: Vec<HistoryEntry>,
    pub members: Vec<Member>,
}

/// Shape of the books file. History rides along with the books because the
/// audit log was always stored there.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BooksFile {
    #[serde(default)]
    books: Vec<Book>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[derive(Serialize)]
struct BooksFileRef<'a> {
    books: &'a [&'a Book],
    history: &'a [HistoryEntry],
}

/// Storage backend for the library. Every save rewrites the whole file for its
/// half of the state; there is no incremental persistence.
pub trait Persistence {
    fn load(&self) -> Result<Snapshot, LibraryError>;
    fn save_books(&self, books: &[&Book], history: &[HistoryEntry]) -> Result<(), LibraryError>;
    fn save_members(&self, members: &[&Member]) -> Result<(), LibraryError>;
}

/// The two pretty-printed JSON files kept in the data directory.
#[derive(Debug, Clone)]
pub struct JsonFiles {
    books_path: PathBuf,
    members_path: PathBuf,
}

impl JsonFiles {
    pub fn new(books_path: impl Into<PathBuf>, members_path: impl Into<PathBuf>) -> Self {
        Self {
            books_path: books_path.into(),
            members_path: members_path.into(),
        }
    }

    pub fn books_path(&self) -> &Path {
        &self.books_path
    }

    pub fn members_path(&self) -> &Path {
        &self.members_path
    }
}

impl Persistence for JsonFiles {
    fn load(&self) -> Result<Snapshot, LibraryError> {
        let books_file: BooksFile = read_json(&self.books_path)?.unwrap_or_default();
        if let Some(book) = books_file.books.iter().find(|book| !book.is_consistent()) {
            return Err(LibraryError::Corrupt {
                path: self.books_path.clone(),
                reason: format!(
                    "book {} has status {} but borrower {:?}",
                    book.book_id, book.status, book.borrowed_by
                ),
            });
        }
        if let Some(id) = first_duplicate(books_file.books.iter().map(|book| &book.book_id)) {
            return Err(duplicate_id(&self.books_path, "book", id));
        }
        let members: Vec<Member> = read_json(&self.members_path)?.unwrap_or_default();
        if let Some(id) = first_duplicate(members.iter().map(|member| &member.member_id)) {
            return Err(duplicate_id(&self.members_path, "member", id));
        }

        debug!(
            books = books_file.books.len(),
            members = members.len(),
            history = books_file.history.len(),
            "loaded library files"
        );

        Ok(Snapshot {
            books: books_file.books,
            history: books_file.history,
            members,
        })
    }

    fn save_books(&self, books: &[&Book], history: &[HistoryEntry]) -> Result<(), LibraryError> {
        let data = BooksFileRef { books, history };
        write_json(&self.books_path, &data)
    }

    fn save_members(&self, members: &[&Member]) -> Result<(), LibraryError> {
        write_json(&self.members_path, members)
    }
}

/// Read and decode `path`, treating a missing file as "no data yet". A file
/// that exists but cannot be decoded is reported rather than discarded.
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, LibraryError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|err| LibraryError::io(path, err))?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|err| LibraryError::Corrupt {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
}

/// Records are keyed by id once loaded, so a repeated id would silently drop
/// the earlier record on the next save.
fn first_duplicate<'a>(ids: impl IntoIterator<Item = &'a String>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(String::as_str)
        .find(|id| !seen.insert(*id))
}

fn duplicate_id(path: &Path, kind: &str, id: &str) -> LibraryError {
    LibraryError::Corrupt {
        path: path.to_path_buf(),
        reason: format!("{kind} id {id} appears more than once"),
    }
}

/// Encode `value` next to `path` and rename it into place so an interrupted
/// write never leaves a truncated file behind.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), LibraryError> {
    let encoded = serde_json::to_string_pretty(value).map_err(|source| LibraryError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| LibraryError::io(parent, err))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, encoded).map_err(|err| LibraryError::io(&tmp_path, err))?;
    fs::rename(&tmp_path, path).map_err(|err| LibraryError::io(path, err))?;
    Ok(())
}

/// In-process backend holding the encoded files as strings. Handy for tests
/// and for running the store without touching the disk.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    books_json: RefCell<Option<String>>,
    members_json: RefCell<Option<String>>,
    fail_writes: Cell<bool>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn books_json(&self) -> Option<String> {
        self.books_json.borrow().clone()
    }

    pub fn members_json(&self) -> Option<String> {
        self.members_json.borrow().clone()
    }

    fn check_writable(&self, name: &str) -> Result<(), LibraryError> {
        if self.fail_writes.get() {
            Err(LibraryError::io(
                name,
                std::io::Error::other("writes disabled"),
            ))
        } else {
            Ok(())
        }
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<Snapshot, LibraryError> {
        let books_file: BooksFile = match self.books_json.borrow().as_deref() {
            Some(raw) => serde_json::from_str(raw).map_err(|err| LibraryError::Corrupt {
                path: PathBuf::from("memory:books"),
                reason: err.to_string(),
            })?,
            None => BooksFile::default(),
        };
        let members: Vec<Member> = match self.members_json.borrow().as_deref() {
            Some(raw) => serde_json::from_str(raw).map_err(|err| LibraryError::Corrupt {
                path: PathBuf::from("memory:members"),
                reason: err.to_string(),
            })?,
            None => Vec::new(),
        };
        if let Some(id) = first_duplicate(books_file.books.iter().map(|book| &book.book_id)) {
            return Err(duplicate_id(Path::new("memory:books"), "book", id));
        }
        if let Some(id) = first_duplicate(members.iter().map(|member| &member.member_id)) {
            return Err(duplicate_id(Path::new("memory:members"), "member", id));
        }
        Ok(Snapshot {
            books: books_file.books,
            history: books_file.history,
            members,
        })
    }

    fn save_books(&self, books: &[&Book], history: &[HistoryEntry]) -> Result<(), LibraryError> {
        self.check_writable("memory:books")?;
        let data = BooksFileRef { books, history };
        let encoded = serde_json::to_string_pretty(&data).map_err(|source| LibraryError::Json {
            path: PathBuf::from("memory:books"),
            source,
        })?;
        *self.books_json.borrow_mut() = Some(encoded);
        Ok(())
    }

    fn save_members(&self, members: &[&Member]) -> Result<(), LibraryError> {
        self.check_writable("memory:members")?;
        let encoded =
            serde_json::to_string_pretty(members).map_err(|source| LibraryError::Json {
                path: PathBuf::from("memory:members"),
                source,
            })?;
        *self.members_json.borrow_mut() = Some(encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookStatus;
    use tempfile::TempDir;

    fn files(dir: &TempDir) -> JsonFiles {
        JsonFiles::new(
            dir.path().join("library_data.json"),
            dir.path().join("members_data.json"),
        )
    }

    #[test]
    fn missing_files_load_as_empty() {
        let dir = TempDir::new().unwrap();
        let snapshot = files(&dir).load().unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn saved_files_use_documented_layout() {
        let dir = TempDir::new().unwrap();
        let store = files(&dir);
        let book = Book::new("B1", "Dune", "Frank Herbert");
        let history = vec![HistoryEntry::from("t: Added book 'Dune' by Frank Herbert".to_string())];
        store
            .save_books(&[&book], &history)
            .unwrap();
        let member = Member::new("M1", "Ada", "ada@example.com");
        store.save_members(&[&member]).unwrap();

        let books: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.books_path()).unwrap()).unwrap();
        assert_eq!(books["books"][0]["book_id"], "B1");
        assert_eq!(books["books"][0]["status"], "available");
        assert!(books["books"][0]["borrowed_by"].is_null());
        assert_eq!(books["history"][0], "t: Added book 'Dune' by Frank Herbert");

        let members: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.members_path()).unwrap()).unwrap();
        assert_eq!(members[0]["member_id"], "M1");
        assert_eq!(members[0]["email"], "ada@example.com");

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.books, vec![book]);
        assert_eq!(snapshot.members, vec![member]);
        assert_eq!(snapshot.history, history);
        assert!(!dir.path().join("library_data.json.tmp").exists());
    }

    #[test]
    fn unparseable_file_is_reported_not_reset() {
        let dir = TempDir::new().unwrap();
        let store = files(&dir);
        fs::write(store.books_path(), "{ not json").unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, LibraryError::Corrupt { .. }));
        assert_eq!(fs::read_to_string(store.books_path()).unwrap(), "{ not json");
    }

    #[test]
    fn borrowed_book_without_borrower_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = files(&dir);
        let raw = r#"{"books": [{"book_id": "B1", "title": "Dune", "author": "Frank Herbert",
                      "status": "borrowed", "borrowed_by": null}], "history": []}"#;
        fs::write(store.books_path(), raw).unwrap();
        assert!(matches!(store.load(), Err(LibraryError::Corrupt { .. })));
    }

    #[test]
    fn repeated_ids_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = files(&dir);
        let raw = r#"{"books": [
            {"book_id": "B1", "title": "Dune", "author": "Frank Herbert"},
            {"book_id": "B1", "title": "Emma", "author": "Jane Austen"}]}"#;
        fs::write(store.books_path(), raw).unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, LibraryError::Corrupt { .. }));
        assert!(err.to_string().contains("book id B1 appears more than once"));

        fs::remove_file(store.books_path()).unwrap();
        let raw = r#"[{"member_id": "M1", "name": "Ada", "email": "a@x"},
                      {"member_id": "M1", "name": "Bob", "email": "b@x"}]"#;
        fs::write(store.members_path(), raw).unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("member id M1 appears more than once"));
        assert_eq!(fs::read_to_string(store.members_path()).unwrap(), raw);
    }

    #[test]
    fn books_file_without_history_key_loads() {
        let dir = TempDir::new().unwrap();
        let store = files(&dir);
        let raw = r#"{"books": [{"book_id": "B1", "title": "Dune", "author": "Frank Herbert",
                      "status": "borrowed", "borrowed_by": "M1"}]}"#;
        fs::write(store.books_path(), raw).unwrap();
        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.books[0].status, BookStatus::Borrowed);
        assert!(snapshot.history.is_empty());
    }

    #[test]
    fn memory_backend_can_refuse_writes() {
        let memory = MemoryPersistence::new();
        memory.set_fail_writes(true);
        let err = memory.save_members(&[]).unwrap_err();
        assert!(matches!(err, LibraryError::Io { .. }));
        assert!(memory.members_json().is_none());
    }
}
