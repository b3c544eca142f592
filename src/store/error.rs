use std::path::PathBuf;

use thiserror::Error;

use crate::models::BookStatus;

/// Everything a store operation can reject or fail with. Validation variants
/// carry the exact sentence shown to the user; the remaining variants are
/// unexpected faults from the filesystem or the JSON layer.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("ID and Title required.")]
    MissingBookFields,

    #[error("Book ID already exists.")]
    DuplicateBook,

    #[error("Title must contain only letters and spaces.")]
    InvalidTitle,

    #[error("Author must contain only letters and spaces.")]
    InvalidAuthor,

    #[error("Book not found.")]
    BookNotFound,

    #[error("Member ID required.")]
    MissingMemberId,

    #[error("Book is currently {0}.")]
    NotAvailable(BookStatus),

    #[error("This book is not currently borrowed.")]
    NotBorrowed,

    #[error("Cannot remove a borrowed book.")]
    RemoveBorrowed,

    #[error("ID and Name required.")]
    MissingMemberFields,

    #[error("Member ID already exists.")]
    DuplicateMember,

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl LibraryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the operation was refused because of its inputs or the
    /// current record state, as opposed to an I/O or encoding fault.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::Io { .. } | Self::Json { .. } | Self::Corrupt { .. }
        )
    }

    /// Render the error the way the UI shows it: `Error: …` for refusals and
    /// `Exception: …` for faults.
    pub fn report(&self) -> String {
        if self.is_validation() {
            format!("Error: {self}")
        } else {
            format!("Exception: {self}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_use_error_prefix() {
        assert_eq!(
            LibraryError::RemoveBorrowed.report(),
            "Error: Cannot remove a borrowed book."
        );
        assert_eq!(
            LibraryError::NotAvailable(BookStatus::Borrowed).report(),
            "Error: Book is currently borrowed."
        );
    }

    #[test]
    fn faults_use_exception_prefix() {
        let err = LibraryError::io(
            "library_data.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_validation());
        assert_eq!(
            err.report(),
            "Exception: failed to access library_data.json: denied"
        );
    }
}
