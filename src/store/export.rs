//! CSV snapshot of the whole library. Rows are written in the layout
//! spreadsheet users already rely on: one header, then books, members and
//! history lines, with the timestamp column left blank.

use std::fs;
use std::path::Path;

use super::error::LibraryError;
use crate::models::{Book, HistoryEntry, Member};

const HEADER: [&str; 5] = ["Type", "ID", "Title/Author/Name", "Status/Details", "Timestamp"];

pub(crate) fn write_csv<'a>(
    path: &Path,
    books: impl IntoIterator<Item = &'a Book>,
    members: impl IntoIterator<Item = &'a Member>,
    history: &[HistoryEntry],
) -> Result<(), LibraryError> {
    let contents = render_csv(books, members, history);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| LibraryError::io(parent, err))?;
    }
    fs::write(path, contents).map_err(|err| LibraryError::io(path, err))
}

fn render_csv<'a>(
    books: impl IntoIterator<Item = &'a Book>,
    members: impl IntoIterator<Item = &'a Member>,
    history: &[HistoryEntry],
) -> String {
    let mut out = String::new();
    push_row(&mut out, &HEADER);
    for book in books {
        let status = book.status.to_string();
        push_row(
            &mut out,
            &["Book", &book.book_id, &book.display_title(), &status, ""],
        );
    }
    for member in members {
        push_row(
            &mut out,
            &["Member", &member.member_id, &member.name, &member.email, ""],
        );
    }
    for entry in history {
        push_row(&mut out, &["History", "", "", entry.as_str(), ""]);
    }
    out
}

fn push_row(out: &mut String, fields: &[&str]) {
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field));
    }
    out.push_str("\r\n");
}

/// Quote a field when it holds a delimiter, quote or line break, doubling any
/// embedded quotes.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Message shown after an export attempt. Failures carry the `Export error:`
/// prefix rather than the usual `Exception:`.
pub fn export_message(result: Result<String, LibraryError>) -> String {
    match result {
        Ok(message) => message,
        Err(err) => format!("Export error: {err}"),
    }
}
