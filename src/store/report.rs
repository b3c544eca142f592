//! Plain-text reports shown in the output panel.

use std::fmt::Write;

use crate::models::{Book, HistoryEntry, Member};

pub fn inventory_report<'a>(books: impl IntoIterator<Item = &'a Book>) -> String {
    let mut books = books.into_iter().peekable();
    if books.peek().is_none() {
        return "Library is empty.".to_string();
    }

    let mut report = String::from("--- Library Inventory ---\n");
    for book in books {
        let marker = match &book.borrowed_by {
            Some(member) if !book.is_available() => format!("❌ ({member})"),
            _ => "✅".to_string(),
        };
        let _ = writeln!(
            report,
            "[{}] {} by {}: {}",
            book.book_id, book.title, book.author, marker
        );
    }
    report
}

pub fn members_report<'a>(members: impl IntoIterator<Item = &'a Member>) -> String {
    let mut members = members.into_iter().peekable();
    if members.peek().is_none() {
        return "No members.".to_string();
    }

    let mut report = String::from("--- Members ---\n");
    for member in members {
        let _ = writeln!(
            report,
            "[{}] {} - {}",
            member.member_id, member.name, member.email
        );
    }
    report
}

/// The newest `limit` entries, oldest first.
pub fn history_report(history: &[HistoryEntry], limit: usize) -> String {
    let start = history.len().saturating_sub(limit);
    let shown = &history[start..];
    if shown.is_empty() {
        return "No history.".to_string();
    }
    shown
        .iter()
        .map(HistoryEntry::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}
