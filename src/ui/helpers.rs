use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Render `[key] label` pairs as a single footer line.
pub(crate) fn key_hints(pairs: &[(&str, &str)]) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut spans = Vec::with_capacity(pairs.len() * 2);
    for (idx, (key, label)) in pairs.iter().enumerate() {
        spans.push(Span::styled(format!("[{key}]"), key_style));
        let sep = if idx + 1 == pairs.len() { "" } else { "   " };
        spans.push(Span::raw(format!(" {label}{sep}")));
    }
    Line::from(spans)
}

/// The innermost cause of `err`, which is the part worth showing a user; the
/// outer layers are the `context` added on the way up.
pub fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::PathBuf;

    use crate::store::LibraryError;

    #[test]
    fn surface_error_reports_root_cause() {
        let result: Result<(), LibraryError> = Err(LibraryError::Corrupt {
            path: PathBuf::from("library_data.json"),
            reason: "book id B1 appears more than once".to_string(),
        });
        let err = result.context("failed to load library data").unwrap_err();
        assert_eq!(
            surface_error(&err),
            "library_data.json is corrupt: book id B1 appears more than once"
        );
        assert_eq!(surface_error(&anyhow::anyhow!("plain")), "plain");
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 40, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert!(popup.x >= area.x && popup.right() <= area.right());
    }

    #[test]
    fn key_hints_join_pairs() {
        let line = key_hints(&[("Enter", "Save"), ("Esc", "Cancel")]);
        let text: String = line.spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(text, "[Enter] Save   [Esc] Cancel");
    }
}
