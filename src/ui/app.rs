use std::mem;
use std::path::PathBuf;

use crossterm::event::KeyCode;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tracing::{info, warn};

use crate::auth::Authenticator;
use crate::store::{export_message, Library, LibraryError, Persistence};

use super::forms::{Action, ActionForm, LoginField, LoginForm};
use super::helpers::{centered_rect, key_hints};
use super::screens::{MainScreen, Screen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Width of the action menu on the main screen.
const MENU_WIDTH: u16 = 24;
/// Lines moved per PageUp/PageDown in the output panel.
const OUTPUT_PAGE: i32 = 5;
const WELCOME_TEXT: &str = "Choose an action from the menu.";

/// Modal state layered over the current screen.
enum Mode {
    Normal,
    Editing(ActionForm),
    /// Failed operation. The form that produced it, if any, is reopened when
    /// the popup is dismissed so the user can correct the input.
    ErrorPopup {
        message: String,
        form: Option<ActionForm>,
    },
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App<P: Persistence> {
    library: Library<P>,
    authenticator: Box<dyn Authenticator>,
    export_path: PathBuf,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl<P: Persistence> App<P> {
    pub fn new(
        library: Library<P>,
        authenticator: Box<dyn Authenticator>,
        export_path: PathBuf,
    ) -> Self {
        Self {
            library,
            authenticator,
            export_path,
            screen: Screen::Login(LoginForm::default()),
            mode: Mode::Normal,
            status: None,
        }
    }

    /// Route a key press to the active screen or modal. Returns `true` when the
    /// user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::Editing(form) => self.handle_form_key(code, form),
            Mode::ErrorPopup { message, form } => self.handle_popup_key(code, message, form),
        };

        exit
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match self.screen {
            Screen::Login(ref mut form) => {
                let mut attempt: Option<(String, String)> = None;
                match code {
                    KeyCode::Esc => *exit = true,
                    KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                        form.toggle_field()
                    }
                    KeyCode::Backspace => form.backspace(),
                    KeyCode::Enter => {
                        attempt = Some((form.username.clone(), form.password.clone()));
                    }
                    KeyCode::Char(ch) => {
                        if form.push_char(ch) {
                            form.error = None;
                        }
                    }
                    _ => {}
                }

                if let Some((username, password)) = attempt {
                    self.attempt_login(&username, &password);
                }
                Mode::Normal
            }
            Screen::Main(ref mut main) => {
                let mut activate: Option<Action> = None;
                match code {
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => *exit = true,
                    KeyCode::Up => main.move_selection(-1),
                    KeyCode::Down => main.move_selection(1),
                    KeyCode::Home => main.move_selection(-(Action::ALL.len() as isize)),
                    KeyCode::End => main.move_selection(Action::ALL.len() as isize),
                    KeyCode::PageUp => main.scroll_output(-OUTPUT_PAGE),
                    KeyCode::PageDown => main.scroll_output(OUTPUT_PAGE),
                    KeyCode::Enter => activate = Some(main.current_action()),
                    KeyCode::Char(ch) => {
                        if let Some(action) = Action::from_shortcut(ch) {
                            main.select(action);
                            activate = Some(action);
                        }
                    }
                    _ => {}
                }

                match activate {
                    Some(action) => self.activate(action),
                    None => Mode::Normal,
                }
            }
        }
    }

    fn attempt_login(&mut self, username: &str, password: &str) {
        if self.authenticator.verify(username, password) {
            info!(username = username.trim(), "login succeeded");
            self.screen = Screen::Main(MainScreen::new(WELCOME_TEXT.to_string()));
            self.set_status("Logged in.", StatusKind::Info);
        } else {
            warn!(username = username.trim(), "login rejected");
            if let Screen::Login(form) = &mut self.screen {
                form.error = Some("Invalid credentials".to_string());
            }
        }
    }

    /// Open the form for input-taking actions, run everything else directly.
    fn activate(&mut self, action: Action) -> Mode {
        if let Some(form) = ActionForm::for_action(action) {
            self.clear_status();
            return Mode::Editing(form);
        }

        match action {
            Action::ShowBooks => {
                let report = self.library.inventory_report();
                self.show_output(report);
            }
            Action::ShowMembers => {
                let report = self.library.members_report();
                self.show_output(report);
            }
            Action::ShowHistory => {
                let report = self.library.history_report();
                self.show_output(report);
            }
            Action::ExportCsv => {
                let result = self.library.export_csv(&self.export_path);
                let failed = result.is_err();
                let message = export_message(result);
                if failed {
                    self.set_status(message.clone(), StatusKind::Error);
                    return Mode::ErrorPopup {
                        message,
                        form: None,
                    };
                }
                self.show_output(message.clone());
                self.set_status(message, StatusKind::Info);
            }
            Action::Logout => {
                info!("logged out");
                self.screen = Screen::Login(LoginForm::default());
                self.set_status("Logged out.", StatusKind::Info);
            }
            Action::AddBook
            | Action::BorrowBook
            | Action::ReturnBook
            | Action::RemoveBook
            | Action::AddMember => {}
        }
        Mode::Normal
    }

    fn handle_form_key(&mut self, code: KeyCode, mut form: ActionForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status(
                    format!("{} cancelled.", form.action.label()),
                    StatusKind::Info,
                );
                Mode::Normal
            }
            KeyCode::Tab | KeyCode::Down => {
                form.next_field();
                Mode::Editing(form)
            }
            KeyCode::BackTab | KeyCode::Up => {
                form.previous_field();
                Mode::Editing(form)
            }
            KeyCode::Backspace => {
                form.backspace();
                Mode::Editing(form)
            }
            KeyCode::Enter => self.submit(form),
            KeyCode::Char(ch) => {
                form.push_char(ch);
                Mode::Editing(form)
            }
            _ => Mode::Editing(form),
        }
    }

    /// Forward trimmed form values to the store. Success closes the form;
    /// failure raises the error popup and keeps the typed values.
    fn submit(&mut self, form: ActionForm) -> Mode {
        let values = form.trimmed_values();
        let value = |idx: usize| values.get(idx).map(String::as_str).unwrap_or_default();

        let result: Result<String, LibraryError> = match form.action {
            Action::AddBook => self.library.add_book(value(0), value(1), value(2)),
            Action::BorrowBook => self.library.borrow_book(value(0), value(1)),
            Action::ReturnBook => self.library.return_book(value(0)),
            Action::RemoveBook => self.library.remove_book(value(0)),
            Action::AddMember => self.library.add_member(value(0), value(1), value(2)),
            Action::ShowBooks
            | Action::ShowMembers
            | Action::ShowHistory
            | Action::ExportCsv
            | Action::Logout => return self.activate(form.action),
        };

        match result {
            Ok(message) => {
                self.show_output(message.clone());
                self.set_status(message, StatusKind::Info);
                Mode::Normal
            }
            Err(err) => {
                let message = err.report();
                self.set_status(message.clone(), StatusKind::Error);
                Mode::ErrorPopup {
                    message,
                    form: Some(form),
                }
            }
        }
    }

    fn handle_popup_key(
        &mut self,
        code: KeyCode,
        message: String,
        form: Option<ActionForm>,
    ) -> Mode {
        match code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => match form {
                Some(form) => Mode::Editing(form),
                None => Mode::Normal,
            },
            _ => Mode::ErrorPopup { message, form },
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Login(form) => self.draw_login(frame, content_area, form),
            Screen::Main(main) => self.draw_main(frame, content_area, main),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::Editing(form) => self.draw_form(frame, area, form),
            Mode::ErrorPopup { message, .. } => self.draw_error_popup(frame, area, message),
            Mode::Normal => {}
        }
    }

    fn draw_login(&self, frame: &mut Frame, area: Rect, form: &LoginForm) {
        let popup_area = centered_rect(50, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Digital Library Login")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line(LoginField::Username),
            form.build_line(LoginField::Password),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to log in • Tab to switch • Esc to quit",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (field, row) = match form.active {
            LoginField::Username => (LoginField::Username, 0),
            LoginField::Password => (LoginField::Password, 1),
        };
        let prefix = "Username: ".len() as u16;
        frame.set_cursor_position((
            inner.x + prefix + form.value_len(field) as u16,
            inner.y + row,
        ));
    }

    fn draw_main(&self, frame: &mut Frame, area: Rect, main: &MainScreen) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(MENU_WIDTH), Constraint::Min(0)])
            .split(area);

        let items: Vec<ListItem> = Action::ALL
            .iter()
            .map(|action| ListItem::new(format!("[{}] {}", action.shortcut(), action.label())))
            .collect();
        let menu = List::new(items)
            .block(Block::default().title("Actions").borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut state = ListState::default();
        state.select(Some(main.selected));
        frame.render_stateful_widget(menu, chunks[0], &mut state);

        let output = Paragraph::new(main.output.as_str())
            .block(Block::default().title("Output").borders(Borders::ALL))
            .wrap(Wrap { trim: false })
            .scroll((main.scroll, 0));
        frame.render_widget(output, chunks[1]);
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, form: &ActionForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(form.action.label())
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = (0..form.fields.len())
            .map(|idx| form.build_line(idx))
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter to submit • Tab to switch • Esc to cancel",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (dx, dy) = form.cursor_offset();
        frame.set_cursor_position((inner.x + dx, inner.y + dy));
    }

    fn draw_error_popup(&self, frame: &mut Frame, area: Rect, message: &str) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Error")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        let lines = vec![
            Line::from(Span::raw(message.to_string())),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to dismiss",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        match (&self.screen, &self.mode) {
            (_, Mode::ErrorPopup { .. }) => key_hints(&[("Enter", "Dismiss")]),
            (_, Mode::Editing(_)) => key_hints(&[
                ("Tab", "Next Field"),
                ("Enter", "Submit"),
                ("Esc", "Cancel"),
            ]),
            (Screen::Login(_), _) => key_hints(&[
                ("Tab", "Switch Field"),
                ("Enter", "Log In"),
                ("Esc", "Quit"),
            ]),
            (Screen::Main(_), _) => key_hints(&[
                ("↑↓", "Navigate"),
                ("Enter", "Run"),
                ("PgUp/PgDn", "Scroll Output"),
                ("q", "Quit"),
            ]),
        }
    }

    fn show_output(&mut self, text: String) {
        if let Screen::Main(main) = &mut self.screen {
            main.show(text);
        }
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}
