use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

/// Everything the main menu can do. Actions with input fields open a modal
/// form; the rest run immediately.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    AddBook,
    BorrowBook,
    ReturnBook,
    RemoveBook,
    AddMember,
    ShowBooks,
    ShowMembers,
    ShowHistory,
    ExportCsv,
    Logout,
}

impl Action {
    /// Menu order.
    pub(crate) const ALL: [Action; 10] = [
        Action::AddBook,
        Action::BorrowBook,
        Action::ReturnBook,
        Action::RemoveBook,
        Action::AddMember,
        Action::ShowBooks,
        Action::ShowMembers,
        Action::ShowHistory,
        Action::ExportCsv,
        Action::Logout,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Action::AddBook => "Add Book",
            Action::BorrowBook => "Borrow Book",
            Action::ReturnBook => "Return Book",
            Action::RemoveBook => "Remove Book",
            Action::AddMember => "Add Member",
            Action::ShowBooks => "Show Books",
            Action::ShowMembers => "Show Members",
            Action::ShowHistory => "Show History",
            Action::ExportCsv => "Export CSV",
            Action::Logout => "Logout",
        }
    }

    pub(crate) fn shortcut(self) -> char {
        match self {
            Action::AddBook => 'a',
            Action::BorrowBook => 'b',
            Action::ReturnBook => 'r',
            Action::RemoveBook => 'd',
            Action::AddMember => 'm',
            Action::ShowBooks => 'i',
            Action::ShowMembers => 'l',
            Action::ShowHistory => 'h',
            Action::ExportCsv => 'x',
            Action::Logout => 'o',
        }
    }

    pub(crate) fn from_shortcut(ch: char) -> Option<Action> {
        let ch = ch.to_ascii_lowercase();
        Action::ALL.into_iter().find(|action| action.shortcut() == ch)
    }

    /// Field labels shown in the action's form, in submission order.
    pub(crate) fn fields(self) -> &'static [&'static str] {
        match self {
            Action::AddBook => &["Book ID", "Title", "Author"],
            Action::BorrowBook => &["Book ID", "Member ID"],
            Action::ReturnBook | Action::RemoveBook => &["Book ID"],
            Action::AddMember => &["Member ID", "Name", "Email"],
            Action::ShowBooks
            | Action::ShowMembers
            | Action::ShowHistory
            | Action::ExportCsv
            | Action::Logout => &[],
        }
    }
}

/// A text input with its label.
#[derive(Clone, Debug)]
pub(crate) struct FormField {
    pub(crate) label: &'static str,
    pub(crate) value: String,
}

/// Modal form backing one of the input-taking actions.
#[derive(Clone, Debug)]
pub(crate) struct ActionForm {
    pub(crate) action: Action,
    pub(crate) fields: Vec<FormField>,
    pub(crate) active: usize,
}

impl ActionForm {
    /// Build an empty form for `action`, or `None` if it takes no input.
    pub(crate) fn for_action(action: Action) -> Option<Self> {
        let labels = action.fields();
        if labels.is_empty() {
            return None;
        }
        Some(Self {
            action,
            fields: labels
                .iter()
                .copied()
                .map(|label| FormField {
                    label,
                    value: String::new(),
                })
                .collect(),
            active: 0,
        })
    }

    pub(crate) fn next_field(&mut self) {
        self.active = (self.active + 1) % self.fields.len();
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = (self.active + self.fields.len() - 1) % self.fields.len();
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        if let Some(field) = self.fields.get_mut(self.active) {
            field.value.push(ch);
            true
        } else {
            false
        }
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.active) {
            field.value.pop();
        }
    }

    /// Field values with surrounding whitespace removed, ready for the store.
    pub(crate) fn trimmed_values(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.value.trim().to_string())
            .collect()
    }

    pub(crate) fn build_line(&self, index: usize) -> Line<'static> {
        let Some(field) = self.fields.get(index) else {
            return Line::from("");
        };
        input_line(field.label, &field.value, index == self.active, false)
    }

    /// Cursor column offset for the active field, relative to the form body.
    pub(crate) fn cursor_offset(&self) -> (u16, u16) {
        let field = &self.fields[self.active];
        let prefix = field.label.chars().count() + 2;
        (
            (prefix + field.value.chars().count()) as u16,
            self.active as u16,
        )
    }
}

/// Fields available on the login screen.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Default, Clone, Debug)]
pub(crate) struct LoginForm {
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) active: LoginField,
    pub(crate) error: Option<String>,
}

impl LoginForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            LoginField::Username => self.username.push(ch),
            LoginField::Password => self.password.push(ch),
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            LoginField::Username => {
                self.username.pop();
            }
            LoginField::Password => {
                self.password.pop();
            }
        }
    }

    pub(crate) fn build_line(&self, field: LoginField) -> Line<'static> {
        match field {
            LoginField::Username => input_line(
                "Username",
                &self.username,
                self.active == LoginField::Username,
                false,
            ),
            LoginField::Password => input_line(
                "Password",
                &self.password,
                self.active == LoginField::Password,
                true,
            ),
        }
    }

    pub(crate) fn value_len(&self, field: LoginField) -> usize {
        match field {
            LoginField::Username => self.username.chars().count(),
            LoginField::Password => self.password.chars().count(),
        }
    }
}

/// `Label: value` with the active field highlighted and empty fields greyed.
fn input_line(label: &str, value: &str, is_active: bool, masked: bool) -> Line<'static> {
    let display = if value.is_empty() {
        "<empty>".to_string()
    } else if masked {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(display, style),
    ])
}
