use super::forms::{Action, LoginForm};

/// Top-level navigation. The main screen is only reachable through a
/// successful login.
pub(crate) enum Screen {
    Login(LoginForm),
    Main(MainScreen),
}

/// Menu selection and output panel state for the main screen.
pub(crate) struct MainScreen {
    pub(crate) selected: usize,
    pub(crate) output: String,
    pub(crate) scroll: u16,
}

impl MainScreen {
    pub(crate) fn new(output: String) -> Self {
        Self {
            selected: 0,
            output,
            scroll: 0,
        }
    }

    pub(crate) fn current_action(&self) -> Action {
        Action::ALL[self.selected.min(Action::ALL.len() - 1)]
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        let len = Action::ALL.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn select(&mut self, action: Action) {
        if let Some(idx) = Action::ALL.iter().position(|candidate| *candidate == action) {
            self.selected = idx;
        }
    }

    /// Replace the output panel text and scroll back to the top.
    pub(crate) fn show(&mut self, text: impl Into<String>) {
        self.output = text.into();
        self.scroll = 0;
    }

    pub(crate) fn scroll_output(&mut self, delta: i32) {
        let max = self.output.lines().count().saturating_sub(1) as i32;
        let next = (self.scroll as i32 + delta).clamp(0, max.max(0));
        self.scroll = next as u16;
    }
}
