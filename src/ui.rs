//! Ratatui front-end: a login gate followed by the main screen, where every
//! store operation is one menu action.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use helpers::surface_error;
pub use terminal::run_app;
