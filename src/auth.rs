//! Login gate for the TUI.
//!
//! The check itself is a plain string comparison; the trait exists so the UI
//! does not care where the credentials come from.

use serde::Deserialize;

/// Anything able to accept or refuse a username/password pair.
pub trait Authenticator {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// A single fixed account, usually read from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StaticCredentials {
    pub username: String,
    pub password: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new("admin", "admin")
    }
}

impl Authenticator for StaticCredentials {
    /// Inputs are trimmed before comparing, the same way form fields are.
    fn verify(&self, username: &str, password: &str) -> bool {
        username.trim() == self.username && password.trim() == self.password
    }
}
