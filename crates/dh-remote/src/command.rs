//! Shell command lines with secret masking

use std::fmt;

/// Replacement shown wherever a secret would appear.
pub const MASK: &str = "*****";

/// A shell command line to run on a host.
///
/// Secrets registered with [`RemoteCommand::with_secret`] are part of the
/// command that runs but are replaced by [`MASK`] whenever the command is
/// displayed or logged.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    line: String,
    secrets: Vec<String>,
}

impl RemoteCommand {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            secrets: Vec::new(),
        }
    }

    /// Register a value that must never be shown.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    /// The command exactly as it will be executed.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// The command with every secret masked.
    pub fn masked(&self) -> String {
        self.mask(&self.line)
    }

    /// Mask the secrets of this command in arbitrary text, such as stderr.
    pub fn mask(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), MASK))
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl fmt::Debug for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RemoteCommand").field(&self.masked()).finish()
    }
}

impl From<&str> for RemoteCommand {
    fn from(line: &str) -> Self {
        Self::new(line)
    }
}

impl From<String> for RemoteCommand {
    fn from(line: String) -> Self {
        Self::new(line)
    }
}

/// Quote a value for a POSIX shell using single quotes.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-=:,+@%".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
