//! Secret handling
//!
//! Provider API keys come from the environment and are held in a
//! [`SecretString`] wrapper so they can never leak through `Debug` or
//! `Display` formatting (and therefore never end up in logs).

use std::fmt;

/// A wrapper for sensitive string data that prevents accidental logging.
///
/// It implements `Debug` and `Display` to always print `[REDACTED]`.
/// To access the actual secret value, use the `unsecure()` method.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new SecretString
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Read a secret from an environment variable.
    ///
    /// Returns `None` when the variable is unset or empty.
    pub fn from_env(var: &str) -> Option<Self> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Some(Self(value)),
            _ => None,
        }
    }

    /// Access the raw underlying string
    pub fn unsecure(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
