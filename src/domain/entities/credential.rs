use std::fmt;

use crate::domain::DomainError;

/// Secret token authorizing the document parsing service.
///
/// Loaded once at startup and never printed: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::configuration("credential must not be empty"));
        }
        Ok(Self(token))
    }

    /// Reads `name` through `lookup`, failing when the value is absent or blank.
    pub fn from_lookup<F>(name: &str, lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(name) {
            Some(value) if !value.trim().is_empty() => Ok(Self(value)),
            _ => Err(DomainError::configuration(format!(
                "{name} is not set; add it to the environment or .env file"
            ))),
        }
    }

    pub fn from_env(name: &str) -> Result<Self, DomainError> {
        Self::from_lookup(name, |key| std::env::var(key).ok())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
