//! Session identifier type.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Unique identifier for a visitor session.
///
/// Backed by a random (v4) UUID, so identifiers are unpredictable and never
/// reused after a session is removed. Displayed in the canonical hyphenated
/// lowercase form, e.g. `67e55044-10b1-426f-9247-bb680e5fe0c8`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Parse a candidate presented by a client.
    ///
    /// Returns `None` for anything that is not a UUID. The stored form is
    /// always canonical, so `"67E55044-..."` and `"67e55044-..."` map to the
    /// same session.
    pub fn parse(candidate: &str) -> Option<Self> {
        Uuid::parse_str(candidate)
            .ok()
            .map(|uuid| Self(uuid.hyphenated().to_string()))
    }

    /// Borrow the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(|uuid| Self(uuid.hyphenated().to_string()))
    }
}
