use serde::{Deserialize, Serialize};
use std::fmt;

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Identity ─────────────────────────────────────────────────────────────

/// Opaque account identifier handed to the engine by the identity provider.
///
/// Only constructible through [`Identity::parse`], so a malformed id is
/// rejected at the boundary and never reaches a membership operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

/// A caller bug: the identity value itself is unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identity {value:?}: {reason}")]
pub struct InvalidIdentity {
    pub value: String,
    pub reason: &'static str,
}

impl Identity {
    /// Validate and wrap a raw identity string.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidIdentity> {
        let value = raw.into();
        if value.trim().is_empty() {
            return Err(InvalidIdentity {
                value,
                reason: "empty",
            });
        }
        if value.trim() != value {
            return Err(InvalidIdentity {
                value,
                reason: "surrounding whitespace",
            });
        }
        if value.chars().any(char::is_control) {
            return Err(InvalidIdentity {
                value,
                reason: "control character",
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = InvalidIdentity;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

impl std::str::FromStr for Identity {
    type Err = InvalidIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Caller ───────────────────────────────────────────────────────────────

/// The acting account, as resolved by an [`crate::IdentityProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: Identity,
    pub display_name: String,
}

impl Caller {
    pub fn new(id: Identity, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}
