use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Opaque, shareable identifier issued for a mapping.
///
/// An `Identifier` is a uniformly random 128-bit value (UUID v4). Its wire
/// form is the canonical 36-character lowercase hyphenated hex text. No
/// information about the slug it maps to can be recovered from it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Length of the canonical text form.
    pub const TEXT_LEN: usize = 36;

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The all-zero identifier. Never issued by [`Identifier::generate`].
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse the canonical hyphenated form.
    ///
    /// Only the 36-character hyphenated layout is accepted; the simple,
    /// braced, and URN layouts that `Uuid` also understands are rejected so
    /// that every identifier has exactly one text form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() != Self::TEXT_LEN {
            return Err(TypeError::InvalidIdentifier(format!(
                "expected {} characters, got {}",
                Self::TEXT_LEN,
                s.len()
            )));
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidIdentifier(e.to_string()))
    }

    /// Short form (first 8 hex characters) for log lines.
    pub fn short(&self) -> String {
        let text = self.to_string();
        text[..8].to_string()
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.0.hyphenated())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Identifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for Identifier {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<Identifier> for Uuid {
    fn from(id: Identifier) -> Self {
        id.0
    }
}
