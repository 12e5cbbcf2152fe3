use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identifier::Identifier;

/// Natural key of a mapping: a content slug scoped by its type.
///
/// Both parts are required and non-empty. Values are kept verbatim, so
/// `"Naruto"` and `"naruto"` are distinct keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappingKey {
    slug: String,
    kind: String,
}

impl MappingKey {
    /// Build a key, rejecting empty slug or type.
    pub fn new(slug: impl Into<String>, kind: impl Into<String>) -> Result<Self, TypeError> {
        let slug = slug.into();
        let kind = kind.into();
        if slug.is_empty() {
            return Err(TypeError::EmptyField { field: "slug" });
        }
        if kind.is_empty() {
            return Err(TypeError::EmptyField { field: "type" });
        }
        Ok(Self { slug, kind })
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.slug, self.kind)
    }
}

/// A stored mapping between an identifier and its (slug, type) key.
///
/// Records are immutable once written: the identifier always maps to the
/// same key for the lifetime of the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingRecord {
    pub identifier: Identifier,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl MappingRecord {
    /// Create a record for `key` under `identifier`.
    pub fn new(identifier: Identifier, key: MappingKey) -> Self {
        Self {
            identifier,
            slug: key.slug,
            kind: key.kind,
        }
    }

    /// Create a record for `key` under a freshly generated identifier.
    pub fn generate(key: MappingKey) -> Self {
        Self::new(Identifier::generate(), key)
    }

    /// The natural key of this record.
    ///
    /// Records read back from storage were validated when written, so the
    /// key is rebuilt without re-validation.
    pub fn key(&self) -> MappingKey {
        MappingKey {
            slug: self.slug.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Whether this record belongs to `key`.
    pub fn matches(&self, key: &MappingKey) -> bool {
        self.slug == key.slug && self.kind == key.kind
    }
}

impl fmt::Display for MappingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.identifier, self.slug, self.kind)
    }
}
