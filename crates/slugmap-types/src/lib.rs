//! Foundation types for slugmap.
//!
//! slugmap issues short, stable identifiers for comic series and chapters
//! that are otherwise addressed by long text slugs. Every other slugmap crate
//! depends on `slugmap-types`.
//!
//! # Key Types
//!
//! - [`Identifier`]: random 128-bit opaque token, canonical hyphenated hex on the wire
//! - [`MappingKey`]: validated (slug, type) natural key
//! - [`MappingRecord`]: an identifier bound to its key

pub mod error;
pub mod identifier;
pub mod record;

pub use error::TypeError;
pub use identifier::Identifier;
pub use record::{MappingKey, MappingRecord};
