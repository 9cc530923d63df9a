//! # Entity Identifiers
//!
//! Every catalog row - predicate or rule - carries an internal integer id and
//! an externally-visible 128-bit time-ordered identifier: a v7 UUID whose
//! first 48 bits are big-endian milliseconds since the Unix epoch, with
//! version nibble 7 and variant bits `10`. The SQL function
//! `new_entity_id()` mints these as the default for `_entity.external_id`.

use std::fmt;

use uuid::Uuid;

use crate::error::{Error, Result};

/// Externally-visible identity of an entity (v7 UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Mint a fresh time-ordered id
    pub fn generate() -> Self {
        EntityId(Uuid::now_v7())
    }

    /// The raw 16 bytes, as stored in `_entity.external_id`
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Rebuild from stored bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        EntityId(Uuid::from_bytes(bytes))
    }

    /// Parse the canonical hyphenated form or the 32-hex-digit unhyphenated
    /// form. Anything else - wrong length, non-hex, misplaced hyphens - is
    /// rejected.
    pub fn parse(text: &str) -> Result<Self> {
        match text.len() {
            32 | 36 => Uuid::try_parse(text)
                .map(EntityId)
                .map_err(|_| Error::MalformedEntityId(text.to_string())),
            _ => Err(Error::MalformedEntityId(text.to_string())),
        }
    }

    /// The millisecond Unix timestamp packed into the first 48 bits
    pub fn timestamp_ms(&self) -> u64 {
        let bytes = self.0.as_bytes();
        let mut ms = 0u64;
        for byte in &bytes[..6] {
            ms = (ms << 8) | u64::from(*byte);
        }
        ms
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
