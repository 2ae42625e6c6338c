//! Note domain model.
//!
//! # Responsibility
//! - Define the opaque `NoteId` key and its generator.
//! - Define the `Note` read model handed out by stores.
//!
//! # Invariants
//! - `NoteId` is compared and hashed as an opaque string; core logic never
//!   inspects its internal structure.
//! - `Note::parents` is derived from every note's child list and never stored
//!   authoritatively.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;
use uuid::Uuid;

const NOTE_ID_PREFIX: char = 'n';
const RANDOM_MASK: u64 = 0x0000_0000_00FF_FFFF;
const TIMESTAMP_MASK: u64 = 0xFFFF_FFFF_FF00_0000;

/// Opaque identifier of one note.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generates a fresh id: `n` followed by 16 uppercase hex digits.
    ///
    /// The high 40 bits hold epoch seconds, the low 24 bits are random so two
    /// ids minted within the same second do not collide.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let random = Uuid::new_v4().as_u64_pair().1;
        let value = ((secs << 24) & TIMESTAMP_MASK) | (random & RANDOM_MASK);
        Self(format!("{NOTE_ID_PREFIX}{value:016X}"))
    }

    /// Wraps an id received from storage or an address string.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self::from_raw(value)
    }
}

/// Read model of one note as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Stable note id.
    pub id: NoteId,
    /// Plain note text.
    pub text: String,
    /// Ordered child ids. Duplicates are legal.
    pub children: Vec<NoteId>,
    /// Every note listing this one as a child at least once.
    pub parents: BTreeSet<NoteId>,
}

#[cfg(test)]
mod tests {
    use super::NoteId;

    #[test]
    fn generated_ids_use_reference_format() {
        let id = NoteId::generate();
        let text = id.as_str();
        assert_eq!(text.len(), 17);
        assert!(text.starts_with('n'));
        assert!(text[1..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn generated_ids_are_distinct() {
        let first = NoteId::generate();
        let second = NoteId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = NoteId::from_raw("n0000000000000001");
        let json = serde_json::to_string(&id).expect("id should serialize");
        assert_eq!(json, "\"n0000000000000001\"");
    }
}
