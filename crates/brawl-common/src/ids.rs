//! ID types for fighters and roster entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for fighter IDs.
static FIGHTER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a fighter instance within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FighterId(u64);

impl FighterId {
    /// Creates a new unique fighter ID.
    #[must_use]
    pub fn new() -> Self {
        Self(FIGHTER_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a fighter ID from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid fighter ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) fighter ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for FighterId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a character template in a roster.
///
/// Roster ids come from data files, so they are strings rather than
/// generated numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterId(String);

impl RosterId {
    /// Creates a roster ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RosterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RosterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roster_id_serializes_as_plain_string() {
        let id = RosterId::new("12");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"12\"");
    }

    proptest! {
        #[test]
        fn prop_fighter_ids_are_unique(count in 1usize..64) {
            let ids: Vec<FighterId> = (0..count).map(|_| FighterId::new()).collect();
            for (i, a) in ids.iter().enumerate() {
                for b in &ids[i + 1..] {
                    prop_assert_ne!(a, b);
                }
            }
        }
    }
}
