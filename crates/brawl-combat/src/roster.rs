//! Character roster: the enemy templates gauntlets and towers draw from.

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use brawl_common::{BrawlError, RosterId};

use crate::fighter::{FighterVariant, SpriteConfig};

/// Errors raised while loading or querying a roster.
#[derive(Debug, Clone, Error)]
pub enum RosterError {
    /// Roster text could not be parsed
    #[error("failed to parse roster: {0}")]
    Parse(String),

    /// No entry with this id
    #[error("unknown roster entry: {0}")]
    Unknown(RosterId),
}

/// Result type for roster operations.
pub type RosterResult<T> = Result<T, RosterError>;

impl From<RosterError> for BrawlError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::Parse(reason) => Self::Serialization(reason),
            RosterError::Unknown(id) => Self::UnknownRoster(id),
        }
    }
}

/// One selectable character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Stable id
    pub id: RosterId,
    /// Display name
    pub name: String,
    /// Body used when spawned
    #[serde(default)]
    pub variant: FighterVariant,
}

impl RosterEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(id: impl Into<RosterId>, name: impl Into<String>, variant: FighterVariant) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            variant,
        }
    }

    /// Entry used when a roster would otherwise be empty.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new("2", "Shadow Ninja", FighterVariant::Classic)
    }

    /// Whether this entry uses a sprite body.
    #[must_use]
    pub const fn is_sprite(&self) -> bool {
        matches!(self.variant, FighterVariant::Sprite(_))
    }
}

const BUILT_IN: [(&str, &str, bool); 15] = [
    ("1", "Street Brawler", false),
    ("2", "Shadow Ninja", false),
    ("3", "Iron Monk", true),
    ("4", "Crimson Blade", true),
    ("5", "Storm Dancer", true),
    ("6", "Bone Breaker", true),
    ("7", "Jade Viper", true),
    ("8", "Night Warden", true),
    ("9", "Ember Fist", true),
    ("10", "Frost Reaper", true),
    ("11", "Thunder Ox", true),
    ("12", "Silent Hawk", true),
    ("13", "Rust Golem", true),
    ("14", "Neon Ronin", true),
    ("15", "Void Walker", true),
];

/// Ordered list of characters with unique ids. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<RosterEntry>", into = "Vec<RosterEntry>")]
pub struct Roster {
    entries: Vec<RosterEntry>,
    fallback: RosterEntry,
}

impl From<Vec<RosterEntry>> for Roster {
    fn from(entries: Vec<RosterEntry>) -> Self {
        Self::new(entries)
    }
}

impl From<Roster> for Vec<RosterEntry> {
    fn from(roster: Roster) -> Self {
        roster.entries
    }
}

impl Default for Roster {
    fn default() -> Self {
        let entries: Vec<RosterEntry> = BUILT_IN
            .iter()
            .map(|&(id, name, sprite)| {
                let variant = if sprite {
                    FighterVariant::Sprite(SpriteConfig::default())
                } else {
                    FighterVariant::Classic
                };
                RosterEntry::new(id, name, variant)
            })
            .collect();
        Self::new(entries)
    }
}

impl Roster {
    /// Creates a roster; an empty list becomes the single fallback entry.
    ///
    /// Later entries reusing an id are dropped. Unknown ids resolve to the
    /// entry with the fallback id when present, otherwise to the first entry.
    #[must_use]
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        let mut unique: Vec<RosterEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if unique.iter().any(|e| e.id == entry.id) {
                warn!(id = %entry.id, "Duplicate roster id, keeping the first entry");
                continue;
            }
            unique.push(entry);
        }
        if unique.is_empty() {
            warn!("Empty roster, using fallback entry");
            unique.push(RosterEntry::fallback());
        }

        let fallback_id = RosterEntry::fallback().id;
        let fallback = unique
            .iter()
            .find(|e| e.id == fallback_id)
            .or_else(|| unique.first())
            .cloned()
            .unwrap_or_else(RosterEntry::fallback);
        Self {
            entries: unique,
            fallback,
        }
    }

    /// Loads a roster from a RON list of entries.
    pub fn from_ron(text: &str) -> RosterResult<Self> {
        let entries: Vec<RosterEntry> = ron::from_str(text).map_err(|e| RosterError::Parse(e.to_string()))?;
        Ok(Self::new(entries))
    }

    /// Sprite entries only, as gauntlet enemies; falls back when none exist.
    #[must_use]
    pub fn sprite_only(&self) -> Self {
        Self::new(self.entries.iter().filter(|e| e.is_sprite()).cloned().collect())
    }

    /// Entry by id.
    pub fn get(&self, id: &RosterId) -> RosterResult<&RosterEntry> {
        self.entries
            .iter()
            .find(|e| &e.id == id)
            .ok_or_else(|| RosterError::Unknown(id.clone()))
    }

    /// Entry by id, or the fallback entry when unknown.
    #[must_use]
    pub fn get_or_fallback(&self, id: &RosterId) -> &RosterEntry {
        match self.get(id) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, fallback = %self.fallback.id, "Using fallback roster entry");
                &self.fallback
            }
        }
    }

    /// Entry that unknown ids resolve to.
    #[must_use]
    pub fn fallback(&self) -> &RosterEntry {
        &self.fallback
    }

    /// Uniform random pick that never repeats `last` when there is a choice.
    #[must_use]
    pub fn pick_random(&self, rng: &mut Rng, last: Option<&RosterId>) -> &RosterEntry {
        let mut pool: Vec<&RosterEntry> = match last {
            Some(last) => self.entries.iter().filter(|e| &e.id != last).collect(),
            None => self.entries.iter().collect(),
        };
        // A single-entry roster has nothing else to offer.
        if pool.is_empty() {
            pool = self.entries.iter().collect();
        }
        let pick = pool.get(rng.usize(0..pool.len().max(1))).copied().unwrap_or(&self.fallback);
        debug!(id = %pick.id, name = %pick.name, "Picked roster entry");
        pick
    }

    /// All entries.
    #[must_use]
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_roster() {
        let roster = Roster::default();
        assert_eq!(roster.len(), 15);
        assert_eq!(roster.sprite_only().len(), 13);
        assert_eq!(roster.get(&RosterId::new("2")).map(|e| e.name.as_str()).ok(), Some("Shadow Ninja"));
    }

    #[test]
    fn test_empty_roster_falls_back() {
        let roster = Roster::new(Vec::new());
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.entries()[0], RosterEntry::fallback());

        let classic_only = Roster::new(vec![RosterEntry::new("1", "Brawler", FighterVariant::Classic)]);
        assert_eq!(classic_only.sprite_only().entries()[0].name, "Shadow Ninja");
    }

    #[test]
    fn test_unknown_id() {
        let roster = Roster::default();
        let missing = RosterId::new("99");
        assert!(matches!(roster.get(&missing), Err(RosterError::Unknown(_))));
        assert_eq!(roster.get_or_fallback(&missing).id, RosterId::new("2"));

        let custom = Roster::new(vec![
            RosterEntry::new("a", "Alpha", FighterVariant::Classic),
            RosterEntry::new("b", "Beta", FighterVariant::Classic),
        ]);
        assert_eq!(custom.get_or_fallback(&missing).id, RosterId::new("a"));

        let err: BrawlError = RosterError::Unknown(missing).into();
        assert!(matches!(err, BrawlError::UnknownRoster(_)));
    }

    #[test]
    fn test_from_ron() {
        let text = r#"[
            (id: "a", name: "Alpha"),
            (id: "b", name: "Beta", variant: Sprite((scale: 2.0))),
        ]"#;
        let roster = Roster::from_ron(text).expect("valid roster");
        assert_eq!(roster.len(), 2);
        assert!(!roster.entries()[0].is_sprite());
        assert!(roster.entries()[1].is_sprite());

        assert!(Roster::from_ron("[(id: 3)]").is_err());
    }

    #[test]
    fn test_duplicate_ids_are_dropped() {
        let text = r#"[
            (id: "a", name: "Alpha"),
            (id: "a", name: "Impostor"),
        ]"#;
        let roster = Roster::from_ron(text).expect("valid roster");
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.entries()[0].name, "Alpha");

        let mut rng = Rng::with_seed(1);
        let last = RosterId::new("a");
        assert_eq!(roster.pick_random(&mut rng, Some(&last)).name, "Alpha");
    }

    #[test]
    fn test_deserialize_goes_through_new() {
        let empty: Roster = ron::from_str("[]").expect("empty list parses");
        assert_eq!(empty.entries(), &[RosterEntry::fallback()]);
        assert_eq!(empty.get_or_fallback(&RosterId::new("x")).name, "Shadow Ninja");

        let mut rng = Rng::with_seed(3);
        assert_eq!(empty.pick_random(&mut rng, None).id, RosterId::new("2"));

        let roster = Roster::new(vec![
            RosterEntry::new("1", "Street Brawler", FighterVariant::Classic),
            RosterEntry::new("2", "Shadow Ninja", FighterVariant::Classic),
        ]);
        let text = ron::to_string(&roster).expect("roster to ron");
        let back: Roster = ron::from_str(&text).expect("roster from ron");
        assert_eq!(back, roster);
        assert_eq!(back.fallback().name, "Shadow Ninja");
    }

    #[test]
    fn test_no_immediate_repeat() {
        let roster = Roster::new(vec![
            RosterEntry::new("a", "Alpha", FighterVariant::Classic),
            RosterEntry::new("b", "Beta", FighterVariant::Classic),
        ]);
        let mut rng = Rng::with_seed(5);
        let mut last: Option<RosterId> = None;
        for _ in 0..100 {
            let pick = roster.pick_random(&mut rng, last.as_ref()).id.clone();
            assert_ne!(Some(&pick), last.as_ref());
            last = Some(pick);
        }
    }

    #[test]
    fn test_single_entry_may_repeat() {
        let roster = Roster::new(vec![RosterEntry::new("solo", "Solo", FighterVariant::Classic)]);
        let mut rng = Rng::with_seed(1);
        let last = RosterId::new("solo");
        assert_eq!(roster.pick_random(&mut rng, Some(&last)).id, last);
    }

    proptest! {
        #[test]
        fn prop_picks_never_repeat(seed in any::<u64>(), size in 2usize..16) {
            let entries = (0..size)
                .map(|i| RosterEntry::new(i.to_string().as_str(), format!("Fighter {i}"), FighterVariant::Classic))
                .collect();
            let roster = Roster::new(entries);
            let mut rng = Rng::with_seed(seed);
            let mut last: Option<RosterId> = None;
            for _ in 0..100 {
                let pick = roster.pick_random(&mut rng, last.as_ref()).id.clone();
                prop_assert_ne!(Some(&pick), last.as_ref());
                last = Some(pick);
            }
        }
    }
}
