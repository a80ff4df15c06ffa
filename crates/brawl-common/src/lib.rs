//! # Brawl Common
//!
//! Shared types for the brawl combat workspace.
//!
//! This crate provides the foundational pieces every other crate leans on:
//! - ID types (FighterId, RosterId)
//! - The workspace-level error type
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fighter_id_generation() {
        let id1 = FighterId::new();
        let id2 = FighterId::new();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
        assert!(!FighterId::NULL.is_valid());
    }

    #[test]
    fn test_roster_id_display() {
        let id = RosterId::new("7");
        assert_eq!(id.to_string(), "7");
        assert_eq!(id.as_str(), "7");
    }
}
