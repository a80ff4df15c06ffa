//! Error types for the brawl workspace.

use thiserror::Error;

use crate::ids::RosterId;

/// Top-level error type for brawl operations.
///
/// Gameplay never produces these: rejected actions are plain `false`
/// returns. They only surface at the edges, when configuration and
/// roster data come in from outside the simulation.
#[derive(Debug, Error)]
pub enum BrawlError {
    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Roster lookup failed
    #[error("Unknown roster entry: {0}")]
    UnknownRoster(RosterId),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for brawl operations.
pub type BrawlResult<T> = Result<T, BrawlError>;
