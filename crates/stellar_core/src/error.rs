//! Error types for turn generation.
//!
//! Per-entity problems found while a step runs are never errors: they are
//! logged, messaged to the owning player and skipped. [`GameError`] covers
//! API misuse, loading and saving, and orchestrator preconditions.

use thiserror::Error;

use crate::ids::{DesignId, MapObjectRef, PlayerId};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all turn generation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// A referenced map object does not exist.
    #[error("Map object not found: {0}")]
    EntityNotFound(MapObjectRef),

    /// A referenced ship design does not exist.
    #[error("Ship design not found: {0}")]
    DesignNotFound(DesignId),

    /// A referenced player does not exist.
    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Binary (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Two replays of the same orders produced different universes.
    #[error("Desync detected in year {year}: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Year where the desync occurred.
        year: u32,
        /// Local game hash.
        local_hash: u64,
        /// Remote game hash.
        remote_hash: u64,
    },
}
