//! Error types
//!
//! Nothing here is fatal: asset failures degrade rendering, rejected
//! transitions are no-ops, and bad config falls back to defaults.

use crate::sim::GameMode;

/// Catalog failed to parse or validate
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog is empty")]
    Empty,

    /// Ids must run 1..=N in order
    #[error("catalog item at position {position} has id {found}, expected {expected}")]
    IdOutOfSequence {
        position: usize,
        expected: u32,
        found: u32,
    },
}

/// Settings JSON could not be applied
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// A single manifest entry failed to load
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to load image {0}")]
    Image(String),

    #[error("failed to load audio clip {name} from {src}")]
    Audio { name: String, src: String },
}

/// Action requested in a mode that does not permit it
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} while in {from:?}")]
pub struct TransitionError {
    pub from: GameMode,
    pub action: &'static str,
}
