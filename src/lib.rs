//! Memory Tree - collect twelve memory envelopes, then hang them on a tree
//!
//! Core modules:
//! - `sim`: Session state machine (modes, collection order, gestures, layout)
//! - `catalog`: The fixed list of memories shown in the scene
//! - `preload`: Asset preloading gate
//! - `audio`: Background tracks, clips and synthesized effects
//! - `effects`: Particle bursts, confetti and ambient snowfall
//! - `settings`: Data-driven tuning

pub mod audio;
pub mod catalog;
pub mod effects;
pub mod error;
pub mod preload;
pub mod settings;
pub mod sim;

pub use catalog::{Catalog, CollectibleItem, ItemId};
pub use error::{CatalogError, LoadError, SettingsError, TransitionError};
pub use settings::Settings;

/// Experience configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz is plenty for UI timers)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Number of memories in the built-in catalog
    pub const CATALOG_SIZE: usize = 12;

    /// Length of the secret input sequence
    pub const SECRET_CODE_LEN: usize = 10;
    /// Secret sequence, already normalized
    pub const SECRET_CODE: [&str; SECRET_CODE_LEN] = [
        "up", "up", "down", "down", "left", "right", "left", "right", "b", "a",
    ];

    /// Tree silhouette in scene percent (top of the first ornament row)
    pub const TREE_TOP: f32 = 24.0;
    /// Bottom ornament row
    pub const TREE_BOTTOM: f32 = 78.0;
    /// Half-width of the widest ornament row
    pub const TREE_HALF_WIDTH: f32 = 30.0;
}
