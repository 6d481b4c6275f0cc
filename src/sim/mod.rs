//! Session simulation module
//!
//! All experience logic lives here. This module must stay platform-free:
//! - Seeded RNG only
//! - Timers advance through `Session::tick`, never wall-clock reads
//! - No audio, DOM or rendering calls (side effects are queued as events)

pub mod events;
pub mod input;
pub mod layout;
pub mod message;
pub mod session;
pub mod state;
pub mod tree;

pub use events::GameEvent;
pub use input::{Gesture, GestureTracker, SecretCode, normalize_token};
pub use layout::{assign_gates, assign_layout, raise};
pub use message::MessageReader;
pub use session::{CollectOutcome, Release, Session, SessionSnapshot};
pub use state::{
    CollectionRecord, GameMode, ItemStatus, LayoutEntry, RevealGate, SecretReturn, Topper,
};
pub use tree::ornament_slots;
