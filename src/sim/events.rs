//! Side effects requested by the session
//!
//! The session never touches audio, particles or the DOM directly; it queues
//! these events and the host drains them after each call.

use glam::Vec2;
use serde::Serialize;

use super::state::GameMode;
use crate::audio::SoundEvent;
use crate::catalog::ItemId;
use crate::effects::BurstStyle;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    ModeChanged { from: GameMode, to: GameMode },
    Sound(SoundEvent),
    /// Show an envelope's message (first read or re-open)
    OpenMessage { item: ItemId },
    CloseMessage,
    /// Out-of-order tap: shake the envelope
    ItemError { item: ItemId },
    ItemUncovered { item: ItemId },
    /// Spawn particles at a scene position
    Burst { at: Vec2, count: usize, style: BurstStyle },
    /// Ambient snowfall layer on/off
    AmbientEffects(bool),
    /// Star missed the tree and springs back to its origin
    TopperReturned,
    SecretUnlocked,
    /// Fresh layout drawn (reset)
    LayoutChanged,
}
