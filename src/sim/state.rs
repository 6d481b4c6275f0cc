//! Session state types
//!
//! Everything a reset discards and recreates lives here.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::audio::Track;
use crate::catalog::ItemId;

/// Mode the secret overlay returns to when dismissed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretReturn {
    Collecting,
    Completed,
}

impl SecretReturn {
    pub fn mode(self) -> GameMode {
        match self {
            SecretReturn::Collecting => GameMode::Collecting,
            SecretReturn::Completed => GameMode::Completed,
        }
    }
}

/// Current mode of the experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Title card, waiting for start
    Cover,
    /// Envelopes scattered, collecting in order
    Collecting,
    /// All envelopes read, waiting for the user to assemble the tree
    ReadyToAssemble,
    /// Assembly timeline running (owned by the presentation layer)
    Assembling,
    /// Waiting for the star to be dragged onto the tree
    PlacingStar,
    /// Finished
    Completed,
    /// Secret overlay on top of another mode
    Secret(SecretReturn),
}

impl GameMode {
    /// Background track this mode expects, and whether it loops
    pub fn background_track(self) -> Option<(Track, bool)> {
        match self {
            GameMode::Cover => None,
            GameMode::Collecting | GameMode::ReadyToAssemble | GameMode::Completed => {
                Some((Track::Main, true))
            }
            GameMode::Assembling | GameMode::PlacingStar => Some((Track::Finale, false)),
            GameMode::Secret(_) => Some((Track::Secret, true)),
        }
    }

    /// Envelopes accept presses, rubs and taps only while collecting
    pub fn allows_item_interaction(self) -> bool {
        self == GameMode::Collecting
    }

    /// Modes from which the secret overlay may open
    pub fn secret_return(self) -> Option<SecretReturn> {
        match self {
            GameMode::Collecting => Some(SecretReturn::Collecting),
            GameMode::Completed => Some(SecretReturn::Completed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Cover => "cover",
            GameMode::Collecting => "collecting",
            GameMode::ReadyToAssemble => "ready",
            GameMode::Assembling => "assembling",
            GameMode::PlacingStar => "placing-star",
            GameMode::Completed => "completed",
            GameMode::Secret(_) => "secret",
        }
    }
}

/// Which envelopes have been read and placed this session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub read: BTreeSet<ItemId>,
    pub placed: BTreeSet<ItemId>,
}

impl CollectionRecord {
    /// Next id that may be collected
    pub fn expected_next(&self) -> ItemId {
        self.read.len() as ItemId + 1
    }

    pub fn is_read(&self, id: ItemId) -> bool {
        self.read.contains(&id)
    }

    pub fn is_placed(&self, id: ItemId) -> bool {
        self.placed.contains(&id)
    }
}

/// Where an envelope sits in the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutEntry {
    /// Position in percent of the viewport
    pub pos: Vec2,
    /// Tilt in degrees
    pub rotation: f32,
    /// Stack order (higher draws on top)
    pub z: u32,
}

/// Scratch-off cover over an envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevealGate {
    pub gated: bool,
    /// Remaining cover (1.0 = fully covered, 0.0 = uncovered)
    pub cover: f32,
}

impl RevealGate {
    pub fn new(gated: bool) -> Self {
        Self {
            gated,
            cover: if gated { 1.0 } else { 0.0 },
        }
    }

    pub fn is_covered(&self) -> bool {
        self.cover > 0.0
    }

    /// Remove one step of cover. Returns true when this rub uncovered it.
    pub fn rub(&mut self, step: f32) -> bool {
        if !self.is_covered() {
            return false;
        }
        self.cover = (self.cover - step).max(0.0);
        // Snap float residue so the gate always opens after ceil(1/step) rubs
        if self.cover < 1e-4 {
            self.cover = 0.0;
        }
        !self.is_covered()
    }
}

/// The star placed on top of the tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Topper {
    pub pos: Vec2,
    pub origin: Vec2,
    pub held: bool,
}

impl Topper {
    pub fn new(origin: Vec2) -> Self {
        Self {
            pos: origin,
            origin,
            held: false,
        }
    }

    /// Snap back to the origin (missed release)
    pub fn return_home(&mut self) {
        self.pos = self.origin;
        self.held = false;
    }
}

/// Per-envelope view for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemStatus {
    pub id: ItemId,
    pub read: bool,
    pub placed: bool,
    pub covered: bool,
    pub cover: f32,
    pub erroring: bool,
    pub layout: LayoutEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_opens_after_expected_rubs() {
        let mut gate = RevealGate::new(true);
        let step = 0.05;
        for _ in 0..19 {
            assert!(!gate.rub(step));
            assert!(gate.is_covered());
        }
        assert!(gate.rub(step));
        assert_eq!(gate.cover, 0.0);
        // Further rubs are inert
        assert!(!gate.rub(step));
    }

    #[test]
    fn test_ungated_starts_uncovered() {
        let gate = RevealGate::new(false);
        assert!(!gate.is_covered());
    }

    #[test]
    fn test_secret_return_modes() {
        assert_eq!(GameMode::Collecting.secret_return(), Some(SecretReturn::Collecting));
        assert_eq!(GameMode::Completed.secret_return(), Some(SecretReturn::Completed));
        assert_eq!(GameMode::Assembling.secret_return(), None);
        assert_eq!(SecretReturn::Completed.mode(), GameMode::Completed);
    }

    #[test]
    fn test_expected_tracks() {
        assert_eq!(GameMode::Cover.background_track(), None);
        assert_eq!(GameMode::Collecting.background_track(), Some((Track::Main, true)));
        assert_eq!(GameMode::Completed.background_track(), Some((Track::Main, true)));
        assert_eq!(GameMode::Assembling.background_track(), Some((Track::Finale, false)));
    }
}
