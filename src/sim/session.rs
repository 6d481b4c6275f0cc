//! Session controller
//!
//! Owns all per-session state and is the only place it changes. Every
//! operation either performs a documented transition or is a logged no-op;
//! side effects are queued as `GameEvent`s for the host to drain.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::events::GameEvent;
use super::input::{Gesture, GestureTracker, SecretCode};
use super::layout::{assign_gates, assign_layout, raise};
use super::message::MessageReader;
use super::state::{CollectionRecord, GameMode, ItemStatus, LayoutEntry, RevealGate, Topper};
use super::tree::ornament_slots;
use crate::audio::{Clip, SoundEvent, Synth, Track};
use crate::catalog::{Catalog, ItemId};
use crate::effects::BurstStyle;
use crate::error::TransitionError;
use crate::settings::Settings;

/// Result of trying to collect an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollectOutcome {
    /// Next in order: now read
    Accepted,
    /// Wrong order; the envelope shakes
    OutOfOrder { expected: ItemId },
    /// Already read; its message re-opens, nothing else changes
    AlreadyRead,
    /// Still under its scratch cover
    Covered,
    Unknown,
    /// Current mode does not accept envelope interaction
    NotInteractive,
}

impl CollectOutcome {
    pub fn accepted(self) -> bool {
        self == CollectOutcome::Accepted
    }
}

/// Result of releasing a held envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub gesture: Gesture,
    /// Set when the release was a tap
    pub collect: Option<CollectOutcome>,
}

#[derive(Debug, Clone, Copy)]
struct Held {
    item: ItemId,
    /// Position before the drag started (restored on cancel)
    origin: Vec2,
}

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub mode: GameMode,
    pub read: Vec<ItemId>,
    pub placed: Vec<ItemId>,
    pub items: Vec<ItemStatus>,
    pub topper: Topper,
    /// Open message and how many characters are visible
    pub message: Option<(ItemId, usize)>,
}

/// One play-through, from cover card to completion
pub struct Session {
    catalog: Catalog,
    settings: Settings,
    rng: Pcg32,
    mode: GameMode,
    record: CollectionRecord,
    layout: Vec<LayoutEntry>,
    gates: Vec<RevealGate>,
    /// Seconds left on each envelope's error shake
    error_timers: Vec<f32>,
    topper: Topper,
    gestures: GestureTracker,
    held: Option<Held>,
    secret: SecretCode,
    message: Option<MessageReader>,
    events: Vec<GameEvent>,
}

impl Session {
    /// Create a session on the cover card with a freshly drawn layout
    pub fn new(catalog: Catalog, settings: Settings, seed: u64) -> Self {
        let count = catalog.len();
        let gestures = GestureTracker::new(settings.tap_max_distance, settings.tap_max_duration);
        let topper = Topper::new(settings.topper_origin);
        let mut session = Self {
            catalog,
            settings,
            rng: Pcg32::seed_from_u64(seed),
            mode: GameMode::Cover,
            record: CollectionRecord::default(),
            layout: Vec::with_capacity(count),
            gates: Vec::with_capacity(count),
            error_timers: vec![0.0; count],
            topper,
            gestures,
            held: None,
            secret: SecretCode::new(),
            message: None,
            events: Vec::new(),
        };
        session.draw_layout();
        log::info!("Session created with seed {} ({} memories)", seed, count);
        session
    }

    fn draw_layout(&mut self) {
        let count = self.catalog.len();
        self.layout = assign_layout(&mut self.rng, count, &self.settings);
        self.gates = assign_gates(&mut self.rng, count, self.settings.reveal_gated_count);
        self.error_timers = vec![0.0; count];
    }

    fn index(&self, id: ItemId) -> Option<usize> {
        self.catalog.contains(id).then(|| id as usize - 1)
    }

    fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    fn sound(&mut self, sound: SoundEvent) {
        self.emit(GameEvent::Sound(sound));
    }

    fn set_mode(&mut self, to: GameMode) {
        let from = self.mode;
        if from == to {
            return;
        }
        self.mode = to;
        log::info!("Mode {:?} -> {:?}", from, to);
        self.emit(GameEvent::ModeChanged { from, to });
    }

    fn reject(&self, action: &'static str) -> TransitionError {
        log::debug!("Rejected {} in {:?}", action, self.mode);
        TransitionError {
            from: self.mode,
            action,
        }
    }

    // === Transitions ===

    /// Cover -> Collecting
    pub fn start_game(&mut self) -> Result<(), TransitionError> {
        if self.mode != GameMode::Cover {
            return Err(self.reject("start"));
        }
        self.set_mode(GameMode::Collecting);
        self.sound(SoundEvent::SwitchTrack {
            track: Track::Main,
            looped: true,
        });
        Ok(())
    }

    /// Try to collect envelope `id` (strict ascending order)
    pub fn attempt_collect(&mut self, id: ItemId) -> CollectOutcome {
        if !self.mode.allows_item_interaction() {
            log::debug!("Collect {} ignored in {:?}", id, self.mode);
            return CollectOutcome::NotInteractive;
        }
        let Some(idx) = self.index(id) else {
            return CollectOutcome::Unknown;
        };
        if self.gates[idx].is_covered() {
            return CollectOutcome::Covered;
        }
        if self.record.is_read(id) {
            self.open_message(id);
            return CollectOutcome::AlreadyRead;
        }

        let expected = self.record.expected_next();
        if id != expected {
            log::debug!("Envelope {} out of order (expected {})", id, expected);
            self.error_timers[idx] = self.settings.error_flash_secs;
            self.emit(GameEvent::ItemError { item: id });
            self.sound(SoundEvent::Clip(Clip::Error));
            return CollectOutcome::OutOfOrder { expected };
        }

        self.record.read.insert(id);
        log::info!("Collected {}/{}", self.record.read.len(), self.catalog.len());
        self.sound(SoundEvent::Clip(Clip::Collect));
        self.emit(GameEvent::Burst {
            at: self.layout[idx].pos,
            count: self.settings.collect_burst,
            style: BurstStyle::Sparkle,
        });
        self.open_message(id);

        if self.record.read.len() == self.catalog.len() {
            self.set_mode(GameMode::ReadyToAssemble);
            self.emit(GameEvent::AmbientEffects(true));
        }
        CollectOutcome::Accepted
    }

    /// ReadyToAssemble -> Assembling
    pub fn begin_assembly(&mut self) -> Result<(), TransitionError> {
        if self.mode != GameMode::ReadyToAssemble {
            return Err(self.reject("begin assembly"));
        }
        self.close_message();
        self.set_mode(GameMode::Assembling);
        self.sound(SoundEvent::SwitchTrack {
            track: Track::Finale,
            looped: false,
        });
        Ok(())
    }

    /// Assembling -> PlacingStar, signalled when the assembly timeline ends
    pub fn finish_assembly(&mut self) -> Result<(), TransitionError> {
        if self.mode != GameMode::Assembling {
            return Err(self.reject("finish assembly"));
        }
        self.record.placed = self.record.read.clone();
        self.set_mode(GameMode::PlacingStar);
        Ok(())
    }

    /// Pick up the star
    pub fn grab_topper(&mut self) -> Result<(), TransitionError> {
        if self.mode != GameMode::PlacingStar {
            return Err(self.reject("grab topper"));
        }
        self.topper.held = true;
        self.sound(SoundEvent::Synth(Synth::Pickup));
        Ok(())
    }

    /// Move the held star (scene percent)
    pub fn drag_topper(&mut self, pos: Vec2) -> bool {
        if self.mode != GameMode::PlacingStar || !self.topper.held {
            return false;
        }
        self.topper.pos = pos.clamp(Vec2::ZERO, Vec2::splat(100.0));
        true
    }

    /// Release the star. Commits (PlacingStar -> Completed) when close enough
    /// to the anchor; otherwise the star returns to its origin.
    pub fn place_topper(&mut self) -> bool {
        if self.mode != GameMode::PlacingStar {
            log::debug!("Place topper ignored in {:?}", self.mode);
            return false;
        }
        let anchor = self.settings.star_anchor;
        if self.topper.pos.distance(anchor) <= self.settings.topper_capture_radius {
            self.topper.pos = anchor;
            self.topper.held = false;
            self.set_mode(GameMode::Completed);
            self.sound(SoundEvent::Clip(Clip::Chime));
            self.emit(GameEvent::Burst {
                at: anchor,
                count: self.settings.confetti_count,
                style: BurstStyle::Confetti,
            });
            true
        } else {
            self.topper.return_home();
            self.sound(SoundEvent::Synth(Synth::Bounce));
            self.emit(GameEvent::TopperReturned);
            false
        }
    }

    /// Any mode -> Cover, with a fresh layout and an empty record
    pub fn reset_game(&mut self) {
        self.sound(SoundEvent::StopAll);
        self.record = CollectionRecord::default();
        self.draw_layout();
        self.topper = Topper::new(self.settings.topper_origin);
        self.held = None;
        self.gestures.cancel();
        if self.message.take().is_some() {
            self.emit(GameEvent::CloseMessage);
        }
        self.emit(GameEvent::AmbientEffects(false));
        self.emit(GameEvent::LayoutChanged);
        self.set_mode(GameMode::Cover);
    }

    /// Feed a key or virtual-button token to the secret-code recognizer.
    /// Returns true if the secret overlay opened.
    pub fn submit_input_token(&mut self, token: &str) -> bool {
        if !self.secret.push(token) {
            return false;
        }
        let Some(ret) = self.mode.secret_return() else {
            log::debug!("Secret code entered in {:?}, ignored", self.mode);
            return false;
        };
        self.cancel_drag();
        self.set_mode(GameMode::Secret(ret));
        self.emit(GameEvent::SecretUnlocked);
        self.sound(SoundEvent::Synth(Synth::Sparkle));
        self.sound(SoundEvent::SwitchTrack {
            track: Track::Secret,
            looped: true,
        });
        self.emit(GameEvent::Burst {
            at: Vec2::new(50.0, 50.0),
            count: self.settings.collect_burst * 2,
            style: BurstStyle::Glitter,
        });
        true
    }

    /// Close the secret overlay, returning to the mode it was opened from
    pub fn dismiss_secret(&mut self) -> Result<(), TransitionError> {
        let GameMode::Secret(ret) = self.mode else {
            return Err(self.reject("dismiss secret"));
        };
        let to = ret.mode();
        self.set_mode(to);
        if let Some((track, looped)) = to.background_track() {
            self.sound(SoundEvent::SwitchTrack { track, looped });
        }
        Ok(())
    }

    // === Envelope gestures ===

    /// Rub a covered envelope. Returns true when this rub uncovered it.
    pub fn rub(&mut self, id: ItemId) -> bool {
        if !self.mode.allows_item_interaction() {
            return false;
        }
        let Some(idx) = self.index(id) else { return false };
        if !self.gates[idx].is_covered() {
            return false;
        }
        let uncovered = self.gates[idx].rub(self.settings.reveal_step);
        self.sound(SoundEvent::Synth(Synth::Scratch));
        if uncovered {
            log::debug!("Envelope {} uncovered", id);
            self.emit(GameEvent::ItemUncovered { item: id });
            self.sound(SoundEvent::Synth(Synth::Uncover));
        }
        uncovered
    }

    /// Press on an envelope (screen px, seconds). Brings it to the front.
    /// Returns false when the press is suppressed, including while another
    /// envelope is already held.
    pub fn press_item(&mut self, id: ItemId, screen: Vec2, time: f64) -> bool {
        if !self.mode.allows_item_interaction() || self.held.is_some() {
            return false;
        }
        let Some(idx) = self.index(id) else { return false };
        if self.gates[idx].is_covered() {
            return false;
        }
        raise(&mut self.layout, idx);
        self.held = Some(Held {
            item: id,
            origin: self.layout[idx].pos,
        });
        self.gestures.press(screen, time);
        true
    }

    /// Move the held envelope (scene percent)
    pub fn set_drag_position(&mut self, id: ItemId, pos: Vec2) -> bool {
        let Some(held) = self.held else { return false };
        if held.item != id {
            return false;
        }
        let Some(idx) = self.index(id) else { return false };
        self.layout[idx].pos = pos.clamp(Vec2::ZERO, Vec2::splat(100.0));
        true
    }

    /// Release the held envelope. A tap collects; a drag leaves it where it was dropped.
    pub fn release_item(&mut self, screen: Vec2, time: f64) -> Release {
        let gesture = self.gestures.release(screen, time);
        let Some(held) = self.held.take() else {
            return Release {
                gesture: Gesture::Ignored,
                collect: None,
            };
        };
        let collect = match gesture {
            Gesture::Tap => Some(self.attempt_collect(held.item)),
            Gesture::DragEnd | Gesture::Ignored => None,
        };
        Release { gesture, collect }
    }

    /// Abort the current drag, restoring the pre-drag position
    pub fn cancel_drag(&mut self) {
        self.gestures.cancel();
        if let Some(held) = self.held.take() {
            if let Some(idx) = self.index(held.item) {
                self.layout[idx].pos = held.origin;
            }
        }
    }

    /// Close the open message view
    pub fn close_message(&mut self) {
        if self.message.take().is_some() {
            self.emit(GameEvent::CloseMessage);
        }
    }

    /// Reveal the rest of the open message immediately
    pub fn skip_message(&mut self) {
        if let Some(reader) = self.message.as_mut() {
            reader.skip();
        }
    }

    fn open_message(&mut self, id: ItemId) {
        let Some(item) = self.catalog.get(id) else { return };
        self.message = Some(MessageReader::open(id, &item.message, self.settings.text_chars_per_sec));
        self.emit(GameEvent::OpenMessage { item: id });
    }

    /// Advance timers (error shakes, message typewriter)
    pub fn tick(&mut self, dt: f32) {
        for timer in &mut self.error_timers {
            if *timer > 0.0 {
                *timer = (*timer - dt).max(0.0);
            }
        }
        if let Some(reader) = self.message.as_mut() {
            reader.tick(dt);
        }
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Queries ===

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn record(&self) -> &CollectionRecord {
        &self.record
    }

    pub fn read_count(&self) -> usize {
        self.record.read.len()
    }

    pub fn layout(&self) -> &[LayoutEntry] {
        &self.layout
    }

    pub fn topper(&self) -> &Topper {
        &self.topper
    }

    pub fn message(&self) -> Option<&MessageReader> {
        self.message.as_ref()
    }

    pub fn held_item(&self) -> Option<ItemId> {
        self.held.map(|h| h.item)
    }

    pub fn item_status(&self, id: ItemId) -> Option<ItemStatus> {
        let idx = self.index(id)?;
        let gate = self.gates[idx];
        Some(ItemStatus {
            id,
            read: self.record.is_read(id),
            placed: self.record.is_placed(id),
            covered: gate.is_covered(),
            cover: gate.cover,
            erroring: self.error_timers[idx] > 0.0,
            layout: self.layout[idx],
        })
    }

    /// Where each read envelope hangs on the tree, in id order
    pub fn assembly_targets(&self) -> Vec<(ItemId, Vec2)> {
        self.record
            .read
            .iter()
            .copied()
            .zip(ornament_slots(self.record.read.len()))
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            read: self.record.read.iter().copied().collect(),
            placed: self.record.placed.iter().copied().collect(),
            items: self
                .catalog
                .iter()
                .filter_map(|item| self.item_status(item.id))
                .collect(),
            topper: self.topper,
            message: self.message.as_ref().map(|m| (m.item(), m.visible_chars())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::SecretReturn;
    use proptest::prelude::*;

    const CODE: [&str; 10] = [
        "ArrowUp", "ArrowUp", "ArrowDown", "ArrowDown", "ArrowLeft", "ArrowRight", "ArrowLeft",
        "ArrowRight", "b", "a",
    ];

    fn ungated_settings() -> Settings {
        Settings {
            reveal_gated_count: 0,
            ..Settings::default()
        }
    }

    fn session() -> Session {
        Session::new(Catalog::builtin().unwrap(), ungated_settings(), 12345)
    }

    fn collecting() -> Session {
        let mut s = session();
        s.start_game().unwrap();
        s.drain_events();
        s
    }

    fn completed() -> Session {
        let mut s = collecting();
        for id in 1..=12 {
            assert!(s.attempt_collect(id).accepted());
        }
        s.begin_assembly().unwrap();
        s.finish_assembly().unwrap();
        s.grab_topper().unwrap();
        s.drag_topper(Vec2::new(50.0, 14.0));
        assert!(s.place_topper());
        s.drain_events();
        s
    }

    fn enter_code(s: &mut Session) -> bool {
        CODE.iter().fold(false, |hit, key| s.submit_input_token(key) || hit)
    }

    fn sounds(events: &[GameEvent]) -> Vec<SoundEvent> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Sound(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_switches_to_main_loop() {
        let mut s = session();
        assert_eq!(s.mode(), GameMode::Cover);
        s.start_game().unwrap();
        assert_eq!(s.mode(), GameMode::Collecting);
        let events = s.drain_events();
        assert_eq!(
            sounds(&events),
            vec![SoundEvent::SwitchTrack { track: Track::Main, looped: true }]
        );
        // Starting twice is rejected
        assert!(s.start_game().is_err());
    }

    #[test]
    fn test_out_of_order_scenario() {
        let mut s = collecting();
        assert!(s.attempt_collect(1).accepted());
        assert!(s.attempt_collect(2).accepted());
        assert_eq!(s.attempt_collect(4), CollectOutcome::OutOfOrder { expected: 3 });
        assert_eq!(s.read_count(), 2);
        assert!(s.item_status(4).unwrap().erroring);
        assert!(s.attempt_collect(3).accepted());
        assert!(s.attempt_collect(4).accepted());
        assert_eq!(s.read_count(), 4);
    }

    #[test]
    fn test_error_flash_expires() {
        let mut s = collecting();
        s.attempt_collect(5);
        let events = s.drain_events();
        assert!(events.contains(&GameEvent::ItemError { item: 5 }));
        assert_eq!(sounds(&events), vec![SoundEvent::Clip(Clip::Error)]);
        s.tick(0.3);
        assert!(s.item_status(5).unwrap().erroring);
        s.tick(0.3);
        assert!(!s.item_status(5).unwrap().erroring);
    }

    #[test]
    fn test_repeat_tap_reopens_without_mutation() {
        let mut s = collecting();
        s.attempt_collect(1);
        s.close_message();
        s.drain_events();
        assert_eq!(s.attempt_collect(1), CollectOutcome::AlreadyRead);
        assert_eq!(s.read_count(), 1);
        let events = s.drain_events();
        assert_eq!(events, vec![GameEvent::OpenMessage { item: 1 }]);
        assert_eq!(s.message().map(|m| m.item()), Some(1));
    }

    #[test]
    fn test_ready_fires_once_at_full_catalog() {
        let mut s = collecting();
        let mut ready_transitions = 0;
        for id in 1..=12 {
            s.attempt_collect(id);
            if id < 12 {
                assert_eq!(s.mode(), GameMode::Collecting);
            }
            ready_transitions += s
                .drain_events()
                .iter()
                .filter(|e| matches!(e, GameEvent::ModeChanged { to: GameMode::ReadyToAssemble, .. }))
                .count();
        }
        assert_eq!(s.mode(), GameMode::ReadyToAssemble);
        assert_eq!(ready_transitions, 1);
        // Further taps are not interactive
        assert_eq!(s.attempt_collect(12), CollectOutcome::NotInteractive);
    }

    #[test]
    fn test_ambient_layer_enabled_when_ready() {
        let mut s = collecting();
        for id in 1..=11 {
            s.attempt_collect(id);
        }
        s.drain_events();
        s.attempt_collect(12);
        assert!(s.drain_events().contains(&GameEvent::AmbientEffects(true)));
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut s = collecting();
        s.attempt_collect(1);
        let before = s.snapshot();
        assert!(s.begin_assembly().is_err());
        assert!(s.finish_assembly().is_err());
        assert!(s.grab_topper().is_err());
        assert!(!s.place_topper());
        assert!(s.dismiss_secret().is_err());
        let after = s.snapshot();
        assert_eq!(before.mode, after.mode);
        assert_eq!(before.read, after.read);

        let err = s.begin_assembly().unwrap_err();
        assert_eq!(err.from, GameMode::Collecting);
    }

    #[test]
    fn test_full_progression() {
        let mut s = collecting();
        for id in 1..=12 {
            s.attempt_collect(id);
        }
        s.begin_assembly().unwrap();
        assert_eq!(s.mode(), GameMode::Assembling);
        assert!(s.message().is_none());
        let events = s.drain_events();
        assert!(sounds(&events).contains(&SoundEvent::SwitchTrack { track: Track::Finale, looped: false }));

        assert_eq!(s.assembly_targets().len(), 12);
        s.finish_assembly().unwrap();
        assert_eq!(s.mode(), GameMode::PlacingStar);
        assert_eq!(s.record().placed, s.record().read);

        // Miss: star springs back
        s.grab_topper().unwrap();
        assert!(s.drag_topper(Vec2::new(80.0, 60.0)));
        assert!(!s.place_topper());
        assert_eq!(s.mode(), GameMode::PlacingStar);
        assert_eq!(s.topper().pos, s.settings().topper_origin);
        assert!(s.drain_events().contains(&GameEvent::TopperReturned));

        // Hit within the capture radius
        s.grab_topper().unwrap();
        s.drag_topper(Vec2::new(53.0, 18.0));
        assert!(s.place_topper());
        assert_eq!(s.mode(), GameMode::Completed);
        assert_eq!(s.topper().pos, s.settings().star_anchor);
    }

    #[test]
    fn test_reset_from_any_mode() {
        let builders: Vec<fn() -> Session> = vec![session, collecting, completed, || {
            let mut s = collecting();
            enter_code(&mut s);
            s.drain_events();
            s
        }];
        for build in builders {
            let mut s = build();
            s.reset_game();
            assert_eq!(s.mode(), GameMode::Cover);
            assert!(s.record().read.is_empty());
            assert!(s.record().placed.is_empty());
            assert!(s.message().is_none());
            assert_eq!(s.layout().len(), 12);
            let events = s.drain_events();
            assert_eq!(sounds(&events), vec![SoundEvent::StopAll]);
            // Idempotent
            s.reset_game();
            assert_eq!(s.mode(), GameMode::Cover);
            assert!(s.record().read.is_empty());
        }
    }

    #[test]
    fn test_reset_draws_new_layout() {
        let mut s = collecting();
        let before: Vec<LayoutEntry> = s.layout().to_vec();
        s.reset_game();
        assert_ne!(before, s.layout());
    }

    #[test]
    fn test_secret_from_collecting_returns() {
        let mut s = collecting();
        s.attempt_collect(1);
        assert!(enter_code(&mut s));
        assert_eq!(s.mode(), GameMode::Secret(SecretReturn::Collecting));
        assert_eq!(s.attempt_collect(2), CollectOutcome::NotInteractive);
        s.drain_events();

        s.dismiss_secret().unwrap();
        assert_eq!(s.mode(), GameMode::Collecting);
        assert_eq!(s.read_count(), 1);
        assert_eq!(
            sounds(&s.drain_events()),
            vec![SoundEvent::SwitchTrack { track: Track::Main, looped: true }]
        );
    }

    #[test]
    fn test_secret_from_completed() {
        let mut s = completed();
        assert!(enter_code(&mut s));
        assert_eq!(s.mode(), GameMode::Secret(SecretReturn::Completed));
        s.drain_events();
        s.dismiss_secret().unwrap();
        assert_eq!(s.mode(), GameMode::Completed);
        assert_eq!(
            sounds(&s.drain_events()),
            vec![SoundEvent::SwitchTrack { track: Track::Main, looped: true }]
        );
    }

    #[test]
    fn test_secret_ignored_outside_allowed_modes() {
        let mut s = session();
        assert!(!enter_code(&mut s));
        assert_eq!(s.mode(), GameMode::Cover);
    }

    #[test]
    fn test_secret_near_miss() {
        let mut s = collecting();
        for key in &CODE[..9] {
            assert!(!s.submit_input_token(key));
        }
        assert!(!s.submit_input_token("x"));
        assert_eq!(s.mode(), GameMode::Collecting);
    }

    #[test]
    fn test_tap_collects_and_drag_does_not() {
        let mut s = collecting();
        // Drag: moved too far
        assert!(s.press_item(1, Vec2::new(100.0, 100.0), 0.0));
        assert!(s.set_drag_position(1, Vec2::new(40.0, 40.0)));
        let release = s.release_item(Vec2::new(160.0, 130.0), 0.2);
        assert_eq!(release.gesture, Gesture::DragEnd);
        assert_eq!(release.collect, None);
        assert_eq!(s.read_count(), 0);
        assert_eq!(s.item_status(1).unwrap().layout.pos, Vec2::new(40.0, 40.0));

        // Drag: held too long
        s.press_item(1, Vec2::new(100.0, 100.0), 1.0);
        assert_eq!(s.release_item(Vec2::new(100.0, 100.0), 2.0).gesture, Gesture::DragEnd);
        assert_eq!(s.read_count(), 0);

        // Tap
        s.press_item(1, Vec2::new(100.0, 100.0), 3.0);
        let release = s.release_item(Vec2::new(102.0, 101.0), 3.1);
        assert_eq!(release.gesture, Gesture::Tap);
        assert_eq!(release.collect, Some(CollectOutcome::Accepted));
        assert_eq!(s.read_count(), 1);
    }

    #[test]
    fn test_press_raises_and_cancel_restores() {
        let mut s = collecting();
        let origin = s.item_status(3).unwrap().layout.pos;
        assert!(s.press_item(3, Vec2::ZERO, 0.0));
        let z = s.item_status(3).unwrap().layout.z;
        assert!(s.layout().iter().enumerate().all(|(i, e)| i == 2 || e.z < z));

        // Only the held envelope moves
        assert!(!s.set_drag_position(4, Vec2::new(1.0, 1.0)));
        s.set_drag_position(3, Vec2::new(70.0, 20.0));
        s.cancel_drag();
        assert_eq!(s.item_status(3).unwrap().layout.pos, origin);
        assert_eq!(s.held_item(), None);
        assert_eq!(s.release_item(Vec2::ZERO, 0.1).gesture, Gesture::Ignored);
    }

    #[test]
    fn test_second_press_ignored_while_holding() {
        let mut s = collecting();
        let origin = s.item_status(5).unwrap().layout.pos;
        assert!(s.press_item(1, Vec2::new(100.0, 100.0), 0.0));
        assert!(!s.press_item(5, Vec2::new(400.0, 300.0), 0.05));
        assert_eq!(s.held_item(), Some(1));
        assert!(!s.set_drag_position(5, Vec2::new(50.0, 50.0)));
        assert_eq!(s.item_status(5).unwrap().layout.pos, origin);

        // Release is classified against the first press
        let release = s.release_item(Vec2::new(102.0, 101.0), 0.1);
        assert_eq!(release.gesture, Gesture::Tap);
        assert_eq!(release.collect, Some(CollectOutcome::Accepted));
    }

    #[test]
    fn test_covered_envelopes_need_rubbing() {
        let mut s = Session::new(Catalog::builtin().unwrap(), Settings::default(), 77);
        s.start_game().unwrap();
        let covered: Vec<ItemId> = (1..=12)
            .filter(|id| s.item_status(*id).unwrap().covered)
            .collect();
        assert_eq!(covered.len(), 3);

        let id = covered[0];
        assert!(!s.press_item(id, Vec2::ZERO, 0.0));
        assert_eq!(s.attempt_collect(id), CollectOutcome::Covered);
        s.drain_events();

        let mut rubs = 0;
        while !s.rub(id) {
            rubs += 1;
            assert!(rubs < 100);
        }
        assert_eq!(rubs + 1, 20);
        let events = s.drain_events();
        assert!(events.contains(&GameEvent::ItemUncovered { item: id }));
        assert!(sounds(&events).contains(&SoundEvent::Synth(Synth::Scratch)));
        assert!(!s.item_status(id).unwrap().covered);
        assert!(s.press_item(id, Vec2::ZERO, 0.0));
    }

    #[test]
    fn test_uncovered_stays_until_reset() {
        let mut s = Session::new(Catalog::builtin().unwrap(), Settings::default(), 5);
        s.start_game().unwrap();
        let id = (1..=12).find(|id| s.item_status(*id).unwrap().covered).unwrap();
        while !s.rub(id) {}
        assert!(!s.rub(id));
        s.reset_game();
        let covered = (1..=12).filter(|id| s.item_status(*id).unwrap().covered).count();
        assert_eq!(covered, 3);
    }

    #[test]
    fn test_message_typewriter() {
        let mut s = collecting();
        s.attempt_collect(1);
        let len = s.catalog().get(1).unwrap().message.chars().count();
        assert_eq!(s.snapshot().message, Some((1, 0)));
        s.tick(0.5);
        assert_eq!(s.snapshot().message, Some((1, 20)));
        s.skip_message();
        assert_eq!(s.snapshot().message, Some((1, len)));
        s.close_message();
        assert!(s.snapshot().message.is_none());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut s = collecting();
        s.attempt_collect(1);
        let json = serde_json::to_string(&s.snapshot()).unwrap();
        assert!(json.contains("\"Collecting\""));
    }

    proptest! {
        #[test]
        fn prop_read_only_grows_in_order(attempts in proptest::collection::vec(0u32..15, 0..80)) {
            let mut s = collecting();
            let mut prev = 0;
            for id in attempts {
                let before = s.read_count();
                let outcome = s.attempt_collect(id);
                let after = s.read_count();
                if outcome.accepted() {
                    prop_assert_eq!(id as usize, before + 1);
                    prop_assert_eq!(after, before + 1);
                } else {
                    prop_assert_eq!(after, before);
                }
                prop_assert!(after >= prev);
                prev = after;
                let expected: Vec<ItemId> = (1..=after as ItemId).collect();
                let read: Vec<ItemId> = s.record().read.iter().copied().collect();
                prop_assert_eq!(read, expected);
            }
        }
    }
}
