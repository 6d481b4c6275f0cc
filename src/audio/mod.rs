//! Audio facility
//!
//! Owns the single active background track and the mute/unlock state. The
//! actual output goes through an `AudioBackend`; the browser one lives in
//! `web` and plays preloaded clips plus oscillator-synthesized effects.

#[cfg(target_arch = "wasm32")]
pub mod web;

use serde::Serialize;

/// Background tracks (only one plays at a time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Track {
    /// Collecting / completion loop
    Main,
    /// Played once over the assembly animation
    Finale,
    /// Secret overlay loop
    Secret,
}

/// Recorded one-shot clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Clip {
    /// Envelope collected in order
    Collect,
    /// Envelope tapped out of order
    Error,
    /// Star placed on the tree
    Chime,
}

/// Short procedurally generated effects - no files needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Synth {
    /// Rubbing the cover off an envelope
    Scratch,
    /// Cover fully removed
    Uncover,
    /// Envelope or star picked up
    Pickup,
    /// Star released off target and springs back
    Bounce,
    /// Secret unlocked
    Sparkle,
}

impl Track {
    /// Name of the preloaded clip backing this track
    pub fn clip_name(self) -> &'static str {
        match self {
            Track::Main => "track-main",
            Track::Finale => "track-finale",
            Track::Secret => "track-secret",
        }
    }
}

impl Clip {
    pub fn clip_name(self) -> &'static str {
        match self {
            Clip::Collect => "sfx-collect",
            Clip::Error => "sfx-error",
            Clip::Chime => "sfx-chime",
        }
    }
}

/// Audio clips in the preload manifest: (name, source)
pub const AUDIO_SOURCES: [(&str, &str); 6] = [
    ("track-main", "audio/main-theme.mp3"),
    ("track-finale", "audio/finale.mp3"),
    ("track-secret", "audio/secret.mp3"),
    ("sfx-collect", "audio/collect.mp3"),
    ("sfx-error", "audio/error.mp3"),
    ("sfx-chime", "audio/chime.mp3"),
];

/// Audio request emitted by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SoundEvent {
    SwitchTrack { track: Track, looped: bool },
    Clip(Clip),
    Synth(Synth),
    StopAll,
}

/// Output device. Implementations must tolerate unknown/missing clips.
pub trait AudioBackend {
    /// Start a track from the beginning
    fn play_track(&mut self, track: Track, looped: bool);
    /// Stop a track and rewind it
    fn stop_track(&mut self, track: Track);
    /// Pause without losing position
    fn pause_track(&mut self, track: Track);
    /// Continue from the paused position
    fn resume_track(&mut self, track: Track);
    /// Play a clip from the beginning (restarting it if already playing)
    fn play_clip(&mut self, clip: Clip);
    fn play_synth(&mut self, synth: Synth);
    /// Called once after the first user gesture
    fn unlock(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveTrack {
    track: Track,
    looped: bool,
    /// Whether the backend has actually started it
    started: bool,
}

/// Playback policy on top of a backend
pub struct AudioFacility<B: AudioBackend> {
    backend: B,
    active: Option<ActiveTrack>,
    muted: bool,
    unlocked: bool,
}

impl<B: AudioBackend> AudioFacility<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: None,
            muted: false,
            unlocked: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn active_track(&self) -> Option<Track> {
        self.active.map(|a| a.track)
    }

    /// Unlock output (first user gesture). Starts a track requested earlier.
    pub fn unlock(&mut self) {
        if self.unlocked {
            return;
        }
        self.unlocked = true;
        self.backend.unlock();
        log::info!("Audio unlocked");
        self.start_pending();
    }

    fn start_pending(&mut self) {
        if !self.unlocked || self.muted {
            return;
        }
        if let Some(active) = self.active.as_mut() {
            if !active.started {
                active.started = true;
                self.backend.play_track(active.track, active.looped);
            }
        }
    }

    /// Replace the background track. The previous one stops and rewinds.
    pub fn switch_track(&mut self, track: Track, looped: bool) {
        if let Some(prev) = self.active.take() {
            if prev.started {
                self.backend.stop_track(prev.track);
            }
        }
        self.active = Some(ActiveTrack {
            track,
            looped,
            started: false,
        });
        if !self.unlocked {
            log::debug!("Track {:?} requested before unlock, deferred", track);
        }
        self.start_pending();
    }

    /// Stop everything (reset)
    pub fn stop_all(&mut self) {
        if let Some(prev) = self.active.take() {
            if prev.started {
                self.backend.stop_track(prev.track);
            }
        }
    }

    pub fn play_clip(&mut self, clip: Clip) {
        if !self.unlocked {
            log::debug!("Clip {:?} before unlock ignored", clip);
            return;
        }
        if !self.muted {
            self.backend.play_clip(clip);
        }
    }

    pub fn play_synth(&mut self, synth: Synth) {
        if !self.unlocked {
            log::debug!("Synth {:?} before unlock ignored", synth);
            return;
        }
        if !self.muted {
            self.backend.play_synth(synth);
        }
    }

    /// Mute/unmute all audio. Returns the new muted state.
    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        if self.muted == muted {
            return;
        }
        self.muted = muted;
        if let Some(active) = self.active {
            if muted && active.started {
                self.backend.pause_track(active.track);
            } else if !muted && active.started && self.unlocked {
                self.backend.resume_track(active.track);
            }
        }
        // A track switched in while muted has not started yet
        self.start_pending();
        log::info!("Audio {}", if muted { "muted" } else { "unmuted" });
    }

    /// Apply a session sound request
    pub fn apply(&mut self, event: SoundEvent) {
        match event {
            SoundEvent::SwitchTrack { track, looped } => self.switch_track(track, looped),
            SoundEvent::Clip(clip) => self.play_clip(clip),
            SoundEvent::Synth(synth) => self.play_synth(synth),
            SoundEvent::StopAll => self.stop_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Play(Track, bool),
        Stop(Track),
        Pause(Track),
        Resume(Track),
        Clip(Clip),
        Synth(Synth),
        Unlock,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl AudioBackend for Recorder {
        fn play_track(&mut self, track: Track, looped: bool) {
            self.calls.push(Call::Play(track, looped));
        }
        fn stop_track(&mut self, track: Track) {
            self.calls.push(Call::Stop(track));
        }
        fn pause_track(&mut self, track: Track) {
            self.calls.push(Call::Pause(track));
        }
        fn resume_track(&mut self, track: Track) {
            self.calls.push(Call::Resume(track));
        }
        fn play_clip(&mut self, clip: Clip) {
            self.calls.push(Call::Clip(clip));
        }
        fn play_synth(&mut self, synth: Synth) {
            self.calls.push(Call::Synth(synth));
        }
        fn unlock(&mut self) {
            self.calls.push(Call::Unlock);
        }
    }

    fn unlocked() -> AudioFacility<Recorder> {
        let mut audio = AudioFacility::new(Recorder::default());
        audio.unlock();
        audio.backend_mut().calls.clear();
        audio
    }

    #[test]
    fn test_plays_before_unlock_are_noops() {
        let mut audio = AudioFacility::new(Recorder::default());
        audio.play_clip(Clip::Collect);
        audio.play_synth(Synth::Scratch);
        audio.switch_track(Track::Main, true);
        assert!(audio.backend().calls.is_empty());

        // Deferred track starts on unlock; effects are not replayed
        audio.unlock();
        assert_eq!(audio.backend().calls, vec![Call::Unlock, Call::Play(Track::Main, true)]);
    }

    #[test]
    fn test_switch_stops_previous() {
        let mut audio = unlocked();
        audio.switch_track(Track::Main, true);
        audio.switch_track(Track::Finale, false);
        assert_eq!(
            audio.backend().calls,
            vec![
                Call::Play(Track::Main, true),
                Call::Stop(Track::Main),
                Call::Play(Track::Finale, false),
            ]
        );
        assert_eq!(audio.active_track(), Some(Track::Finale));
    }

    #[test]
    fn test_mute_pauses_and_resumes_track() {
        let mut audio = unlocked();
        audio.switch_track(Track::Main, true);
        assert!(audio.toggle_mute());
        audio.play_clip(Clip::Error);
        audio.play_synth(Synth::Pickup);
        assert!(!audio.toggle_mute());
        assert_eq!(
            audio.backend().calls,
            vec![
                Call::Play(Track::Main, true),
                Call::Pause(Track::Main),
                Call::Resume(Track::Main),
            ]
        );
    }

    #[test]
    fn test_switch_while_muted_starts_on_unmute() {
        let mut audio = unlocked();
        audio.set_muted(true);
        audio.switch_track(Track::Secret, true);
        assert!(audio.backend().calls.is_empty());
        audio.set_muted(false);
        assert_eq!(audio.backend().calls, vec![Call::Play(Track::Secret, true)]);
    }

    #[test]
    fn test_apply_stop_all() {
        let mut audio = unlocked();
        audio.apply(SoundEvent::SwitchTrack { track: Track::Main, looped: true });
        audio.apply(SoundEvent::Clip(Clip::Collect));
        audio.apply(SoundEvent::StopAll);
        assert_eq!(audio.active_track(), None);
        assert_eq!(audio.backend().calls.last(), Some(&Call::Stop(Track::Main)));
        // Stopping with nothing active is harmless
        audio.stop_all();
    }
}
