//! Browser audio backend
//!
//! Tracks and clips are preloaded `HtmlAudioElement`s; short effects are
//! synthesized with Web Audio oscillators.

use std::collections::HashMap;

use web_sys::{AudioContext, GainNode, HtmlAudioElement, OscillatorNode, OscillatorType};

use super::{AudioBackend, Clip, Synth, Track};

/// Web Audio / media element backend
pub struct WebAudioBackend {
    ctx: Option<AudioContext>,
    clips: HashMap<String, HtmlAudioElement>,
    effect_volume: f32,
    track_volume: f32,
}

impl WebAudioBackend {
    pub fn new(clips: HashMap<String, HtmlAudioElement>, effect_volume: f32, track_volume: f32) -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - synthesized effects disabled");
        }
        Self {
            ctx,
            clips,
            effect_volume: effect_volume.clamp(0.0, 1.0),
            track_volume: track_volume.clamp(0.0, 1.0),
        }
    }

    fn element(&self, name: &str) -> Option<&HtmlAudioElement> {
        let el = self.clips.get(name);
        if el.is_none() {
            log::debug!("Audio clip {} not loaded, skipping", name);
        }
        el
    }

    // === Sound generators ===

    /// Schedule one enveloped oscillator voice starting at `at`: jumps to
    /// `peak` and decays over `len` seconds. The returned oscillator can
    /// still have its pitch automated.
    fn voice(
        &self,
        ctx: &AudioContext,
        wave: OscillatorType,
        freq: f32,
        at: f64,
        peak: f32,
        len: f64,
    ) -> Option<OscillatorNode> {
        let osc = ctx.create_oscillator().ok()?;
        let gain: GainNode = ctx.create_gain().ok()?;
        osc.set_type(wave);
        osc.frequency().set_value_at_time(freq, at).ok()?;
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        let level = gain.gain();
        level.set_value_at_time(0.0, ctx.current_time()).ok()?;
        level.set_value_at_time(peak, at).ok()?;
        level.exponential_ramp_to_value_at_time(0.001, at + len).ok()?;

        osc.start_with_when(at).ok()?;
        osc.stop_with_when(at + len + 0.02).ok()?;
        Some(osc)
    }

    /// Scratch - short noisy rasp
    fn play_scratch(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();
        if let Some(osc) = self.voice(ctx, OscillatorType::Sawtooth, 900.0, t, vol * 0.08, 0.05) {
            let pitch = osc.frequency();
            pitch.set_value_at_time(1400.0, t + 0.015).ok();
            pitch.set_value_at_time(700.0, t + 0.03).ok();
        }
    }

    /// Uncover - rising sparkle pair
    fn play_uncover(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();
        for (i, freq) in [880.0, 1320.0].into_iter().enumerate() {
            self.voice(ctx, OscillatorType::Sine, freq, t + i as f64 * 0.06, vol * 0.2, 0.2);
        }
    }

    /// Pickup - soft upward pop
    fn play_pickup(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();
        if let Some(osc) = self.voice(ctx, OscillatorType::Triangle, 300.0, t, vol * 0.25, 0.08) {
            osc.frequency().exponential_ramp_to_value_at_time(600.0, t + 0.06).ok();
        }
    }

    /// Bounce - the star springing home: three hops, each lower, shorter and quieter
    fn play_bounce(&self, ctx: &AudioContext, vol: f32) {
        let mut at = ctx.current_time();
        let mut freq = 660.0_f32;
        let mut peak = vol * 0.3;
        let mut len = 0.14;
        for _ in 0..3 {
            if let Some(osc) = self.voice(ctx, OscillatorType::Triangle, freq, at, peak, len) {
                osc.frequency()
                    .exponential_ramp_to_value_at_time(freq * 0.6, at + len)
                    .ok();
            }
            at += len * 0.9;
            freq *= 0.75;
            peak *= 0.55;
            len *= 0.7;
        }
    }

    /// Sparkle - ascending arpeggio
    fn play_sparkle(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();
        for (i, freq) in [523.0, 659.0, 784.0, 1047.0, 1319.0].into_iter().enumerate() {
            self.voice(ctx, OscillatorType::Triangle, freq, t + i as f64 * 0.07, vol * 0.22, 0.3);
        }
    }
}

impl AudioBackend for WebAudioBackend {
    fn play_track(&mut self, track: Track, looped: bool) {
        let Some(el) = self.element(track.clip_name()) else { return };
        el.set_loop(looped);
        el.set_volume(self.track_volume as f64);
        el.set_current_time(0.0);
        // play() rejects if the page has not been interacted with; nothing to do then
        let _ = el.play();
    }

    fn stop_track(&mut self, track: Track) {
        let Some(el) = self.element(track.clip_name()) else { return };
        let _ = el.pause();
        el.set_current_time(0.0);
    }

    fn pause_track(&mut self, track: Track) {
        if let Some(el) = self.element(track.clip_name()) {
            let _ = el.pause();
        }
    }

    fn resume_track(&mut self, track: Track) {
        if let Some(el) = self.element(track.clip_name()) {
            let _ = el.play();
        }
    }

    fn play_clip(&mut self, clip: Clip) {
        let Some(el) = self.element(clip.clip_name()) else { return };
        el.set_volume(self.effect_volume as f64);
        el.set_current_time(0.0);
        let _ = el.play();
    }

    fn play_synth(&mut self, synth: Synth) {
        let vol = self.effect_volume;
        if vol <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match synth {
            Synth::Scratch => self.play_scratch(ctx, vol),
            Synth::Uncover => self.play_uncover(ctx, vol),
            Synth::Pickup => self.play_pickup(ctx, vol),
            Synth::Bounce => self.play_bounce(ctx, vol),
            Synth::Sparkle => self.play_sparkle(ctx, vol),
        }
    }

    fn unlock(&mut self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }
}
