//! Experience settings and tuning
//!
//! Every field has a default; the host page may override any subset by
//! passing a JSON object (unknown keys are ignored).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 80,
            QualityPreset::Medium => 300,
            QualityPreset::High => 1200,
        }
    }

    /// Whether the ambient snowfall layer is drawn
    pub fn ambient_enabled(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }
}

/// Experience settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Particle effects (bursts, confetti, snow)
    pub particles: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,

    // === Gestures ===
    /// Max per-axis pointer travel (px) for a press to count as a tap
    pub tap_max_distance: f32,
    /// Max press duration (seconds) for a tap
    pub tap_max_duration: f64,

    // === Collection ===
    /// How long an out-of-order envelope shakes (seconds)
    pub error_flash_secs: f32,
    /// Envelopes that start covered
    pub reveal_gated_count: usize,
    /// Cover removed per rub (0.0 - 1.0)
    pub reveal_step: f32,

    // === Layout (scene percent) ===
    pub layout_margin_x: f32,
    pub layout_margin_top: f32,
    pub layout_margin_bottom: f32,
    /// Envelopes are tilted within +/- this many degrees
    pub max_rotation: f32,

    // === Star topper ===
    pub star_anchor: Vec2,
    pub topper_origin: Vec2,
    /// Release distance from the anchor that still counts as placed
    pub topper_capture_radius: f32,

    // === Timing ===
    /// Pause after the last asset settles before the scene shows
    pub preload_grace_secs: f32,
    /// Typewriter speed for opened messages
    pub text_chars_per_sec: f32,

    // === Effects ===
    pub collect_burst: usize,
    pub confetti_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,

            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.6,

            tap_max_distance: 10.0,
            tap_max_duration: 0.3,

            error_flash_secs: 0.5,
            reveal_gated_count: 3,
            reveal_step: 0.05,

            layout_margin_x: 10.0,
            layout_margin_top: 15.0,
            layout_margin_bottom: 15.0,
            max_rotation: 25.0,

            star_anchor: Vec2::new(50.0, 14.0),
            topper_origin: Vec2::new(50.0, 90.0),
            topper_capture_radius: 8.0,

            preload_grace_secs: 0.5,
            text_chars_per_sec: 40.0,

            collect_burst: 24,
            confetti_count: 160,
        }
    }
}

impl Settings {
    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;

        // Low preset trims the celebration effects
        if preset == QualityPreset::Low {
            self.collect_burst = self.collect_burst.min(8);
            self.confetti_count = self.confetti_count.min(40);
        }
    }

    /// Parse a (partial) settings object supplied by the host page.
    /// The chosen quality preset is applied on top of the parsed values.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.apply_preset(settings.quality);
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the session cannot work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.reveal_step > 0.0 && self.reveal_step <= 1.0) {
            return Err(SettingsError::Invalid {
                field: "reveal_step",
                reason: "must be in (0, 1]",
            });
        }
        if self.tap_max_distance <= 0.0 || self.tap_max_duration <= 0.0 {
            return Err(SettingsError::Invalid {
                field: "tap_max_distance",
                reason: "tap thresholds must be positive",
            });
        }
        if self.layout_margin_x * 2.0 >= 100.0
            || self.layout_margin_top + self.layout_margin_bottom >= 100.0
        {
            return Err(SettingsError::Invalid {
                field: "layout_margin_x",
                reason: "margins leave no room for envelopes",
            });
        }
        if self.topper_capture_radius < 0.0 {
            return Err(SettingsError::Invalid {
                field: "topper_capture_radius",
                reason: "must not be negative",
            });
        }
        Ok(())
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    /// Effective ambient layer (respects quality and the particle toggle)
    pub fn effective_ambient(&self) -> bool {
        self.particles && self.quality.ambient_enabled()
    }

    /// Volume applied to short effects
    pub fn effect_volume(&self) -> f32 {
        (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
    }

    /// Volume applied to background tracks
    pub fn track_volume(&self) -> f32 {
        (self.master_volume * self.music_volume).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "reveal_step": 0.25, "quality": "High" }"#).unwrap();
        assert_eq!(settings.reveal_step, 0.25);
        assert_eq!(settings.quality, QualityPreset::High);
        assert_eq!(settings.reveal_gated_count, 3);
        assert_eq!(settings.star_anchor, Vec2::new(50.0, 14.0));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Settings::from_json(r#"{ "reveal_step": 0.0 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "reveal_step", .. }));
        assert!(matches!(Settings::from_json("nope"), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_low_preset_trims_effects() {
        let settings = Settings::from_json(r#"{ "quality": "Low" }"#).unwrap();
        assert_eq!(settings.max_particles(), 80);
        assert!(!settings.effective_ambient());
        assert_eq!(settings.confetti_count, 40);
        assert_eq!(settings.collect_burst, 8);

        // Smaller explicit values survive the trim
        let settings = Settings::from_json(r#"{ "quality": "Low", "confetti_count": 12 }"#).unwrap();
        assert_eq!(settings.confetti_count, 12);

        let high = Settings::from_json(r#"{ "quality": "High" }"#).unwrap();
        assert_eq!(high.confetti_count, 160);

        let mut off = Settings::default();
        off.particles = false;
        assert_eq!(off.max_particles(), 0);
    }
}
