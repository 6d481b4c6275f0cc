//! Particle effects
//!
//! Bursts when an envelope is collected, confetti on completion and a slow
//! ambient snowfall once every envelope is read. Purely visual; nothing here
//! feeds back into the session.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Look of a particle burst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstStyle {
    /// Gold sparks around a collected envelope
    Sparkle,
    /// Multicolour confetti for the finale
    Confetti,
    /// Glitter for the secret overlay
    Glitter,
}

/// A particle for visual effects (scene percent space)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: u32,
    /// 0-1, decreases over time
    pub life: f32,
    pub size: f32,
    /// Life lost per second
    decay: f32,
    /// Downward acceleration
    gravity: f32,
}

const SPARKLE_COLORS: [u32; 3] = [0xffd700, 0xfff2a8, 0xffffff];
const CONFETTI_COLORS: [u32; 5] = [0xe63946, 0x2a9d8f, 0xf4a261, 0x457b9d, 0xffd700];
const GLITTER_COLORS: [u32; 3] = [0xc77dff, 0xe0aaff, 0xffffff];
const SNOW_COLOR: u32 = 0xffffff;

/// Snowflakes spawned per second while the ambient layer is on
const SNOW_RATE: f32 = 12.0;

/// Bounded particle pool
#[derive(Debug, Clone, Default)]
pub struct ParticleField {
    particles: Vec<Particle>,
    capacity: usize,
    ambient: bool,
    snow_accumulator: f32,
}

impl ParticleField {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            capacity,
            ambient: false,
            snow_accumulator: 0.0,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Toggle the ambient snowfall layer
    pub fn set_ambient(&mut self, on: bool) {
        self.ambient = on;
        if !on {
            self.snow_accumulator = 0.0;
        }
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.snow_accumulator = 0.0;
    }

    fn push(&mut self, particle: Particle) -> bool {
        if self.particles.len() >= self.capacity {
            return false;
        }
        self.particles.push(particle);
        true
    }

    /// Spawn up to `count` particles at `at`. Returns how many fit.
    pub fn burst<R: Rng + ?Sized>(&mut self, rng: &mut R, at: Vec2, count: usize, style: BurstStyle) -> usize {
        let mut spawned = 0;
        for _ in 0..count {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let (speed, gravity, decay, size, color): (f32, f32, f32, f32, u32) = match style {
                BurstStyle::Sparkle => (
                    rng.random_range(8.0..25.0),
                    10.0,
                    rng.random_range(1.2..2.0),
                    rng.random_range(0.4..0.9),
                    SPARKLE_COLORS[rng.random_range(0..SPARKLE_COLORS.len())],
                ),
                BurstStyle::Confetti => (
                    rng.random_range(20.0..60.0),
                    35.0,
                    rng.random_range(0.3..0.6),
                    rng.random_range(0.6..1.4),
                    CONFETTI_COLORS[rng.random_range(0..CONFETTI_COLORS.len())],
                ),
                BurstStyle::Glitter => (
                    rng.random_range(5.0..15.0),
                    -2.0,
                    rng.random_range(0.5..1.0),
                    rng.random_range(0.3..0.7),
                    GLITTER_COLORS[rng.random_range(0..GLITTER_COLORS.len())],
                ),
            };
            let particle = Particle {
                pos: at,
                vel: Vec2::new(angle.cos(), angle.sin()) * speed,
                color,
                life: 1.0,
                size,
                decay,
                gravity,
            };
            if !self.push(particle) {
                break;
            }
            spawned += 1;
        }
        spawned
    }

    /// Advance particles by `dt` seconds, dropping dead ones
    pub fn update<R: Rng + ?Sized>(&mut self, rng: &mut R, dt: f32) {
        for p in &mut self.particles {
            p.vel.y += p.gravity * dt;
            p.pos += p.vel * dt;
            p.life -= p.decay * dt;
        }
        self.particles
            .retain(|p| p.life > 0.0 && p.pos.y < 110.0 && p.pos.y > -20.0);

        if self.ambient {
            self.snow_accumulator += SNOW_RATE * dt;
            while self.snow_accumulator >= 1.0 {
                self.snow_accumulator -= 1.0;
                let flake = Particle {
                    pos: Vec2::new(rng.random_range(0.0..100.0), -2.0),
                    vel: Vec2::new(rng.random_range(-2.0..2.0), rng.random_range(4.0..9.0)),
                    color: SNOW_COLOR,
                    life: 1.0,
                    size: rng.random_range(0.2..0.6),
                    decay: 0.05,
                    gravity: 0.0,
                };
                if !self.push(flake) {
                    self.snow_accumulator = 0.0;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_burst_respects_capacity() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut field = ParticleField::new(50);
        assert_eq!(field.burst(&mut rng, Vec2::new(50.0, 50.0), 30, BurstStyle::Sparkle), 30);
        assert_eq!(field.burst(&mut rng, Vec2::new(50.0, 50.0), 30, BurstStyle::Confetti), 20);
        assert_eq!(field.len(), 50);
    }

    #[test]
    fn test_particles_expire() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut field = ParticleField::new(100);
        field.burst(&mut rng, Vec2::new(50.0, 50.0), 20, BurstStyle::Sparkle);
        for _ in 0..120 {
            field.update(&mut rng, 1.0 / 60.0);
        }
        assert!(field.is_empty());
    }

    #[test]
    fn test_ambient_snow_bounded() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut field = ParticleField::new(10);
        field.set_ambient(true);
        for _ in 0..600 {
            field.update(&mut rng, 1.0 / 60.0);
            assert!(field.len() <= 10);
        }
        assert!(!field.is_empty());

        field.set_ambient(false);
        field.clear();
        field.update(&mut rng, 1.0);
        assert!(field.is_empty());
    }

    #[test]
    fn test_zero_capacity_spawns_nothing() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut field = ParticleField::new(0);
        assert_eq!(field.burst(&mut rng, Vec2::ZERO, 10, BurstStyle::Glitter), 0);
    }
}
