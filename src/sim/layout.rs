//! Random scene layout
//!
//! Scatter positions, tilt, stack order and the reveal-gated subset are drawn
//! fresh on every reset from the session RNG.

use glam::Vec2;
use rand::Rng;
use rand::seq::index;

use super::state::{LayoutEntry, RevealGate};
use crate::settings::Settings;

/// Draw a scattered layout for `count` envelopes
pub fn assign_layout<R: Rng + ?Sized>(rng: &mut R, count: usize, settings: &Settings) -> Vec<LayoutEntry> {
    let x_range = settings.layout_margin_x..=(100.0 - settings.layout_margin_x);
    let y_range = settings.layout_margin_top..=(100.0 - settings.layout_margin_bottom);
    let max_z = (count as u32 * 10).max(1);

    (0..count)
        .map(|_| LayoutEntry {
            pos: Vec2::new(rng.random_range(x_range.clone()), rng.random_range(y_range.clone())),
            rotation: if settings.max_rotation > 0.0 {
                rng.random_range(-settings.max_rotation..=settings.max_rotation)
            } else {
                0.0
            },
            z: rng.random_range(1..=max_z),
        })
        .collect()
}

/// Choose which envelopes start covered (without replacement)
pub fn assign_gates<R: Rng + ?Sized>(rng: &mut R, count: usize, gated: usize) -> Vec<RevealGate> {
    let mut gates = vec![RevealGate::new(false); count];
    for i in index::sample(rng, count, gated.min(count)) {
        gates[i] = RevealGate::new(true);
    }
    gates
}

/// Bring an envelope to the front. Returns its new stack order.
pub fn raise(layout: &mut [LayoutEntry], index: usize) -> Option<u32> {
    let top = layout.iter().map(|e| e.z).max().unwrap_or(0);
    let tie = layout_has_tie(top, index, layout);
    let entry = layout.get_mut(index)?;
    if entry.z != top || tie {
        entry.z = top + 1;
    }
    Some(entry.z)
}

/// Another envelope shares the top stack order
fn layout_has_tie(top: u32, index: usize, layout: &[LayoutEntry]) -> bool {
    layout
        .iter()
        .enumerate()
        .any(|(i, e)| i != index && e.z == top)
}
