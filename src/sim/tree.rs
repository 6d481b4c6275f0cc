//! Ornament slots on the assembled tree
//!
//! Rows widen towards the bottom: 1, 2, 3, ... envelopes per row, centred on
//! x = 50%. The last row may be partial and is centred as well.

use glam::Vec2;

use crate::consts::{TREE_BOTTOM, TREE_HALF_WIDTH, TREE_TOP};

/// Number of rows needed to hold `count` ornaments
fn row_count(count: usize) -> usize {
    let mut rows = 0;
    let mut capacity = 0;
    while capacity < count {
        rows += 1;
        capacity += rows;
    }
    rows
}

/// Slot positions (scene percent) for `count` ornaments, top row first
pub fn ornament_slots(count: usize) -> Vec<Vec2> {
    let rows = row_count(count);
    if rows == 0 {
        return Vec::new();
    }
    let row_step = if rows > 1 {
        (TREE_BOTTOM - TREE_TOP) / (rows - 1) as f32
    } else {
        0.0
    };

    let mut slots = Vec::with_capacity(count);
    let mut remaining = count;
    for row in 0..rows {
        let in_row = (row + 1).min(remaining);
        remaining -= in_row;

        let y = TREE_TOP + row_step * row as f32;
        // Row width follows the silhouette, not the number of ornaments in it
        let half_width = TREE_HALF_WIDTH * (row as f32 / (rows.max(2) - 1) as f32);
        let spacing = if row > 0 { 2.0 * half_width / row as f32 } else { 0.0 };
        let row_width = spacing * (in_row as f32 - 1.0);
        for i in 0..in_row {
            let x = 50.0 - row_width / 2.0 + spacing * i as f32;
            slots.push(Vec2::new(x, y));
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twelve_slots_in_five_rows() {
        let slots = ornament_slots(12);
        assert_eq!(slots.len(), 12);
        assert_eq!(slots[0], Vec2::new(50.0, TREE_TOP));
        // 1 + 2 + 3 + 4 = 10, so the last two sit on the bottom row
        assert_eq!(slots[10].y, TREE_BOTTOM);
        assert_eq!(slots[11].y, TREE_BOTTOM);
        // Partial row is centred
        assert!(((slots[10].x + slots[11].x) / 2.0 - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_slots_within_silhouette() {
        for slot in ornament_slots(12) {
            assert!((slot.x - 50.0).abs() <= TREE_HALF_WIDTH + 1e-4);
            assert!(slot.y >= TREE_TOP && slot.y <= TREE_BOTTOM);
        }
    }

    #[test]
    fn test_degenerate_counts() {
        assert!(ornament_slots(0).is_empty());
        assert_eq!(ornament_slots(1), vec![Vec2::new(50.0, TREE_TOP)]);
    }
}
