//! Input recognition
//!
//! Two independent recognizers:
//! - `GestureTracker` tells a tap from a drag using travel and duration
//! - `SecretCode` watches the rolling token stream for the secret sequence

use std::collections::VecDeque;

use glam::Vec2;

use crate::consts::{SECRET_CODE, SECRET_CODE_LEN};

/// Result of a press/release pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Short, nearly stationary press
    Tap,
    /// Anything else; position was already applied during the drag
    DragEnd,
    /// Release without a matching press
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct Press {
    pos: Vec2,
    time: f64,
}

/// Classifies a press/move/release stream as tap or drag
#[derive(Debug, Clone)]
pub struct GestureTracker {
    max_distance: f32,
    max_duration: f64,
    press: Option<Press>,
}

impl GestureTracker {
    pub fn new(max_distance: f32, max_duration: f64) -> Self {
        Self {
            max_distance,
            max_duration,
            press: None,
        }
    }

    /// Record the press point (screen px) and time (seconds)
    pub fn press(&mut self, pos: Vec2, time: f64) {
        self.press = Some(Press { pos, time });
    }

    /// Forget the current press without classifying it
    pub fn cancel(&mut self) {
        self.press = None;
    }

    /// Classify the release against the recorded press
    pub fn release(&mut self, pos: Vec2, time: f64) -> Gesture {
        let Some(press) = self.press.take() else {
            return Gesture::Ignored;
        };
        let delta = (pos - press.pos).abs();
        let elapsed = time - press.time;
        if delta.x < self.max_distance && delta.y < self.max_distance && elapsed < self.max_duration {
            Gesture::Tap
        } else {
            Gesture::DragEnd
        }
    }
}

/// Normalize a key name or virtual button id into a code token
///
/// `ArrowUp`, `up`, `KeyB` and `B` all normalize to their short form.
pub fn normalize_token(raw: &str) -> String {
    let token = raw.trim().to_lowercase();
    if let Some(rest) = token.strip_prefix("arrow") {
        return rest.to_string();
    }
    if let Some(rest) = token.strip_prefix("key") {
        if rest.len() == 1 {
            return rest.to_string();
        }
    }
    token
}

/// Rolling input buffer matched against the secret sequence
#[derive(Debug, Clone, Default)]
pub struct SecretCode {
    buffer: VecDeque<String>,
}

impl SecretCode {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(SECRET_CODE_LEN),
        }
    }

    /// Append a token. Returns true (and clears) when the trailing
    /// tokens match the secret sequence.
    pub fn push(&mut self, raw: &str) -> bool {
        let token = normalize_token(raw);
        if token.is_empty() {
            return false;
        }
        // Only the trailing K tokens are ever compared
        if self.buffer.len() == SECRET_CODE_LEN {
            self.buffer.pop_front();
        }
        self.buffer.push_back(token);

        let matched = self.buffer.len() == SECRET_CODE_LEN
            && self.buffer.iter().zip(SECRET_CODE).all(|(have, want)| have == want);
        if matched {
            self.buffer.clear();
        }
        matched
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
