//! Typewriter reveal for an opened envelope's message

use serde::Serialize;

use crate::catalog::ItemId;

/// Progress of the currently opened message
#[derive(Debug, Clone, Serialize)]
pub struct MessageReader {
    item: ItemId,
    /// Characters in the message
    total: usize,
    /// Fractional characters revealed so far
    revealed: f32,
    chars_per_sec: f32,
}

impl MessageReader {
    pub fn open(item: ItemId, message: &str, chars_per_sec: f32) -> Self {
        Self {
            item,
            total: message.chars().count(),
            revealed: 0.0,
            chars_per_sec,
        }
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    /// Advance the reveal by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        if self.chars_per_sec <= 0.0 {
            self.skip();
            return;
        }
        self.revealed = (self.revealed + self.chars_per_sec * dt).min(self.total as f32);
    }

    /// Reveal the whole message at once
    pub fn skip(&mut self) {
        self.revealed = self.total as f32;
    }

    /// Whole characters currently visible
    pub fn visible_chars(&self) -> usize {
        (self.revealed.floor() as usize).min(self.total)
    }

    pub fn is_complete(&self) -> bool {
        self.visible_chars() == self.total
    }

    /// Prefix of `message` currently visible
    pub fn visible<'a>(&self, message: &'a str) -> &'a str {
        match message.char_indices().nth(self.visible_chars()) {
            Some((byte, _)) => &message[..byte],
            None => message,
        }
    }
}
