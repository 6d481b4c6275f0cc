//! Asset preloading gate
//!
//! Every manifest entry settles exactly once, either loaded or failed.
//! Failures are logged and counted; they never block readiness. Once the last
//! entry settles, readiness waits a short grace period so the loading screen
//! does not flash away.

#[cfg(target_arch = "wasm32")]
pub mod web;

use serde::Serialize;

use crate::audio::AUDIO_SOURCES;
use crate::catalog::Catalog;
use crate::error::LoadError;

/// Named audio clip source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSource {
    pub name: String,
    pub src: String,
}

/// Everything to load before the first render
#[derive(Debug, Clone, Default, Serialize)]
pub struct Manifest {
    pub images: Vec<String>,
    pub audio: Vec<AudioSource>,
}

impl Manifest {
    /// Catalog images plus the built-in audio clips
    pub fn for_catalog(catalog: &Catalog) -> Self {
        Self {
            images: catalog.image_paths(),
            audio: AUDIO_SOURCES
                .iter()
                .map(|(name, src)| AudioSource {
                    name: name.to_string(),
                    src: src.to_string(),
                })
                .collect(),
        }
    }

    /// Images first, then audio
    pub fn len(&self) -> usize {
        self.images.len() + self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settlement state of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryState {
    Pending,
    Loaded,
    Failed,
}

/// Tracks settlement of a manifest
#[derive(Debug, Clone)]
pub struct Preloader {
    entries: Vec<EntryState>,
    settled: usize,
    failed: usize,
    grace_secs: f32,
    /// Time since the last entry settled
    since_settled: f32,
    ready: bool,
}

impl Preloader {
    pub fn new(manifest: &Manifest, grace_secs: f32) -> Self {
        Self {
            entries: vec![EntryState::Pending; manifest.len()],
            settled: 0,
            failed: 0,
            grace_secs,
            since_settled: 0.0,
            ready: false,
        }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn settled(&self) -> usize {
        self.settled
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn entry(&self, index: usize) -> Option<EntryState> {
        self.entries.get(index).copied()
    }

    /// Record the outcome of entry `index`. Returns the new percentage, or
    /// `None` if the entry was unknown or already settled.
    pub fn settle(&mut self, index: usize, outcome: Result<(), LoadError>) -> Option<u8> {
        let Some(entry) = self.entries.get_mut(index) else {
            log::warn!("Preload settle for unknown entry {}", index);
            return None;
        };
        if *entry != EntryState::Pending {
            log::debug!("Preload entry {} settled twice, ignoring", index);
            return None;
        }
        match outcome {
            Ok(()) => *entry = EntryState::Loaded,
            Err(err) => {
                log::warn!("{}", err);
                *entry = EntryState::Failed;
                self.failed += 1;
            }
        }
        self.settled += 1;
        log::debug!("Preloaded {}/{}", self.settled, self.total());
        Some(self.percent())
    }

    /// Fraction settled (an empty manifest counts as fully settled)
    pub fn progress(&self) -> f32 {
        if self.entries.is_empty() {
            1.0
        } else {
            self.settled as f32 / self.entries.len() as f32
        }
    }

    /// Progress for display, 0-100
    pub fn percent(&self) -> u8 {
        (self.progress() * 100.0).round() as u8
    }

    pub fn all_settled(&self) -> bool {
        self.settled == self.entries.len()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Advance the grace timer. Returns true exactly once, when ready.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.ready || !self.all_settled() {
            return false;
        }
        self.since_settled += dt;
        if self.since_settled >= self.grace_secs {
            self.ready = true;
            log::info!(
                "Assets ready ({} loaded, {} failed)",
                self.settled - self.failed,
                self.failed
            );
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(images: usize, audio: usize) -> Manifest {
        Manifest {
            images: (0..images).map(|i| format!("img/{i}.png")).collect(),
            audio: (0..audio)
                .map(|i| AudioSource {
                    name: format!("clip-{i}"),
                    src: format!("audio/{i}.mp3"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_progress_with_one_failure() {
        let manifest = manifest(3, 2);
        let mut preloader = Preloader::new(&manifest, 0.5);
        assert_eq!(preloader.percent(), 0);

        let outcomes = [
            Ok(()),
            Err(LoadError::Image("img/1.png".to_string())),
            Ok(()),
            Ok(()),
            Ok(()),
        ];
        let mut percents = Vec::new();
        for (i, outcome) in outcomes.into_iter().enumerate() {
            assert!(!preloader.tick(10.0), "ready before last settle");
            percents.push(preloader.settle(i, outcome).unwrap());
        }
        assert_eq!(percents, vec![20, 40, 60, 80, 100]);
        assert_eq!(preloader.failed(), 1);
        assert_eq!(preloader.entry(1), Some(EntryState::Failed));

        // Grace delay before ready, then exactly once
        assert!(!preloader.tick(0.3));
        assert!(preloader.tick(0.3));
        assert!(preloader.is_ready());
        assert!(!preloader.tick(1.0));
    }

    #[test]
    fn test_settle_is_counted_once() {
        let mut preloader = Preloader::new(&manifest(2, 0), 0.0);
        assert_eq!(preloader.settle(0, Ok(())), Some(50));
        assert_eq!(preloader.settle(0, Ok(())), None);
        assert_eq!(preloader.settle(7, Ok(())), None);
        assert_eq!(preloader.settled(), 1);
    }

    #[test]
    fn test_empty_manifest_ready_after_grace() {
        let mut preloader = Preloader::new(&Manifest::default(), 0.2);
        assert_eq!(preloader.percent(), 100);
        assert!(!preloader.tick(0.1));
        assert!(preloader.tick(0.1));
    }

    #[test]
    fn test_catalog_manifest() {
        let catalog = Catalog::builtin().unwrap();
        let manifest = Manifest::for_catalog(&catalog);
        assert_eq!(manifest.images.len(), 12);
        assert_eq!(manifest.audio.len(), AUDIO_SOURCES.len());
    }

    #[test]
    fn test_manifest_paths_live_in_copied_dirs() {
        // index.html copies img/ and audio/ into the bundle
        let manifest = Manifest::for_catalog(&Catalog::builtin().unwrap());
        assert!(manifest.images.iter().all(|p| p.starts_with("img/")));
        assert!(manifest.audio.iter().all(|a| a.src.starts_with("audio/")));
        let dirs = ["img", "audio"].map(|d| std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(d));
        assert!(dirs.iter().all(|d| d.is_dir()));
    }
}
