#![allow(clippy::collapsible_if)]
pub mod controller;
pub mod episodes;
pub mod manifest;
pub mod resolver;
pub mod session;
pub mod store;

pub use controller::{
    AttemptPhase, Command, Effect, FailureReason, PlaybackAttempt, PlaybackState, PlayerSignal,
    RecoveryController, SessionUpdate, Signal,
};
pub use episodes::EpisodeNavigator;
pub use manifest::{HttpManifestLoader, ManifestLoader, QualityVariant};
pub use resolver::{PlaybackTarget, Resolution, ResolutionError, StreamResolver};
pub use session::{PlaybackSession, SessionDeps};
pub use store::{MemoryStore, PreferenceStore, SqliteStore, StoreError, WatchProgressStore};

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("playback session closed")]
    SessionClosed,
    #[error("no candidate at index {0}")]
    UnknownCandidate(usize),
}

/// Timing knobs for resolution and recovery.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Time allowed for a ready signal after a target is assigned.
    pub grace_window: Duration,
    /// How long `Recovering` is held before the next candidate resolves.
    pub rotation_delay: Duration,
    pub metadata_timeout: Duration,
    /// Applies separately to manifest lookup and manifest download.
    pub manifest_timeout: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            grace_window: Duration::from_secs(5),
            rotation_delay: Duration::from_millis(500),
            metadata_timeout: Duration::from_secs(8),
            manifest_timeout: Duration::from_secs(8),
        }
    }
}
