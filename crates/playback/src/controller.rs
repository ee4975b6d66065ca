//! Source rotation and playback recovery as a synchronous state machine.
//!
//! The controller performs no I/O and owns no timers. Callers feed it
//! [`Command`]s and token-tagged [`Signal`]s in arrival order and execute the
//! returned [`Effect`]s. Every attempt gets a fresh token from a counter that
//! is never reset, so a signal carrying any other token is dropped.

use std::sync::Arc;
use std::time::Duration;

use reelroute_core::{ContentRef, EpisodeKey, PersistedPreference};
use reelroute_sources::SourceCatalog;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::manifest::QualityVariant;
use crate::resolver::{PlaybackTarget, Resolution, ResolutionError};
use crate::PlaybackConfig;

/// The only failure text a viewer ever sees.
pub const UNAVAILABLE_MESSAGE: &str = "Unable to load stream, try again";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Resolving { index: usize },
    Playing { index: usize },
    Recovering { index: usize, attempt_count: usize },
    /// Absorbing until retry or a manual source change.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    /// Waiting on the external id before any provider lookup.
    ResolvingMetadata,
    ResolvingManifest,
    AwaitingPlayerSignal,
    Ready,
    Failed,
}

/// One resolution/playback cycle against a single candidate.
#[derive(Debug, Clone)]
pub struct PlaybackAttempt {
    pub token: u64,
    pub candidate_index: usize,
    pub phase: AttemptPhase,
    pub target: Option<PlaybackTarget>,
    pub started_at: Instant,
}

impl PlaybackAttempt {
    pub fn manifest_url(&self) -> Option<&url::Url> {
        self.target.as_ref().and_then(|t| t.manifest_url.as_ref())
    }

    pub fn embed_url(&self) -> Option<&url::Url> {
        self.target.as_ref().map(|t| &t.embed_url)
    }

    fn is_resolving(&self) -> bool {
        matches!(
            self.phase,
            AttemptPhase::ResolvingMetadata | AttemptPhase::ResolvingManifest
        )
    }
}

/// Manual actions and lifecycle requests. These carry no token.
#[derive(Debug, Clone)]
pub enum Command {
    Start {
        content: ContentRef,
        preference: Option<PersistedPreference>,
    },
    NextSource,
    SelectSource(usize),
    SelectQuality(String),
    Retry,
    Stop,
}

/// What the player surface reports about the target it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSignal {
    Ready,
    Error(String),
    UserInteracted,
}

/// Asynchronous outcomes, each tagged with the attempt that produced it.
#[derive(Debug, Clone)]
pub enum Signal {
    /// Outcome of the external id lookup; `None` when the catalog has none.
    ExternalIdResolved {
        token: u64,
        external_id: Option<String>,
    },
    Resolved {
        token: u64,
        result: Result<Resolution, ResolutionError>,
    },
    Player {
        token: u64,
        signal: PlayerSignal,
    },
    GraceElapsed {
        token: u64,
    },
    RotationDue {
        token: u64,
    },
}

impl Signal {
    pub fn token(&self) -> u64 {
        match self {
            Signal::ExternalIdResolved { token, .. }
            | Signal::Resolved { token, .. }
            | Signal::Player { token, .. }
            | Signal::GraceElapsed { token }
            | Signal::RotationDue { token } => *token,
        }
    }
}

/// Work the caller must carry out, in order.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Cancel every timer and fetch spawned for earlier effects.
    CancelPending,
    /// Fetch the external id that the candidate needs before resolving.
    LookupExternalId {
        token: u64,
        content: ContentRef,
    },
    /// Resolve the target using only the ids `content` already carries.
    Resolve {
        token: u64,
        content: ContentRef,
        index: usize,
    },
    ArmGraceTimer {
        token: u64,
        after: Duration,
    },
    ScheduleRotation {
        token: u64,
        after: Duration,
    },
    PersistPreference(PersistedPreference),
    MarkWatched {
        native_id: String,
        episode: EpisodeKey,
    },
    Publish(SessionUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    PlayerError { reason: String },
    GraceWindowTimeout,
    Resolution { message: String },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::PlayerError { reason } => write!(f, "player error: {reason}"),
            FailureReason::GraceWindowTimeout => write!(f, "no ready signal within grace window"),
            FailureReason::Resolution { message } => write!(f, "resolution failed: {message}"),
        }
    }
}

/// Everything the player surface needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionUpdate {
    State {
        state: PlaybackState,
        attempt_count: usize,
        user_intervened: bool,
    },
    TargetAssigned {
        token: u64,
        target: PlaybackTarget,
    },
    QualitySelected {
        token: u64,
        variant: QualityVariant,
    },
    AttemptFailed {
        token: u64,
        candidate_index: usize,
        reason: FailureReason,
        /// Automatic rotation was held back by a manual intervention.
        suppressed: bool,
    },
    Unavailable {
        message: String,
    },
}

pub struct RecoveryController {
    catalog: Arc<SourceCatalog>,
    grace_window: Duration,
    rotation_delay: Duration,
    content: Option<ContentRef>,
    state: PlaybackState,
    attempt: Option<PlaybackAttempt>,
    attempt_count: usize,
    user_intervened: bool,
    next_token: u64,
}

impl RecoveryController {
    pub fn new(catalog: Arc<SourceCatalog>, config: &PlaybackConfig) -> Self {
        Self {
            catalog,
            grace_window: config.grace_window,
            rotation_delay: config.rotation_delay,
            content: None,
            state: PlaybackState::Idle,
            attempt: None,
            attempt_count: 0,
            user_intervened: false,
            next_token: 1,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn content(&self) -> Option<&ContentRef> {
        self.content.as_ref()
    }

    pub fn attempt(&self) -> Option<&PlaybackAttempt> {
        self.attempt.as_ref()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempt_count
    }

    pub fn user_intervened(&self) -> bool {
        self.user_intervened
    }

    pub fn current_token(&self) -> Option<u64> {
        self.attempt.as_ref().map(|a| a.token)
    }

    pub fn handle_command(&mut self, command: Command) -> Vec<Effect> {
        let mut effects = Vec::new();
        match command {
            Command::Start {
                content,
                preference,
            } => {
                let index = preference
                    .as_ref()
                    .and_then(|p| self.catalog.index_of(p))
                    .unwrap_or(0);
                info!(content = %content, index, "playback opened");
                self.content = Some(content);
                self.attempt = None;
                self.attempt_count = 0;
                self.user_intervened = false;
                self.begin_attempt(index, &mut effects);
            }
            Command::Stop => {
                if self.content.is_none() && self.state == PlaybackState::Idle {
                    return effects;
                }
                info!("playback closed");
                effects.push(Effect::CancelPending);
                self.content = None;
                self.attempt = None;
                self.attempt_count = 0;
                self.user_intervened = false;
                self.set_state(PlaybackState::Idle, &mut effects);
            }
            Command::NextSource => {
                if self.content.is_none() {
                    debug!("next source ignored, nothing open");
                    return effects;
                }
                let from = self.attempt.as_ref().map_or(0, |a| a.candidate_index);
                if self.state == PlaybackState::Exhausted {
                    self.attempt_count = 0;
                }
                self.user_intervened = true;
                self.attempt_count += 1;
                let next = self.catalog.next_index(from);
                info!(from, next, "manual next source");
                self.begin_attempt(next, &mut effects);
            }
            Command::SelectSource(index) => {
                if self.content.is_none() {
                    debug!("source selection ignored, nothing open");
                    return effects;
                }
                if index >= self.catalog.len() {
                    warn!(index, candidates = self.catalog.len(), "no such source");
                    return effects;
                }
                if self.state == (PlaybackState::Playing { index }) {
                    self.intervene(&mut effects);
                    return effects;
                }
                info!(index, "manual source selection");
                self.user_intervened = true;
                self.attempt_count = 0;
                self.begin_attempt(index, &mut effects);
            }
            Command::SelectQuality(name) => {
                let Some(attempt) = self.attempt.as_ref() else {
                    return effects;
                };
                let Some(variant) = attempt
                    .target
                    .as_ref()
                    .and_then(|t| t.variant(&name))
                    .cloned()
                else {
                    warn!(quality = %name, "quality not offered by current target");
                    return effects;
                };
                let token = attempt.token;
                self.intervene(&mut effects);
                effects.push(Effect::Publish(SessionUpdate::QualitySelected { token, variant }));
            }
            Command::Retry => {
                if self.content.is_none() {
                    debug!("retry ignored, nothing open");
                    return effects;
                }
                info!("manual retry");
                self.attempt_count = 0;
                self.user_intervened = false;
                self.begin_attempt(0, &mut effects);
            }
        }
        effects
    }

    pub fn handle_signal(&mut self, signal: Signal) -> Vec<Effect> {
        let mut effects = Vec::new();
        let token = signal.token();
        let current = self.current_token();
        if current != Some(token) {
            debug!(token, ?current, "stale signal dropped");
            return effects;
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return effects;
        };

        match signal {
            Signal::ExternalIdResolved { external_id, .. } => {
                if attempt.phase != AttemptPhase::ResolvingMetadata {
                    debug!(token, phase = ?attempt.phase, "external id outside metadata phase");
                    return effects;
                }
                self.on_external_id(external_id, &mut effects);
            }
            Signal::Resolved { result, .. } => {
                if !attempt.is_resolving() {
                    return effects;
                }
                match result {
                    Ok(resolution) => self.on_resolved(resolution, &mut effects),
                    Err(e) => {
                        attempt.phase = AttemptPhase::Failed;
                        let reason = FailureReason::Resolution {
                            message: e.to_string(),
                        };
                        self.on_failure(reason, &mut effects);
                    }
                }
            }
            Signal::Player { signal, .. } => match signal {
                PlayerSignal::Ready => {
                    if attempt.phase == AttemptPhase::AwaitingPlayerSignal {
                        self.on_ready(&mut effects);
                    } else {
                        debug!(token, phase = ?attempt.phase, "ready ignored");
                    }
                }
                PlayerSignal::Error(reason) => {
                    if matches!(
                        attempt.phase,
                        AttemptPhase::AwaitingPlayerSignal | AttemptPhase::Ready
                    ) {
                        self.on_failure(FailureReason::PlayerError { reason }, &mut effects);
                    } else {
                        // no target assigned yet, so the player cannot be showing this attempt
                        debug!(token, phase = ?attempt.phase, %reason, "player error before target");
                    }
                }
                PlayerSignal::UserInteracted => self.intervene(&mut effects),
            },
            Signal::GraceElapsed { .. } => {
                if attempt.phase == AttemptPhase::AwaitingPlayerSignal {
                    self.on_failure(FailureReason::GraceWindowTimeout, &mut effects);
                }
            }
            Signal::RotationDue { .. } => {
                if attempt.phase != AttemptPhase::Failed
                    || !matches!(self.state, PlaybackState::Recovering { .. })
                {
                    return effects;
                }
                if self.user_intervened {
                    // viewer took over while recovering; only manual actions move on
                    info!(token, "rotation held after user intervention");
                    effects.push(Effect::Publish(self.snapshot()));
                } else {
                    self.rotate(&mut effects);
                }
            }
        }
        effects
    }

    fn begin_attempt(&mut self, index: usize, effects: &mut Vec<Effect>) {
        let (Some(content), Some(candidate)) = (self.content.as_ref(), self.catalog.candidate(index))
        else {
            return;
        };

        let token = self.next_token;
        self.next_token += 1;

        let phase = if content.external_id().is_none() && candidate.provider.needs_external_id() {
            AttemptPhase::ResolvingMetadata
        } else {
            AttemptPhase::ResolvingManifest
        };
        debug!(token, candidate = %candidate, ?phase, "attempt started");

        let content = content.clone();
        self.attempt = Some(PlaybackAttempt {
            token,
            candidate_index: index,
            phase,
            target: None,
            started_at: Instant::now(),
        });

        effects.push(Effect::CancelPending);
        self.set_state(PlaybackState::Resolving { index }, effects);
        if phase == AttemptPhase::ResolvingMetadata {
            effects.push(Effect::LookupExternalId { token, content });
        } else {
            effects.push(Effect::Resolve {
                token,
                content,
                index,
            });
        }
    }

    /// Metadata step done: cache what was found and move on to the target.
    fn on_external_id(&mut self, external_id: Option<String>, effects: &mut Vec<Effect>) {
        let (Some(attempt), Some(content)) = (self.attempt.as_mut(), self.content.as_mut()) else {
            return;
        };
        match external_id {
            Some(id) => content.set_external_id(id),
            None => debug!(token = attempt.token, "no external id, resolving without it"),
        }
        attempt.phase = AttemptPhase::ResolvingManifest;
        effects.push(Effect::Resolve {
            token: attempt.token,
            content: content.clone(),
            index: attempt.candidate_index,
        });
    }

    fn on_resolved(&mut self, resolution: Resolution, effects: &mut Vec<Effect>) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        if let (Some(content), Some(id)) = (self.content.as_mut(), resolution.external_id) {
            content.set_external_id(id);
        }

        attempt.phase = AttemptPhase::AwaitingPlayerSignal;
        attempt.target = Some(resolution.target.clone());
        debug!(
            token = attempt.token,
            url = %resolution.target.playable_url(),
            variants = resolution.target.quality_variants.len(),
            "target assigned"
        );

        effects.push(Effect::Publish(SessionUpdate::TargetAssigned {
            token: attempt.token,
            target: resolution.target,
        }));
        effects.push(Effect::ArmGraceTimer {
            token: attempt.token,
            after: self.grace_window,
        });
    }

    fn on_ready(&mut self, effects: &mut Vec<Effect>) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        attempt.phase = AttemptPhase::Ready;
        let index = attempt.candidate_index;
        let elapsed = attempt.started_at.elapsed();

        effects.push(Effect::CancelPending);
        self.set_state(PlaybackState::Playing { index }, effects);

        if let Some(candidate) = self.catalog.candidate(index) {
            info!(candidate = %candidate, elapsed_ms = elapsed.as_millis() as u64, "playback confirmed");
            effects.push(Effect::PersistPreference(candidate.preference()));
        }
        if let Some(content) = self.content.as_ref() {
            if let Some(episode) = content.episode_key() {
                effects.push(Effect::MarkWatched {
                    native_id: content.native_id().to_string(),
                    episode,
                });
            }
        }
    }

    /// Automatic failure: rotate unless the viewer has taken over.
    fn on_failure(&mut self, reason: FailureReason, effects: &mut Vec<Effect>) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        let token = attempt.token;
        let index = attempt.candidate_index;

        if self.user_intervened {
            info!(token, index, %reason, "automatic rotation suppressed");
            effects.push(Effect::Publish(SessionUpdate::AttemptFailed {
                token,
                candidate_index: index,
                reason,
                suppressed: true,
            }));
            return;
        }

        attempt.phase = AttemptPhase::Failed;
        self.attempt_count += 1;
        warn!(token, index, attempt_count = self.attempt_count, %reason, "attempt failed");

        effects.push(Effect::CancelPending);
        effects.push(Effect::Publish(SessionUpdate::AttemptFailed {
            token,
            candidate_index: index,
            reason,
            suppressed: false,
        }));
        self.set_state(
            PlaybackState::Recovering {
                index,
                attempt_count: self.attempt_count,
            },
            effects,
        );
        effects.push(Effect::ScheduleRotation {
            token,
            after: self.rotation_delay,
        });
    }

    fn rotate(&mut self, effects: &mut Vec<Effect>) {
        let Some(from) = self.attempt.as_ref().map(|a| a.candidate_index) else {
            return;
        };
        if self.attempt_count >= self.catalog.len() {
            warn!(attempts = self.attempt_count, "every source failed");
            self.attempt = None;
            effects.push(Effect::CancelPending);
            self.set_state(PlaybackState::Exhausted, effects);
            effects.push(Effect::Publish(SessionUpdate::Unavailable {
                message: UNAVAILABLE_MESSAGE.to_string(),
            }));
            return;
        }
        let next = self.catalog.next_index(from);
        self.begin_attempt(next, effects);
    }

    fn intervene(&mut self, effects: &mut Vec<Effect>) {
        if !self.user_intervened {
            debug!("user intervened, automatic rotation disabled");
            self.user_intervened = true;
            effects.push(Effect::Publish(self.snapshot()));
        }
    }

    fn set_state(&mut self, state: PlaybackState, effects: &mut Vec<Effect>) {
        self.state = state;
        effects.push(Effect::Publish(self.snapshot()));
    }

    fn snapshot(&self) -> SessionUpdate {
        SessionUpdate::State {
            state: self.state,
            attempt_count: self.attempt_count,
            user_intervened: self.user_intervened,
        }
    }
}
