//! Async driver around one [`RecoveryController`].
//!
//! A single task owns the controller and drains one channel, so transitions
//! happen strictly in arrival order. Resolver calls and timers run as
//! separate tasks that post their outcome back into that channel; each is
//! tied to the cancellation token current when it was spawned.

use std::future::Future;
use std::sync::Arc;

use reelroute_core::ContentRef;
use reelroute_sources::SourceCatalog;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::controller::{Command, Effect, PlayerSignal, RecoveryController, SessionUpdate, Signal};
use crate::resolver::{Resolution, StreamResolver};
use crate::store::{PreferenceStore, WatchProgressStore};
use crate::{PlaybackConfig, PlaybackError};

/// Collaborators injected into a session.
#[derive(Clone)]
pub struct SessionDeps {
    pub catalog: Arc<SourceCatalog>,
    pub resolver: Arc<StreamResolver>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub progress: Arc<dyn WatchProgressStore>,
}

enum Message {
    Open(ContentRef),
    Command(Command),
    Signal(Signal),
    Shutdown,
}

/// Handle to a running playback session.
pub struct PlaybackSession {
    tx: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
    candidates: usize,
}

impl PlaybackSession {
    /// Start the driver task. Every state change is published on the returned receiver.
    pub fn spawn(
        deps: SessionDeps,
        config: PlaybackConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let candidates = deps.catalog.len();

        let driver = Driver {
            controller: RecoveryController::new(deps.catalog.clone(), &config),
            deps,
            tx: tx.downgrade(),
            updates: updates_tx,
            pending: CancellationToken::new(),
        };
        let task = tokio::spawn(driver.run(rx));

        (Self { tx, task, candidates }, updates_rx)
    }

    /// Play `content`, replacing whatever was open. The source preference is read here.
    pub fn open(&self, content: ContentRef) -> Result<(), PlaybackError> {
        self.send(Message::Open(content))
    }

    pub fn player_ready(&self, token: u64) -> Result<(), PlaybackError> {
        self.player(token, PlayerSignal::Ready)
    }

    pub fn player_error(&self, token: u64, reason: impl Into<String>) -> Result<(), PlaybackError> {
        self.player(token, PlayerSignal::Error(reason.into()))
    }

    pub fn user_interacted(&self, token: u64) -> Result<(), PlaybackError> {
        self.player(token, PlayerSignal::UserInteracted)
    }

    pub fn next_source(&self) -> Result<(), PlaybackError> {
        self.command(Command::NextSource)
    }

    /// Switch to candidate `index`, counted from zero in catalog order.
    pub fn select_source(&self, index: usize) -> Result<(), PlaybackError> {
        if index >= self.candidates {
            return Err(PlaybackError::UnknownCandidate(index));
        }
        self.command(Command::SelectSource(index))
    }

    pub fn select_quality(&self, name: impl Into<String>) -> Result<(), PlaybackError> {
        self.command(Command::SelectQuality(name.into()))
    }

    pub fn retry(&self) -> Result<(), PlaybackError> {
        self.command(Command::Retry)
    }

    /// Navigate away: cancel pending work and return to idle.
    pub fn close(&self) -> Result<(), PlaybackError> {
        self.command(Command::Stop)
    }

    /// Stop the driver and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Err(e) = self.task.await {
            warn!(error = %e, "playback session task failed");
        }
    }

    fn player(&self, token: u64, signal: PlayerSignal) -> Result<(), PlaybackError> {
        self.send(Message::Signal(Signal::Player { token, signal }))
    }

    fn command(&self, command: Command) -> Result<(), PlaybackError> {
        self.send(Message::Command(command))
    }

    fn send(&self, message: Message) -> Result<(), PlaybackError> {
        self.tx
            .send(message)
            .map_err(|_| PlaybackError::SessionClosed)
    }
}

struct Driver {
    controller: RecoveryController,
    deps: SessionDeps,
    /// Weak so the loop ends once every handle and in-flight task is gone.
    tx: mpsc::WeakUnboundedSender<Message>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    pending: CancellationToken,
}

impl Driver {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        while let Some(message) = rx.recv().await {
            let effects = match message {
                Message::Open(content) => {
                    let preference = match self.deps.preferences.get().await {
                        Ok(pref) => pref,
                        Err(e) => {
                            warn!(error = %e, "source preference unavailable");
                            None
                        }
                    };
                    self.controller.handle_command(Command::Start {
                        content,
                        preference,
                    })
                }
                Message::Command(command) => self.controller.handle_command(command),
                Message::Signal(signal) => self.controller.handle_signal(signal),
                Message::Shutdown => break,
            };
            self.apply(effects).await;
        }

        self.pending.cancel();
        debug!("playback session ended");
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CancelPending => {
                    self.pending.cancel();
                    self.pending = CancellationToken::new();
                }
                Effect::LookupExternalId { token, content } => {
                    let resolver = self.deps.resolver.clone();
                    self.spawn_guarded(async move {
                        let external_id = resolver.lookup_external_id(&content).await;
                        Signal::ExternalIdResolved { token, external_id }
                    });
                }
                Effect::Resolve {
                    token,
                    content,
                    index,
                } => {
                    let Some(candidate) = self.deps.catalog.candidate(index).cloned() else {
                        continue;
                    };
                    let resolver = self.deps.resolver.clone();
                    self.spawn_guarded(async move {
                        let result = resolver
                            .resolve_target(&content, &candidate)
                            .await
                            .map(|target| Resolution {
                                target,
                                external_id: None,
                            });
                        Signal::Resolved { token, result }
                    });
                }
                Effect::ArmGraceTimer { token, after } => {
                    self.spawn_guarded(async move {
                        tokio::time::sleep(after).await;
                        Signal::GraceElapsed { token }
                    });
                }
                Effect::ScheduleRotation { token, after } => {
                    self.spawn_guarded(async move {
                        tokio::time::sleep(after).await;
                        Signal::RotationDue { token }
                    });
                }
                Effect::PersistPreference(pref) => {
                    if let Err(e) = self.deps.preferences.set(&pref).await {
                        warn!(provider = %pref.provider_name, host = %pref.host, error = %e, "failed to persist source preference");
                    }
                }
                Effect::MarkWatched { native_id, episode } => {
                    if let Err(e) = self.deps.progress.mark_watched(&native_id, episode).await {
                        warn!(native_id = %native_id, %episode, error = %e, "failed to mark episode watched");
                    }
                }
                Effect::Publish(update) => {
                    if self.updates.send(update).is_err() {
                        debug!("update receiver dropped");
                    }
                }
            }
        }
    }

    /// Run `work` unless the current pending token is cancelled first.
    fn spawn_guarded<F>(&self, work: F)
    where
        F: Future<Output = Signal> + Send + 'static,
    {
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let cancel = self.pending.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                signal = work => {
                    let _ = tx.send(Message::Signal(signal));
                }
            }
        });
    }
}
