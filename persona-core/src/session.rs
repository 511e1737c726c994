//! Session - the primary public API for the persona pipeline.
//!
//! This module wraps the service clients, the orchestrator and the run
//! state into a single object with two workflows: memory extraction and
//! personality generation.

use crate::config::SessionConfig;
use crate::orchestrator::{GenerationReport, PersonalityOrchestrator, RunEvent};
use crate::pacing::{FixedDelay, Pacing};
use crate::service::{HealthCheck, MemoryExtractor, PersonalityGenerator};
use crate::state::{RunGuard, RunKind, RunState};
use crate::transcript;
use guppshupp::{ExtractedMemories, Guppshupp, Health, PersonalityKind};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors from Session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Memory extraction failed: {0}")]
    Extraction(#[from] guppshupp::Error),

    #[error("No memories extracted yet - run an extraction first")]
    MissingMemories,

    #[error("Session busy: {0} in progress")]
    Busy(RunKind),

    #[error("Health check failed: {0}")]
    Health(guppshupp::Error),

    #[error("No health check configured")]
    NoHealthCheck,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// A persona session.
///
/// Owns the run state and is its only writer. Every state-changing call
/// claims the run slot for its whole duration, so runs never overlap even
/// when the session is shared between tasks.
pub struct Session {
    extractor: Arc<dyn MemoryExtractor>,
    orchestrator: PersonalityOrchestrator,
    health: Option<Arc<dyn HealthCheck>>,
    state: watch::Sender<RunState>,
}

impl Session {
    /// Create a session talking to the service described by `config`.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let client = Guppshupp::with_timeouts(
            &config.base_url,
            config.request_timeout,
            config.connect_timeout,
        )
        .map_err(|e| SessionError::Config(e.to_string()))?;
        let client = Arc::new(client);

        let pacing = FixedDelay::new(config.pacing_interval)
            .with_rate_limit_backoff(config.rate_limit_backoff);

        Ok(
            Self::with_services(client.clone(), client.clone(), Arc::new(pacing))
                .with_health_check(client),
        )
    }

    /// Create a session configured from the environment.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::new(SessionConfig::from_env()?)
    }

    /// Create a session from explicit service implementations.
    pub fn with_services(
        extractor: Arc<dyn MemoryExtractor>,
        generator: Arc<dyn PersonalityGenerator>,
        pacing: Arc<dyn Pacing>,
    ) -> Self {
        let (state, _) = watch::channel(RunState::default());
        Self {
            extractor,
            orchestrator: PersonalityOrchestrator::new(generator, pacing),
            health: None,
            state,
        }
    }

    /// Set the service used by [`Session::health`].
    pub fn with_health_check(mut self, health: Arc<dyn HealthCheck>) -> Self {
        self.health = Some(health);
        self
    }

    /// Watch the run state. Each change publishes a complete snapshot.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Copy of the current run state.
    pub fn snapshot(&self) -> RunState {
        self.state.borrow().clone()
    }

    /// Memories from the last successful extraction.
    pub fn memories(&self) -> Option<ExtractedMemories> {
        self.state.borrow().memories.clone()
    }

    /// Ask the backing service whether it is up. Does not touch run state.
    pub async fn health(&self) -> Result<Health, SessionError> {
        let check = self.health.as_ref().ok_or(SessionError::NoHealthCheck)?;
        check.health().await.map_err(SessionError::Health)
    }

    /// Parse `raw_transcript` and store it without extracting.
    ///
    /// Memories from an earlier extraction are kept. Returns the number of
    /// messages stored.
    pub fn load_transcript(&self, raw_transcript: &str) -> Result<usize, SessionError> {
        let guard = self.claim(RunKind::TranscriptLoad)?;
        let messages = transcript::parse(raw_transcript);
        let count = messages.len();
        self.state.send_modify(|s| s.transcript = messages);
        guard.finish();

        info!(messages = count, "transcript loaded");
        Ok(count)
    }

    /// Parse `raw_transcript` and extract memories from it.
    ///
    /// On success the transcript and memories replace the previous ones
    /// together. On failure nothing in the run state changes.
    pub async fn extract(&self, raw_transcript: &str) -> Result<ExtractedMemories, SessionError> {
        let guard = self.claim(RunKind::Extraction)?;

        let messages = transcript::parse(raw_transcript);
        info!(messages = messages.len(), "extracting memories");

        let memories = match self.extractor.extract(&messages).await {
            Ok(memories) => memories,
            Err(e) => {
                warn!(error = %e, "memory extraction failed");
                return Err(e.into());
            }
        };

        info!(
            preferences = memories.preferences.len(),
            facts = memories.facts.len(),
            emotional_patterns = memories.emotional_patterns.len(),
            "memories extracted"
        );

        let stored = memories.clone();
        self.state.send_modify(|s| {
            s.transcript = messages;
            s.memories = Some(stored);
        });
        guard.finish();
        Ok(memories)
    }

    /// Generate one response per personality kind for `user_message`.
    ///
    /// `on_update` is called once per response, in call order, as soon as
    /// it arrives. Failed kinds are absorbed: they leave their slot empty
    /// and show up in the report and in `generation_errors`.
    pub async fn generate<F>(
        &self,
        user_message: &str,
        on_update: F,
    ) -> Result<GenerationReport, SessionError>
    where
        F: FnMut(PersonalityKind, &str),
    {
        self.generate_cancellable(user_message, &CancellationToken::new(), on_update)
            .await
    }

    /// Like [`Session::generate`], stopping early when `cancel` fires.
    ///
    /// A cancelled run clears every response slot again, so the state never
    /// holds a partial mix from an abandoned run. The same holds when the
    /// returned future is dropped before it completes.
    pub async fn generate_cancellable<F>(
        &self,
        user_message: &str,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> Result<GenerationReport, SessionError>
    where
        F: FnMut(PersonalityKind, &str),
    {
        let guard = self.claim(RunKind::Generation)?;
        let Some(memories) = self.memories() else {
            guard.finish();
            return Err(SessionError::MissingMemories);
        };

        let report = self
            .orchestrator
            .run(user_message, &memories, cancel, |event| match event {
                RunEvent::Cleared => self.state.send_modify(RunState::reset_responses),
                RunEvent::Response { kind, text } => {
                    self.state.send_modify(|s| s.responses.insert(kind, text));
                    on_update(kind, text);
                }
                RunEvent::Failed { kind, error } => self.state.send_modify(|s| {
                    s.generation_errors.insert(kind, error.to_string());
                }),
            })
            .await;

        // An unfinished guard clears the partial responses on release.
        if !report.cancelled {
            guard.finish();
        }

        Ok(report)
    }

    /// Forget the transcript, memories and responses.
    pub fn clear(&self) -> Result<(), SessionError> {
        let guard = self.claim(RunKind::Clear)?;
        self.state.send_modify(|s| {
            s.transcript.clear();
            s.memories = None;
            s.reset_responses();
        });
        guard.finish();
        Ok(())
    }

    fn claim(&self, kind: RunKind) -> Result<RunGuard<'_>, SessionError> {
        RunGuard::acquire(&self.state, kind).map_err(SessionError::Busy)
    }
}
