//! Paced, failure-isolated personality generation.
//!
//! The orchestrator asks for one response per personality kind, strictly
//! one after another, waiting between calls so the service's rate limit is
//! respected. Each result is published as soon as it arrives and a failed
//! kind never stops the ones after it.

use crate::pacing::Pacing;
use crate::service::PersonalityGenerator;
use crate::state::PersonalityResponseSet;
use guppshupp::{Error, ExtractedMemories, PersonalityKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Progress notifications emitted during a run, in order.
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// All slots were reset. Always the first event of a run.
    Cleared,
    /// A kind produced its response.
    Response { kind: PersonalityKind, text: &'a str },
    /// A kind's call failed; the run carries on.
    Failed { kind: PersonalityKind, error: &'a Error },
}

/// A kind whose call failed during a run.
#[derive(Debug)]
pub struct GenerationFailure {
    pub kind: PersonalityKind,
    pub error: Error,
}

/// Outcome of one generation run.
#[derive(Debug)]
pub struct GenerationReport {
    /// Identifier attached to this run's log span.
    pub run_id: Uuid,

    /// Responses that arrived, by kind.
    pub responses: PersonalityResponseSet,

    /// Kinds whose call failed, in call order.
    pub failures: Vec<GenerationFailure>,

    /// Whether the run was cancelled before every kind was attempted.
    pub cancelled: bool,
}

impl GenerationReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            responses: PersonalityResponseSet::default(),
            failures: Vec::new(),
            cancelled: false,
        }
    }

    pub fn failed_kinds(&self) -> Vec<PersonalityKind> {
        self.failures.iter().map(|f| f.kind).collect()
    }

    /// True when every kind produced a response.
    pub fn is_complete(&self) -> bool {
        self.responses.is_complete()
    }
}

/// Drives the generator once per personality kind.
#[derive(Clone)]
pub struct PersonalityOrchestrator {
    generator: Arc<dyn PersonalityGenerator>,
    pacing: Arc<dyn Pacing>,
}

impl PersonalityOrchestrator {
    pub fn new(generator: Arc<dyn PersonalityGenerator>, pacing: Arc<dyn Pacing>) -> Self {
        Self { generator, pacing }
    }

    /// Generate a response per kind for `user_message`.
    ///
    /// Calls go out in [`PersonalityKind::ALL`] order. Between two calls the
    /// pacing strategy decides the wait, counted from the end of one call to
    /// the start of the next, whatever the outcome. `on_event` receives
    /// [`RunEvent::Cleared`] first, then one event per attempted kind.
    ///
    /// Individual failures are recorded in the report, never returned as an
    /// error. Cancelling `cancel` stops the run at the next suspension point.
    pub async fn run<F>(
        &self,
        user_message: &str,
        memories: &ExtractedMemories,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> GenerationReport
    where
        F: FnMut(RunEvent<'_>),
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("generation", %run_id);

        async move {
            let mut report = GenerationReport::new(run_id);
            on_event(RunEvent::Cleared);
            info!(memories = memories.total(), "generation run started");

            let last = PersonalityKind::ALL.len() - 1;
            for (index, kind) in PersonalityKind::ALL.into_iter().enumerate() {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                    result = self.generator.generate(user_message, kind, memories) => result,
                };

                let delay = match outcome {
                    Ok(text) => {
                        debug!(%kind, chars = text.len(), "response received");
                        on_event(RunEvent::Response { kind, text: &text });
                        report.responses.insert(kind, text);
                        self.pacing.delay_after(None)
                    }
                    Err(error) => {
                        warn!(%kind, %error, "personality generation failed");
                        on_event(RunEvent::Failed { kind, error: &error });
                        let delay = self.pacing.delay_after(Some(&error));
                        report.failures.push(GenerationFailure { kind, error });
                        delay
                    }
                };

                if index == last || delay.is_zero() {
                    continue;
                }

                debug!(delay_ms = delay.as_millis() as u64, "pacing before next call");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            if report.cancelled {
                warn!(
                    completed = report.responses.populated(),
                    "generation run cancelled"
                );
            } else {
                info!(
                    succeeded = report.responses.populated(),
                    failed = report.failures.len(),
                    "generation run finished"
                );
            }
            report
        }
        .instrument(span)
        .await
    }
}
