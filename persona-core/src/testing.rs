//! Testing utilities for the persona pipeline.
//!
//! This module provides tools for integration testing:
//! - `MockService` for deterministic runs without network calls
//! - Assertion helpers for call order and pacing

use crate::pacing::NoDelay;
use crate::service::{HealthCheck, MemoryExtractor, PersonalityGenerator};
use crate::session::Session;
use async_trait::async_trait;
use guppshupp::{Error, ExtractedMemories, Health, Message, PersonalityKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A scripted failure.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Status { status: u16, detail: Option<String> },
    Transport(String),
}

impl MockFailure {
    fn to_error(&self) -> Error {
        match self {
            MockFailure::Status { status, detail } => Error::Request {
                status: *status,
                detail: detail.clone(),
            },
            MockFailure::Transport(message) => Error::Transport(message.clone()),
        }
    }
}

/// A scripted reply for one personality kind.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(MockFailure),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn status(status: u16) -> Self {
        MockReply::Fail(MockFailure::Status {
            status,
            detail: None,
        })
    }

    pub fn transport(message: impl Into<String>) -> Self {
        MockReply::Fail(MockFailure::Transport(message.into()))
    }

    fn into_result(self) -> Result<String, Error> {
        match self {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(failure) => Err(failure.to_error()),
        }
    }
}

/// A call the mock received.
#[derive(Debug, Clone)]
pub enum MockCall {
    Extract {
        messages: Vec<Message>,
    },
    Generate {
        kind: PersonalityKind,
        user_message: String,
        issued_at: Instant,
        /// `None` if the call was abandoned before it finished.
        completed_at: Option<Instant>,
    },
}

/// A stand-in for the remote service.
///
/// Returns canned memories and one canned response per kind unless a
/// reply has been scripted. Every call is logged with its timing.
pub struct MockService {
    memories: ExtractedMemories,
    extraction_failure: Mutex<Option<MockFailure>>,
    replies: Mutex<HashMap<PersonalityKind, MockReply>>,
    latency: Duration,
    calls: Mutex<Vec<MockCall>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            memories: canned_memories(),
            extraction_failure: Mutex::new(None),
            replies: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Memories returned by a successful extraction.
    pub fn with_memories(mut self, memories: ExtractedMemories) -> Self {
        self.memories = memories;
        self
    }

    /// Script the reply for one kind.
    pub fn with_reply(self, kind: PersonalityKind, reply: MockReply) -> Self {
        self.set_reply(kind, reply);
        self
    }

    /// Simulated time each call takes.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make extraction fail.
    pub fn with_extraction_failure(self, failure: MockFailure) -> Self {
        self.set_extraction_failure(Some(failure));
        self
    }

    pub fn set_reply(&self, kind: PersonalityKind, reply: MockReply) {
        lock(&self.replies).insert(kind, reply);
    }

    pub fn set_extraction_failure(&self, failure: Option<MockFailure>) {
        *lock(&self.extraction_failure) = failure;
    }

    /// Memories this mock extracts.
    pub fn memories(&self) -> ExtractedMemories {
        self.memories.clone()
    }

    /// A session wired to this mock with no pacing.
    pub fn session(self: &Arc<Self>) -> Session {
        Session::with_services(self.clone(), self.clone(), Arc::new(NoDelay))
            .with_health_check(self.clone())
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn extract_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, MockCall::Extract { .. }))
            .count()
    }

    pub fn generate_count(&self) -> usize {
        self.generate_order().len()
    }

    pub fn network_calls(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Kinds requested, in the order the calls were issued.
    pub fn generate_order(&self) -> Vec<PersonalityKind> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                MockCall::Generate { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    /// Time from each generation call finishing to the next one being issued.
    pub fn generate_gaps(&self) -> Vec<Duration> {
        let timings: Vec<(Instant, Option<Instant>)> = lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                MockCall::Generate {
                    issued_at,
                    completed_at,
                    ..
                } => Some((*issued_at, *completed_at)),
                _ => None,
            })
            .collect();

        timings
            .windows(2)
            .filter_map(|pair| {
                let finished = pair[0].1?;
                Some(pair[1].0.saturating_duration_since(finished))
            })
            .collect()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryExtractor for MockService {
    async fn extract(&self, messages: &[Message]) -> Result<ExtractedMemories, Error> {
        lock(&self.calls).push(MockCall::Extract {
            messages: messages.to_vec(),
        });
        self.simulate_latency().await;

        let failure = lock(&self.extraction_failure).clone();
        match failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(self.memories.clone()),
        }
    }
}

#[async_trait]
impl HealthCheck for MockService {
    async fn health(&self) -> Result<Health, Error> {
        Ok(Health {
            status: "healthy".to_string(),
            service: "mock".to_string(),
        })
    }
}

#[async_trait]
impl PersonalityGenerator for MockService {
    async fn generate(
        &self,
        user_message: &str,
        kind: PersonalityKind,
        _memories: &ExtractedMemories,
    ) -> Result<String, Error> {
        let index = {
            let mut calls = lock(&self.calls);
            calls.push(MockCall::Generate {
                kind,
                user_message: user_message.to_string(),
                issued_at: Instant::now(),
                completed_at: None,
            });
            calls.len() - 1
        };

        self.simulate_latency().await;

        let reply = lock(&self.replies)
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| MockReply::text(canned_response(kind)));

        if let Some(MockCall::Generate { completed_at, .. }) = lock(&self.calls).get_mut(index) {
            *completed_at = Some(Instant::now());
        }
        reply.into_result()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Memories matching the sample transcript.
pub fn canned_memories() -> ExtractedMemories {
    ExtractedMemories {
        preferences: vec![
            "Dislikes waking up early".to_string(),
            "Loves pizza".to_string(),
            "Night owl".to_string(),
        ],
        facts: vec![
            "Works in cybersecurity".to_string(),
            "Has a dog named Luna".to_string(),
        ],
        emotional_patterns: vec![
            "Stressed on Mondays".to_string(),
            "Uses humor to cope".to_string(),
        ],
    }
}

/// Default response for each kind.
pub fn canned_response(kind: PersonalityKind) -> &'static str {
    match kind {
        PersonalityKind::CalmMentor => {
            "I hear you're navigating some challenges in cybersecurity work, and that can be \
             demanding. Given that Mondays tend to be particularly stressful for you, what small \
             step could you take this week to ease into the workweek more gently?"
        }
        PersonalityKind::WittyFriend => {
            "Yo, cybersecurity life hitting different this week? At least you got Luna and pizza \
             to keep you sane lol. For real though, take care of yourself between those bug hunts!"
        }
        PersonalityKind::Therapist => {
            "It sounds like you're feeling the weight of work stress, especially as someone who \
             experiences heightened pressure on Mondays. That's completely valid, and reaching for \
             comfort like pizza or time with Luna shows you're already listening to what you need."
        }
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the generation calls were issued in exactly this order.
#[track_caller]
pub fn assert_call_order(mock: &MockService, expected: &[PersonalityKind]) {
    let actual = mock.generate_order();
    assert_eq!(
        actual, expected,
        "Expected generation calls {expected:?}, got {actual:?}"
    );
}

/// Assert at least `interval` passed between every pair of consecutive calls.
#[track_caller]
pub fn assert_min_gap(mock: &MockService, interval: Duration) {
    for (i, gap) in mock.generate_gaps().into_iter().enumerate() {
        assert!(
            gap >= interval,
            "Expected at least {interval:?} between calls {i} and {}, got {gap:?}",
            i + 1
        );
    }
}
