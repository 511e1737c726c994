//! End-to-end pipeline tests against the mock service.
//!
//! These exercise the public API the way a front end would: paste a
//! transcript, extract, then generate while watching the run state.

use persona_core::testing::{assert_call_order, assert_min_gap, canned_memories};
use persona_core::transcript::{self, SAMPLE_TRANSCRIPT};
use persona_core::{
    FixedDelay, Message, MockReply, MockService, PersonalityKind, Session, SessionError,
};
use std::sync::Arc;
use std::time::Duration;

fn paced_session(mock: &Arc<MockService>, interval: Duration) -> Session {
    Session::with_services(mock.clone(), mock.clone(), Arc::new(FixedDelay::new(interval)))
}

#[tokio::test]
async fn test_transcript_reaches_extractor_verbatim() {
    let mock = Arc::new(MockService::new());
    let session = mock.session();

    session
        .extract("user: hi\nassistant: hello: world\nno colon")
        .await
        .unwrap();

    let calls = mock.calls();
    match &calls[0] {
        persona_core::testing::MockCall::Extract { messages } => {
            assert_eq!(
                messages,
                &vec![
                    Message::new("user", "hi"),
                    Message::new("assistant", "hello: world"),
                    Message::new("", "no colon"),
                ]
            );
        }
        other => panic!("expected an extraction call, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_paced_run_with_one_failure() {
    let interval = Duration::from_secs(4);
    let mock = Arc::new(
        MockService::new()
            .with_latency(Duration::from_millis(300))
            .with_reply(PersonalityKind::WittyFriend, MockReply::transport("timed out")),
    );
    let session = paced_session(&mock, interval);

    session.extract(SAMPLE_TRANSCRIPT).await.unwrap();
    assert_eq!(session.memories(), Some(canned_memories()));

    let mut order = Vec::new();
    let report = session
        .generate("Mondays, am I right?", |kind, _| order.push(kind))
        .await
        .unwrap();

    assert_call_order(&mock, &PersonalityKind::ALL);
    assert_min_gap(&mock, interval);
    assert_eq!(order, vec![PersonalityKind::CalmMentor, PersonalityKind::Therapist]);
    assert_eq!(report.failed_kinds(), vec![PersonalityKind::WittyFriend]);

    let state = session.snapshot();
    assert_eq!(state.responses.populated(), 2);
    assert!(state.generation_errors[&PersonalityKind::WittyFriend].contains("timed out"));
    assert!(!state.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_observer_sees_responses_pop_in() {
    let mock = Arc::new(MockService::new().with_latency(Duration::from_millis(100)));
    let session = Arc::new(paced_session(&mock, Duration::from_secs(1)));
    session.extract(SAMPLE_TRANSCRIPT).await.unwrap();

    let mut rx = session.subscribe();
    let observer = tokio::spawn(async move {
        let mut populated = Vec::new();
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            let count = state.responses.populated();
            if populated.last() != Some(&count) {
                populated.push(count);
            }
            if !state.is_busy() && count == 3 {
                break;
            }
        }
        populated
    });

    session.generate("hey", |_, _| {}).await.unwrap();
    let populated = observer.await.unwrap();

    // Slots only ever grow within a run, one at a time.
    assert!(populated.windows(2).all(|w| w[1] == w[0] + 1), "{populated:?}");
    assert_eq!(populated.last(), Some(&3));
}

#[tokio::test]
async fn test_generation_requires_extraction() {
    let mock = Arc::new(MockService::new());
    let session = mock.session();

    let err = session.generate("hello?", |_, _| {}).await.unwrap_err();
    assert!(matches!(err, SessionError::MissingMemories));
    assert_eq!(mock.network_calls(), 0);
}

#[test]
fn test_sample_round_trips_through_render() {
    let messages = transcript::parse(SAMPLE_TRANSCRIPT);
    assert_eq!(transcript::render(&messages), SAMPLE_TRANSCRIPT);
}
