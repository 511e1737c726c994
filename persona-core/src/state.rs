//! Run state shared by the extraction and generation workflows.
//!
//! The session owns the only writer. Everyone else gets cloned snapshots
//! through a `watch` channel, so a reader never sees a half-applied update.

use guppshupp::{ExtractedMemories, Message, PersonalityKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::watch;

/// Which workflow currently holds the run slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Extraction,
    Generation,
    TranscriptLoad,
    Clear,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Extraction => f.write_str("extraction"),
            RunKind::Generation => f.write_str("generation"),
            RunKind::TranscriptLoad => f.write_str("transcript load"),
            RunKind::Clear => f.write_str("clear"),
        }
    }
}

/// One optional response per personality kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonalityResponseSet {
    pub calm_mentor: Option<String>,
    pub witty_friend: Option<String>,
    pub therapist: Option<String>,
}

impl PersonalityResponseSet {
    pub fn get(&self, kind: PersonalityKind) -> Option<&str> {
        self.slot(kind).as_deref()
    }

    pub fn insert(&mut self, kind: PersonalityKind, response: impl Into<String>) {
        *self.slot_mut(kind) = Some(response.into());
    }

    /// Reset every slot to absent.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of populated slots.
    pub fn populated(&self) -> usize {
        PersonalityKind::ALL
            .into_iter()
            .filter(|kind| self.slot(*kind).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.populated() == 0
    }

    pub fn is_complete(&self) -> bool {
        self.populated() == PersonalityKind::ALL.len()
    }

    /// Slots in call order.
    pub fn iter(&self) -> impl Iterator<Item = (PersonalityKind, Option<&str>)> + '_ {
        PersonalityKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }

    fn slot(&self, kind: PersonalityKind) -> &Option<String> {
        match kind {
            PersonalityKind::CalmMentor => &self.calm_mentor,
            PersonalityKind::WittyFriend => &self.witty_friend,
            PersonalityKind::Therapist => &self.therapist,
        }
    }

    fn slot_mut(&mut self, kind: PersonalityKind) -> &mut Option<String> {
        match kind {
            PersonalityKind::CalmMentor => &mut self.calm_mentor,
            PersonalityKind::WittyFriend => &mut self.witty_friend,
            PersonalityKind::Therapist => &mut self.therapist,
        }
    }
}

/// Everything the presentation layer can observe about the current session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunState {
    /// Transcript from the last successful extraction or explicit load.
    pub transcript: Vec<Message>,

    /// Memories from the last successful extraction.
    pub memories: Option<ExtractedMemories>,

    /// Responses from the current (or last) generation run.
    pub responses: PersonalityResponseSet,

    /// Failure detail for each kind whose call failed in the current run.
    pub generation_errors: BTreeMap<PersonalityKind, String>,

    /// The run currently in progress, if any.
    pub busy: Option<RunKind>,
}

impl RunState {
    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn has_memories(&self) -> bool {
        self.memories.is_some()
    }

    /// Clear responses and their error details ahead of a new run.
    pub(crate) fn reset_responses(&mut self) {
        self.responses.clear();
        self.generation_errors.clear();
    }
}

/// Exclusive claim on the run slot, released when dropped.
///
/// A generation guard dropped before [`RunGuard::finish`] also clears the
/// responses it may have half written. That covers early returns, an
/// explicit cancel, the owning future being dropped, and unwinding.
#[derive(Debug)]
pub(crate) struct RunGuard<'a> {
    state: &'a watch::Sender<RunState>,
    kind: RunKind,
    finished: bool,
}

impl<'a> RunGuard<'a> {
    /// Claim the slot for `kind`, or return the run already holding it.
    pub(crate) fn acquire(
        state: &'a watch::Sender<RunState>,
        kind: RunKind,
    ) -> Result<Self, RunKind> {
        let mut holder = None;
        state.send_if_modified(|s| match s.busy {
            Some(current) => {
                holder = Some(current);
                false
            }
            None => {
                s.busy = Some(kind);
                true
            }
        });

        match holder {
            Some(current) => Err(current),
            None => Ok(Self {
                state,
                kind,
                finished: false,
            }),
        }
    }

    /// Release the slot after the run went all the way through.
    pub(crate) fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let abandoned = !self.finished && self.kind == RunKind::Generation;
        self.state.send_modify(|s| {
            if abandoned {
                s.reset_responses();
            }
            s.busy = None;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_set_slots_are_independent() {
        let mut set = PersonalityResponseSet::default();
        assert!(set.is_empty());

        set.insert(PersonalityKind::Therapist, "That sounds heavy.");
        assert_eq!(set.get(PersonalityKind::Therapist), Some("That sounds heavy."));
        assert_eq!(set.get(PersonalityKind::CalmMentor), None);
        assert_eq!(set.populated(), 1);
        assert!(!set.is_complete());

        set.insert(PersonalityKind::CalmMentor, "a");
        set.insert(PersonalityKind::WittyFriend, "b");
        assert!(set.is_complete());

        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_response_set_iterates_in_call_order() {
        let mut set = PersonalityResponseSet::default();
        set.insert(PersonalityKind::WittyFriend, "lol");

        let order: Vec<_> = set.iter().collect();
        assert_eq!(
            order,
            vec![
                (PersonalityKind::CalmMentor, None),
                (PersonalityKind::WittyFriend, Some("lol")),
                (PersonalityKind::Therapist, None),
            ]
        );
    }

    #[test]
    fn test_run_guard_is_exclusive() {
        let (tx, rx) = watch::channel(RunState::default());

        let guard = RunGuard::acquire(&tx, RunKind::Generation).unwrap();
        assert_eq!(rx.borrow().busy, Some(RunKind::Generation));

        assert_eq!(
            RunGuard::acquire(&tx, RunKind::Generation).unwrap_err(),
            RunKind::Generation
        );
        assert_eq!(
            RunGuard::acquire(&tx, RunKind::Extraction).unwrap_err(),
            RunKind::Generation
        );

        drop(guard);
        assert!(!rx.borrow().is_busy());
        assert!(RunGuard::acquire(&tx, RunKind::Extraction).is_ok());
    }

    #[test]
    fn test_unfinished_generation_guard_clears_responses() {
        let (tx, rx) = watch::channel(RunState::default());

        let guard = RunGuard::acquire(&tx, RunKind::Generation).unwrap();
        tx.send_modify(|s| s.responses.insert(PersonalityKind::CalmMentor, "half"));
        drop(guard);

        let state = rx.borrow();
        assert!(state.responses.is_empty());
        assert!(!state.is_busy());
    }

    #[test]
    fn test_finished_guard_keeps_responses() {
        let (tx, rx) = watch::channel(RunState::default());

        let guard = RunGuard::acquire(&tx, RunKind::Generation).unwrap();
        tx.send_modify(|s| s.responses.insert(PersonalityKind::CalmMentor, "done"));
        guard.finish();

        assert_eq!(rx.borrow().responses.populated(), 1);
        assert!(!rx.borrow().is_busy());

        // Other kinds never touch responses, finished or not.
        let guard = RunGuard::acquire(&tx, RunKind::Extraction).unwrap();
        drop(guard);
        assert_eq!(rx.borrow().responses.populated(), 1);
    }

    #[test]
    fn test_run_kind_display() {
        assert_eq!(RunKind::TranscriptLoad.to_string(), "transcript load");
        assert_eq!(RunKind::Clear.to_string(), "clear");
    }

    #[test]
    fn test_snapshot_serializes_wire_names() {
        let mut state = RunState::default();
        state
            .generation_errors
            .insert(PersonalityKind::WittyFriend, "timed out".to_string());
        state.responses.insert(PersonalityKind::CalmMentor, "Breathe.");

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["generation_errors"]["witty_friend"], "timed out");
        assert_eq!(value["responses"]["calm_mentor"], "Breathe.");
        assert!(value["memories"].is_null());
    }
}
