//! Restart state machine and the gate guarding it.
//!
//! # Responsibilities
//! - Decide whether a build event starts a cycle, is dropped, or is queued
//! - Hand the queued event to the cycle that just finished, together with
//!   every path coalesced into it
//!
//! # Design Decisions
//! - Transitions are pure functions on `RestartState`; `RestartGate` only
//!   adds a lock and the pending cycle
//! - The lock is never held across an await

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::reload::events::BuildEvent;

/// What happens to build events arriving while a reload is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Discard them.
    #[default]
    Drop,
    /// Coalesce them into one more cycle.
    Queue,
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(OverlapPolicy::Drop),
            "queue" => Ok(OverlapPolicy::Queue),
            other => Err(format!("unknown overlap policy '{other}' (expected drop or queue)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartState {
    #[default]
    Idle,
    Restarting,
    /// Only reachable under [`OverlapPolicy::Queue`].
    RestartingWithPending,
}

/// Answer to a restart request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The caller owns the cycle.
    Started,
    Dropped,
    Queued,
}

impl RestartState {
    pub fn on_request(self, policy: OverlapPolicy) -> (RestartState, Admission) {
        match (self, policy) {
            (RestartState::Idle, _) => (RestartState::Restarting, Admission::Started),
            (busy, OverlapPolicy::Drop) => (busy, Admission::Dropped),
            (_, OverlapPolicy::Queue) => (RestartState::RestartingWithPending, Admission::Queued),
        }
    }

    /// State after a cycle ends, and whether another cycle must run.
    pub fn on_complete(self) -> (RestartState, bool) {
        match self {
            RestartState::RestartingWithPending => (RestartState::Restarting, true),
            RestartState::Restarting | RestartState::Idle => (RestartState::Idle, false),
        }
    }
}

/// The extra cycle owed to events that arrived mid-cycle: the latest event
/// plus the changed paths of every event coalesced into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCycle {
    pub event: BuildEvent,
    pub changed: BTreeSet<PathBuf>,
}

#[derive(Debug, Default)]
struct GateInner {
    state: RestartState,
    pending: Option<QueuedCycle>,
}

/// Single-flight guard for reload cycles.
#[derive(Debug)]
pub struct RestartGate {
    policy: OverlapPolicy,
    inner: Mutex<GateInner>,
}

impl RestartGate {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(GateInner::default()),
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn state(&self) -> RestartState {
        self.inner.lock().state
    }

    /// Ask to reload for `event`. A queued event becomes the pending one
    /// and its path joins those of events queued before it.
    pub fn request(&self, event: BuildEvent) -> Admission {
        let mut inner = self.inner.lock();
        let (next, admission) = inner.state.on_request(self.policy);
        inner.state = next;
        if admission == Admission::Queued {
            let mut changed = inner
                .pending
                .take()
                .map(|queued| queued.changed)
                .unwrap_or_default();
            changed.insert(event.changed_path.clone());
            inner.pending = Some(QueuedCycle { event, changed });
        }
        admission
    }

    /// Finish the current cycle. Returns the cycle to run next, if any;
    /// the gate stays closed in that case.
    pub fn complete(&self) -> Option<QueuedCycle> {
        let mut inner = self.inner.lock();
        let (next, again) = inner.state.on_complete();
        let pending = if again { inner.pending.take() } else { None };

        inner.state = if pending.is_some() { next } else { RestartState::Idle };
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_policy_transitions() {
        let (state, admission) = RestartState::Idle.on_request(OverlapPolicy::Drop);
        assert_eq!((state, admission), (RestartState::Restarting, Admission::Started));

        let (state, admission) = state.on_request(OverlapPolicy::Drop);
        assert_eq!((state, admission), (RestartState::Restarting, Admission::Dropped));

        assert_eq!(state.on_complete(), (RestartState::Idle, false));
    }

    #[test]
    fn test_queue_policy_transitions() {
        let (state, _) = RestartState::Idle.on_request(OverlapPolicy::Queue);
        let (state, admission) = state.on_request(OverlapPolicy::Queue);
        assert_eq!((state, admission), (RestartState::RestartingWithPending, Admission::Queued));

        let (state, again) = state.on_complete();
        assert_eq!((state, again), (RestartState::Restarting, true));
        assert_eq!(state.on_complete(), (RestartState::Idle, false));
    }

    #[test]
    fn test_gate_coalesces_pending_events() {
        let gate = RestartGate::new(OverlapPolicy::Queue);

        assert_eq!(gate.request(BuildEvent::succeeded("a.ts")), Admission::Started);
        assert_eq!(
            gate.request(BuildEvent::succeeded("features/Post/Service/index.ts")),
            Admission::Queued
        );
        assert_eq!(gate.request(BuildEvent::succeeded("c.ts")), Admission::Queued);

        let next = gate.complete().unwrap();
        assert_eq!(next.event.changed_path.to_str(), Some("c.ts"));
        assert_eq!(
            next.changed,
            BTreeSet::from([
                PathBuf::from("c.ts"),
                PathBuf::from("features/Post/Service/index.ts"),
            ])
        );
        assert_eq!(gate.state(), RestartState::Restarting);

        assert!(gate.complete().is_none());
        assert_eq!(gate.state(), RestartState::Idle);

        // The next overlap starts a fresh set.
        gate.request(BuildEvent::succeeded("d.ts"));
        gate.request(BuildEvent::succeeded("e.ts"));
        let next = gate.complete().unwrap();
        assert_eq!(next.changed, BTreeSet::from([PathBuf::from("e.ts")]));
    }

    #[test]
    fn test_gate_drop_never_queues() {
        let gate = RestartGate::new(OverlapPolicy::Drop);

        assert_eq!(gate.request(BuildEvent::succeeded("a.ts")), Admission::Started);
        assert_eq!(gate.request(BuildEvent::succeeded("b.ts")), Admission::Dropped);
        assert!(gate.complete().is_none());
        assert_eq!(gate.state(), RestartState::Idle);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Queue".parse::<OverlapPolicy>(), Ok(OverlapPolicy::Queue));
        assert!("later".parse::<OverlapPolicy>().is_err());
    }
}
