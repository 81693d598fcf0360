//! Supervision directives and restart-rate bounding.
//!
//! The restart backoff tracker is grounded on the sliding-window design used
//! elsewhere in the ecosystem for bounding retry storms: a `VecDeque` of
//! restart timestamps, pruned to the configured window on each check, with
//! the directive downgraded to `Stop` once the threshold is exceeded within
//! that window.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::QuarkError;
use crate::identity::ActorIdentity;

/// What should happen to an activation after its turn returned an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisionDirective {
    /// Discard the failed turn's error and continue with existing state.
    Resume,
    /// Deactivate and re-activate the actor, discarding in-memory state
    /// (persisted state is reloaded via `on_activate`).
    Restart,
    /// Deactivate and do not reactivate until the next inbound envelope.
    Stop,
    /// Re-raise the failure to the parent activation's supervisor.
    Escalate,
}

/// Carries the context a parent's `supervision_directive` override needs to
/// decide how to handle a child's failure.
pub struct ChildFailureContext<'a> {
    pub child: &'a ActorIdentity,
    pub error: &'a QuarkError,
}

/// Bounds how often a single activation may be restarted within a sliding
/// time window, downgrading further `Restart` directives to `Stop` once the
/// threshold is exceeded.
pub struct RestartBackoff {
    max_restarts: u32,
    window: Duration,
    history: HashMap<ActorIdentity, VecDeque<DateTime<Utc>>>,
}

impl RestartBackoff {
    pub fn new(max_restarts: u32, window: Duration) -> Self {
        RestartBackoff {
            max_restarts,
            window,
            history: HashMap::new(),
        }
    }

    fn prune(&mut self, identity: &ActorIdentity, now: DateTime<Utc>) {
        if let Some(entries) = self.history.get_mut(identity) {
            let cutoff = now - chrono::Duration::from_std(self.window).unwrap_or_default();
            while entries.front().is_some_and(|t| *t < cutoff) {
                entries.pop_front();
            }
        }
    }

    /// Records a restart attempt for `identity` at `now` and returns whether
    /// the restart-rate threshold has now been exceeded.
    pub fn record_restart(&mut self, identity: &ActorIdentity, now: DateTime<Utc>) -> bool {
        self.prune(identity, now);
        let entries = self.history.entry(identity.clone()).or_default();
        entries.push_back(now);
        entries.len() as u32 > self.max_restarts
    }

    /// Returns whether `identity` is currently over the restart-rate
    /// threshold, without recording a new attempt.
    pub fn is_limit_exceeded(&mut self, identity: &ActorIdentity, now: DateTime<Utc>) -> bool {
        self.prune(identity, now);
        self.history.get(identity).map(|e| e.len() as u32).unwrap_or(0) > self.max_restarts
    }

    /// Clears restart history for an activation, e.g. after a clean
    /// deactivation with no pending failure.
    pub fn reset(&mut self, identity: &ActorIdentity) {
        self.history.remove(identity);
    }

    /// Applies the backoff to a proposed directive: a `Restart` that would
    /// exceed the threshold is downgraded to `Stop` and escalated via the
    /// caller's own handling of the returned bool.
    pub fn apply(&mut self, identity: &ActorIdentity, directive: SupervisionDirective, now: DateTime<Utc>) -> SupervisionDirective {
        match directive {
            SupervisionDirective::Restart => {
                if self.record_restart(identity, now) {
                    SupervisionDirective::Stop
                } else {
                    SupervisionDirective::Restart
                }
            }
            other => other,
        }
    }
}
