//! Deterministic ownership assignment: `hash(actorId) mod |silos|`.
//!
//! Every silo can compute the same assignment independently of the others,
//! so ownership changes purely as a function of the roster, with no
//! coordination beyond agreeing on membership (see `crate::membership`).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::identity::ActorIdentity;
use crate::membership::SiloId;

/// Returns the silo responsible for sweeping reminders belonging to
/// `actor`, given the current (sorted) roster. An empty roster has no owner.
pub fn owning_silo<'a>(actor: &ActorIdentity, roster: &'a [SiloId]) -> Option<&'a SiloId> {
    if roster.is_empty() {
        return None;
    }
    let mut sorted: Vec<&SiloId> = roster.iter().collect();
    sorted.sort();

    let mut hasher = DefaultHasher::new();
    actor.key().hash(&mut hasher);
    let idx = (hasher.finish() as usize) % sorted.len();
    Some(sorted[idx])
}
