//! Actor identity and process-unique message id generation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// `(typeName, id)` pair that addresses an actor cluster-wide.
///
/// The string key `"<type_name>/<id>"` is the cluster-unique address used
/// by the directory, placement, and reminder ownership hashing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ActorIdentity {
    pub type_name: String,
    pub id: String,
}

impl ActorIdentity {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        ActorIdentity {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// The cluster-unique address string, `"<type_name>/<id>"`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.type_name, self.id)
    }
}

impl fmt::Display for ActorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Process-unique, monotonically increasing message id.
///
/// Ids are generated as short strings rather than UUIDs to avoid the
/// randomness/allocation cost on the hot path; correlation across silos
/// relies on a silo id prefix supplied by [`MessageIdGenerator::with_prefix`],
/// not on global uniqueness of the counter itself (see spec Open Questions).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds an id for a synthetic, fire-and-forget envelope (a fired timer
    /// or reminder) that never goes through the pending-reply map and so
    /// needs no generator-assigned uniqueness.
    pub fn synthetic(label: impl Into<String>) -> Self {
        MessageId(label.into())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates process-unique [`MessageId`]s, optionally prefixed with a
/// silo id so that responses can be routed back across the cluster.
pub struct MessageIdGenerator {
    prefix: Option<String>,
    counter: AtomicU64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        MessageIdGenerator {
            prefix: None,
            counter: AtomicU64::new(0),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        MessageIdGenerator {
            prefix: Some(prefix.into()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> MessageId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let id = match &self.prefix {
            Some(prefix) => format!("{prefix}-{n:x}"),
            None => format!("{n:x}"),
        };
        MessageId(id)
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_type_and_id_joined() {
        let id = ActorIdentity::new("PizzaActor", "p-001");
        assert_eq!(id.key(), "PizzaActor/p-001");
        assert_eq!(id.to_string(), "PizzaActor/p-001");
    }

    #[test]
    fn generator_is_monotone_per_process() {
        let gen = MessageIdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert_ne!(a, b);
    }

    #[test]
    fn generator_prefixes_with_silo_id() {
        let gen = MessageIdGenerator::with_prefix("silo-1");
        let id = gen.next();
        assert!(id.as_str().starts_with("silo-1-"));
    }
}
