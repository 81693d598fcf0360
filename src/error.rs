//! The single error type surfaced by every fallible operation in the runtime.
//!
//! Typed proxies and actor methods alike surface a `QuarkError` carrying a
//! kind and a short diagnostic message — never a stack from a remote
//! process (spec §7).

use crate::identity::ActorIdentity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuarkError {
    /// The target activation has stopped; further envelopes are rejected.
    #[error("actor gone: {identity}")]
    ActorGone { identity: ActorIdentity },

    /// A timer or child name collided with one already registered.
    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    /// The mailbox's soft bound was exceeded.
    #[error("mailbox overloaded: {identity}")]
    Overloaded { identity: ActorIdentity },

    /// A suspendable operation observed a cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// A `saveWithVersion` call's `expectedVersion` did not match storage.
    #[error("concurrency conflict: expected version {expected}, actual {actual}")]
    ConcurrencyConflict { expected: i64, actual: i64 },

    /// A cluster client call was made before `connect()`.
    #[error("client not connected")]
    NotConnected,

    /// Placement could not find a candidate silo/resource for the actor.
    #[error("no placement capacity for actor type {actor_type}")]
    NoCapacity { actor_type: String },

    /// The transport failed to deliver or receive a frame.
    #[error("transport failed: {reason}")]
    TransportFailed { reason: String },

    /// A deadline on an envelope or operation elapsed before completion.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A supervision failure reached the root and was surfaced as fatal.
    #[error("supervision escalated to host for {identity}")]
    SupervisionEscalated { identity: ActorIdentity },

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// An ambient I/O failure (state store, reminder table, transport).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QuarkError>;
