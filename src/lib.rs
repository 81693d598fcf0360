#![deny(clippy::all)]
#![allow(clippy::large_enum_variant)]

//! Quark is a virtual-actor runtime: actors are addressable by a stable
//! identity, are single-threaded with respect to their own mailbox, are
//! activated on demand somewhere in the cluster, and are reached through
//! type-safe proxies that hide location.
//!
//! This crate covers the runtime kernel: the activation directory, the
//! per-actor mailbox and turn loop, the supervision tree, the placement
//! pipeline, serverless idle-deactivation, durable reminders, and the
//! cluster-client proxy. Storage, membership, transport and wire framing
//! are external collaborators, expressed here as traits (see [`persistence`],
//! [`membership`], [`transport`]).

pub mod actor;
pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod host;
pub mod identity;
pub mod mailbox;
pub mod membership;
pub mod message;
pub mod persistence;
pub mod placement;
pub mod reminders;
pub mod serverless;
pub mod supervision;
pub mod testkit;
pub mod timers;
pub mod transport;

pub use error::QuarkError;
pub use identity::ActorIdentity;
pub use message::Envelope;

/// Convenience re-exports for implementing an actor type and wiring a
/// [`host::Runtime`].
pub mod prelude {
    pub use crate::actor::{Actor, ActorContext, TurnState};
    pub use crate::client::{ClusterClient, Proxy};
    pub use crate::config::Config;
    pub use crate::error::QuarkError;
    pub use crate::host::Runtime;
    pub use crate::identity::ActorIdentity;
    pub use crate::membership::{ClusterMembership, SiloId, SiloInfo};
    pub use crate::message::Envelope;
    pub use crate::persistence::{StateStore, StateWithVersion};
    pub use crate::reminders::{Reminder, ReminderTable};
    pub use crate::supervision::SupervisionDirective;
    pub use crate::transport::Transport;
}
