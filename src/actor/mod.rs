//! The `Actor` trait implemented by application code, and the turn state
//! machine an activation moves through.
//!
//! Grounded on the capability-set shape of the teacher's `Actor` trait
//! (`pre_start`/`post_start`/`post_stop`/`recv`), generalized from a single
//! associated `Msg` type to the generic envelope dispatch spec §9 requires:
//! the runtime itself never reflects on an actor's method signatures, so
//! `handle_envelope` takes and returns opaque bytes and the concrete method
//! call happens inside the actor's own implementation.

pub mod context;

use async_trait::async_trait;

pub use context::ActorContext;

use crate::error::Result;
use crate::persistence::StateWithVersion;
use crate::supervision::SupervisionDirective;

/// Lifecycle state of an activation, independent of what its actor is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    /// Not yet activated, or fully deactivated.
    Idle,
    /// A turn is currently executing.
    Running,
    /// Draining in-flight turns before deactivation; new envelopes are
    /// rejected with `ActorGone`.
    Suspending,
    /// Deactivated; the activation record is about to be evicted.
    Stopped,
}

/// Implemented by application code to define one virtual-actor type.
///
/// A fresh instance is constructed by the directory on each activation; no
/// state survives a deactivation except what was explicitly persisted via
/// [`crate::persistence::StateStore`].
#[async_trait]
pub trait Actor: Send + Sync + 'static {
    /// Called once, immediately after placement, before the first envelope
    /// is dispatched. Typically loads persisted state and registers timers.
    async fn on_activate(&mut self, ctx: &ActorContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called once, after the last in-flight turn completes, before the
    /// activation is evicted. Use to persist final state or cancel timers.
    async fn on_deactivate(&mut self, ctx: &ActorContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Dispatches one envelope's method call and returns the serialized
    /// response, if any. The runtime never inspects `method`/`args_blob`;
    /// decoding is the actor implementation's responsibility.
    async fn handle_envelope(&mut self, ctx: &ActorContext, method: &str, args_blob: &[u8]) -> Result<Vec<u8>>;

    /// Invoked when a timer or reminder registered by this actor fires.
    async fn on_timer(&mut self, ctx: &ActorContext, name: &str) -> Result<()> {
        let _ = (ctx, name);
        Ok(())
    }

    /// Invoked when a durable reminder owned by this silo fires for this
    /// actor. Unlike timers, reminders survive deactivation and restart.
    async fn on_reminder(&mut self, ctx: &ActorContext, name: &str, data: &[u8]) -> Result<()> {
        let _ = (ctx, name, data);
        Ok(())
    }

    /// Chooses how a child's failure should be handled. The default restarts
    /// the activation (reloading its state from storage); override for
    /// actor-type-specific supervision policy.
    fn supervision_directive(&self, child_error: &crate::error::QuarkError) -> SupervisionDirective {
        let _ = child_error;
        SupervisionDirective::Restart
    }

    /// A snapshot to persist after this turn, paired with the version the
    /// store currently holds. Returning `None` opts this actor out of
    /// persistence entirely.
    fn persisted_state(&self) -> Option<(serde_json::Value, i64)> {
        None
    }

    /// Restores state loaded from the `StateStore` on activation or restart.
    /// Only called when a row was actually found.
    fn restore_state(&mut self, loaded: StateWithVersion) {
        let _ = loaded;
    }

    /// Whether this activation's turns may run reentrant call chains
    /// concurrently (see [`crate::mailbox::Reentrancy`]). Off by default.
    fn reentrant(&self) -> bool {
        false
    }
}
