//! The mailbox: a bounded, FIFO envelope queue plus the turn loop that
//! drains it one envelope (or one reentrant call-chain) at a time.

pub mod queue;
pub mod turn;

pub use queue::{mailbox, Mailbox, MailboxSender};
pub use turn::{spawn_turn_loop, CancellationToken, Dispatch, Reentrancy};
