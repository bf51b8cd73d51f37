//! A lightweight actor framework.
//!
//! An actor owns its state exclusively. Every mutation is expressed as a
//! [`Message`] and processed one at a time on the actor's own task, which
//! gives callers serialized access without any locking.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod macros;
mod mailbox;
mod query;
mod scheduler;

pub use error::ActorDeadError;
pub use handle::Actor;
pub use mailbox::Message;
