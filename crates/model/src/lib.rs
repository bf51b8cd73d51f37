//! An abstraction layer for the completion backends.
//!
//! This crate establishes the protocol the conversation core uses to talk
//! to a remote model, so that the transport (endpoint dialect, auth,
//! streaming format) can be swapped without touching the dialogue logic.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
