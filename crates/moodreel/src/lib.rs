//! A music and film curation chat, ready to run against an OpenAI
//! compatible endpoint.
//!
//! The crate includes a CLI tool for chatting in the terminal. It can also
//! be linked into a host app, either as a Rust library or through the C
//! API in [`ffi`].

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

#[cfg(feature = "ffi")]
pub mod ffi;
mod session;

pub use session::{Session, SessionBuilder, openai_provider};

/// Re-exports of [`moodreel_core`] crate.
pub mod core {
    pub use moodreel_core::*;
}
