//! Core types, capability traits and engines for the Courier messaging
//! subsystem.
//!
//! No HTTP or database code lives here. The friend graph, message store and
//! notification store are injected through the traits in [`store`];
//! [`delivery::Messenger`] and [`notify::Notifier`] implement the behaviour
//! on top of them.

// Trait methods declare `+ Send` futures; implementors write `async fn`.
#![allow(async_fn_in_trait)]

pub mod conversation;
pub mod delivery;
pub mod error;
pub mod message;
pub mod notification;
pub mod notify;
pub mod store;
pub mod user;

#[cfg(test)]
mod fake;

pub use error::{Error, Result};
