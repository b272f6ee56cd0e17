//! # Phone Client Library
//!
//! A headless stand-in for the browser page phones use to play the museum
//! quest. It speaks the same JSON-over-WebSocket protocol, which makes it
//! useful for driving a live server from integration tests and for poking
//! at a running server from the command line.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! [`PhoneClient`] owns one WebSocket connection:
//! - Sending request frames, well-formed or deliberately broken
//! - Receiving and decoding server messages with timeouts
//! - Waiting for a specific message type while skipping the rest
//!
//! ### Requests Module (`requests`)
//! Builders for every request a phone can send, and the `kind:args` step
//! syntax the command line client uses to script a session.

pub mod network;
pub mod requests;

pub use network::{ClientResult, PhoneClient};
pub use requests::Step;
