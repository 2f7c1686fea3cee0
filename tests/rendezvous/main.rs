//! Rendezvous Integration Tests
//!
//! Continuations completed by worker threads and pending results routed
//! between instances over a shared broadcast channel.

#[path = "../common/mod.rs"]
mod common;

mod continuations;
mod pending_results;
