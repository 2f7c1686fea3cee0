//! Transaction Integration Tests
//!
//! Coordinated begin/commit/abort across the four resource wrappers, wired
//! to recording resources.

#[path = "../common/mod.rs"]
mod common;

mod end_to_end;
mod handlers;
mod lifecycle;
mod ordering;
