//! Integration Tests
//!
//! Cross-crate tests driving real connections over the in-memory mirror:
//! - Resolver: every record lookup strategy of the `Open_vSwitch` schema
//! - Events: row notifications routed from commits to watchers
//! - Connection: the worker thread, retries, failure policy and timeouts

#[path = "../common/mod.rs"]
mod common;

mod connection;
mod events;
mod resolver;
