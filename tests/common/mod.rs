//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod bridge_server;
pub mod fixtures;
pub mod test_env;
