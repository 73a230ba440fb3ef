//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - The signing provider capability surface (traits)
//! - The CAdESCOM bridge (HTTP client and host)
//! - An in-memory provider for tests and offline demos

pub mod bridge;
pub mod memory;
pub mod provider;
