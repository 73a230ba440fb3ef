//! CAdESCOM bridge adapter.
//!
//! The browser plugin objects live in a local host process; this adapter
//! reaches them over a small JSON-over-HTTP protocol. The client side
//! implements [`crate::adapters::provider::SigningProvider`], the host side
//! serves any provider implementation.

pub mod client;
pub mod host;
pub mod protocol;

pub use client::{BridgeClient, BridgeConfig, BridgeLocator, BridgeProvider};
pub use host::BridgeHost;
