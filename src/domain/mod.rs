pub mod certificate;
pub mod constants;
pub mod state; // detection result and session lifecycle
pub mod types;
