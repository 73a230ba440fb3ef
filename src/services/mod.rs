//! Service layer module root.
//! Contains provider detection, certificate listing and signing orchestration.

pub mod certificates;
pub mod detector;
pub mod session;
pub mod signing;
pub mod store_scope;

pub use certificates::{list_certificates, list_from_provider};
pub use detector::ProviderDetector;
pub use session::SigningSession;
pub use signing::{sign, sign_with_provider, SigningInput};
pub use store_scope::with_personal_store;
