//! CAdES Signer Library
//!
//! Orchestrates CAdES-BES signing through a CryptoPro CAdESCOM provider:
//! detects whether the provider is reachable from the current page origin,
//! lists personal certificates with a private key, and asks the provider to
//! sign file content with a chosen certificate. All cryptography stays in
//! the provider.
//!
//! ```no_run
//! use std::sync::Arc;
//! use cades_signer::{
//!     BridgeConfig, BridgeLocator, ExecutionContext, ProviderDetector, SigningInput,
//!     SigningSession,
//! };
//!
//! # async fn run() -> cades_signer::SigningResult<()> {
//! let locator = BridgeLocator::new(Some(BridgeConfig::new("http://127.0.0.1:8095")))?;
//! let detector = ProviderDetector::new(
//!     ExecutionContext::new("http://localhost:8080")?,
//!     Arc::new(locator),
//! );
//!
//! let mut session = SigningSession::new();
//! if session.initialize(&detector).await.is_available() {
//!     let newest = session.refresh_certificates().await?.first().cloned();
//!     if let Some(certificate) = newest {
//!         let input = SigningInput::new(b"hello".to_vec(), certificate.fingerprint.as_str(), true);
//!         let signature = session.sign(&input).await?;
//!         println!("{}", signature.signature);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

pub use adapters::bridge::{BridgeConfig, BridgeHost, BridgeLocator, BridgeProvider};
pub use adapters::memory::{InMemoryLocator, InMemoryProvider, LocatorMode};
pub use adapters::provider::{
    Capability, CertificateRecord, ProviderAbout, ProviderHandle, ProviderLocator,
    SigningProvider,
};
pub use domain::certificate::{format_certificate_info, CertificateDescriptor, SignatureResult};
pub use domain::state::{DetectionFailure, ProviderState, SessionPhase, StatusDetail};
pub use domain::types::{ExecutionContext, Fingerprint};
pub use infra::config::{ConfigManager, ExportFormat, SignerConfiguration};
pub use infra::error::{SigningError, SigningResult};
pub use services::{list_certificates, sign, ProviderDetector, SigningInput, SigningSession};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_detect_list_sign_through_reexports() {
        let provider = InMemoryProvider::new().with_certificate(CertificateRecord {
            handle: "c1".to_string(),
            thumbprint: "0a1b2c".to_string(),
            subject_name: "CN=Library".to_string(),
            issuer_name: "CN=CA".to_string(),
            valid_from: "2024-03-01T00:00:00Z".parse().unwrap(),
            valid_to: "2026-03-01T00:00:00Z".parse().unwrap(),
            has_private_key: true,
        });
        let detector = ProviderDetector::new(
            ExecutionContext::new("http://localhost:8080").unwrap(),
            Arc::new(InMemoryLocator::new(provider, LocatorMode::Ready)),
        );

        let state = detector.detect().await;
        let certificates = list_certificates(&state).await.unwrap();
        assert_eq!(certificates[0].fingerprint.as_str(), "0A1B2C");

        let input = SigningInput::new(b"data".to_vec(), "0A1B2C", true);
        let result = sign(&state, &input).await.unwrap();
        assert!(result.detached);
        assert_eq!(result.file_name, "signature.sig");
    }
}
