//! Error types for provider detection, certificate listing and signing.

use thiserror::Error;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Error taxonomy for the signing workflow.
///
/// Detection-phase failures (`EnvironmentRestricted`, `ProviderNotFound`,
/// `ProviderInitFailed`) are normally reported as data inside a
/// [`ProviderState`](crate::domain::state::ProviderState); they only surface
/// as errors when a caller asks for the provider explicitly.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("Environment restricted: {0}")]
    #[diagnostic(help("serve the page over http:// or https:// instead of opening it from disk"))]
    EnvironmentRestricted(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider initialization failed: {0}")]
    ProviderInitFailed(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Certificate not found: {0}")]
    CertificateNotFound(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::IoError(error.to_string())
    }
}

impl From<reqwest::Error> for SigningError {
    fn from(error: reqwest::Error) -> Self {
        SigningError::NetworkError(error.to_string())
    }
}

impl From<serde_json::Error> for SigningError {
    fn from(error: serde_json::Error) -> Self {
        SigningError::ProviderError(format!("Malformed provider message: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SigningError::CertificateNotFound("AABBCC".to_string());
        assert_eq!(error.to_string(), "Certificate not found: AABBCC");

        let error = SigningError::ProviderUnavailable("detection not run".to_string());
        assert_eq!(error.to_string(), "Provider unavailable: detection not run");
    }

    #[test]
    fn test_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.bin");
        match SigningError::from(io) {
            SigningError::IoError(msg) => assert!(msg.contains("missing.bin")),
            other => panic!("Wrong error type: {other:?}"),
        }

        let json = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(
            SigningError::from(json),
            SigningError::ProviderError(_)
        ));
    }
}
