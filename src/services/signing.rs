//! Signing orchestration.
//!
//! Looks the chosen certificate up again by fingerprint (the listing snapshot
//! may be stale), then asks the provider for a CAdES-BES signature over the
//! file content:
//! - content is sent base64-encoded and flagged as binary
//! - the signature comes back base64-encoded, verbatim

use crate::adapters::provider::{CadesSignRequest, CertificateRecord, SigningProvider};
use crate::domain::certificate::SignatureResult;
use crate::domain::state::ProviderState;
use crate::domain::types::{ContentEncoding, EncodingType, FindQuery, Fingerprint, SignatureType};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::store_scope::with_personal_store;
use base64::Engine;
use std::path::Path;

/// Input for one signing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningInput {
    /// Raw file content
    pub content: Vec<u8>,
    /// Fingerprint of the certificate to sign with
    pub fingerprint: String,
    /// Produce a detached signature instead of embedding the content
    pub detached: bool,
    /// Input file name, used to suggest the output name
    pub file_name: Option<String>,
}

impl SigningInput {
    #[must_use]
    pub fn new(content: Vec<u8>, fingerprint: impl Into<String>, detached: bool) -> Self {
        Self {
            content,
            fingerprint: fingerprint.into(),
            detached,
            file_name: None,
        }
    }

    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Read `path` and take its file name for the suggested output name.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read.
    pub async fn from_file(
        path: &Path,
        fingerprint: impl Into<String>,
        detached: bool,
    ) -> SigningResult<Self> {
        let content = tokio::fs::read(path).await.map_err(|e| {
            SigningError::IoError(format!("Failed to read {}: {e}", path.display()))
        })?;

        let mut input = Self::new(content, fingerprint, detached);
        input.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(input)
    }
}

/// Sign with a certificate from the detected provider.
///
/// # Errors
///
/// - `ProviderUnavailable` if detection did not succeed
/// - `ValidationError` if the fingerprint is not hex
/// - `CertificateNotFound` if no usable certificate matches
/// - `SigningFailed` if the provider rejects the request
pub async fn sign(state: &ProviderState, input: &SigningInput) -> SigningResult<SignatureResult> {
    let provider = state.provider_for("signing")?;
    sign_with_provider(provider.as_ref(), input).await
}

/// Sign directly against a provider.
///
/// # Errors
///
/// Same as [`sign`], minus the detection check.
pub async fn sign_with_provider(
    provider: &dyn SigningProvider,
    input: &SigningInput,
) -> SigningResult<SignatureResult> {
    let fingerprint = Fingerprint::normalize(&input.fingerprint)?;

    let certificate = find_certificate(provider, &fingerprint)
        .await?
        .ok_or_else(|| SigningError::CertificateNotFound(fingerprint.to_string()))?;

    if !certificate.has_private_key {
        return Err(SigningError::CertificateNotFound(format!(
            "{fingerprint} has no private key"
        )));
    }

    log::info!(
        "Signing {} byte(s) with {} ({} signature)",
        input.content.len(),
        fingerprint,
        if input.detached { "detached" } else { "attached" }
    );

    let request = CadesSignRequest {
        certificate,
        content: base64::engine::general_purpose::STANDARD.encode(&input.content),
        content_encoding: ContentEncoding::Base64ToBinary,
        signature_type: SignatureType::CadesBes,
        detached: input.detached,
        encoding: EncodingType::Base64,
    };

    let signature = provider.sign_cades(request).await.map_err(|e| match e {
        SigningError::SigningFailed(message) => SigningError::SigningFailed(message),
        other => SigningError::SigningFailed(other.to_string()),
    })?;

    if signature.trim().is_empty() {
        return Err(SigningError::SigningFailed(
            "provider returned an empty signature".to_string(),
        ));
    }

    log::info!("Signature created ({} base64 chars)", signature.len());
    Ok(SignatureResult::new(
        signature,
        input.file_name.as_deref(),
        input.detached,
    ))
}

/// Find-by-hash lookup in the personal store; the store is closed before returning.
async fn find_certificate(
    provider: &dyn SigningProvider,
    fingerprint: &Fingerprint,
) -> SigningResult<Option<CertificateRecord>> {
    let query = FindQuery::Sha1Hash(fingerprint.clone());
    with_personal_store(provider, move |store| {
        Box::pin(async move {
            let matches = store.find(&query).await?;
            log::debug!("{} match(es) for {}", matches.len(), query.criteria());
            Ok(matches.into_iter().next())
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProvider;
    use chrono::{TimeZone, Utc};

    fn record(thumbprint: &str, has_private_key: bool) -> CertificateRecord {
        CertificateRecord {
            handle: format!("handle-{thumbprint}"),
            thumbprint: thumbprint.to_string(),
            subject_name: "CN=Signer".to_string(),
            issuer_name: "CN=CA".to_string(),
            valid_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            valid_to: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            has_private_key,
        }
    }

    #[tokio::test]
    async fn test_request_shape() {
        let provider = InMemoryProvider::new()
            .with_certificate(record("AA BB CC", true))
            .with_signature("c2lnbmF0dXJl");

        let input = SigningInput::new(b"hello".to_vec(), "aabbcc", false).with_file_name("a.txt");
        let result = sign_with_provider(&provider, &input).await.unwrap();
        assert_eq!(result.signature, "c2lnbmF0dXJl");
        assert_eq!(result.file_name, "a.txt.sig");
        assert!(!result.detached);

        let calls = provider.calls();
        let request = &calls.sign_requests[0];
        assert_eq!(request.content, "aGVsbG8=");
        assert_eq!(request.content_encoding, ContentEncoding::Base64ToBinary);
        assert_eq!(request.signature_type, SignatureType::CadesBes);
        assert_eq!(request.encoding, EncodingType::Base64);
        assert_eq!(request.certificate.handle, "handle-AA BB CC");
        assert_eq!(calls.find_queries, ["AABBCC"]);
        assert_eq!(provider.open_store_count(), 0);
    }

    #[tokio::test]
    async fn test_certificate_without_key_is_not_used() {
        let provider = InMemoryProvider::new().with_certificate(record("AABBCC", false));
        let input = SigningInput::new(b"x".to_vec(), "AABBCC", true);

        let result = sign_with_provider(&provider, &input).await;
        assert!(matches!(result, Err(SigningError::CertificateNotFound(_))));
        assert!(provider.calls().sign_requests.is_empty());
    }

    #[tokio::test]
    async fn test_provider_rejection_is_signing_failed() {
        let provider = InMemoryProvider::new()
            .with_certificate(record("AABBCC", true))
            .rejecting_signatures("user cancelled the PIN prompt");
        let input = SigningInput::new(b"x".to_vec(), "AABBCC", true);

        let result = sign_with_provider(&provider, &input).await;
        assert!(matches!(
            result,
            Err(SigningError::SigningFailed(msg)) if msg.contains("PIN prompt")
        ));
    }

    #[tokio::test]
    async fn test_empty_signature_is_rejected() {
        let provider = InMemoryProvider::new()
            .with_certificate(record("AABBCC", true))
            .with_signature("  ");
        let input = SigningInput::new(b"x".to_vec(), "AABBCC", false);

        assert!(matches!(
            sign_with_provider(&provider, &input).await,
            Err(SigningError::SigningFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_fingerprint_never_opens_store() {
        let provider = InMemoryProvider::new();
        let input = SigningInput::new(b"x".to_vec(), "not-hex", false);

        assert!(matches!(
            sign_with_provider(&provider, &input).await,
            Err(SigningError::ValidationError(_))
        ));
        assert_eq!(provider.calls().stores_opened, 0);
    }

    #[tokio::test]
    async fn test_from_file_takes_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("contract.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let input = SigningInput::from_file(&path, "AA", true).await.unwrap();
        assert_eq!(input.content, b"%PDF");
        assert_eq!(input.file_name.as_deref(), Some("contract.pdf"));
        assert!(input.detached);
    }
}
