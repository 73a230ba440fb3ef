//! Signing integration tests.

use cades_signer::{sign, InMemoryProvider, SigningError, SigningInput};

mod common;

use common::fixtures::{ready_state, record, three_certificates};

#[tokio::test]
async fn test_absent_fingerprint_is_not_found_without_sign_call() {
    let provider = InMemoryProvider::new().with_certificates(three_certificates());
    let state = ready_state(&provider).await;

    let input = SigningInput::new(b"payload".to_vec(), "DEADBEEF", false);
    let err = sign(&state, &input).await.unwrap_err();

    assert!(matches!(err, SigningError::CertificateNotFound(ref fp) if fp == "DEADBEEF"));
    let calls = provider.calls();
    assert!(calls.sign_requests.is_empty());
    assert_eq!(calls.stores_opened, calls.stores_closed);
}

#[tokio::test]
async fn test_echoed_signature_and_detached_flag_round_trip() {
    let provider = InMemoryProvider::new()
        .with_certificates(three_certificates())
        .with_signature("MIIGdwYJKoZIhvcNAQcCoIIGaDCCBmQCAQExDjAMBggqhQMHAQECAgUAMAsG");
    let state = ready_state(&provider).await;

    for detached in [true, false] {
        let input = SigningInput::new(
            b"contract body".to_vec(),
            "ffeeddccbbaa99887766554433221100ffeeddcc",
            detached,
        );
        let result = sign(&state, &input).await.unwrap();

        assert_eq!(
            result.signature,
            "MIIGdwYJKoZIhvcNAQcCoIIGaDCCBmQCAQExDjAMBggqhQMHAQECAgUAMAsG"
        );
        assert_eq!(result.detached, detached);
        let calls = provider.calls();
        let request = calls.sign_requests.last().unwrap();
        assert_eq!(request.detached, detached);
        assert_eq!(request.certificate.subject_name, "CN=Petrova Anna, O=Example");
    }
}

#[tokio::test]
async fn test_aabbcc_scenario_returns_base64() {
    let provider = InMemoryProvider::new().with_certificate(record(
        "AABBCC",
        "CN=Scenario",
        (2024, 1, 1),
        true,
    ));
    let state = ready_state(&provider).await;

    let file_bytes = vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xff];
    let input = SigningInput::new(file_bytes, "AABBCC", true);
    let result = sign(&state, &input).await.unwrap();

    assert!(!result.signature.is_empty());
    assert!(result
        .signature
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')));
    assert_eq!(provider.calls().sign_requests[0].content, "JVBERgD/");
}

#[tokio::test]
async fn test_certificate_removed_after_listing_is_not_found() {
    let provider = InMemoryProvider::new().with_certificates(three_certificates());
    let state = ready_state(&provider).await;
    let listed = cades_signer::list_certificates(&state).await.unwrap();

    provider.replace_certificates(Vec::new());

    let input = SigningInput::new(b"x".to_vec(), listed[0].fingerprint.as_str(), false);
    assert!(matches!(
        sign(&state, &input).await,
        Err(SigningError::CertificateNotFound(_))
    ));
}

#[tokio::test]
async fn test_provider_rejection_surfaces_as_signing_failed() {
    let provider = InMemoryProvider::new()
        .with_certificates(three_certificates())
        .rejecting_signatures("The operation was cancelled by the user");
    let state = ready_state(&provider).await;

    let input = SigningInput::new(b"x".to_vec(), "A1B2C3D4E5F60718293A4B5C6D7E8F9001122334", true);
    let err = sign(&state, &input).await.unwrap_err();

    assert!(matches!(err, SigningError::SigningFailed(_)));
    assert!(err.to_string().contains("cancelled by the user"));
    assert_eq!(provider.open_store_count(), 0);
}

#[tokio::test]
async fn test_signature_file_is_saved_under_suggested_name() {
    let dir = tempfile::TempDir::new().unwrap();
    let input_path = dir.path().join("invoice.xml");
    std::fs::write(&input_path, b"<invoice/>").unwrap();

    let provider = InMemoryProvider::new()
        .with_certificate(record("0A1B", "CN=Saver", (2024, 1, 1), true))
        .with_signature("c2ln");
    let state = ready_state(&provider).await;

    let input = SigningInput::from_file(&input_path, "0a 1b", true)
        .await
        .unwrap();
    let result = sign(&state, &input).await.unwrap();
    let saved = result.save_in(dir.path()).await.unwrap();

    assert_eq!(saved, dir.path().join("invoice.xml.sig"));
    assert_eq!(std::fs::read_to_string(saved).unwrap(), "c2ln");
}
