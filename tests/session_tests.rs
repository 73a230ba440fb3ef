//! Signing session lifecycle tests.

use cades_signer::domain::state::{Activity, SigningOutcome};
use cades_signer::{
    InMemoryProvider, LocatorMode, SessionPhase, SigningError, SigningInput, SigningSession,
};

mod common;

use common::fixtures::{detector, record, three_certificates, LOCAL_ORIGIN};

#[tokio::test]
async fn test_operations_require_detection() {
    let mut session = SigningSession::new();
    assert_eq!(session.phase(), SessionPhase::Unchecked);

    let err = session.refresh_certificates().await.unwrap_err();
    assert!(matches!(err, SigningError::ProviderUnavailable(_)));

    let input = SigningInput::new(b"x".to_vec(), "AA", false);
    assert!(matches!(
        session.sign(&input).await,
        Err(SigningError::ProviderUnavailable(_))
    ));
    assert!(session.last_outcome().is_none());
}

#[tokio::test]
async fn test_detection_runs_once_per_session() {
    let provider = InMemoryProvider::new();
    let detector = detector(&provider, LOCAL_ORIGIN, LocatorMode::Ready);
    let mut session = SigningSession::new();

    assert!(session.initialize(&detector).await.is_available());
    assert!(session.initialize(&detector).await.is_available());

    assert_eq!(session.phase(), SessionPhase::Available);
    assert_eq!(provider.calls().about_calls, 1);
}

#[tokio::test]
async fn test_unavailable_session_reports_detection_message() {
    let provider = InMemoryProvider::new();
    let detector = detector(&provider, "file:///srv/app/index.html", LocatorMode::Ready);
    let mut session = SigningSession::new();

    let state = session.initialize(&detector).await;
    assert!(!state.is_available());
    assert_eq!(session.phase(), SessionPhase::Unavailable);

    let err = session.refresh_certificates().await.unwrap_err();
    assert!(matches!(err, SigningError::ProviderUnavailable(ref msg) if msg.contains("file://")));
}

#[tokio::test]
async fn test_list_select_sign_flow() {
    let provider = InMemoryProvider::new().with_certificates(three_certificates());
    let detector = detector(&provider, LOCAL_ORIGIN, LocatorMode::Deferred);
    let mut session = SigningSession::new();
    session.initialize(&detector).await;

    let newest = session.refresh_certificates().await.unwrap()[0].clone();
    assert_eq!(session.certificates().len(), 2);
    assert_eq!(session.activity(), Activity::Idle);

    let lookup = newest.fingerprint.as_str().to_ascii_lowercase();
    assert_eq!(session.certificate(&lookup), Some(&newest));
    assert!(session.certificate("not hex").is_none());

    let input = SigningInput::new(b"body".to_vec(), newest.fingerprint.as_str(), true)
        .with_file_name("body.txt");
    let result = session.sign(&input).await.unwrap();
    assert_eq!(result.file_name, "body.txt.sig");
    assert_eq!(session.last_outcome(), Some(SigningOutcome::Signed));
    assert_eq!(session.activity(), Activity::Idle);
}

#[tokio::test]
async fn test_failed_sign_is_recorded() {
    let provider = InMemoryProvider::new()
        .with_certificate(record("AABBCC", "CN=Token", (2024, 1, 1), true))
        .rejecting_signatures("token removed");
    let detector = detector(&provider, LOCAL_ORIGIN, LocatorMode::Ready);
    let mut session = SigningSession::new();
    session.initialize(&detector).await;

    let input = SigningInput::new(b"x".to_vec(), "AABBCC", false);
    assert!(session.sign(&input).await.is_err());
    assert_eq!(session.last_outcome(), Some(SigningOutcome::Failed));
    assert_eq!(session.activity(), Activity::Idle);
}

#[tokio::test]
async fn test_failed_refresh_clears_snapshot() {
    let provider = InMemoryProvider::new().with_certificates(three_certificates());
    let detector = detector(&provider, LOCAL_ORIGIN, LocatorMode::Ready);
    let mut session = SigningSession::new();
    session.initialize(&detector).await;

    session.refresh_certificates().await.unwrap();
    assert_eq!(session.certificates().len(), 2);

    // clones share behaviour with the provider the session holds
    let _ = provider.clone().failing_store_open("store is locked");
    assert!(session.refresh_certificates().await.is_err());
    assert!(session.certificates().is_empty());
}
