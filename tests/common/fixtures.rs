//! Certificate records and provider setups used across integration tests.

use cades_signer::{
    CertificateRecord, ExecutionContext, InMemoryLocator, InMemoryProvider, LocatorMode,
    ProviderDetector, ProviderState,
};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

pub const LOCAL_ORIGIN: &str = "http://localhost:8080";

/// Record valid for three years from `(year, month, day)`.
pub fn record(
    thumbprint: &str,
    subject: &str,
    (year, month, day): (i32, u32, u32),
    has_private_key: bool,
) -> CertificateRecord {
    CertificateRecord {
        handle: format!("cert:{}", thumbprint.replace(' ', "")),
        thumbprint: thumbprint.to_string(),
        subject_name: subject.to_string(),
        issuer_name: "CN=Test Certification Authority, O=Test".to_string(),
        valid_from: Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap(),
        valid_to: Utc.with_ymd_and_hms(year + 3, month, day, 0, 0, 0).unwrap(),
        has_private_key,
    }
}

/// Two signing certificates (2023-01-01, 2024-06-01) and one without a key.
pub fn three_certificates() -> Vec<CertificateRecord> {
    vec![
        record(
            "a1 b2 c3 d4 e5 f6 07 18 29 3a 4b 5c 6d 7e 8f 90 01 12 23 34",
            "CN=Ivanov Ivan, O=Example",
            (2023, 1, 1),
            true,
        ),
        record(
            "0102030405060708090A0B0C0D0E0F1011121314",
            "CN=Encryption Only",
            (2025, 2, 1),
            false,
        ),
        record(
            "ffeeddccbbaa99887766554433221100ffeeddcc",
            "CN=Petrova Anna, O=Example",
            (2024, 6, 1),
            true,
        ),
    ]
}

pub fn detector(provider: &InMemoryProvider, origin: &str, mode: LocatorMode) -> ProviderDetector {
    let locator = InMemoryLocator::new(provider.clone(), mode);
    ProviderDetector::new(ExecutionContext::new(origin).unwrap(), Arc::new(locator))
}

/// Detection result for a provider that is present and ready.
pub async fn ready_state(provider: &InMemoryProvider) -> ProviderState {
    let state = detector(provider, LOCAL_ORIGIN, LocatorMode::Ready)
        .detect()
        .await;
    assert!(state.is_available(), "{}", state.message());
    state
}
