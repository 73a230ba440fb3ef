//! Certificate listing service.
//!
//! Produces the snapshot of personal certificates that can sign: entries
//! without a private key are skipped, thumbprints are normalized, and the
//! result is ordered most recently issued first.

use crate::adapters::provider::{CertificateStore, SigningProvider};
use crate::domain::certificate::{sort_newest_first, CertificateDescriptor};
use crate::domain::state::ProviderState;
use crate::domain::types::Fingerprint;
use crate::infra::error::SigningResult;
use crate::services::store_scope::with_personal_store;
use std::collections::HashSet;

/// List certificates with a private key from a detected provider.
///
/// # Errors
///
/// Returns `ProviderUnavailable` if detection did not succeed, or the
/// provider's error if the store cannot be read.
pub async fn list_certificates(state: &ProviderState) -> SigningResult<Vec<CertificateDescriptor>> {
    let provider = state.provider_for("certificate listing")?;
    list_from_provider(provider.as_ref()).await
}

/// List certificates with a private key directly from a provider.
///
/// # Errors
///
/// Returns the provider's error if the store cannot be read.
pub async fn list_from_provider(
    provider: &dyn SigningProvider,
) -> SigningResult<Vec<CertificateDescriptor>> {
    let mut certificates =
        with_personal_store(provider, |store| Box::pin(collect_signing_certificates(store)))
            .await?;
    sort_newest_first(&mut certificates);

    log::info!("Found {} certificate(s) with a private key", certificates.len());
    Ok(certificates)
}

async fn collect_signing_certificates(
    store: &mut dyn CertificateStore,
) -> SigningResult<Vec<CertificateDescriptor>> {
    let count = store.count().await?;
    log::debug!("Personal store holds {count} certificate(s)");

    let mut seen = HashSet::new();
    let mut certificates = Vec::with_capacity(count);

    for index in 1..=count {
        let record = store.item(index).await?;

        if !record.has_private_key {
            log::debug!("Skipping certificate #{index}: no private key");
            continue;
        }

        let fingerprint = match Fingerprint::normalize(&record.thumbprint) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                log::warn!("Skipping certificate #{index}: {e}");
                continue;
            }
        };

        if !seen.insert(fingerprint.clone()) {
            log::debug!("Skipping certificate #{index}: duplicate of {fingerprint}");
            continue;
        }

        certificates.push(CertificateDescriptor {
            fingerprint,
            subject: record.subject_name,
            issuer: record.issuer_name,
            valid_from: record.valid_from,
            valid_to: record.valid_to,
        });
    }

    Ok(certificates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProvider;
    use crate::adapters::provider::CertificateRecord;
    use crate::domain::state::DetectionFailure;
    use crate::infra::error::SigningError;
    use chrono::{TimeZone, Utc};

    fn record(thumbprint: &str, year: i32, has_private_key: bool) -> CertificateRecord {
        CertificateRecord {
            handle: format!("h-{year}"),
            thumbprint: thumbprint.to_string(),
            subject_name: format!("CN=Subject {year}"),
            issuer_name: "CN=Issuer".to_string(),
            valid_from: Utc.with_ymd_and_hms(year, 2, 1, 0, 0, 0).unwrap(),
            valid_to: Utc.with_ymd_and_hms(year + 1, 2, 1, 0, 0, 0).unwrap(),
            has_private_key,
        }
    }

    #[tokio::test]
    async fn test_skips_malformed_and_duplicate_thumbprints() {
        let provider = InMemoryProvider::new().with_certificates([
            record("not a thumbprint", 2020, true),
            record("aa bb", 2021, true),
            record("AABB", 2022, true),
            record("", 2023, true),
        ]);

        let certs = list_from_provider(&provider).await.unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].fingerprint.as_str(), "AABB");
        assert_eq!(certs[0].subject, "CN=Subject 2021");
    }

    #[tokio::test]
    async fn test_requires_successful_detection() {
        let state = ProviderState::unavailable(
            DetectionFailure::ProviderNotFound,
            "plugin not found",
            Vec::new(),
            Vec::new(),
        );
        let result = list_certificates(&state).await;
        assert!(matches!(result, Err(SigningError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_item_failure_still_closes_store() {
        let provider = InMemoryProvider::new()
            .with_certificate(record("01", 2024, true))
            .failing_enumeration("device busy");

        assert!(list_from_provider(&provider).await.is_err());
        assert_eq!(provider.open_store_count(), 0);
    }
}
