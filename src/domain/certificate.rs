//! Certificate snapshot entries and the signature produced for a file.

use crate::domain::constants::{DEFAULT_SIGNATURE_FILE_NAME, SIGNATURE_EXTENSION};
use crate::domain::types::Fingerprint;
use crate::infra::error::SigningResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";
const DATE_FORMAT: &str = "%d.%m.%Y";

/// Read-only view of a provider certificate that has a private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateDescriptor {
    pub fingerprint: Fingerprint,
    pub subject: String,
    pub issuer: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

impl CertificateDescriptor {
    /// One-line label used when offering the certificate for selection.
    #[must_use]
    pub fn selection_label(&self) -> String {
        format!(
            "{} (until {})",
            self.subject,
            self.valid_to.format(DATE_FORMAT)
        )
    }

    /// Multi-line summary shown for the selected certificate.
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Fingerprint: {}", self.fingerprint),
            format!("Subject: {}", self.subject),
            format!("Issuer: {}", self.issuer),
            format!("Valid from: {}", self.valid_from.format(DATE_TIME_FORMAT)),
            format!("Valid to: {}", self.valid_to.format(DATE_TIME_FORMAT)),
        ]
    }
}

/// Summary for an optional selection; `"No data"` when nothing is selected.
#[must_use]
pub fn format_certificate_info(certificate: Option<&CertificateDescriptor>) -> String {
    match certificate {
        Some(cert) => cert.summary_lines().join("\n"),
        None => "No data".to_string(),
    }
}

/// Order a snapshot most recently issued first.
pub fn sort_newest_first(certificates: &mut [CertificateDescriptor]) {
    certificates.sort_by(|a, b| b.valid_from.cmp(&a.valid_from));
}

/// Encoded signature returned by the provider, ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureResult {
    /// Base64 CAdES-BES signature, verbatim from the provider
    pub signature: String,
    /// Suggested name for the saved signature
    pub file_name: String,
    /// Whether the signature is detached from the content
    pub detached: bool,
}

impl SignatureResult {
    #[must_use]
    pub fn new(signature: String, input_name: Option<&str>, detached: bool) -> Self {
        Self {
            signature,
            file_name: suggested_file_name(input_name),
            detached,
        }
    }

    /// Write the signature as UTF-8 text into `directory` under the suggested name.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be written.
    pub async fn save_in(&self, directory: &Path) -> SigningResult<PathBuf> {
        let path = directory.join(&self.file_name);
        tokio::fs::write(&path, self.signature.as_bytes()).await?;
        log::info!("Signature saved to {}", path.display());
        Ok(path)
    }
}

/// `<input name>.sig`, or `signature.sig` when the input name is unknown.
#[must_use]
pub fn suggested_file_name(input_name: Option<&str>) -> String {
    match input_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!("{name}.{SIGNATURE_EXTENSION}"),
        None => DEFAULT_SIGNATURE_FILE_NAME.to_string(),
    }
}
