//! Protocol definitions for the CAdESCOM bridge.
//!
//! Defines the JSON messages exchanged between the bridge client and the
//! host process that owns the plugin objects. Raw CAdESCOM constant values
//! travel as numbers so the host can hand them to the plugin unchanged.

use crate::adapters::provider::CertificateRecord;
use serde::{Deserialize, Serialize};

/// API version for protocol compatibility checks.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Endpoint paths under `/api/v1/`.
pub mod endpoints {
    pub const ABOUT: &str = "about";
    pub const STORE_OPEN: &str = "store/open";
    pub const STORE_COUNT: &str = "store/count";
    pub const STORE_ITEM: &str = "store/item";
    pub const STORE_FIND: &str = "store/find";
    pub const STORE_CLOSE: &str = "store/close";
    pub const SIGN: &str = "sign";
}

/// Request for the provider's self-description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutRequest {
    pub version: String,
}

/// Provider self-description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutResponse {
    pub version: String,
    /// Plugin version reported by `CAdESCOM.About`.
    pub plugin_version: String,
    /// CSP version, if the host could read it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csp_version: Option<String>,
}

/// Request to open a certificate store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenStoreRequest {
    pub version: String,
    /// `CAPICOM_*_STORE` location value.
    pub location: u32,
    /// Store name, e.g. `My`.
    pub name: String,
    /// `CAPICOM_STORE_OPEN_*` mode value.
    pub mode: u32,
}

/// Identifier of an opened store session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenStoreResponse {
    pub version: String,
    pub store_id: String,
}

/// Request addressing an open store (count, close).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRequest {
    pub version: String,
    pub store_id: String,
}

/// Number of certificates in a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub version: String,
    pub count: usize,
}

/// Request for one store entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRequest {
    pub version: String,
    pub store_id: String,
    /// 1-based entry index.
    pub index: usize,
}

/// One certificate record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateResponse {
    pub version: String,
    pub certificate: CertificateRecord,
}

/// Certificate search inside an open store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindRequest {
    pub version: String,
    pub store_id: String,
    /// `CAPICOM_CERTIFICATE_FIND_*` value.
    pub find_type: u32,
    pub criteria: String,
}

/// Certificates matching a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindResponse {
    pub version: String,
    pub certificates: Vec<CertificateRecord>,
}

/// Empty acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub version: String,
}

/// `CadesSignedData.SignCades` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignCadesRequest {
    pub version: String,
    pub certificate: CertificateRecord,
    pub content: String,
    /// `CADESCOM_*` content encoding value.
    pub content_encoding: u32,
    /// `CADESCOM_CADES_*` signature type value.
    pub signature_type: u32,
    pub detached: bool,
    /// `CADESCOM_ENCODE_*` output encoding value.
    pub encoding_type: u32,
}

/// Encoded signature produced by the plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignCadesResponse {
    pub version: String,
    pub signature: String,
}

/// Error response from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub version: String,
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Known error codes returned by the host.
pub mod error_codes {
    /// Plugin present but not initialized.
    pub const PROVIDER_NOT_READY: &str = "PROVIDER_NOT_READY";
    /// Plugin call failed.
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";
    /// Unknown or already closed store id.
    pub const STORE_NOT_FOUND: &str = "STORE_NOT_FOUND";
    /// Certificate not found.
    pub const CERT_NOT_FOUND: &str = "CERT_NOT_FOUND";
    /// `SignCades` rejected the request.
    pub const SIGNING_FAILED: &str = "SIGNING_FAILED";
    /// Protocol version mismatch.
    pub const VERSION_MISMATCH: &str = "VERSION_MISMATCH";
    /// Malformed request or unknown endpoint.
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

impl AboutRequest {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}

impl Default for AboutRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreRequest {
    #[must_use]
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            store_id: store_id.into(),
        }
    }
}

impl AckResponse {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}

impl Default for AckResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorResponse {
    /// Create a new error response.
    ///
    /// # Arguments
    /// * `code` - Error code from `error_codes` module
    /// * `message` - Human-readable error description
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            error_code: code.into(),
            message: message.into(),
        }
    }
}
