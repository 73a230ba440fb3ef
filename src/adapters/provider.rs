//! Provider capability surface.
//!
//! This module defines the interface the orchestration code needs from a
//! CAdESCOM-compatible signing provider. The provider owns all cryptography;
//! implementations only relay calls:
//! - HTTP bridge to the local plugin host - [`crate::adapters::bridge`]
//! - In-memory provider for tests and demos - [`crate::adapters::memory`]

use crate::domain::types::{
    ContentEncoding, EncodingType, FindQuery, SignatureType, StoreLocation, StoreName,
    StoreOpenMode,
};
use crate::infra::error::SigningResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Shared handle to an acquired provider.
pub type ProviderHandle = Arc<dyn SigningProvider>;

/// Future resolving a deferred capability.
pub type PendingCapability = Pin<Box<dyn Future<Output = SigningResult<ProviderHandle>> + Send>>;

/// Provider self-description (`CAdESCOM.About`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAbout {
    /// Plugin version string
    pub version: String,
    /// Version of the underlying CSP, when the provider reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csp_version: Option<String>,
}

/// Certificate as reported by the provider for one store entry.
///
/// `handle` is an opaque provider-side reference passed back when signing.
/// The thumbprint is raw; normalization happens in the lister.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub handle: String,
    pub thumbprint: String,
    pub subject_name: String,
    pub issuer_name: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub has_private_key: bool,
}

/// Parameters for `CadesSignedData.SignCades`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadesSignRequest {
    /// Certificate assigned to the `CPSigner`
    pub certificate: CertificateRecord,
    /// Content as set on `SignedData.Content`
    pub content: String,
    pub content_encoding: ContentEncoding,
    pub signature_type: SignatureType,
    pub detached: bool,
    pub encoding: EncodingType,
}

/// Signing provider operations.
#[async_trait]
pub trait SigningProvider: Send + Sync {
    /// Query the provider's self-description.
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot answer.
    async fn about(&self) -> SigningResult<ProviderAbout>;

    /// Open a certificate store.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened.
    async fn open_store(
        &self,
        location: StoreLocation,
        name: StoreName,
        mode: StoreOpenMode,
    ) -> SigningResult<Box<dyn CertificateStore>>;

    /// Produce a CAdES signature and return it in the requested encoding.
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the request.
    async fn sign_cades(&self, request: CadesSignRequest) -> SigningResult<String>;
}

/// An open certificate store session.
#[async_trait]
pub trait CertificateStore: Send {
    /// Number of certificates in the store.
    async fn count(&mut self) -> SigningResult<usize>;

    /// Certificate at a 1-based `index`.
    async fn item(&mut self, index: usize) -> SigningResult<CertificateRecord>;

    /// Certificates matching `query`, in provider order.
    async fn find(&mut self, query: &FindQuery) -> SigningResult<Vec<CertificateRecord>>;

    /// Release the store session.
    async fn close(&mut self) -> SigningResult<()>;
}

/// Outcome of probing for the provider's capability object.
pub enum Capability {
    /// The capability exists but is still initializing.
    Pending(PendingCapability),
    /// The capability is ready to use.
    Ready(ProviderHandle),
    /// No capability is present; the string says why.
    Unavailable(String),
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Pending(_) => f.write_str("Capability::Pending"),
            Capability::Ready(_) => f.write_str("Capability::Ready"),
            Capability::Unavailable(reason) => write!(f, "Capability::Unavailable({reason})"),
        }
    }
}

/// Finds the provider in the current environment.
#[async_trait]
pub trait ProviderLocator: Send + Sync {
    /// Probe for the capability object without side effects.
    fn locate(&self) -> Capability;

    /// Try to make the capability appear, e.g. by loading the plugin loader.
    ///
    /// # Errors
    ///
    /// Returns error if the loader itself cannot be loaded.
    async fn load(&self) -> SigningResult<()>;

    /// Where the loader is expected, for remediation hints.
    fn loader_location(&self) -> String;
}
