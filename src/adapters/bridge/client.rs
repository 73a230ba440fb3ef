//! Bridge client.
//!
//! Talks to the local CAdESCOM bridge host over HTTP and exposes it as a
//! [`SigningProvider`].

use super::protocol::{
    endpoints, error_codes, AboutRequest, AboutResponse, AckResponse, CertificateResponse,
    CountResponse, ErrorResponse, FindRequest, FindResponse, ItemRequest, OpenStoreRequest,
    OpenStoreResponse, SignCadesRequest, SignCadesResponse, StoreRequest, PROTOCOL_VERSION,
};
use crate::adapters::provider::{
    CadesSignRequest, Capability, CertificateRecord, CertificateStore, ProviderAbout,
    ProviderHandle, ProviderLocator, SigningProvider,
};
use crate::domain::types::{FindQuery, StoreLocation, StoreName, StoreOpenMode};
use crate::infra::error::{SigningError, SigningResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Configuration for connecting to the bridge host.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the host (e.g., `http://127.0.0.1:8095`).
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl BridgeConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 30,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP client for the bridge protocol.
#[derive(Debug)]
pub struct BridgeClient {
    config: BridgeConfig,
    client: reqwest::Client,
}

impl BridgeClient {
    /// Create a new bridge client.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(config: BridgeConfig) -> SigningResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                SigningError::NetworkError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { config, client })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Query the plugin's self-description.
    ///
    /// # Errors
    /// Returns error if the host is unreachable or reports a failure.
    pub async fn about(&self) -> SigningResult<AboutResponse> {
        self.post(endpoints::ABOUT, &AboutRequest::new()).await
    }

    async fn post<Req, Resp>(&self, endpoint: &str, request: &Req) -> SigningResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!(
            "{}/api/v1/{endpoint}",
            self.config.base_url.trim_end_matches('/')
        );
        log::debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                SigningError::NetworkError(format!("Failed to reach bridge host: {e}"))
            })?;

        self.handle_response(response).await
    }

    /// Handle HTTP response and parse JSON body.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> SigningResult<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| SigningError::ProviderError(format!("Failed to parse response: {e}")))
        } else {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                Err(Self::map_error_code(&error_response))
            } else {
                Err(SigningError::NetworkError(format!(
                    "Bridge error {status}: {error_text}"
                )))
            }
        }
    }

    /// Map error codes to appropriate `SigningError` variants.
    fn map_error_code(error: &ErrorResponse) -> SigningError {
        let message = error.message.clone();
        match error.error_code.as_str() {
            error_codes::PROVIDER_NOT_READY => SigningError::ProviderInitFailed(message),
            error_codes::CERT_NOT_FOUND => SigningError::CertificateNotFound(message),
            error_codes::SIGNING_FAILED => SigningError::SigningFailed(message),
            error_codes::BAD_REQUEST | error_codes::VERSION_MISMATCH => {
                SigningError::ValidationError(format!("[{}] {message}", error.error_code))
            }
            _ => SigningError::ProviderError(format!("[{}] {message}", error.error_code)),
        }
    }
}

/// [`SigningProvider`] backed by the bridge host.
#[derive(Debug, Clone)]
pub struct BridgeProvider {
    client: Arc<BridgeClient>,
}

impl BridgeProvider {
    #[must_use]
    pub fn new(client: Arc<BridgeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SigningProvider for BridgeProvider {
    async fn about(&self) -> SigningResult<ProviderAbout> {
        let response = self.client.about().await?;
        Ok(ProviderAbout {
            version: response.plugin_version,
            csp_version: response.csp_version,
        })
    }

    async fn open_store(
        &self,
        location: StoreLocation,
        name: StoreName,
        mode: StoreOpenMode,
    ) -> SigningResult<Box<dyn CertificateStore>> {
        let request = OpenStoreRequest {
            version: PROTOCOL_VERSION.to_string(),
            location: location.as_raw(),
            name: name.as_str().to_string(),
            mode: mode.as_raw(),
        };
        let response: OpenStoreResponse = self.client.post(endpoints::STORE_OPEN, &request).await?;

        Ok(Box::new(BridgeStore {
            client: Arc::clone(&self.client),
            store_id: response.store_id,
            closed: false,
        }))
    }

    async fn sign_cades(&self, request: CadesSignRequest) -> SigningResult<String> {
        let request = SignCadesRequest {
            version: PROTOCOL_VERSION.to_string(),
            certificate: request.certificate,
            content: request.content,
            content_encoding: request.content_encoding.as_raw(),
            signature_type: request.signature_type.as_raw(),
            detached: request.detached,
            encoding_type: request.encoding.as_raw(),
        };
        let response: SignCadesResponse = self.client.post(endpoints::SIGN, &request).await?;
        Ok(response.signature)
    }
}

struct BridgeStore {
    client: Arc<BridgeClient>,
    store_id: String,
    closed: bool,
}

#[async_trait]
impl CertificateStore for BridgeStore {
    async fn count(&mut self) -> SigningResult<usize> {
        let response: CountResponse = self
            .client
            .post(endpoints::STORE_COUNT, &StoreRequest::new(&self.store_id))
            .await?;
        Ok(response.count)
    }

    async fn item(&mut self, index: usize) -> SigningResult<CertificateRecord> {
        let request = ItemRequest {
            version: PROTOCOL_VERSION.to_string(),
            store_id: self.store_id.clone(),
            index,
        };
        let response: CertificateResponse =
            self.client.post(endpoints::STORE_ITEM, &request).await?;
        Ok(response.certificate)
    }

    async fn find(&mut self, query: &FindQuery) -> SigningResult<Vec<CertificateRecord>> {
        let request = FindRequest {
            version: PROTOCOL_VERSION.to_string(),
            store_id: self.store_id.clone(),
            find_type: query.find_type(),
            criteria: query.criteria().to_string(),
        };
        let response: FindResponse = self.client.post(endpoints::STORE_FIND, &request).await?;
        Ok(response.certificates)
    }

    async fn close(&mut self) -> SigningResult<()> {
        if self.closed {
            return Ok(());
        }
        let _: AckResponse = self
            .client
            .post(endpoints::STORE_CLOSE, &StoreRequest::new(&self.store_id))
            .await?;
        self.closed = true;
        Ok(())
    }
}

/// Locates the bridge host from configuration.
#[derive(Debug)]
pub struct BridgeLocator {
    client: Option<Arc<BridgeClient>>,
    loader_script: Option<String>,
}

impl BridgeLocator {
    /// Locator for a configured endpoint, or one that reports the provider
    /// missing when `config` is `None`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(config: Option<BridgeConfig>) -> SigningResult<Self> {
        let client = config
            .map(BridgeClient::new)
            .transpose()?
            .map(Arc::new);
        Ok(Self {
            client,
            loader_script: None,
        })
    }

    /// Loader location reported in remediation hints instead of the bridge URL.
    #[must_use]
    pub fn with_loader_script(mut self, script: impl Into<String>) -> Self {
        self.loader_script = Some(script.into());
        self
    }
}

#[async_trait]
impl ProviderLocator for BridgeLocator {
    fn locate(&self) -> Capability {
        let Some(client) = &self.client else {
            return Capability::Unavailable("no bridge endpoint configured".to_string());
        };

        let client = Arc::clone(client);
        Capability::Pending(Box::pin(async move {
            client.about().await.map_err(|e| match e {
                SigningError::NetworkError(message) => SigningError::ProviderInitFailed(message),
                other => other,
            })?;
            let provider: ProviderHandle = Arc::new(BridgeProvider::new(client));
            Ok(provider)
        }))
    }

    async fn load(&self) -> SigningResult<()> {
        if self.client.is_none() {
            return Err(SigningError::ProviderNotFound(
                "no bridge endpoint configured; set bridge_url or pass --bridge-url".to_string(),
            ));
        }
        Ok(())
    }

    fn loader_location(&self) -> String {
        match (&self.loader_script, &self.client) {
            (Some(script), _) => script.clone(),
            (None, Some(client)) => client.base_url().to_string(),
            (None, None) => "<bridge_url not set>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::new("http://127.0.0.1:8095").with_timeout(5);
        assert_eq!(config.base_url, "http://127.0.0.1:8095");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_error_code_mapping() {
        let mapped = BridgeClient::map_error_code(&ErrorResponse::new(
            error_codes::SIGNING_FAILED,
            "certificate revoked",
        ));
        assert!(matches!(mapped, SigningError::SigningFailed(msg) if msg == "certificate revoked"));

        let mapped = BridgeClient::map_error_code(&ErrorResponse::new(
            error_codes::PROVIDER_NOT_READY,
            "extension disabled",
        ));
        assert!(matches!(mapped, SigningError::ProviderInitFailed(_)));

        let mapped =
            BridgeClient::map_error_code(&ErrorResponse::new(error_codes::STORE_NOT_FOUND, "s9"));
        assert!(matches!(mapped, SigningError::ProviderError(msg) if msg.contains("STORE_NOT_FOUND")));
    }

    #[tokio::test]
    async fn test_unconfigured_locator_reports_missing() {
        let locator = BridgeLocator::new(None).unwrap();
        assert!(matches!(locator.locate(), Capability::Unavailable(_)));
        assert!(matches!(
            locator.load().await,
            Err(SigningError::ProviderNotFound(_))
        ));
        assert_eq!(locator.loader_location(), "<bridge_url not set>");
    }

    #[test]
    fn test_loader_location_prefers_script() {
        let locator = BridgeLocator::new(Some(BridgeConfig::new("http://127.0.0.1:8095")))
            .unwrap()
            .with_loader_script("./vendor/cadesplugin_api.js");
        assert_eq!(locator.loader_location(), "./vendor/cadesplugin_api.js");
    }
}
