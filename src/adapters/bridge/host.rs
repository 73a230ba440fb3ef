//! Bridge host.
//!
//! Serves any [`SigningProvider`] over the bridge protocol. The host keeps
//! open store sessions keyed by id until the client closes them or they sit
//! idle past the timeout (swept whenever a store is opened); handlers
//! are transport-agnostic and return either a response or an
//! [`ErrorResponse`], so any HTTP framework can mount them.

use super::protocol::{
    endpoints, error_codes, AboutRequest, AboutResponse, AckResponse, CertificateResponse,
    CountResponse, ErrorResponse, FindRequest, FindResponse, ItemRequest, OpenStoreRequest,
    OpenStoreResponse, SignCadesRequest, SignCadesResponse, StoreRequest, PROTOCOL_VERSION,
};
use crate::adapters::provider::{CadesSignRequest, CertificateStore, ProviderHandle};
use crate::domain::constants::CAPICOM_CERTIFICATE_FIND_SHA1_HASH;
use crate::domain::types::{
    ContentEncoding, EncodingType, FindQuery, Fingerprint, SignatureType, StoreLocation,
    StoreName, StoreOpenMode,
};
use crate::infra::error::SigningError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Idle time after which an unclosed store session is closed by the host.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

struct StoreSession {
    store: Box<dyn CertificateStore>,
    last_used: Instant,
}

/// Shared state for the bridge handlers.
pub struct BridgeHost {
    provider: ProviderHandle,
    stores: Mutex<HashMap<String, StoreSession>>,
    next_store: AtomicU64,
    idle_timeout: Duration,
}

impl BridgeHost {
    #[must_use]
    pub fn new(provider: ProviderHandle) -> Self {
        Self {
            provider,
            stores: Mutex::new(HashMap::new()),
            next_store: AtomicU64::new(1),
            idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }

    /// Close sessions left unused for `timeout` instead of the default.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Close and forget store sessions idle for at least the idle timeout.
    /// Returns how many were evicted.
    pub async fn evict_idle_sessions(&self) -> usize {
        let expired: Vec<(String, StoreSession)> = {
            let mut stores = self.stores.lock().await;
            let ids: Vec<String> = stores
                .iter()
                .filter(|(_, session)| session.last_used.elapsed() >= self.idle_timeout)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| stores.remove(&id).map(|session| (id, session)))
                .collect()
        };

        let evicted = expired.len();
        for (store_id, mut session) in expired {
            log::warn!("Evicting idle store session {store_id}");
            if let Err(e) = session.store.close().await {
                log::warn!("Failed to close evicted {store_id}: {e}");
            }
        }
        evicted
    }

    /// Number of store sessions not yet closed by clients.
    pub async fn open_sessions(&self) -> usize {
        self.stores.lock().await.len()
    }

    /// Route a JSON request body to the handler for `endpoint`.
    ///
    /// # Errors
    /// Returns `BAD_REQUEST` for unknown endpoints or undecodable bodies,
    /// otherwise whatever the handler returns.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ErrorResponse> {
        let endpoint = endpoint.trim_matches('/');
        log::debug!("Bridge request: {endpoint}");

        match endpoint {
            endpoints::ABOUT => encode(self.handle_about(&decode(body)?).await),
            endpoints::STORE_OPEN => encode(self.handle_open_store(&decode(body)?).await),
            endpoints::STORE_COUNT => encode(self.handle_count(&decode(body)?).await),
            endpoints::STORE_ITEM => encode(self.handle_item(&decode(body)?).await),
            endpoints::STORE_FIND => encode(self.handle_find(&decode(body)?).await),
            endpoints::STORE_CLOSE => encode(self.handle_close(&decode(body)?).await),
            endpoints::SIGN => encode(self.handle_sign(decode(body)?).await),
            other => Err(ErrorResponse::new(
                error_codes::BAD_REQUEST,
                format!("Unknown endpoint: {other}"),
            )),
        }
    }

    /// Handle the about endpoint.
    ///
    /// # Errors
    /// `PROVIDER_NOT_READY` if the provider cannot describe itself.
    pub async fn handle_about(&self, request: &AboutRequest) -> Result<AboutResponse, ErrorResponse> {
        check_version(&request.version)?;

        let about = self.provider.about().await.map_err(|e| {
            ErrorResponse::new(error_codes::PROVIDER_NOT_READY, provider_message(&e))
        })?;

        Ok(AboutResponse {
            version: PROTOCOL_VERSION.to_string(),
            plugin_version: about.version,
            csp_version: about.csp_version,
        })
    }

    /// Handle the store open endpoint.
    ///
    /// # Errors
    /// `BAD_REQUEST` for unknown constants, `PROVIDER_ERROR` if opening fails.
    pub async fn handle_open_store(
        &self,
        request: &OpenStoreRequest,
    ) -> Result<OpenStoreResponse, ErrorResponse> {
        check_version(&request.version)?;

        self.evict_idle_sessions().await;

        let location = StoreLocation::from_raw(request.location).map_err(invalid)?;
        let name = StoreName::parse(&request.name).map_err(invalid)?;
        let mode = StoreOpenMode::from_raw(request.mode).map_err(invalid)?;

        let store = self
            .provider
            .open_store(location, name, mode)
            .await
            .map_err(|e| to_error_response(&e))?;

        let store_id = format!("store-{}", self.next_store.fetch_add(1, Ordering::SeqCst));
        self.stores.lock().await.insert(
            store_id.clone(),
            StoreSession {
                store,
                last_used: Instant::now(),
            },
        );
        log::debug!("Opened {store_id} ({} at {location:?})", name.as_str());

        Ok(OpenStoreResponse {
            version: PROTOCOL_VERSION.to_string(),
            store_id,
        })
    }

    /// Handle the store count endpoint.
    ///
    /// # Errors
    /// `STORE_NOT_FOUND` for unknown ids, `PROVIDER_ERROR` if counting fails.
    pub async fn handle_count(&self, request: &StoreRequest) -> Result<CountResponse, ErrorResponse> {
        check_version(&request.version)?;

        let mut stores = self.stores.lock().await;
        let store = session(&mut stores, &request.store_id)?;
        let count = store.count().await.map_err(|e| to_error_response(&e))?;

        Ok(CountResponse {
            version: PROTOCOL_VERSION.to_string(),
            count,
        })
    }

    /// Handle the store item endpoint.
    ///
    /// # Errors
    /// `STORE_NOT_FOUND` for unknown ids, `PROVIDER_ERROR` for bad indexes.
    pub async fn handle_item(
        &self,
        request: &ItemRequest,
    ) -> Result<CertificateResponse, ErrorResponse> {
        check_version(&request.version)?;

        let mut stores = self.stores.lock().await;
        let store = session(&mut stores, &request.store_id)?;
        let certificate = store
            .item(request.index)
            .await
            .map_err(|e| to_error_response(&e))?;

        Ok(CertificateResponse {
            version: PROTOCOL_VERSION.to_string(),
            certificate,
        })
    }

    /// Handle the store find endpoint.
    ///
    /// # Errors
    /// `BAD_REQUEST` for unsupported search types or criteria.
    pub async fn handle_find(&self, request: &FindRequest) -> Result<FindResponse, ErrorResponse> {
        check_version(&request.version)?;

        if request.find_type != CAPICOM_CERTIFICATE_FIND_SHA1_HASH {
            return Err(bad_request(format!(
                "Unsupported find type: {}",
                request.find_type
            )));
        }
        let fingerprint = Fingerprint::normalize(&request.criteria).map_err(invalid)?;
        let query = FindQuery::Sha1Hash(fingerprint);

        let mut stores = self.stores.lock().await;
        let store = session(&mut stores, &request.store_id)?;
        let certificates = store.find(&query).await.map_err(|e| to_error_response(&e))?;

        Ok(FindResponse {
            version: PROTOCOL_VERSION.to_string(),
            certificates,
        })
    }

    /// Handle the store close endpoint. The session is dropped even if the
    /// provider reports a close failure.
    ///
    /// # Errors
    /// `STORE_NOT_FOUND` for unknown ids, `PROVIDER_ERROR` if closing fails.
    pub async fn handle_close(&self, request: &StoreRequest) -> Result<AckResponse, ErrorResponse> {
        check_version(&request.version)?;

        let mut session = self
            .stores
            .lock()
            .await
            .remove(&request.store_id)
            .ok_or_else(|| store_not_found(&request.store_id))?;

        session.store.close().await.map_err(|e| to_error_response(&e))?;
        log::debug!("Closed {}", request.store_id);
        Ok(AckResponse::new())
    }

    /// Handle the signing endpoint.
    ///
    /// # Errors
    /// `BAD_REQUEST` for unknown constants, `SIGNING_FAILED` if the provider
    /// rejects the request.
    pub async fn handle_sign(
        &self,
        request: SignCadesRequest,
    ) -> Result<SignCadesResponse, ErrorResponse> {
        check_version(&request.version)?;

        let content_encoding = ContentEncoding::from_raw(request.content_encoding).map_err(invalid)?;
        let signature_type = SignatureType::from_raw(request.signature_type).map_err(invalid)?;
        let encoding = EncodingType::from_raw(request.encoding_type).map_err(invalid)?;

        log::info!(
            "Signing request for {} ({} base64 chars)",
            request.certificate.thumbprint,
            request.content.len()
        );

        let signature = self
            .provider
            .sign_cades(CadesSignRequest {
                certificate: request.certificate,
                content: request.content,
                content_encoding,
                signature_type,
                detached: request.detached,
                encoding,
            })
            .await
            .map_err(|e| ErrorResponse::new(error_codes::SIGNING_FAILED, provider_message(&e)))?;

        Ok(SignCadesResponse {
            version: PROTOCOL_VERSION.to_string(),
            signature,
        })
    }
}

fn check_version(version: &str) -> Result<(), ErrorResponse> {
    if version == PROTOCOL_VERSION {
        Ok(())
    } else {
        Err(ErrorResponse::new(
            error_codes::VERSION_MISMATCH,
            format!("Protocol version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        ))
    }
}

fn session<'a>(
    stores: &'a mut HashMap<String, StoreSession>,
    store_id: &str,
) -> Result<&'a mut Box<dyn CertificateStore>, ErrorResponse> {
    let session = stores
        .get_mut(store_id)
        .ok_or_else(|| store_not_found(store_id))?;
    session.last_used = Instant::now();
    Ok(&mut session.store)
}

fn store_not_found(store_id: &str) -> ErrorResponse {
    ErrorResponse::new(
        error_codes::STORE_NOT_FOUND,
        format!("Unknown store session: {store_id}"),
    )
}

fn bad_request(message: String) -> ErrorResponse {
    ErrorResponse::new(error_codes::BAD_REQUEST, message)
}

fn invalid(error: SigningError) -> ErrorResponse {
    match error {
        SigningError::ValidationError(message) => bad_request(message),
        other => bad_request(other.to_string()),
    }
}

fn decode<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, ErrorResponse> {
    serde_json::from_value(body).map_err(|e| bad_request(format!("Malformed request: {e}")))
}

fn encode<T: Serialize>(
    result: Result<T, ErrorResponse>,
) -> Result<serde_json::Value, ErrorResponse> {
    result.and_then(|response| {
        serde_json::to_value(response).map_err(|e| {
            ErrorResponse::new(error_codes::PROVIDER_ERROR, format!("Encoding failed: {e}"))
        })
    })
}

/// The provider's message without the local error-kind prefix, so the
/// client does not stack prefixes when it maps the code back.
fn provider_message(error: &SigningError) -> String {
    match error {
        SigningError::ProviderError(message)
        | SigningError::ProviderInitFailed(message)
        | SigningError::SigningFailed(message)
        | SigningError::CertificateNotFound(message) => message.clone(),
        other => other.to_string(),
    }
}

fn to_error_response(error: &SigningError) -> ErrorResponse {
    let code = match error {
        SigningError::CertificateNotFound(_) => error_codes::CERT_NOT_FOUND,
        SigningError::SigningFailed(_) => error_codes::SIGNING_FAILED,
        SigningError::ProviderInitFailed(_) => error_codes::PROVIDER_NOT_READY,
        SigningError::ValidationError(_) => error_codes::BAD_REQUEST,
        _ => error_codes::PROVIDER_ERROR,
    };
    ErrorResponse::new(code, provider_message(error))
}
