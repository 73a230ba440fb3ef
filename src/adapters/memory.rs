//! In-memory signing provider.
//!
//! Holds a fixed set of certificate records and answers signing requests with
//! a configured signature string. Every call is recorded so tests can assert
//! on store lifecycle and on what was sent for signing.

use crate::adapters::provider::{
    CadesSignRequest, Capability, CertificateRecord, CertificateStore, ProviderAbout,
    ProviderHandle, ProviderLocator, SigningProvider,
};
use crate::domain::types::{FindQuery, StoreLocation, StoreName, StoreOpenMode};
use crate::infra::error::{SigningError, SigningResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Calls observed by an [`InMemoryProvider`].
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    pub about_calls: usize,
    pub stores_opened: usize,
    pub stores_closed: usize,
    pub opened_with: Vec<(StoreLocation, StoreName, StoreOpenMode)>,
    pub find_queries: Vec<String>,
    pub sign_requests: Vec<CadesSignRequest>,
}

#[derive(Debug)]
struct Behaviour {
    about: Result<ProviderAbout, String>,
    signature: Result<String, String>,
    open_failure: Option<String>,
    enumeration_failure: Option<String>,
}

#[derive(Debug)]
struct Shared {
    certificates: Mutex<Vec<CertificateRecord>>,
    behaviour: Mutex<Behaviour>,
    log: Mutex<CallLog>,
}

/// Provider backed by a list of certificate records.
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    shared: Arc<Shared>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    /// Empty store, version `2.0.0`, signs with a fixed base64 string.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                certificates: Mutex::new(Vec::new()),
                behaviour: Mutex::new(Behaviour {
                    about: Ok(ProviderAbout {
                        version: "2.0.0".to_string(),
                        csp_version: None,
                    }),
                    signature: Ok("MIAGCSqGSIb3DQEHAqCAMIACAQEx".to_string()),
                    open_failure: None,
                    enumeration_failure: None,
                }),
                log: Mutex::new(CallLog::default()),
            }),
        }
    }

    #[must_use]
    pub fn with_certificate(self, record: CertificateRecord) -> Self {
        lock(&self.shared.certificates).push(record);
        self
    }

    #[must_use]
    pub fn with_certificates(self, records: impl IntoIterator<Item = CertificateRecord>) -> Self {
        lock(&self.shared.certificates).extend(records);
        self
    }

    #[must_use]
    pub fn with_about(self, about: ProviderAbout) -> Self {
        lock(&self.shared.behaviour).about = Ok(about);
        self
    }

    /// Make `about` fail with `message`.
    #[must_use]
    pub fn failing_about(self, message: impl Into<String>) -> Self {
        lock(&self.shared.behaviour).about = Err(message.into());
        self
    }

    /// Signature string returned for every accepted request.
    #[must_use]
    pub fn with_signature(self, signature: impl Into<String>) -> Self {
        lock(&self.shared.behaviour).signature = Ok(signature.into());
        self
    }

    /// Reject every signing request with `message`.
    #[must_use]
    pub fn rejecting_signatures(self, message: impl Into<String>) -> Self {
        lock(&self.shared.behaviour).signature = Err(message.into());
        self
    }

    /// Fail every `open_store` call with `message`.
    #[must_use]
    pub fn failing_store_open(self, message: impl Into<String>) -> Self {
        lock(&self.shared.behaviour).open_failure = Some(message.into());
        self
    }

    /// Fail `count`, `item` and `find` on opened stores with `message`.
    #[must_use]
    pub fn failing_enumeration(self, message: impl Into<String>) -> Self {
        lock(&self.shared.behaviour).enumeration_failure = Some(message.into());
        self
    }

    /// Replace the store contents, e.g. to simulate a revoked certificate.
    pub fn replace_certificates(&self, records: Vec<CertificateRecord>) {
        *lock(&self.shared.certificates) = records;
    }

    /// Snapshot of all calls made so far.
    #[must_use]
    pub fn calls(&self) -> CallLog {
        lock(&self.shared.log).clone()
    }

    /// Stores opened and not yet closed.
    #[must_use]
    pub fn open_store_count(&self) -> usize {
        let log = lock(&self.shared.log);
        log.stores_opened.saturating_sub(log.stores_closed)
    }

    /// Wrap into a shareable provider handle.
    #[must_use]
    pub fn handle(&self) -> ProviderHandle {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl SigningProvider for InMemoryProvider {
    async fn about(&self) -> SigningResult<ProviderAbout> {
        lock(&self.shared.log).about_calls += 1;
        lock(&self.shared.behaviour)
            .about
            .clone()
            .map_err(SigningError::ProviderError)
    }

    async fn open_store(
        &self,
        location: StoreLocation,
        name: StoreName,
        mode: StoreOpenMode,
    ) -> SigningResult<Box<dyn CertificateStore>> {
        if let Some(message) = lock(&self.shared.behaviour).open_failure.clone() {
            return Err(SigningError::ProviderError(message));
        }

        {
            let mut log = lock(&self.shared.log);
            log.stores_opened += 1;
            log.opened_with.push((location, name, mode));
        }

        let snapshot = lock(&self.shared.certificates).clone();
        Ok(Box::new(InMemoryStore {
            shared: Arc::clone(&self.shared),
            certificates: snapshot,
            closed: false,
        }))
    }

    async fn sign_cades(&self, request: CadesSignRequest) -> SigningResult<String> {
        lock(&self.shared.log).sign_requests.push(request);
        lock(&self.shared.behaviour)
            .signature
            .clone()
            .map_err(SigningError::SigningFailed)
    }
}

struct InMemoryStore {
    shared: Arc<Shared>,
    certificates: Vec<CertificateRecord>,
    closed: bool,
}

impl InMemoryStore {
    fn ensure_usable(&self) -> SigningResult<()> {
        if self.closed {
            return Err(SigningError::ProviderError("Store is closed".to_string()));
        }
        match lock(&self.shared.behaviour).enumeration_failure.clone() {
            Some(message) => Err(SigningError::ProviderError(message)),
            None => Ok(()),
        }
    }
}

fn normalized_thumbprint(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

#[async_trait]
impl CertificateStore for InMemoryStore {
    async fn count(&mut self) -> SigningResult<usize> {
        self.ensure_usable()?;
        Ok(self.certificates.len())
    }

    async fn item(&mut self, index: usize) -> SigningResult<CertificateRecord> {
        self.ensure_usable()?;
        index
            .checked_sub(1)
            .and_then(|i| self.certificates.get(i))
            .cloned()
            .ok_or_else(|| {
                SigningError::ProviderError(format!("Certificate index out of range: {index}"))
            })
    }

    async fn find(&mut self, query: &FindQuery) -> SigningResult<Vec<CertificateRecord>> {
        self.ensure_usable()?;
        lock(&self.shared.log)
            .find_queries
            .push(query.criteria().to_string());

        let FindQuery::Sha1Hash(fingerprint) = query;
        Ok(self
            .certificates
            .iter()
            .filter(|record| normalized_thumbprint(&record.thumbprint) == fingerprint.as_str())
            .cloned()
            .collect())
    }

    async fn close(&mut self) -> SigningResult<()> {
        if !self.closed {
            self.closed = true;
            lock(&self.shared.log).stores_closed += 1;
        }
        Ok(())
    }
}

/// How an [`InMemoryLocator`] presents its provider.
#[derive(Debug, Clone)]
pub enum LocatorMode {
    /// Capability is present and ready.
    Ready,
    /// Capability is present but must be awaited.
    Deferred,
    /// Capability is present but its initialization fails with the message.
    DeferredFailure(String),
    /// Capability appears only after `load` succeeds.
    AfterLoad,
    /// Capability never appears; `load` succeeds but changes nothing.
    Missing,
    /// `load` itself fails with the message.
    LoaderFailure(String),
}

/// Locator that hands out an [`InMemoryProvider`] according to a [`LocatorMode`].
#[derive(Debug)]
pub struct InMemoryLocator {
    provider: InMemoryProvider,
    mode: LocatorMode,
    loaded: AtomicBool,
    load_calls: AtomicUsize,
    locate_calls: AtomicUsize,
}

impl InMemoryLocator {
    #[must_use]
    pub fn new(provider: InMemoryProvider, mode: LocatorMode) -> Self {
        Self {
            provider,
            mode,
            loaded: AtomicBool::new(false),
            load_calls: AtomicUsize::new(0),
            locate_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn locate_calls(&self) -> usize {
        self.locate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderLocator for InMemoryLocator {
    fn locate(&self) -> Capability {
        self.locate_calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            LocatorMode::Ready => Capability::Ready(self.provider.handle()),
            LocatorMode::Deferred => {
                let handle = self.provider.handle();
                Capability::Pending(Box::pin(async move { Ok(handle) }))
            }
            LocatorMode::DeferredFailure(message) => {
                let message = message.clone();
                Capability::Pending(Box::pin(async move {
                    Err(SigningError::ProviderInitFailed(message))
                }))
            }
            LocatorMode::AfterLoad if self.loaded.load(Ordering::SeqCst) => {
                Capability::Ready(self.provider.handle())
            }
            LocatorMode::AfterLoad | LocatorMode::Missing | LocatorMode::LoaderFailure(_) => {
                Capability::Unavailable("plugin object is not defined".to_string())
            }
        }
    }

    async fn load(&self) -> SigningResult<()> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if let LocatorMode::LoaderFailure(message) = &self.mode {
            return Err(SigningError::ProviderNotFound(message.clone()));
        }
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn loader_location(&self) -> String {
        crate::domain::constants::DEFAULT_LOADER_SCRIPT.to_string()
    }
}
