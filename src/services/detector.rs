//! Provider availability detection.
//!
//! Runs once per session and always yields a [`ProviderState`]; failures are
//! described with a message, labelled details and remediation hints instead
//! of being raised.

use crate::adapters::provider::{Capability, ProviderHandle, ProviderLocator};
use crate::domain::state::{DetectionFailure, ProviderState, StatusDetail};
use crate::domain::types::ExecutionContext;
use crate::infra::error::SigningError;
use std::sync::Arc;

const READY_MESSAGE: &str = "Plugin is ready";
const NOT_FOUND_MESSAGE: &str = "CryptoPro plugin not found";
const INIT_FAILED_MESSAGE: &str = "CryptoPro plugin failed to initialize";

/// Detects the signing provider for an execution context.
pub struct ProviderDetector {
    context: ExecutionContext,
    locator: Arc<dyn ProviderLocator>,
}

impl ProviderDetector {
    #[must_use]
    pub fn new(context: ExecutionContext, locator: Arc<dyn ProviderLocator>) -> Self {
        Self { context, locator }
    }

    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Run detection. Never fails; see [`ProviderState::require_provider`].
    pub async fn detect(&self) -> ProviderState {
        log::info!("Detecting signing provider for {}", self.context);

        if !self.context.is_networked() {
            log::warn!(
                "Page origin {} is not served over HTTP; provider cannot be reached",
                self.context
            );
            return self.environment_restricted();
        }

        let capability = match self.locator.locate() {
            Capability::Unavailable(reason) => {
                log::debug!("Provider not present ({reason}), loading plugin loader");
                if let Err(e) = self.locator.load().await {
                    log::warn!("Plugin loader failed: {e}");
                    return self.not_found(&e.to_string());
                }
                self.locator.locate()
            }
            present => present,
        };

        let provider = match capability {
            Capability::Ready(provider) => provider,
            Capability::Pending(pending) => {
                log::debug!("Waiting for provider initialization");
                match pending.await {
                    Ok(provider) => provider,
                    Err(e) => {
                        log::warn!("Provider initialization failed: {e}");
                        return self.init_failed(&provider_error_detail(&e));
                    }
                }
            }
            Capability::Unavailable(reason) => {
                log::warn!("Provider still missing after loading: {reason}");
                return self.not_found(&reason);
            }
        };

        self.describe(provider).await
    }

    async fn describe(&self, provider: ProviderHandle) -> ProviderState {
        match provider.about().await {
            Ok(about) => {
                log::info!("Provider ready, plugin version {}", about.version);
                let mut details = vec![
                    StatusDetail::new("Origin", self.context.origin()),
                    StatusDetail::new("Plugin version", about.version),
                ];
                if let Some(csp) = about.csp_version {
                    details.push(StatusDetail::new("CSP version", csp));
                }
                ProviderState::available(provider, READY_MESSAGE, details)
            }
            Err(e) => {
                log::warn!("Provider did not describe itself: {e}");
                self.init_failed(&provider_error_detail(&e))
            }
        }
    }

    fn environment_restricted(&self) -> ProviderState {
        let scheme = self.context.scheme();
        ProviderState::unavailable(
            DetectionFailure::EnvironmentRestricted,
            format!(
                "The page is opened via {scheme}://; the CryptoPro plugin only works on pages served over http:// or https://"
            ),
            vec![StatusDetail::new("Origin", self.context.origin())],
            vec![
                "Serve the application over HTTP, for example from a local static server".to_string(),
                "Open the page via http://localhost instead of from disk".to_string(),
            ],
        )
    }

    fn not_found(&self, reason: &str) -> ProviderState {
        ProviderState::unavailable(
            DetectionFailure::ProviderNotFound,
            NOT_FOUND_MESSAGE,
            vec![
                StatusDetail::new("Origin", self.context.origin()),
                StatusDetail::new("Reason", reason),
            ],
            vec![
                "Install CryptoPro CSP and the CryptoPro CAdES browser plug-in".to_string(),
                "Enable the CryptoPro extension in the browser".to_string(),
                format!(
                    "Check that the plugin loader is available at {}",
                    self.locator.loader_location()
                ),
            ],
        )
    }

    fn init_failed(&self, error: &str) -> ProviderState {
        ProviderState::unavailable(
            DetectionFailure::ProviderInitFailed,
            INIT_FAILED_MESSAGE,
            vec![
                StatusDetail::new("Origin", self.context.origin()),
                StatusDetail::new("Error", error),
            ],
            vec![
                "Allow the site in the CryptoPro extension settings".to_string(),
                "Restart the browser after installing or updating the plug-in".to_string(),
            ],
        )
    }
}

/// The provider's own message, without the local error-kind prefix.
fn provider_error_detail(error: &SigningError) -> String {
    match error {
        SigningError::ProviderInitFailed(message)
        | SigningError::ProviderError(message)
        | SigningError::ProviderNotFound(message)
        | SigningError::NetworkError(message) => message.clone(),
        other => other.to_string(),
    }
}
