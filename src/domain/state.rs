//! Detection result and per-session lifecycle state.

use crate::adapters::provider::ProviderHandle;
use crate::infra::error::{SigningError, SigningResult};
use serde::Serialize;
use std::fmt;

/// Why detection did not produce a usable provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionFailure {
    /// The page is not served from a networked origin.
    EnvironmentRestricted,
    /// The capability object never materialized.
    ProviderNotFound,
    /// The capability exists but did not initialize or describe itself.
    ProviderInitFailed,
}

/// One labelled line of diagnostic output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDetail {
    pub label: String,
    pub value: String,
}

impl StatusDetail {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Outcome of one detection attempt. Immutable once built.
#[derive(Clone, Serialize)]
pub struct ProviderState {
    available: bool,
    message: String,
    details: Vec<StatusDetail>,
    hints: Vec<String>,
    failure: Option<DetectionFailure>,
    #[serde(skip)]
    provider: Option<ProviderHandle>,
}

impl ProviderState {
    /// Successful detection holding the provider handle.
    #[must_use]
    pub fn available(
        provider: ProviderHandle,
        message: impl Into<String>,
        details: Vec<StatusDetail>,
    ) -> Self {
        Self {
            available: true,
            message: message.into(),
            details,
            hints: Vec::new(),
            failure: None,
            provider: Some(provider),
        }
    }

    /// Failed detection with diagnostics and remediation hints.
    #[must_use]
    pub fn unavailable(
        failure: DetectionFailure,
        message: impl Into<String>,
        details: Vec<StatusDetail>,
        hints: Vec<String>,
    ) -> Self {
        Self {
            available: false,
            message: message.into(),
            details,
            hints,
            failure: Some(failure),
            provider: None,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn details(&self) -> &[StatusDetail] {
        &self.details
    }

    #[must_use]
    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    #[must_use]
    pub fn failure(&self) -> Option<DetectionFailure> {
        self.failure
    }

    #[must_use]
    pub fn provider(&self) -> Option<&ProviderHandle> {
        self.provider.as_ref()
    }

    /// Raise the detection failure as an error of the matching kind.
    ///
    /// # Errors
    ///
    /// Returns the detection failure when the provider is not available.
    pub fn require_provider(&self) -> SigningResult<ProviderHandle> {
        if let Some(provider) = &self.provider {
            return Ok(provider.clone());
        }

        let message = self.message.clone();
        Err(match self.failure {
            Some(DetectionFailure::EnvironmentRestricted) => {
                SigningError::EnvironmentRestricted(message)
            }
            Some(DetectionFailure::ProviderNotFound) => SigningError::ProviderNotFound(message),
            Some(DetectionFailure::ProviderInitFailed) => SigningError::ProviderInitFailed(message),
            None => SigningError::ProviderUnavailable(message),
        })
    }

    /// Provider for listing/signing; any detection failure becomes `ProviderUnavailable`.
    pub(crate) fn provider_for(&self, operation: &str) -> SigningResult<ProviderHandle> {
        self.provider.clone().ok_or_else(|| {
            SigningError::ProviderUnavailable(format!(
                "cannot run {operation}: {}",
                self.message
            ))
        })
    }
}

impl fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderState")
            .field("available", &self.available)
            .field("message", &self.message)
            .field("details", &self.details)
            .field("hints", &self.hints)
            .field("failure", &self.failure)
            .field("provider", &self.provider.as_ref().map(|_| "<provider>"))
            .finish()
    }
}

/// Detection lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Unchecked,
    Checking,
    Available,
    Unavailable,
}

/// What an available session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Activity {
    Idle,
    Listing,
    Signing,
}

/// Result of the most recent signing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SigningOutcome {
    Signed,
    Failed,
}
