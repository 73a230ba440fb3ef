//! Signing session: the detection result, the current certificate snapshot,
//! and the lifecycle phase, held together and passed explicitly.

use crate::domain::certificate::{CertificateDescriptor, SignatureResult};
use crate::domain::state::{Activity, ProviderState, SessionPhase, SigningOutcome};
use crate::domain::types::Fingerprint;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::certificates::list_certificates;
use crate::services::detector::ProviderDetector;
use crate::services::signing::{sign, SigningInput};

/// State of one front-end session.
///
/// `Unchecked → Checking → {Available, Unavailable}`; while available,
/// listing and signing move the activity away from `Idle` and back.
/// Methods take `&mut self`, so one session never runs two operations at once.
#[derive(Debug)]
pub struct SigningSession {
    phase: SessionPhase,
    activity: Activity,
    state: Option<ProviderState>,
    certificates: Vec<CertificateDescriptor>,
    last_outcome: Option<SigningOutcome>,
}

impl Default for SigningSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SigningSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Unchecked,
            activity: Activity::Idle,
            state: None,
            certificates: Vec::new(),
            last_outcome: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn activity(&self) -> Activity {
        self.activity
    }

    #[must_use]
    pub fn provider_state(&self) -> Option<&ProviderState> {
        self.state.as_ref()
    }

    /// Latest listing snapshot (empty until the first listing).
    #[must_use]
    pub fn certificates(&self) -> &[CertificateDescriptor] {
        &self.certificates
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<SigningOutcome> {
        self.last_outcome
    }

    /// Look a fingerprint up in the current snapshot, whatever its formatting.
    #[must_use]
    pub fn certificate(&self, fingerprint: &str) -> Option<&CertificateDescriptor> {
        let fingerprint = Fingerprint::normalize(fingerprint).ok()?;
        self.certificates
            .iter()
            .find(|cert| cert.fingerprint == fingerprint)
    }

    /// Run detection once. Later calls return the cached state.
    pub async fn initialize(&mut self, detector: &ProviderDetector) -> &ProviderState {
        let state = match self.state.take() {
            Some(state) => state,
            None => {
                self.phase = SessionPhase::Checking;
                let state = detector.detect().await;
                self.phase = if state.is_available() {
                    SessionPhase::Available
                } else {
                    SessionPhase::Unavailable
                };
                state
            }
        };

        self.state.insert(state)
    }

    /// Replace the snapshot with a fresh listing.
    ///
    /// On failure the previous snapshot is cleared.
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable` before a successful detection, or the
    /// listing error.
    pub async fn refresh_certificates(&mut self) -> SigningResult<&[CertificateDescriptor]> {
        let state = self.available_state()?.clone();

        self.activity = Activity::Listing;
        let listed = list_certificates(&state).await;
        self.activity = Activity::Idle;

        match listed {
            Ok(certificates) => {
                self.certificates = certificates;
                Ok(&self.certificates)
            }
            Err(e) => {
                self.certificates.clear();
                Err(e)
            }
        }
    }

    /// Sign with the provider detected for this session.
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable` before a successful detection, or the
    /// signing error.
    pub async fn sign(&mut self, input: &SigningInput) -> SigningResult<SignatureResult> {
        let state = self.available_state()?.clone();

        self.activity = Activity::Signing;
        let result = sign(&state, input).await;
        self.activity = Activity::Idle;

        self.last_outcome = Some(if result.is_ok() {
            SigningOutcome::Signed
        } else {
            SigningOutcome::Failed
        });
        result
    }

    fn available_state(&self) -> SigningResult<&ProviderState> {
        match (&self.phase, &self.state) {
            (SessionPhase::Available, Some(state)) => Ok(state),
            (SessionPhase::Unavailable, Some(state)) => Err(SigningError::ProviderUnavailable(
                state.message().to_string(),
            )),
            _ => Err(SigningError::ProviderUnavailable(
                "provider detection has not run".to_string(),
            )),
        }
    }
}
