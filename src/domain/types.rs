//! Type-safe wrappers using new-type pattern
//!
//! Wraps the values that cross the provider boundary (fingerprints, page
//! origins, store/signing enumerations) so raw strings and magic numbers do
//! not leak into the orchestration code.

use crate::domain::constants::{
    CADESCOM_BASE64_TO_BINARY, CADESCOM_CADES_BES, CADESCOM_ENCODE_BASE64, CADESCOM_ENCODE_BINARY,
    CADESCOM_STRING_TO_UCS2LE, CAPICOM_CERTIFICATE_FIND_SHA1_HASH, CAPICOM_CURRENT_USER_STORE,
    CAPICOM_LOCAL_MACHINE_STORE, CAPICOM_MY_STORE, CAPICOM_STORE_OPEN_MAXIMUM_ALLOWED,
    CAPICOM_STORE_OPEN_READ_ONLY,
};
use crate::infra::error::{SigningError, SigningResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Certificate SHA-1 thumbprint, normalized to uppercase hex without whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Normalize a raw thumbprint as reported by the provider or typed by a user.
    ///
    /// Whitespace anywhere in the input is removed and the rest upper-cased.
    /// The result must be non-empty hex.
    pub fn normalize(raw: impl AsRef<str>) -> SigningResult<Self> {
        let normalized: String = raw
            .as_ref()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        if normalized.is_empty() {
            return Err(SigningError::ValidationError(
                "Fingerprint must not be empty".to_string(),
            ));
        }

        hex::decode(&normalized).map_err(|e| {
            SigningError::ValidationError(format!("Fingerprint '{normalized}' is not hex: {e}"))
        })?;

        Ok(Fingerprint(normalized))
    }

    /// Get the fingerprint as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Fingerprint {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = SigningError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the front-end is running.
///
/// The provider only talks to pages served from a networked origin; a page
/// opened straight from disk can never reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    origin: String,
    scheme: String,
}

impl ExecutionContext {
    /// Build a context from the page URL or origin (`http://localhost:8080`,
    /// `file:///home/user/index.html`, ...).
    pub fn new(origin: impl AsRef<str>) -> SigningResult<Self> {
        let origin = origin.as_ref().trim();
        let Some((scheme, rest)) = origin.split_once(':') else {
            return Err(SigningError::ValidationError(format!(
                "Origin must include a scheme, got: {origin}"
            )));
        };

        let valid_scheme = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(SigningError::ValidationError(format!(
                "Invalid origin scheme: {origin}"
            )));
        }

        let scheme = scheme.to_ascii_lowercase();
        if matches!(scheme.as_str(), "http" | "https") && rest.trim_start_matches('/').is_empty() {
            return Err(SigningError::ValidationError(format!(
                "Origin is missing a host: {origin}"
            )));
        }

        Ok(Self {
            origin: origin.to_string(),
            scheme,
        })
    }

    /// Full origin string as given
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Lower-cased URL scheme
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Whether the page is served over HTTP(S)
    #[must_use]
    pub fn is_networked(&self) -> bool {
        matches!(self.scheme.as_str(), "http" | "https")
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin)
    }
}

/// Certificate store location (`CAPICOM_*_STORE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreLocation {
    LocalMachine,
    CurrentUser,
}

impl StoreLocation {
    #[must_use]
    pub fn as_raw(self) -> u32 {
        match self {
            StoreLocation::LocalMachine => CAPICOM_LOCAL_MACHINE_STORE,
            StoreLocation::CurrentUser => CAPICOM_CURRENT_USER_STORE,
        }
    }

    pub fn from_raw(raw: u32) -> SigningResult<Self> {
        match raw {
            CAPICOM_LOCAL_MACHINE_STORE => Ok(StoreLocation::LocalMachine),
            CAPICOM_CURRENT_USER_STORE => Ok(StoreLocation::CurrentUser),
            other => Err(SigningError::ValidationError(format!(
                "Unknown store location: {other}"
            ))),
        }
    }
}

/// Certificate store name. Only the personal store is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreName {
    My,
}

impl StoreName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StoreName::My => CAPICOM_MY_STORE,
        }
    }

    pub fn parse(name: &str) -> SigningResult<Self> {
        if name.eq_ignore_ascii_case(CAPICOM_MY_STORE) {
            Ok(StoreName::My)
        } else {
            Err(SigningError::ValidationError(format!(
                "Unsupported store name: {name}"
            )))
        }
    }
}

/// Store open mode (`CAPICOM_STORE_OPEN_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreOpenMode {
    ReadOnly,
    MaximumAllowed,
}

impl StoreOpenMode {
    #[must_use]
    pub fn as_raw(self) -> u32 {
        match self {
            StoreOpenMode::ReadOnly => CAPICOM_STORE_OPEN_READ_ONLY,
            StoreOpenMode::MaximumAllowed => CAPICOM_STORE_OPEN_MAXIMUM_ALLOWED,
        }
    }

    pub fn from_raw(raw: u32) -> SigningResult<Self> {
        match raw {
            CAPICOM_STORE_OPEN_READ_ONLY => Ok(StoreOpenMode::ReadOnly),
            CAPICOM_STORE_OPEN_MAXIMUM_ALLOWED => Ok(StoreOpenMode::MaximumAllowed),
            other => Err(SigningError::ValidationError(format!(
                "Unknown store open mode: {other}"
            ))),
        }
    }
}

/// Certificate search criteria supported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindQuery {
    /// `CAPICOM_CERTIFICATE_FIND_SHA1_HASH`
    Sha1Hash(Fingerprint),
}

impl FindQuery {
    #[must_use]
    pub fn find_type(&self) -> u32 {
        match self {
            FindQuery::Sha1Hash(_) => CAPICOM_CERTIFICATE_FIND_SHA1_HASH,
        }
    }

    #[must_use]
    pub fn criteria(&self) -> &str {
        match self {
            FindQuery::Sha1Hash(fingerprint) => fingerprint.as_str(),
        }
    }
}

/// How the provider should interpret `SignedData.Content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentEncoding {
    /// `CADESCOM_STRING_TO_UCS2LE`
    StringToUcs2Le,
    /// `CADESCOM_BASE64_TO_BINARY`
    Base64ToBinary,
}

impl ContentEncoding {
    #[must_use]
    pub fn as_raw(self) -> u32 {
        match self {
            ContentEncoding::StringToUcs2Le => CADESCOM_STRING_TO_UCS2LE,
            ContentEncoding::Base64ToBinary => CADESCOM_BASE64_TO_BINARY,
        }
    }

    pub fn from_raw(raw: u32) -> SigningResult<Self> {
        match raw {
            CADESCOM_STRING_TO_UCS2LE => Ok(ContentEncoding::StringToUcs2Le),
            CADESCOM_BASE64_TO_BINARY => Ok(ContentEncoding::Base64ToBinary),
            other => Err(SigningError::ValidationError(format!(
                "Unknown content encoding: {other}"
            ))),
        }
    }
}

/// Signature format requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureType {
    /// `CADESCOM_CADES_BES`
    CadesBes,
}

impl SignatureType {
    #[must_use]
    pub fn as_raw(self) -> u32 {
        match self {
            SignatureType::CadesBes => CADESCOM_CADES_BES,
        }
    }

    pub fn from_raw(raw: u32) -> SigningResult<Self> {
        match raw {
            CADESCOM_CADES_BES => Ok(SignatureType::CadesBes),
            other => Err(SigningError::ValidationError(format!(
                "Unsupported signature type: {other}"
            ))),
        }
    }
}

/// Output encoding of the produced signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodingType {
    /// `CADESCOM_ENCODE_BASE64`
    Base64,
    /// `CADESCOM_ENCODE_BINARY`
    Binary,
}

impl EncodingType {
    #[must_use]
    pub fn as_raw(self) -> u32 {
        match self {
            EncodingType::Base64 => CADESCOM_ENCODE_BASE64,
            EncodingType::Binary => CADESCOM_ENCODE_BINARY,
        }
    }

    pub fn from_raw(raw: u32) -> SigningResult<Self> {
        match raw {
            CADESCOM_ENCODE_BASE64 => Ok(EncodingType::Base64),
            CADESCOM_ENCODE_BINARY => Ok(EncodingType::Binary),
            other => Err(SigningError::ValidationError(format!(
                "Unknown encoding type: {other}"
            ))),
        }
    }
}
