use std::fmt;

use thiserror::Error;

use crate::protocol::CurveError;

/// Failures while minting a new device identity. Callers are expected to retry with a fresh
/// scalar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The curve backend produced a scalar or coordinate that is not exactly 28 bytes wide.
    #[error("{what} is {actual} bytes long, expected {expected}")]
    KeyGeneration {
        /// Which value had the wrong width.
        what: &'static str,
        /// Required width in bytes.
        expected: usize,
        /// Width actually produced.
        actual: usize,
    },
    /// The base64 identifier contains a character the relay cannot carry.
    #[error("identifier {0} contains '/'")]
    InvalidIdentifier(String),
    /// The curve backend rejected the scalar it produced.
    #[error(transparent)]
    Curve(#[from] CurveError),
    /// Generation was given no attempts, so no key was ever drawn.
    #[error("no key generation attempts were allowed")]
    NoAttempts,
}

/// Failures while decrypting a single report payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecryptError {
    /// The raw payload is too short for the slice being read.
    #[error("malformed payload: needed {needed} bytes, got {actual}")]
    MalformedPayload {
        /// Minimum length required by the read that failed.
        needed: usize,
        /// Length actually available.
        actual: usize,
    },
    /// The ephemeral key is not a valid point encoding on the curve.
    #[error("ephemeral public key is not a valid curve point")]
    InvalidPublicKey,
    /// The device key is not a usable scalar (zero or not below the curve order).
    #[error("device private key is not a valid scalar")]
    InvalidPrivateKey,
    /// The X9.63 derivation refused its inputs.
    #[error("key derivation failed")]
    KeyDerivation,
    /// AES-GCM authentication failed or the tag had the wrong size.
    #[error("authenticated decryption failed")]
    Decryption,
}

/// A fatal relay failure. Nothing is decrypted when this is returned.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The relay answered with a non-success envelope.
    #[error("relay returned status {0}")]
    Status(String),
    /// The request could not be completed or its body could not be decoded.
    #[error("relay request failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Box any client error as [`TransportError::Request`].
    pub fn request(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Request(Box::new(err))
    }
}

/// Why a single relay result was skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportErrorCause {
    /// The payload is not valid base64.
    #[error("failed to decode payload: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The result's identifier matches none of the requested devices.
    #[error("no requested device has this identifier")]
    UnknownDevice,
    /// `datePublished` is outside the representable date range.
    #[error("publication time {0} ms is out of range")]
    DatePublished(i64),
    /// Parsing or decryption failed.
    #[error("failed to decrypt payload: {0}")]
    Decrypt(#[from] DecryptError),
}

/// A relay result that could not be turned into a location record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("report for device {device_id} skipped: {cause}")]
pub struct ReportError {
    /// The identifier the relay filed the result under.
    pub device_id: String,
    /// The payload exactly as the relay sent it (base64 text).
    pub payload: String,
    /// Why it was skipped.
    #[source]
    pub cause: ReportErrorCause,
}

/// Every per-report failure collected during one batch run. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError(Vec<ReportError>);

impl AggregateError {
    /// Wraps the collected failures, or returns `None` when there were none.
    pub fn from_errors(errors: Vec<ReportError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    /// The failures, in relay order.
    pub fn errors(&self) -> &[ReportError] {
        &self.0
    }

    /// Number of skipped reports. At least one.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present alongside [`Self::len`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take ownership of the failures.
    pub fn into_errors(self) -> Vec<ReportError> {
        self.0
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} reports could not be decrypted", self.0.len())?;
        for err in &self.0 {
            write!(f, "; {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Failures while reading a credential record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// One of the three required lines is absent.
    #[error("credential record is missing the \"{0}\" field")]
    MissingField(&'static str),
    /// A key value is not valid base64.
    #[error("\"{field}\" is not valid base64: {source}")]
    Base64 {
        /// The record key whose value failed.
        field: &'static str,
        /// The decoder's complaint.
        #[source]
        source: base64::DecodeError,
    },
    /// A key decodes to the wrong number of bytes.
    #[error("\"{field}\" decodes to {actual} bytes, expected {expected}")]
    KeyLength {
        /// The record key whose value failed.
        field: &'static str,
        /// Required width in bytes.
        expected: usize,
        /// Width actually decoded.
        actual: usize,
    },
}
