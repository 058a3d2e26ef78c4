use p224::{
    elliptic_curve::{ecdh, sec1::ToEncodedPoint},
    FieldBytes, PublicKey, SecretKey,
};
use rand_core::CryptoRngCore;
use thiserror::Error;
use zeroize::Zeroizing;

use super::key::KEY_LEN;

/// Curve-level failures, translated by callers into their own error kinds.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CurveError {
    /// The scalar has the wrong width or is not a nonzero value below the curve order.
    #[error("scalar is not a valid private key")]
    InvalidScalar,
    /// The encoding is malformed or the point is not on the curve.
    #[error("bytes do not encode a point on the curve")]
    InvalidPoint,
}

/// The elliptic-curve operations the protocol needs, expressed over plain byte strings so the
/// identity and report code never touch a backend's point types.
///
/// Scalars and coordinates are big-endian. Implementations report whatever width their
/// primitive produces; fixing the width is the caller's job.
pub trait EllipticCurve {
    /// Draw a fresh private scalar.
    fn random_scalar(&self, csprng: &mut impl CryptoRngCore) -> Zeroizing<Vec<u8>>;

    /// Raw X coordinate of `scalar · G`.
    fn public_x(&self, scalar: &[u8]) -> Result<Vec<u8>, CurveError>;

    /// X coordinate of `scalar · point`, where `point` is a SEC1-encoded public key.
    fn shared_x(&self, scalar: &[u8], point: &[u8]) -> Result<Zeroizing<Vec<u8>>, CurveError>;
}

/// NIST P-224 (secp224r1), the curve used by offline-finding accessories.
#[derive(Debug, Clone, Copy, Default)]
pub struct P224;

impl P224 {
    fn secret_key(scalar: &[u8]) -> Result<SecretKey, CurveError> {
        if scalar.len() != KEY_LEN {
            return Err(CurveError::InvalidScalar);
        }
        SecretKey::from_bytes(&FieldBytes::clone_from_slice(scalar))
            .map_err(|_| CurveError::InvalidScalar)
    }
}

impl EllipticCurve for P224 {
    fn random_scalar(&self, csprng: &mut impl CryptoRngCore) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(SecretKey::random(csprng).to_bytes().to_vec())
    }

    fn public_x(&self, scalar: &[u8]) -> Result<Vec<u8>, CurveError> {
        let point = Self::secret_key(scalar)?
            .public_key()
            .to_encoded_point(false);

        point
            .x()
            .map(|x| x.to_vec())
            .ok_or(CurveError::InvalidPoint)
    }

    fn shared_x(&self, scalar: &[u8], point: &[u8]) -> Result<Zeroizing<Vec<u8>>, CurveError> {
        let secret = Self::secret_key(scalar)?;
        let public = PublicKey::from_sec1_bytes(point).map_err(|_| CurveError::InvalidPoint)?;

        let shared_secret = ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());

        Ok(Zeroizing::new(shared_secret.raw_secret_bytes().to_vec()))
    }
}
