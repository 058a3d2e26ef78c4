use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    error::DecryptError,
    protocol::{
        open_in_place, CurveError, DecryptedReport, EllipticCurve, EncryptedReport, Location,
        PrivateKey, P224,
    },
};

/// The owner side of the protocol: holds nothing but the curve backend, so one instance can
/// decrypt reports for any number of devices.
#[derive(Debug, Clone, Default)]
pub struct OwnerDevice<C = P224> {
    curve: C,
}

impl OwnerDevice<P224> {
    /// An owner on P-224.
    pub fn new() -> Self {
        Self { curve: P224 }
    }
}

impl<C: EllipticCurve> OwnerDevice<C> {
    /// An owner on a caller-supplied curve backend.
    pub fn with_curve(curve: C) -> Self {
        Self { curve }
    }

    /// Decrypt one raw (base64-decoded) relay payload with the device's private key.
    pub fn decrypt_report(
        &self,
        payload: &[u8],
        private_key: &PrivateKey,
    ) -> Result<DecryptedReport, DecryptError> {
        let encrypted_report = EncryptedReport::parse(payload)?;

        // (1) ECDH between our private key and the finder's ephemeral key
        let shared_secret = self
            .curve
            .shared_x(
                private_key.as_bytes(),
                encrypted_report.ephemeral_public_key,
            )
            .map_err(|e| match e {
                CurveError::InvalidPoint => DecryptError::InvalidPublicKey,
                CurveError::InvalidScalar => DecryptError::InvalidPrivateKey,
            })?;

        // (2) ANSI X9.63 KDF: SHA-256(shared secret || 00000001 || ephemeral key)
        let mut symmetric_key = Zeroizing::new([0u8; 32]);
        ansi_x963_kdf::derive_key_into::<Sha256>(
            shared_secret.as_slice(),
            encrypted_report.ephemeral_public_key,
            &mut symmetric_key[..],
        )
        .map_err(|_| DecryptError::KeyDerivation)?;

        // (3) First half is the AES key, second half the 16-byte GCM nonce
        let mut key = Zeroizing::new([0u8; 16]);
        let mut iv = [0u8; 16];
        key.copy_from_slice(&symmetric_key[..16]);
        iv.copy_from_slice(&symmetric_key[16..]);

        let mut decrypted_location = encrypted_report.encrypted_location; // `Copy`'ed here
        open_in_place(&key, &iv, &mut decrypted_location, encrypted_report.tag)?;

        Ok(DecryptedReport {
            timestamp: encrypted_report.seen_at(),
            confidence: encrypted_report.confidence,
            location: Location::from_bytes(&decrypted_location),
        })
    }
}

/// Decrypt one raw relay payload on P-224.
pub fn decrypt(payload: &[u8], private_key: &PrivateKey) -> Result<DecryptedReport, DecryptError> {
    OwnerDevice::new().decrypt_report(payload, private_key)
}
