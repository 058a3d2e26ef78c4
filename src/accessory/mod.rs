use rand_core::CryptoRngCore;
use tracing::debug;

use crate::{
    error::IdentityError,
    protocol::{AdvertisementKey, EllipticCurve, PrivateKey, KEY_LEN, P224},
};

/// Reading and writing the `key: value` credential record of an accessory.
mod credentials;

/// Everything needed to track one accessory: the private key that decrypts its reports, the key
/// it broadcasts, and the identifier the relay files its reports under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    name: String,
    private_key: PrivateKey,
    advertisement_key: AdvertisementKey,
    id: String,
}

impl DeviceIdentity {
    /// Human-readable label, not part of the protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scalar that decrypts this device's reports.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// The raw X coordinate the accessory broadcasts.
    pub fn advertisement_key(&self) -> &AdvertisementKey {
        &self.advertisement_key
    }

    /// Base64 SHA-256 of the advertisement key.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Generate a new P-224 identity from the operating system's CSPRNG.
pub fn generate(name: &str) -> Result<DeviceIdentity, IdentityError> {
    generate_with(&P224, &mut rand::rngs::OsRng, name)
}

/// Generate a new identity on `curve`.
///
/// Fails instead of padding when the backend hands back a scalar or X coordinate narrower than
/// 28 bytes, and fails when the identifier's base64 contains `/`. Either way the caller should
/// try again with a fresh scalar.
pub fn generate_with(
    curve: &impl EllipticCurve,
    csprng: &mut impl CryptoRngCore,
    name: &str,
) -> Result<DeviceIdentity, IdentityError> {
    let scalar = curve.random_scalar(csprng);
    let private_key = PrivateKey::from_slice(&scalar).ok_or(IdentityError::KeyGeneration {
        what: "private key",
        expected: KEY_LEN,
        actual: scalar.len(),
    })?;

    let x = curve.public_x(private_key.as_bytes())?;
    let advertisement_key = AdvertisementKey(x.as_slice().try_into().map_err(|_| {
        IdentityError::KeyGeneration {
            what: "public key",
            expected: KEY_LEN,
            actual: x.len(),
        }
    })?);

    let id = advertisement_key.id();
    if id.contains('/') {
        return Err(IdentityError::InvalidIdentifier(id));
    }

    Ok(DeviceIdentity {
        name: name.to_string(),
        private_key,
        advertisement_key,
        id,
    })
}

/// Call [`generate`] until it succeeds, at most `max_attempts` times. Returns the last error
/// when every attempt failed, or [`IdentityError::NoAttempts`] when `max_attempts` is zero.
pub fn generate_until_valid(
    name: &str,
    max_attempts: usize,
) -> Result<DeviceIdentity, IdentityError> {
    retry(max_attempts, || generate(name))
}

fn retry(
    max_attempts: usize,
    mut attempt: impl FnMut() -> Result<DeviceIdentity, IdentityError>,
) -> Result<DeviceIdentity, IdentityError> {
    let mut last_error = None;

    for n in 1..=max_attempts {
        match attempt() {
            Ok(identity) => return Ok(identity),
            Err(e) => {
                debug!(attempt = n, error = %e, "discarding generated key");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(IdentityError::NoAttempts))
}

/// Pick devices by name, case-insensitively. An empty selector or `all` picks every device.
/// `None` if a name matches nothing.
pub fn select_devices<'a>(
    devices: &'a [DeviceIdentity],
    selector: &str,
) -> Option<Vec<&'a DeviceIdentity>> {
    let selector = selector.trim();
    if selector.is_empty() || selector.eq_ignore_ascii_case("all") {
        return Some(devices.iter().collect());
    }

    let selected: Vec<_> = devices
        .iter()
        .filter(|d| d.name.eq_ignore_ascii_case(selector))
        .collect();

    (!selected.is_empty()).then_some(selected)
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
    use const_decoder::{decode, Decoder};
    use sha2::{Digest, Sha256};
    use zeroize::Zeroizing;

    use crate::protocol::CurveError;

    use super::*;

    /// A curve that hands back canned values, to exercise width and identifier checks.
    struct CannedCurve {
        scalar: Vec<u8>,
        x: Vec<u8>,
    }

    impl EllipticCurve for CannedCurve {
        fn random_scalar(&self, _csprng: &mut impl CryptoRngCore) -> Zeroizing<Vec<u8>> {
            Zeroizing::new(self.scalar.clone())
        }

        fn public_x(&self, _scalar: &[u8]) -> Result<Vec<u8>, CurveError> {
            Ok(self.x.clone())
        }

        fn shared_x(
            &self,
            _scalar: &[u8],
            _point: &[u8],
        ) -> Result<Zeroizing<Vec<u8>>, CurveError> {
            Err(CurveError::InvalidPoint)
        }
    }

    // Hashes to "RwPKNxB/wNDVZuQ8UEmKb2KHdakTHDNPTEvZ2kxRFvQ="
    const SLASHED_KEY: [u8; KEY_LEN] =
        decode!(Decoder::Base64, b"/j3eaoofkmPIV4hAJTIh2qmE9s1W3Y4PoBoohg==");

    #[test]
    fn test_generated_identity_is_well_formed() {
        let identity = generate_until_valid("keys", 64).unwrap();

        assert_eq!(identity.name(), "keys");
        assert_eq!(identity.private_key().as_bytes().len(), KEY_LEN);
        assert!(!identity.id().contains('/'));

        let advertisement_key = b64.decode(identity.advertisement_key().to_base64()).unwrap();
        assert_eq!(advertisement_key.len(), KEY_LEN);

        let expected_id = b64.encode(Sha256::digest(&advertisement_key).as_slice());
        assert_eq!(identity.id(), expected_id);

        let x = P224.public_x(identity.private_key().as_bytes()).unwrap();
        assert_eq!(x.as_slice(), advertisement_key.as_slice());
    }

    #[test]
    fn test_short_scalar_is_rejected_not_padded() {
        let curve = CannedCurve {
            scalar: vec![1; 27],
            x: vec![2; KEY_LEN],
        };

        assert_eq!(
            generate_with(&curve, &mut rand::rngs::OsRng, "short"),
            Err(IdentityError::KeyGeneration {
                what: "private key",
                expected: KEY_LEN,
                actual: 27
            })
        );
    }

    #[test]
    fn test_short_public_key_is_rejected() {
        let curve = CannedCurve {
            scalar: vec![1; KEY_LEN],
            x: vec![2; 27],
        };

        assert_eq!(
            generate_with(&curve, &mut rand::rngs::OsRng, "short"),
            Err(IdentityError::KeyGeneration {
                what: "public key",
                expected: KEY_LEN,
                actual: 27
            })
        );
    }

    #[test]
    fn test_identifier_with_slash_is_rejected() {
        let curve = CannedCurve {
            scalar: vec![1; KEY_LEN],
            x: SLASHED_KEY.to_vec(),
        };

        assert_eq!(
            generate_with(&curve, &mut rand::rngs::OsRng, "slash"),
            Err(IdentityError::InvalidIdentifier(
                "RwPKNxB/wNDVZuQ8UEmKb2KHdakTHDNPTEvZ2kxRFvQ=".to_string()
            ))
        );
    }

    #[test]
    fn test_retry_stops_at_first_success() {
        let slashed = CannedCurve {
            scalar: vec![1; KEY_LEN],
            x: SLASHED_KEY.to_vec(),
        };
        let mut calls = 0;

        let identity = retry(5, || {
            calls += 1;
            if calls < 3 {
                generate_with(&slashed, &mut rand::rngs::OsRng, "retry")
            } else {
                Ok(DeviceIdentity {
                    name: "retry".to_string(),
                    private_key: PrivateKey::from_bytes([1; KEY_LEN]),
                    advertisement_key: AdvertisementKey([2; KEY_LEN]),
                    id: "accepted".to_string(),
                })
            }
        })
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(identity.id(), "accepted");
    }

    #[test]
    fn test_retry_surfaces_last_error() {
        let slashed = CannedCurve {
            scalar: vec![1; KEY_LEN],
            x: SLASHED_KEY.to_vec(),
        };
        let mut calls = 0;

        let result = retry(4, || {
            calls += 1;
            generate_with(&slashed, &mut rand::rngs::OsRng, "never")
        });

        assert_eq!(calls, 4);
        assert!(matches!(result, Err(IdentityError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_zero_attempts_never_generates() {
        let mut calls = 0;

        let result = retry(0, || {
            calls += 1;
            generate("unreachable")
        });

        assert_eq!(calls, 0);
        assert_eq!(result, Err(IdentityError::NoAttempts));
        assert_eq!(
            generate_until_valid("none", 0),
            Err(IdentityError::NoAttempts)
        );
    }

    #[test]
    fn test_select_devices() {
        let devices = vec![
            generate_until_valid("Keys", 64).unwrap(),
            generate_until_valid("bike", 64).unwrap(),
        ];

        assert_eq!(select_devices(&devices, "all").unwrap().len(), 2);
        assert_eq!(select_devices(&devices, "").unwrap().len(), 2);
        assert_eq!(select_devices(&devices, "keys").unwrap()[0].name(), "Keys");
        assert!(select_devices(&devices, "wallet").is_none());
    }
}
