use core::fmt;

use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Width of a P-224 scalar and of a raw X coordinate.
pub const KEY_LEN: usize = 28;

/// A device's 28-byte private scalar, big-endian.
///
/// Wiped from memory when dropped. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; KEY_LEN]);

impl PrivateKey {
    /// Wrap raw scalar bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Accept exactly 28 bytes; `None` for any other length.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// The raw scalar bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Standard base64, as stored in credential records.
    pub fn to_base64(&self) -> String {
        b64.encode(self.0)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// The raw X coordinate of a device's public key, as broadcast by the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisementKey(pub [u8; KEY_LEN]);

impl AdvertisementKey {
    /// SHA-256 of the raw key bytes: the identifier the relay indexes reports under.
    pub fn hash(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(Sha256::digest(self.0).as_slice());
        out
    }

    /// The relay identifier in its base64 text form.
    pub fn id(&self) -> String {
        b64.encode(self.hash())
    }

    /// Standard base64 of the raw key bytes.
    pub fn to_base64(&self) -> String {
        b64.encode(self.0)
    }

    /// Decode from base64. `None` unless the text is valid and decodes to exactly 28 bytes.
    pub fn from_base64(encoded: &str) -> Option<Self> {
        let decoded = b64.decode(encoded).ok()?;
        let key: [u8; KEY_LEN] = decoded.as_slice().try_into().ok()?;
        Some(Self(key))
    }
}

impl From<AdvertisementKey> for [u8; KEY_LEN] {
    fn from(value: AdvertisementKey) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use const_decoder::{decode, Decoder};

    use super::*;

    #[test]
    fn test_hash() {
        let public_key = decode!(Decoder::Base64, b"/j3eaoofkmPIV4hAJTIh2qmE9s1W3Y4PoBoohg==");
        let key = AdvertisementKey(public_key);

        assert_eq!(
            key.hash(),
            decode!(
                Decoder::Base64,
                b"RwPKNxB/wNDVZuQ8UEmKb2KHdakTHDNPTEvZ2kxRFvQ="
            )
        );
        assert_eq!(key.id(), "RwPKNxB/wNDVZuQ8UEmKb2KHdakTHDNPTEvZ2kxRFvQ=");
    }

    #[test]
    fn test_base64_reencodes_to_same_text() {
        let encoded = "/j3eaoofkmPIV4hAJTIh2qmE9s1W3Y4PoBoohg==";
        let key = AdvertisementKey::from_base64(encoded).unwrap();

        assert_eq!(key.to_base64(), encoded);
    }

    #[test]
    fn test_base64_rejects_wrong_length() {
        assert!(AdvertisementKey::from_base64("AAAA").is_none());
        assert!(AdvertisementKey::from_base64("not base64!").is_none());
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let key = PrivateKey::from_bytes([0x2a; KEY_LEN]);
        let printed = format!("{key:?}");

        assert_eq!(printed, "PrivateKey(<redacted>)");
    }

    #[test]
    fn test_private_key_from_slice_requires_exact_width() {
        assert!(PrivateKey::from_slice(&[1; 27]).is_none());
        assert!(PrivateKey::from_slice(&[1; 29]).is_none());
        assert!(PrivateKey::from_slice(&[1; 28]).is_some());
    }
}
