use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Key,
};
use p224::{
    elliptic_curve::{ecdh, sec1::ToEncodedPoint},
    FieldBytes, PublicKey, SecretKey,
};
use sha2::{Digest, Sha256};

use crate::protocol::{AdvertisementKey, Aes, KEY_LEN, LOCATION_LEN};

/// Encode a fix the way an accessory's finder does before encryption.
pub fn encode_location(latitude: f64, longitude: f64, accuracy: u8, status: u8) -> [u8; 10] {
    let mut output = [0u8; LOCATION_LEN];

    output[0..4].copy_from_slice(&((latitude * 10_000_000.0).round() as i32).to_be_bytes());
    output[4..8].copy_from_slice(&((longitude * 10_000_000.0).round() as i32).to_be_bytes());
    output[8] = accuracy;
    output[9] = status;

    output
}

/// Encrypt a location for an accessory with a caller-chosen ephemeral scalar and serialize it
/// in the relay's 88-byte payload layout.
///
/// The key derivation is written out by hand rather than through the X9.63 crate so that
/// decryption is checked against an independent construction.
pub fn seal_report(
    accessory_public_key: &AdvertisementKey,
    ephemeral_scalar: &[u8; KEY_LEN],
    seen_offset_seconds: u32,
    confidence: u8,
    location: &[u8; LOCATION_LEN],
) -> Vec<u8> {
    // (1) The ephemeral key pair
    let finder_secret =
        SecretKey::from_bytes(&FieldBytes::clone_from_slice(ephemeral_scalar)).unwrap();
    let finder_public_key_point = finder_secret.public_key().to_encoded_point(false);

    // (2) ECDH against the advertised key; either Y works since only X of the product is used
    let mut compressed = [0u8; KEY_LEN + 1];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(&accessory_public_key.0);
    let advertised_public_key = PublicKey::from_sec1_bytes(&compressed).unwrap();
    let shared_secret = ecdh::diffie_hellman(
        finder_secret.to_nonzero_scalar(),
        advertised_public_key.as_affine(),
    );

    // (3) SHA-256(shared secret || counter 1 || ephemeral key)
    let mut hasher = Sha256::new();
    hasher.update(shared_secret.raw_secret_bytes());
    hasher.update([0u8, 0, 0, 1]);
    hasher.update(finder_public_key_point.as_bytes());
    let symmetric_key = hasher.finalize();

    // (4) AES-GCM with the first half as key and the second half as the 16-byte nonce
    let cipher = Aes::new(Key::<Aes>::from_slice(&symmetric_key[..16]));
    let mut encrypted_location = *location;
    let tag = cipher
        .encrypt_in_place_detached(
            GenericArray::from_slice(&symmetric_key[16..]),
            &[],
            &mut encrypted_location,
        )
        .unwrap();

    let mut output = Vec::with_capacity(88);
    output.extend_from_slice(&seen_offset_seconds.to_be_bytes());
    output.push(confidence);
    output.extend_from_slice(finder_public_key_point.as_bytes());
    output.extend_from_slice(&encrypted_location);
    output.extend_from_slice(&tag);

    output
}

#[cfg(test)]
mod tests {
    use crate::protocol::{EllipticCurve, P224};

    use super::*;

    #[test]
    fn test_serialized_payload_length() {
        let payload = seal_report(
            &AdvertisementKey(
                P224.public_x(&[7; KEY_LEN])
                    .unwrap()
                    .as_slice()
                    .try_into()
                    .unwrap(),
            ),
            &[9; KEY_LEN],
            0,
            0,
            &[0; LOCATION_LEN],
        );

        assert_eq!(payload.len(), 88);
        assert_eq!(payload[5], 0x04);
    }
}
