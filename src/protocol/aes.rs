use aes_gcm::{
    aead::{consts::U16, generic_array::GenericArray, AeadInPlace, KeyInit},
    aes::Aes128,
    AesGcm, Key,
};

use crate::error::DecryptError;

/// AES as used in the encryption and decryption of FindMy reports: AES-128 in GCM mode with a
/// 16-byte nonce instead of the usual 12.
pub type Aes = AesGcm<Aes128, U16>;

/// Length of the GCM authentication tag appended to each report.
pub const TAG_LEN: usize = 16;

/// Authenticate and decrypt `buffer` in place.
///
/// A tag of any length other than [`TAG_LEN`] fails the same way a forged one does.
pub fn open_in_place(
    key: &[u8; 16],
    nonce: &[u8; 16],
    buffer: &mut [u8],
    tag: &[u8],
) -> Result<(), DecryptError> {
    if tag.len() != TAG_LEN {
        return Err(DecryptError::Decryption);
    }

    let cipher = Aes::new(Key::<Aes>::from_slice(key));
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            &[],
            buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| DecryptError::Decryption)
}
