use core::{fmt, ops::Range};

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::DecryptError;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the reference date of report
/// timestamps.
pub const REFERENCE_DATE_OFFSET_SECONDS: i64 = 978_307_200;

/// Length of the finder's ephemeral key, a SEC1 uncompressed P-224 point.
pub const EPHEMERAL_KEY_LEN: usize = 57;

/// Length of the encrypted location fix.
pub const ENCRYPTED_LOCATION_LEN: usize = 10;

/// Offset of the encrypted block within the raw payload. The block starts with the
/// confidence byte.
const BLOCK_OFFSET: usize = 4;

/// Newer relay responses carry one extra byte at the start of the encrypted block.
const EXTENDED_BLOCK_LEN: usize = 85;

const EPHEMERAL_KEY: Range<usize> = 1..58;
const ENCRYPTED_LOCATION: Range<usize> = 58..68;
const TAG_START: usize = 68;

/// A raw report payload split into its fields, borrowing from the decoded relay bytes.
///
/// Layout: `[0..4]` big-endian seconds since 2001-01-01, `[4]` confidence, then the encrypted
/// block: one byte, the 57-byte ephemeral key, 10 bytes of ciphertext and the GCM tag.
pub struct EncryptedReport<'a> {
    /// Seconds since 2001-01-01T00:00:00Z.
    pub seen_offset_seconds: u32,
    /// Confidence byte, always `payload[4]`.
    pub confidence: u8,
    /// Finder device's ephemeral public key from the keypair used to encrypt the location.
    pub ephemeral_public_key: &'a [u8],
    /// The 10 encrypted location bytes.
    pub encrypted_location: [u8; ENCRYPTED_LOCATION_LEN],
    /// Everything after the ciphertext. Should be exactly 16 bytes; checked at decryption.
    pub tag: &'a [u8],
}

impl<'a> EncryptedReport<'a> {
    /// Split a payload into fields. Every slice is bounds-checked.
    pub fn parse(payload: &'a [u8]) -> Result<Self, DecryptError> {
        let header = slice(payload, 0, 0..BLOCK_OFFSET + 1)?;
        let seen_offset_seconds = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let confidence = header[BLOCK_OFFSET];

        let mut block_offset = BLOCK_OFFSET;
        if payload.len() - block_offset == EXTENDED_BLOCK_LEN {
            block_offset += 1;
        }

        let ephemeral_public_key = slice(payload, block_offset, EPHEMERAL_KEY)?;
        let ciphertext = slice(payload, block_offset, ENCRYPTED_LOCATION)?;
        let mut encrypted_location = [0u8; ENCRYPTED_LOCATION_LEN];
        encrypted_location.copy_from_slice(ciphertext);
        let tag = &payload[block_offset + TAG_START..];

        Ok(Self {
            seen_offset_seconds,
            confidence,
            ephemeral_public_key,
            encrypted_location,
            tag,
        })
    }

    /// Absolute time the finder saw the accessory.
    pub fn seen_at(&self) -> DateTime<Utc> {
        seen_at(self.seen_offset_seconds)
    }
}

/// Convert a report's seconds-since-2001 offset to an absolute time.
pub fn seen_at(seen_offset_seconds: u32) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
        + TimeDelta::seconds(REFERENCE_DATE_OFFSET_SECONDS + i64::from(seen_offset_seconds))
}

/// `bytes[base + range]`, or the length the read would have required.
fn slice(bytes: &[u8], base: usize, range: Range<usize>) -> Result<&[u8], DecryptError> {
    let (start, end) = (base + range.start, base + range.end);
    bytes
        .get(start..end)
        .ok_or(DecryptError::MalformedPayload {
            needed: end,
            actual: bytes.len(),
        })
}

impl fmt::Debug for EncryptedReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedReport")
            .field("seen_at", &self.seen_at())
            .field("confidence", &self.confidence)
            .field(
                "ephemeral_public_key",
                &hex::encode_upper(self.ephemeral_public_key),
            )
            .field(
                "encrypted_location",
                &hex::encode_upper(self.encrypted_location),
            )
            .field("tag", &hex::encode_upper(self.tag))
            .finish()
    }
}
