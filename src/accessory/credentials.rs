use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use serde::Serialize;
use tracing::warn;
use zeroize::Zeroizing;

use crate::{
    error::CredentialError,
    protocol::{AdvertisementKey, PrivateKey, KEY_LEN},
};

use super::DeviceIdentity;

const PRIVATE_KEY: &str = "Private key";
const ADVERTISEMENT_KEY: &str = "Advertisement key";
const HASHED_ADVERTISEMENT_KEY: &str = "Hashed adv key";

/// One entry of the device list the macless-haystack web app imports.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppDevice<'a> {
    id: u32,
    color_components: [u8; 4],
    name: &'a str,
    private_key: &'a str,
    icon: &'a str,
    is_deployed: bool,
    color_space_name: &'a str,
    uses_derivation: bool,
    is_active: bool,
    additional_keys: [&'a str; 0],
}

impl DeviceIdentity {
    /// Render the identity in the line-oriented `key: value` format other haystack tooling
    /// reads. The output contains the private key.
    pub fn to_credential_record(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{PRIVATE_KEY}: {}\n{ADVERTISEMENT_KEY}: {}\n{HASHED_ADVERTISEMENT_KEY}: {}\n",
            *Zeroizing::new(self.private_key.to_base64()),
            self.advertisement_key.to_base64(),
            self.id,
        ))
    }

    /// Parse a credential record. Lines without a `": "` separator and unknown keys are
    /// skipped; all three known fields are required.
    pub fn from_credential_record(
        name: impl Into<String>,
        record: &str,
    ) -> Result<Self, CredentialError> {
        let mut private_key = None;
        let mut advertisement_key = None;
        let mut id = None;

        for line in record.lines().filter(|line| !line.trim().is_empty()) {
            let Some((key, value)) = line.split_once(": ") else {
                warn!(line_len = line.len(), "skipping credential line without a separator");
                continue;
            };

            match key.trim() {
                PRIVATE_KEY => {
                    private_key = Some(PrivateKey::from_bytes(*decode_key(PRIVATE_KEY, value)?));
                }
                ADVERTISEMENT_KEY => {
                    advertisement_key =
                        Some(AdvertisementKey(*decode_key(ADVERTISEMENT_KEY, value)?));
                }
                HASHED_ADVERTISEMENT_KEY => id = Some(value.trim().to_string()),
                other => warn!(key = other, "skipping unknown credential key"),
            }
        }

        let identity = Self {
            name: name.into(),
            private_key: private_key.ok_or(CredentialError::MissingField(PRIVATE_KEY))?,
            advertisement_key: advertisement_key
                .ok_or(CredentialError::MissingField(ADVERTISEMENT_KEY))?,
            id: id.ok_or(CredentialError::MissingField(HASHED_ADVERTISEMENT_KEY))?,
        };

        if identity.advertisement_key.id() != identity.id {
            warn!(
                name = %identity.name,
                id = %identity.id,
                "hashed advertisement key does not match the advertisement key"
            );
        }

        Ok(identity)
    }

    /// Render the identity as a macless-haystack device list holding this one device, ready to
    /// import into its web app. `app_id` is the app's display identifier and has nothing to do
    /// with the relay identifier. The output contains the private key.
    pub fn to_app_device_list(
        &self,
        app_id: u32,
    ) -> Result<Zeroizing<String>, serde_json::Error> {
        let private_key = Zeroizing::new(self.private_key.to_base64());
        let device = AppDevice {
            id: app_id,
            color_components: [0, 1, 0, 1],
            name: &self.name,
            private_key: &private_key,
            icon: "",
            is_deployed: true,
            color_space_name: "kCGColorSpaceExtendedSRGB",
            uses_derivation: false,
            is_active: false,
            additional_keys: [],
        };

        serde_json::to_string_pretty(&[device]).map(Zeroizing::new)
    }
}

fn decode_key(
    field: &'static str,
    value: &str,
) -> Result<Zeroizing<[u8; KEY_LEN]>, CredentialError> {
    let decoded = Zeroizing::new(
        b64.decode(value.trim())
            .map_err(|source| CredentialError::Base64 { field, source })?,
    );

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    if decoded.len() != KEY_LEN {
        return Err(CredentialError::KeyLength {
            field,
            expected: KEY_LEN,
            actual: decoded.len(),
        });
    }
    key.copy_from_slice(&decoded);

    Ok(key)
}
