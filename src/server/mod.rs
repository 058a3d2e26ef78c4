use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Fanning a relay response out into decrypted location records.
pub mod batch;
/// A reqwest client for macless-haystack-style relays.
#[cfg(feature = "client")]
mod http;

pub use batch::{decrypt_response, fetch_and_decrypt, BatchOutcome, ReportBatch};
#[cfg(feature = "client")]
pub use http::{HttpRelay, RelayConfig};

/// The body POSTed to the relay.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Base64 hashed advertisement keys.
    pub ids: Vec<String>,
    /// How far back to look, in days.
    pub days: u32,
}

/// The relay's response envelope.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    /// `"200"` on success. Anything else is fatal for the whole request.
    #[serde(rename = "statusCode")]
    pub status_code: String,
    /// Empty when the relay has nothing, or when the envelope is an error.
    #[serde(default)]
    pub results: Vec<RelayResult>,
}

/// One encrypted report as the relay returns it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RelayResult {
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "datePublished")]
    pub date_published: i64,
    /// Base64 raw report payload.
    pub payload: String,
    /// Free-form text from the relay.
    #[serde(default)]
    pub description: String,
    /// The hashed advertisement key this report was filed under.
    pub id: String,
    /// Per-result status as the relay reports it.
    #[serde(rename = "statusCode", default)]
    pub status_code: i64,
}

impl RelayResponse {
    /// The envelope status of a successful response.
    pub const SUCCESS: &'static str = "200";

    /// Whether the envelope carries [`Self::SUCCESS`].
    pub fn is_success(&self) -> bool {
        self.status_code == Self::SUCCESS
    }
}

/// Anything that can answer a [`ReportRequest`]: the HTTP relay in production, canned
/// responses in tests.
pub trait ReportFetcher {
    /// Send one request and return the relay's envelope as is. Only transport-level failures
    /// are errors here; the envelope status is checked by the caller.
    fn fetch(
        &self,
        request: &ReportRequest,
    ) -> impl Future<Output = Result<RelayResponse, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserializes_relay_json() {
        let body = r#"{
            "statusCode": "200",
            "results": [{
                "datePublished": 1735689600000,
                "payload": "AAAA",
                "description": "found",
                "id": "abc=",
                "statusCode": 0
            }]
        }"#;

        let response: RelayResponse = serde_json::from_str(body).unwrap();

        assert!(response.is_success());
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].date_published, 1_735_689_600_000);
        assert_eq!(response.results[0].id, "abc=");
    }

    #[test]
    fn test_error_envelope_without_results() {
        let response: RelayResponse = serde_json::from_str(r#"{"statusCode": "401"}"#).unwrap();

        assert!(!response.is_success());
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_request_serializes_to_relay_json() {
        let request = ReportRequest {
            ids: vec!["abc=".to_string()],
            days: 7,
        };

        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"ids":["abc="],"days":7}"#
        );
    }
}
