use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::TransportError;

use super::{RelayResponse, ReportFetcher, ReportRequest};

/// Where to find the relay and how to query it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// URL the report request is POSTed to.
    pub endpoint: String,
    /// Lookback window sent with every request.
    pub days: u32,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl RelayConfig {
    /// A relay on the local machine, on the port macless-haystack listens on.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:6176";
    /// One week of reports.
    pub const DEFAULT_DAYS: u32 = 7;
    /// Half a minute per request.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            days: Self::DEFAULT_DAYS,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// A relay reached over HTTP. One POST per [`ReportRequest`].
pub struct HttpRelay {
    client: Client,
    endpoint: String,
}

impl HttpRelay {
    /// Build a client for `config`. Fails only if the TLS backend cannot be initialized.
    pub fn new(config: &RelayConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(TransportError::request)?,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl ReportFetcher for HttpRelay {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn fetch(&self, request: &ReportRequest) -> Result<RelayResponse, TransportError> {
        debug!(ids = request.ids.len(), days = request.days, "posting report request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(TransportError::request)?;

        response
            .json::<RelayResponse>()
            .await
            .map_err(TransportError::request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.endpoint, "http://localhost:6176");
        assert_eq!(config.days, 7);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_a_transport_error() {
        let relay = HttpRelay::new(&RelayConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            ..RelayConfig::default()
        })
        .unwrap();

        let result = relay
            .fetch(&ReportRequest {
                ids: vec!["abc=".to_string()],
                days: 1,
            })
            .await;

        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
