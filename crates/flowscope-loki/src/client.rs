use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::LokiConfig;
use crate::error::ClientError;

/// Header used by Loki for multi-tenant routing
pub const ORG_ID_HEADER: &str = "x-scope-orgid";

/// Status code and body of a store response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Wrap a status code and body
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Minimal GET transport towards the log store
///
/// An `Err` means the store could not be reached at all; any HTTP answer,
/// whatever its status, is an `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, ClientError>;
}

/// `reqwest`-backed transport with timeout and tenant header
#[derive(Clone, Debug)]
pub struct LokiClient {
    http: reqwest::Client,
}

impl LokiClient {
    /// Build a client with the configured timeout and tenant header
    pub fn new(config: &LokiConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(tenant) = config.tenant_id.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(tenant)
                .map_err(|_| ClientError::InvalidTenant(tenant.to_string()))?;
            headers.insert(HeaderName::from_static(ORG_ID_HEADER), value);
        }
        // TODO: support bearer token auth towards Loki
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpClient for LokiClient {
    async fn get(&self, url: &str) -> Result<RawResponse, ClientError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        tracing::trace!(status, len = body.len(), "Loki response received");
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

/// Describe a non-200 Loki answer from its `{"message": ...}` error envelope
pub fn loki_error_message(body: &[u8], status: u16) -> String {
    let parsed: serde_json::Map<String, serde_json::Value> = match serde_json::from_slice(body) {
        Ok(map) => map,
        Err(_) => {
            return format!(
                "Unknown error from Loki - cannot unmarshal (code: {} resp: {})",
                status,
                String::from_utf8_lossy(body)
            );
        }
    };
    match parsed.get("message").and_then(serde_json::Value::as_str) {
        Some(message) => format!("Error from Loki (code: {}): {}", status, message),
        None => format!("Unknown error from Loki - no message found (code: {})", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_envelope() {
        let msg = loki_error_message(br#"{"message":"parse error at line 1"}"#, 400);
        assert_eq!(msg, "Error from Loki (code: 400): parse error at line 1");
    }

    #[test]
    fn test_error_message_without_message_field() {
        let msg = loki_error_message(br#"{"status":"error"}"#, 500);
        assert_eq!(msg, "Unknown error from Loki - no message found (code: 500)");
    }

    #[test]
    fn test_error_message_not_json() {
        let msg = loki_error_message(b"too many outstanding requests", 429);
        assert_eq!(
            msg,
            "Unknown error from Loki - cannot unmarshal (code: 429 resp: too many outstanding requests)"
        );
    }

    #[test]
    fn test_client_rejects_invalid_tenant() {
        let mut config = LokiConfig::default();
        config.tenant_id = Some("bad\ntenant".to_string());
        let err = LokiClient::new(&config).unwrap_err();
        assert!(matches!(err, ClientError::InvalidTenant(_)));
    }

    #[test]
    fn test_client_with_tenant_builds() {
        let mut config = LokiConfig::default();
        config.tenant_id = Some("netobserv".to_string());
        assert!(LokiClient::new(&config).is_ok());
    }
}
