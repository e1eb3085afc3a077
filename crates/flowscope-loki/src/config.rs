use serde::Deserialize;
use std::time::Duration;

use flowscope_types::fields;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Loki connection settings, shared read-only by every query of a request
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LokiConfig {
    /// Base URL of the Loki instance
    pub url: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Tenant sent as `X-Scope-OrgID` when set
    pub tenant_id: Option<String>,

    /// Fields indexed as stream labels by the store
    pub labels: Vec<String>,

    /// Value of the `app` label identifying flow records
    pub app_label_value: String,
}

impl Default for LokiConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3100/".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tenant_id: None,
            labels: [
                "SrcK8S_Namespace",
                "SrcK8S_OwnerName",
                "DstK8S_Namespace",
                "DstK8S_OwnerName",
                fields::FLOW_DIRECTION,
            ]
            .iter()
            .map(|l| l.to_string())
            .collect(),
            app_label_value: "netobserv-flowcollector".to_string(),
        }
    }
}

impl LokiConfig {
    /// Settings for `url` with default labels and app identity
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        tenant_id: Option<String>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            url: url.into(),
            timeout_secs: timeout.as_secs(),
            tenant_id,
            labels,
            ..Default::default()
        }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Whether the field is indexed as a stream label
    pub fn is_label(&self, key: &str) -> bool {
        self.labels.iter().any(|l| l == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LokiConfig::default();
        assert_eq!(config.base_url(), "http://localhost:3100");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.is_label("SrcK8S_Namespace"));
        assert!(config.is_label("FlowDirection"));
        assert!(!config.is_label("SrcK8S_Name"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: LokiConfig = toml::from_str(
            r#"
            url = "http://loki.netobserv:3100/"
            tenant_id = "netobserv"
            labels = ["SrcK8S_Namespace"]
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url(), "http://loki.netobserv:3100");
        assert_eq!(config.tenant_id.as_deref(), Some("netobserv"));
        assert_eq!(config.labels, vec!["SrcK8S_Namespace".to_string()]);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.app_label_value, "netobserv-flowcollector");
    }
}
