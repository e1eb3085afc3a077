//! Shared types for flowscope
//!
//! This crate contains data structures used across multiple flowscope crates.

pub mod fields;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Filter Types
// ============================================================================

/// A single key/value filter as sent by the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    pub key: String,
    pub value: String,
}

impl Filter {
    /// Create a filter from a key and its raw value
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Filters fetched together in a single query (AND semantics)
///
/// Keys are unique: inserting an existing key replaces its value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterGroup {
    filters: BTreeMap<String, String>,
}

impl FilterGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a filter, replacing any previous value for the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(key.into(), value.into());
    }

    /// Merge all filters of `other` into this group (last write wins)
    pub fn merge(&mut self, other: &FilterGroup) {
        for (k, v) in &other.filters {
            self.filters.insert(k.clone(), v.clone());
        }
    }

    /// Value for a key, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    /// Whether the group holds a filter for `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.filters.contains_key(key)
    }

    /// Iterate over filters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of filters in the group
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the group holds no filter
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterGroup {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut group = FilterGroup::new();
        for (k, v) in iter {
            group.insert(k, v);
        }
        group
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for FilterGroup {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl fmt::Display for FilterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

/// How user filters combine with each other
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Filters are conjunctive, except when a Src/Dst split is required
    #[default]
    All,
    /// Filters are disjunctive, each one fetched on its own
    Any,
}

impl MatchMode {
    /// `any` selects [`MatchMode::Any`], anything else (or nothing) selects [`MatchMode::All`]
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("any") => Self::Any,
            _ => Self::All,
        }
    }

    /// Parameter value of this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
        }
    }
}

/// Which side of a flow reported it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Reporter {
    Source,
    Destination,
    #[default]
    Both,
}

impl Reporter {
    /// `source` and `destination` select one side, anything else selects both
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("source") => Self::Source,
            Some("destination") => Self::Destination,
            _ => Self::Both,
        }
    }

    /// Value of the `FlowDirection` label matching this reporter, if any
    pub fn flow_direction(&self) -> Option<&'static str> {
        match self {
            Self::Source => Some("1"),
            Self::Destination => Some("0"),
            Self::Both => None,
        }
    }

    /// Parameter value of this reporter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
            Self::Both => "both",
        }
    }
}

/// Flow endpoint side, used as a field name prefix
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Src,
    Dst,
}

impl Side {
    /// Field name prefix for this side
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Src => fields::SRC,
            Self::Dst => fields::DST,
        }
    }
}

// ============================================================================
// Loki Response Types
// ============================================================================

pub const RESULT_TYPE_STREAMS: &str = "streams";

/// Envelope returned by the Loki query endpoints
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub status: String,
    pub data: QueryData,
}

impl QueryResponse {
    /// Wrap streams into a successful response
    pub fn from_streams(streams: Vec<Stream>) -> Self {
        Self {
            status: "success".to_string(),
            data: QueryData {
                result: ResultValue::Streams(streams),
                stats: None,
            },
        }
    }

    /// Streams carried by this response, if it is a streams result
    pub fn streams(&self) -> Option<&[Stream]> {
        match &self.data.result {
            ResultValue::Streams(streams) => Some(streams),
            ResultValue::Other { .. } => None,
        }
    }

    /// Total number of entries over all streams
    pub fn entry_count(&self) -> usize {
        self.streams()
            .map(|streams| streams.iter().map(|s| s.entries.len()).sum())
            .unwrap_or(0)
    }
}

/// `data` section of a [`QueryResponse`]
///
/// The shape of `result` depends on `resultType`; it is resolved once, at decode time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQueryData", into = "RawQueryData")]
pub struct QueryData {
    pub result: ResultValue,
    pub stats: Option<serde_json::Value>,
}

/// Typed result payload
#[derive(Clone, Debug, PartialEq)]
pub enum ResultValue {
    Streams(Vec<Stream>),
    /// Any other result type (matrix, vector, scalar...), kept undecoded
    Other {
        result_type: String,
        result: serde_json::Value,
    },
}

impl ResultValue {
    /// Loki `resultType` of this payload
    pub fn result_type(&self) -> &str {
        match self {
            Self::Streams(_) => RESULT_TYPE_STREAMS,
            Self::Other { result_type, .. } => result_type,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQueryData {
    result_type: String,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stats: Option<serde_json::Value>,
}

impl TryFrom<RawQueryData> for QueryData {
    type Error = serde_json::Error;

    fn try_from(raw: RawQueryData) -> Result<Self, Self::Error> {
        let result = if raw.result_type == RESULT_TYPE_STREAMS {
            ResultValue::Streams(serde_json::from_value(raw.result)?)
        } else {
            ResultValue::Other {
                result_type: raw.result_type,
                result: raw.result,
            }
        };
        Ok(Self {
            result,
            stats: raw.stats,
        })
    }
}

impl From<QueryData> for RawQueryData {
    fn from(data: QueryData) -> Self {
        let (result_type, result) = match data.result {
            ResultValue::Streams(streams) => (
                RESULT_TYPE_STREAMS.to_string(),
                serde_json::to_value(streams).unwrap_or_default(),
            ),
            ResultValue::Other {
                result_type,
                result,
            } => (result_type, result),
        };
        Self {
            result_type,
            result,
            stats: data.stats,
        }
    }
}

/// A label set and its log entries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    #[serde(rename = "stream", default)]
    pub labels: BTreeMap<String, String>,
    #[serde(rename = "values", default)]
    pub entries: Vec<Entry>,
}

/// A single log line, encoded by Loki as `["<unix nanos>", "<line>"]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Entry {
    /// Timestamp in nanoseconds, kept as sent by the store
    pub timestamp: String,
    pub line: String,
}

impl Entry {
    /// Create an entry from a nanosecond timestamp and a line
    pub fn new(timestamp: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            line: line.into(),
        }
    }
}

impl From<(String, String)> for Entry {
    fn from((timestamp, line): (String, String)) -> Self {
        Self { timestamp, line }
    }
}

impl From<Entry> for (String, String) {
    fn from(entry: Entry) -> Self {
        (entry.timestamp, entry.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAMS_BODY: &str = r#"{
        "status": "success",
        "data": {
            "resultType": "streams",
            "result": [
                {
                    "stream": {"app": "netobserv-flowcollector", "FlowDirection": "0"},
                    "values": [
                        ["1646812000000000000", "{\"SrcPort\":8080}"],
                        ["1646812001000000000", "{\"SrcPort\":443}"]
                    ]
                }
            ],
            "stats": {"summary": {"bytesProcessedPerSecond": 12}}
        }
    }"#;

    #[test]
    fn test_filter_group_last_write_wins() {
        let mut group = FilterGroup::from([("Port", "80")]);
        group.insert("Port", "443");
        group.merge(&FilterGroup::from([("Proto", "6")]));
        assert_eq!(group.len(), 2);
        assert_eq!(group.get("Port"), Some("443"));
        assert_eq!(group.to_string(), "Port=443&Proto=6");
    }

    #[test]
    fn test_match_mode_from_param() {
        assert_eq!(MatchMode::from_param(Some("any")), MatchMode::Any);
        assert_eq!(MatchMode::from_param(Some("all")), MatchMode::All);
        assert_eq!(MatchMode::from_param(Some("whatever")), MatchMode::All);
        assert_eq!(MatchMode::from_param(None), MatchMode::All);
    }

    #[test]
    fn test_reporter_flow_direction() {
        assert_eq!(Reporter::from_param(Some("source")).flow_direction(), Some("1"));
        assert_eq!(
            Reporter::from_param(Some("destination")).flow_direction(),
            Some("0")
        );
        assert_eq!(Reporter::from_param(Some("both")).flow_direction(), None);
        assert_eq!(Reporter::from_param(None), Reporter::Both);
    }

    #[test]
    fn test_decode_streams_response() {
        let resp: QueryResponse = serde_json::from_str(STREAMS_BODY).unwrap();
        assert_eq!(resp.status, "success");
        let streams = resp.streams().expect("streams result");
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].labels.get("FlowDirection").unwrap(), "0");
        assert_eq!(streams[0].entries[1].timestamp, "1646812001000000000");
        assert_eq!(streams[0].entries[1].line, r#"{"SrcPort":443}"#);
        assert_eq!(resp.entry_count(), 2);
        assert!(resp.data.stats.is_some());
    }

    #[test]
    fn test_streams_response_reencodes_in_loki_shape() {
        let resp: QueryResponse = serde_json::from_str(STREAMS_BODY).unwrap();
        let encoded = serde_json::to_value(&resp).unwrap();
        assert_eq!(encoded["data"]["resultType"], "streams");
        assert_eq!(
            encoded["data"]["result"][0]["values"][0][0],
            "1646812000000000000"
        );
        assert_eq!(
            encoded["data"]["result"][0]["stream"]["app"],
            "netobserv-flowcollector"
        );
    }

    #[test]
    fn test_decode_other_result_type() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{},"values":[]}]}}"#;
        let resp: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(resp.streams().is_none());
        assert_eq!(resp.data.result.result_type(), "matrix");
        assert_eq!(resp.entry_count(), 0);
    }

    #[test]
    fn test_decode_malformed_streams_fails() {
        let body = r#"{"status":"success","data":{"resultType":"streams","result":{"not":"a list"}}}"#;
        assert!(serde_json::from_str::<QueryResponse>(body).is_err());
    }
}
