use chrono::{DateTime, Utc};
use std::collections::HashMap;

use flowscope_types::{MatchMode, Reporter};

use crate::error::FlowError;

pub const START_TIME_KEY: &str = "startTime";
pub const END_TIME_KEY: &str = "endTime";
pub const TIME_RANGE_KEY: &str = "timeRange";
pub const LIMIT_KEY: &str = "limit";
pub const MATCH_KEY: &str = "match";
pub const REPORTER_KEY: &str = "reporter";
pub const FILTERS_KEY: &str = "filters";
pub const DIRECTION_KEY: &str = "direction";

/// Inbound parameters of a flow request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowParams {
    /// Unix seconds, passed through to Loki
    pub start: Option<String>,
    pub end: Option<String>,
    pub limit: Option<String>,
    /// Loki sort direction (`forward` / `backward`)
    pub direction: Option<String>,
    pub match_mode: MatchMode,
    pub reporter: Reporter,
    /// Raw, still encoded, filter expression
    pub filters: String,
}

impl FlowParams {
    /// Read request parameters; empty values count as absent
    ///
    /// Without `startTime`, a `timeRange` in seconds sets the start to
    /// `now - timeRange`.
    pub fn from_query(params: &HashMap<String, String>, now: DateTime<Utc>) -> Result<Self, FlowError> {
        let get = |key: &str| params.get(key).filter(|v| !v.is_empty()).cloned();

        let start = match get(START_TIME_KEY) {
            Some(start) => Some(start),
            None => match get(TIME_RANGE_KEY) {
                Some(range) => {
                    let range: i64 = range.parse().map_err(|e| {
                        FlowError::UserInput(format!("Could not parse time range: {}", e))
                    })?;
                    let start = now.timestamp().checked_sub(range).ok_or_else(|| {
                        FlowError::UserInput(format!(
                            "Could not parse time range: {} is out of bounds",
                            range
                        ))
                    })?;
                    Some(start.to_string())
                }
                None => None,
            },
        };

        Ok(Self {
            start,
            end: get(END_TIME_KEY),
            limit: get(LIMIT_KEY),
            direction: get(DIRECTION_KEY),
            match_mode: MatchMode::from_param(get(MATCH_KEY).as_deref()),
            reporter: Reporter::from_param(get(REPORTER_KEY).as_deref()),
            filters: get(FILTERS_KEY).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let params = FlowParams::from_query(&HashMap::new(), now()).unwrap();
        assert_eq!(params, FlowParams::default());
        assert_eq!(params.match_mode, MatchMode::All);
        assert_eq!(params.reporter, Reporter::Both);
    }

    #[test]
    fn test_time_range() {
        let params = FlowParams::from_query(&query(&[("timeRange", "300")]), now()).unwrap();
        assert_eq!(params.start.as_deref(), Some("1699999700"));
    }

    #[test]
    fn test_start_time_wins_over_range() {
        let params = FlowParams::from_query(
            &query(&[("startTime", "1600000000"), ("timeRange", "300"), ("endTime", "1600000600")]),
            now(),
        )
        .unwrap();
        assert_eq!(params.start.as_deref(), Some("1600000000"));
        assert_eq!(params.end.as_deref(), Some("1600000600"));
    }

    #[test]
    fn test_bad_time_range() {
        let err = FlowParams::from_query(&query(&[("timeRange", "5m")]), now()).unwrap_err();
        assert!(matches!(&err, FlowError::UserInput(m) if m.starts_with("Could not parse time range: ")));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_out_of_bounds_time_range() {
        let min = i64::MIN.to_string();
        let err = FlowParams::from_query(&query(&[("timeRange", min.as_str())]), now()).unwrap_err();
        assert_eq!(
            err,
            FlowError::UserInput(format!("Could not parse time range: {} is out of bounds", min))
        );

        let params = FlowParams::from_query(&query(&[("timeRange", "-60")]), now()).unwrap();
        assert_eq!(params.start.as_deref(), Some("1700000060"));
    }

    #[test]
    fn test_pass_through_values() {
        let params = FlowParams::from_query(
            &query(&[
                ("limit", "100"),
                ("match", "any"),
                ("reporter", "destination"),
                ("direction", "forward"),
                ("filters", "Port%3D80"),
                ("endTime", ""),
            ]),
            now(),
        )
        .unwrap();
        assert_eq!(params.limit.as_deref(), Some("100"));
        assert_eq!(params.match_mode, MatchMode::Any);
        assert_eq!(params.reporter, Reporter::Destination);
        assert_eq!(params.direction.as_deref(), Some("forward"));
        assert_eq!(params.filters, "Port%3D80");
        assert_eq!(params.end, None);
    }
}
