//! Flow query core for flowscope
//!
//! This crate turns user flow filters into Loki queries and merges their results:
//! filter decoding, Src/Dst and resource-path expansion, grouping by match mode,
//! LogQL rendering, and the parallel dispatcher that runs one query per group.

mod builder;
mod decode;
mod dispatch;
mod error;
mod expand;
mod group;
mod label;
mod line;
mod params;

pub use builder::{FlowQueryBuilder, Query};
pub use decode::decode_filters;
pub use dispatch::{FlowFetcher, aggregate, fetch_single};
pub use error::FlowError;
pub use expand::{Expansion, expand};
pub use group::{group_all, group_filters};
pub use label::{LabelFilter, LabelJoiner, LabelValue};
pub use line::{LineFilter, LineValue, TextPattern, validate_key, validate_value};
pub use params::{
    DIRECTION_KEY, END_TIME_KEY, FILTERS_KEY, FlowParams, LIMIT_KEY, MATCH_KEY, REPORTER_KEY,
    START_TIME_KEY, TIME_RANGE_KEY,
};

// Re-export types used in our public API
pub use flowscope_loki::{HttpClient, LokiConfig};
pub use flowscope_types::{Filter, FilterGroup, MatchMode, QueryResponse, Reporter};
