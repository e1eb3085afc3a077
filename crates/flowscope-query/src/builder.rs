use flowscope_loki::LokiConfig;
use flowscope_types::{FilterGroup, Reporter, fields};

use crate::error::FlowError;
use crate::label::{LabelFilter, LabelJoiner};
use crate::line::{
    LineFilter, TextPattern, join_numbers, validate_ip, validate_key, validate_value,
};

const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range?query=";

const START_PARAM: &str = "start";
const END_PARAM: &str = "end";
const LIMIT_PARAM: &str = "limit";
const DIRECTION_PARAM: &str = "direction";

/// A LogQL range query against Loki
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    base_url: String,
    stream_selector: Vec<LabelFilter>,
    line_filters: Vec<LineFilter>,
    label_filters: Vec<LabelFilter>,
    label_joiner: LabelJoiner,
    url_params: Vec<(String, String)>,
}

impl Query {
    /// Empty query against `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Predicates of the stream selector
    pub fn stream_selector(&self) -> &[LabelFilter] {
        &self.stream_selector
    }

    /// Append a plain `&key=value` parameter
    pub fn add_url_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.url_params.push((key.into(), value.into()));
    }

    /// Full query URL: selector, then line filters, then label filters
    pub fn url_query(&self) -> Result<String, FlowError> {
        if self.stream_selector.is_empty() {
            return Err(FlowError::UserInput(
                "there is no stream selector. At least one label matcher is needed".to_string(),
            ));
        }

        let mut sb = String::with_capacity(128);
        sb.push_str(&self.base_url);
        sb.push_str(QUERY_RANGE_PATH);
        sb.push('{');
        for (i, filter) in self.stream_selector.iter().enumerate() {
            if i > 0 {
                sb.push(',');
            }
            filter.write_into(&mut sb);
        }
        sb.push('}');

        for filter in &self.line_filters {
            sb.push_str("|~`");
            filter.write_into(&mut sb);
            sb.push('`');
        }

        if !self.label_filters.is_empty() {
            sb.push_str("|json|");
            for (i, filter) in self.label_filters.iter().enumerate() {
                if i > 0 {
                    sb.push_str(self.label_joiner.as_str());
                }
                filter.write_into(&mut sb);
            }
        }

        for (key, value) in &self.url_params {
            sb.push('&');
            sb.push_str(key);
            sb.push('=');
            sb.push_str(value);
        }
        Ok(sb)
    }

    /// Rewrite every predicate as an OR-ed label filter
    ///
    /// The returned query has an empty stream selector; one must be added
    /// back before rendering.
    pub fn to_any_match(&self) -> Query {
        let mut label_filters = Vec::with_capacity(
            self.stream_selector.len() + self.label_filters.len() + self.line_filters.len(),
        );
        label_filters.extend(self.stream_selector.iter().cloned());
        label_filters.extend(self.label_filters.iter().cloned());
        label_filters.extend(self.line_filters.iter().map(LineFilter::to_label_filter));
        Query {
            base_url: self.base_url.clone(),
            stream_selector: Vec::new(),
            line_filters: Vec::new(),
            label_filters,
            label_joiner: LabelJoiner::Or,
            url_params: self.url_params.clone(),
        }
    }
}

/// Builds the Loki query for one filter group
pub struct FlowQueryBuilder<'a> {
    config: &'a LokiConfig,
    /// App identity and reporter, kept as stream selector in every rendering
    fixed_selector: Vec<LabelFilter>,
    query: Query,
}

impl<'a> FlowQueryBuilder<'a> {
    /// Start a query with app identity, reporter and time bounds
    pub fn new(
        config: &'a LokiConfig,
        start: Option<&str>,
        end: Option<&str>,
        limit: Option<&str>,
        reporter: Reporter,
    ) -> Self {
        let mut fixed_selector = vec![LabelFilter::exact(
            fields::APP_LABEL,
            config.app_label_value.as_str(),
        )];
        if let Some(direction) = reporter.flow_direction() {
            fixed_selector.push(LabelFilter::exact(fields::FLOW_DIRECTION, direction));
        }

        let mut query = Query::new(config.base_url());
        for (key, value) in [(START_PARAM, start), (END_PARAM, end), (LIMIT_PARAM, limit)] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                query.add_url_param(key, value);
            }
        }

        Self {
            config,
            fixed_selector,
            query,
        }
    }

    /// Loki sort direction, appended after the other URL parameters
    pub fn direction(mut self, direction: Option<&str>) -> Self {
        if let Some(direction) = direction.filter(|d| !d.is_empty()) {
            self.query.add_url_param(DIRECTION_PARAM, direction);
        }
        self
    }

    /// Add every filter of a group
    pub fn filters(&mut self, group: &FilterGroup) -> Result<(), FlowError> {
        for (key, value) in group.iter() {
            self.add_filter(key, value)?;
        }
        Ok(())
    }

    /// Add one filter; comma-separated values are alternatives
    pub fn add_filter(&mut self, key: &str, value: &str) -> Result<(), FlowError> {
        validate_key(key)?;
        if value.is_empty() {
            return Ok(());
        }
        validate_value(value)?;
        let values: Vec<&str> = value.split(',').filter(|v| !v.is_empty()).collect();
        if values.is_empty() {
            return Ok(());
        }

        if self.config.is_label(key) {
            let filter = label_selector(key, &values)?;
            self.query.stream_selector.push(filter);
            return Ok(());
        }

        match fields::kind_of(key) {
            fields::FieldKind::Ip => {
                for v in &values {
                    validate_ip(v)?;
                }
                self.query.label_filters.push(LabelFilter::ip(key, values));
            }
            fields::FieldKind::Numeric => {
                let numbers = parse_numbers(key, &values)?;
                self.query.line_filters.push(LineFilter::numeric(key, numbers));
            }
            fields::FieldKind::Text => {
                let patterns = values.iter().map(|v| TextPattern::parse(v)).collect();
                self.query.line_filters.push(LineFilter::text(key, patterns));
            }
        }
        Ok(())
    }

    /// Conjunctive query with app identity first in the selector
    pub fn build(self) -> Query {
        let mut query = self.query;
        let mut selector = self.fixed_selector;
        selector.append(&mut query.stream_selector);
        query.stream_selector = selector;
        query
    }

    /// Disjunctive query: user predicates OR-ed, app identity as selector
    pub fn build_any_match(self) -> Query {
        let mut query = self.query.to_any_match();
        query.stream_selector = self.fixed_selector;
        query
    }
}

fn label_selector(key: &str, values: &[&str]) -> Result<LabelFilter, FlowError> {
    if fields::is_numeric(key) {
        let numbers = parse_numbers(key, values)?;
        return Ok(match numbers.as_slice() {
            [single] => LabelFilter::exact(key, single.to_string()),
            _ => LabelFilter::regex(key, join_numbers(&numbers)),
        });
    }

    let patterns: Vec<TextPattern> = values.iter().map(|v| TextPattern::parse(v)).collect();
    Ok(match patterns.as_slice() {
        [single] if single.is_exact() => LabelFilter::exact(key, single.literal()),
        _ => {
            let alternatives: Vec<String> = patterns.iter().map(TextPattern::label_regex).collect();
            LabelFilter::regex(key, alternatives.join("|"))
        }
    })
}

fn parse_numbers(key: &str, values: &[&str]) -> Result<Vec<i64>, FlowError> {
    values
        .iter()
        .map(|v| {
            v.parse::<i64>().map_err(|_| {
                FlowError::UserInput(format!("invalid numeric value for {}: {}", key, v))
            })
        })
        .collect()
}
