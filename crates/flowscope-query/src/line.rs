use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;

use crate::error::FlowError;
use crate::label::LabelFilter;

static ALLOWED_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[A-Za-z0-9_\-.,"*:/]*$"#).expect("filter value pattern is valid")
});

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("field name pattern is valid"));

/// Reject keys that are not plain field names
pub fn validate_key(key: &str) -> Result<(), FlowError> {
    if FIELD_NAME.is_match(key) {
        Ok(())
    } else {
        Err(FlowError::UserInput(format!(
            "unauthorized sign in filter key: {}",
            key
        )))
    }
}

/// Reject values that could break out of a LogQL string or regex
pub fn validate_value(value: &str) -> Result<(), FlowError> {
    if value.contains('`') {
        return Err(FlowError::UserInput(format!(
            "backquote not authorized in filter value: {}",
            value
        )));
    }
    if !ALLOWED_VALUE.is_match(value) {
        return Err(FlowError::UserInput(format!(
            "unauthorized sign in flows request: {}",
            value
        )));
    }
    Ok(())
}

/// Accept a single address, a CIDR block or an `a-b` range
pub(crate) fn validate_ip(value: &str) -> Result<(), FlowError> {
    let invalid = || FlowError::UserInput(format!("invalid IP filter value: {}", value));

    if let Some((addr, prefix)) = value.split_once('/') {
        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        return if prefix <= max { Ok(()) } else { Err(invalid()) };
    }
    if let Some((from, to)) = value.split_once('-') {
        let from: IpAddr = from.parse().map_err(|_| invalid())?;
        let to: IpAddr = to.parse().map_err(|_| invalid())?;
        return if from.is_ipv4() == to.is_ipv4() { Ok(()) } else { Err(invalid()) };
    }
    value.parse::<IpAddr>().map(|_| ()).map_err(|_| invalid())
}

/// User text value turned into a regex
///
/// A value wrapped in double quotes is matched exactly, `*` is a wildcard
/// anywhere, and an unquoted value is a case-insensitive substring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextPattern {
    /// Value without quotes, `*` still in place
    literal: String,
    quoted_start: bool,
    quoted_end: bool,
    wildcard_start: bool,
    wildcard_end: bool,
}

/// Wildcard over a whole extracted label value
const LABEL_WILDCARD: &str = ".*";
/// Wildcard that cannot leave the current JSON string
const JSON_WILDCARD: &str = "[^\"]*";

impl TextPattern {
    /// Parse a raw filter value
    pub fn parse(value: &str) -> Self {
        let quoted_start = value.starts_with('"');
        let quoted_end = value.len() > 1 && value.ends_with('"');
        Self {
            literal: value.replace('"', ""),
            quoted_start,
            quoted_end,
            wildcard_start: value.starts_with("\"*"),
            wildcard_end: value.ends_with("*\""),
        }
    }

    /// Quoted on both ends without wildcard, usable as an equality matcher
    pub fn is_exact(&self) -> bool {
        self.quoted_start && self.quoted_end && !self.literal.contains('*')
    }

    /// Value with quotes stripped
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Regex matching a whole label value
    pub fn label_regex(&self) -> String {
        let mut re = String::new();
        if !self.quoted_start {
            re.push_str(LABEL_WILDCARD);
        } else if !self.wildcard_start {
            re.push('^');
        }
        re.push_str(&self.literal.replace('*', LABEL_WILDCARD));
        if !self.quoted_end {
            re.push_str(LABEL_WILDCARD);
        } else if !self.wildcard_end {
            re.push('$');
        }
        self.scoped(re)
    }

    /// Regex matching the value part of a JSON string field, between its quotes
    fn json_regex(&self) -> String {
        let mut re = String::new();
        if !self.quoted_start {
            re.push_str(JSON_WILDCARD);
        }
        re.push_str(&self.literal.replace('*', JSON_WILDCARD));
        if !self.quoted_end {
            re.push_str(JSON_WILDCARD);
        }
        self.scoped(re)
    }

    /// Unquoted values are case-insensitive, with the flag kept inside the group
    fn scoped(&self, re: String) -> String {
        if self.quoted_start {
            re
        } else {
            format!("(?i:{})", re)
        }
    }
}

/// Values a line filter matches
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineValue {
    Numeric(Vec<i64>),
    Text(Vec<TextPattern>),
}

/// Regex matched against the raw JSON line, keyed on a field name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineFilter {
    pub key: String,
    pub value: LineValue,
}

impl LineFilter {
    /// Filter on integer alternatives
    pub fn numeric(key: impl Into<String>, values: Vec<i64>) -> Self {
        Self {
            key: key.into(),
            value: LineValue::Numeric(values),
        }
    }

    /// Filter on text patterns
    pub fn text(key: impl Into<String>, patterns: Vec<TextPattern>) -> Self {
        Self {
            key: key.into(),
            value: LineValue::Text(patterns),
        }
    }

    /// Write the regex body; the caller wraps it in back quotes
    pub fn write_into(&self, sb: &mut String) {
        match &self.value {
            LineValue::Numeric(values) => {
                sb.push_str(&self.key);
                sb.push_str("\":");
                if values.len() == 1 {
                    sb.push_str(&values[0].to_string());
                } else {
                    sb.push('(');
                    sb.push_str(&join_numbers(values));
                    sb.push(')');
                }
                // value boundary in compact JSON
                sb.push_str("[,}]");
            }
            LineValue::Text(patterns) => {
                for (i, pattern) in patterns.iter().enumerate() {
                    if i > 0 {
                        sb.push('|');
                    }
                    sb.push_str(&self.key);
                    sb.push_str("\":\"");
                    sb.push_str(&pattern.json_regex());
                    sb.push('"');
                }
            }
        }
    }

    /// Equivalent predicate on the field extracted by the `json` stage
    pub fn to_label_filter(&self) -> LabelFilter {
        match &self.value {
            LineValue::Numeric(values) if values.len() == 1 => {
                LabelFilter::integer(self.key.clone(), values[0])
            }
            LineValue::Numeric(values) => {
                LabelFilter::regex(self.key.clone(), join_numbers(values))
            }
            LineValue::Text(patterns) => {
                let alternatives: Vec<String> =
                    patterns.iter().map(TextPattern::label_regex).collect();
                LabelFilter::raw_regex(self.key.clone(), alternatives.join("|"))
            }
        }
    }
}

pub(crate) fn join_numbers(values: &[i64]) -> String {
    values
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join("|")
}
