/// Joins label filters after the `json` stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LabelJoiner {
    #[default]
    And,
    Or,
}

impl LabelJoiner {
    /// Separator rendered between label filters
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "|",
            // pre-encoded space around `or`
            Self::Or => "+or+",
        }
    }
}

/// Right-hand side of a label matcher
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LabelValue {
    /// `key="value"`
    Exact(String),
    /// `key=~"regex"`
    Regex(String),
    /// ``key=~`regex` ``
    RawRegex(String),
    /// `key=value`
    Integer(i64),
    /// `key=ip("value")`, several values are or-ed
    Ip(Vec<String>),
}

/// Predicate on a stream label, or on a field extracted by `json`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelFilter {
    pub key: String,
    pub value: LabelValue,
}

impl LabelFilter {
    /// Exact string match
    pub fn exact(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: LabelValue::Exact(value.into()),
        }
    }

    /// Regex match, rendered in double quotes
    pub fn regex(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: LabelValue::Regex(pattern.into()),
        }
    }

    /// Regex match, rendered in back quotes
    pub fn raw_regex(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: LabelValue::RawRegex(pattern.into()),
        }
    }

    /// Numeric equality on an extracted field
    pub fn integer(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value: LabelValue::Integer(value),
        }
    }

    /// Address, CIDR or range match; several values are or-ed
    pub fn ip<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            value: LabelValue::Ip(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Append the LogQL rendering of this filter
    pub fn write_into(&self, sb: &mut String) {
        match &self.value {
            LabelValue::Exact(v) => {
                sb.push_str(&self.key);
                sb.push_str("=\"");
                sb.push_str(v);
                sb.push('"');
            }
            LabelValue::Regex(v) => {
                sb.push_str(&self.key);
                sb.push_str("=~\"");
                sb.push_str(v);
                sb.push('"');
            }
            LabelValue::RawRegex(v) => {
                sb.push_str(&self.key);
                sb.push_str("=~`");
                sb.push_str(v);
                sb.push('`');
            }
            LabelValue::Integer(v) => {
                sb.push_str(&self.key);
                sb.push('=');
                sb.push_str(&v.to_string());
            }
            LabelValue::Ip(values) => {
                let grouped = values.len() > 1;
                if grouped {
                    sb.push('(');
                }
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        sb.push_str(LabelJoiner::Or.as_str());
                    }
                    sb.push_str(&self.key);
                    sb.push_str("=ip(\"");
                    sb.push_str(v);
                    sb.push_str("\")");
                }
                if grouped {
                    sb.push(')');
                }
            }
        }
    }
}
