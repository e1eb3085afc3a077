use tracing::debug;

use flowscope_loki::LokiConfig;
use flowscope_types::{Filter, FilterGroup, MatchMode};

use crate::error::FlowError;
use crate::expand::{Expansion, expand};

/// Turn the filters of one decoded group into the groups to query
///
/// In [`MatchMode::Any`] every expanded filter is fetched on its own, in input
/// order. In [`MatchMode::All`] filters are merged into a single group, or
/// into a Src group and a Dst group as soon as one filter needs a side split.
pub fn group_filters(
    config: &LokiConfig,
    filters: &[Filter],
    mode: MatchMode,
) -> Result<Vec<FilterGroup>, FlowError> {
    match mode {
        MatchMode::Any => {
            let mut groups = Vec::with_capacity(filters.len());
            for filter in filters {
                match expand(config, filter)? {
                    Expansion::Plain(group) => groups.push(group),
                    Expansion::Split { src, dst } => {
                        groups.push(src);
                        groups.push(dst);
                    }
                }
            }
            Ok(groups)
        }
        MatchMode::All => {
            let mut src_group = FilterGroup::new();
            let mut dst_group = FilterGroup::new();
            let mut split = false;
            for filter in filters {
                match expand(config, filter)? {
                    Expansion::Plain(group) => {
                        src_group.merge(&group);
                        dst_group.merge(&group);
                    }
                    Expansion::Split { src, dst } => {
                        src_group.merge(&src);
                        dst_group.merge(&dst);
                        split = true;
                    }
                }
            }
            if split {
                Ok(vec![src_group, dst_group])
            } else {
                Ok(vec![src_group])
            }
        }
    }
}

/// Group every decoded group independently and concatenate the results
pub fn group_all(
    config: &LokiConfig,
    decoded: &[Vec<Filter>],
    mode: MatchMode,
) -> Result<Vec<FilterGroup>, FlowError> {
    let mut groups = Vec::new();
    for filters in decoded {
        groups.extend(group_filters(config, filters, mode)?);
    }
    debug!(
        decoded = decoded.len(),
        groups = groups.len(),
        mode = mode.as_str(),
        "Filters grouped"
    );
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LokiConfig {
        LokiConfig::default()
    }

    fn filters(pairs: &[(&str, &str)]) -> Vec<Filter> {
        pairs.iter().map(|(k, v)| Filter::new(*k, *v)).collect()
    }

    #[test]
    fn test_match_all_resource_path() {
        let input = filters(&[("SrcK8S_Object", "Pod.default.test"), ("Port", "8080")]);
        let groups = group_filters(&config(), &input, MatchMode::All).unwrap();
        assert_eq!(
            groups,
            vec![FilterGroup::from([
                ("SrcK8S_Name", "\"test\""),
                ("SrcK8S_Namespace", "\"default\""),
                ("SrcK8S_Type", "\"Pod\""),
                ("Port", "8080"),
            ])]
        );
    }

    #[test]
    fn test_match_any_resource_path() {
        let input = filters(&[("SrcK8S_Object", "Pod.default.test"), ("Port", "8080")]);
        let groups = group_filters(&config(), &input, MatchMode::Any).unwrap();
        assert_eq!(
            groups,
            vec![
                FilterGroup::from([
                    ("SrcK8S_Name", "\"test\""),
                    ("SrcK8S_Namespace", "\"default\""),
                    ("SrcK8S_Type", "\"Pod\""),
                ]),
                FilterGroup::from([("Port", "8080")]),
            ]
        );
    }

    #[test]
    fn test_match_all_common_resource_path() {
        let input = filters(&[("K8S_Object", "Pod.default.test"), ("Port", "8080")]);
        let groups = group_filters(&config(), &input, MatchMode::All).unwrap();
        assert_eq!(
            groups,
            vec![
                FilterGroup::from([
                    ("SrcK8S_Name", "\"test\""),
                    ("SrcK8S_Namespace", "\"default\""),
                    ("SrcK8S_Type", "\"Pod\""),
                    ("Port", "8080"),
                ]),
                FilterGroup::from([
                    ("DstK8S_Name", "\"test\""),
                    ("DstK8S_Namespace", "\"default\""),
                    ("DstK8S_Type", "\"Pod\""),
                    ("Port", "8080"),
                ]),
            ]
        );
    }

    #[test]
    fn test_match_any_common_resource_path() {
        let input = filters(&[("K8S_Object", "Pod.default.test"), ("Port", "8080")]);
        let groups = group_filters(&config(), &input, MatchMode::Any).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].get("SrcK8S_Type"), Some("\"Pod\""));
        assert_eq!(groups[1].get("DstK8S_Type"), Some("\"Pod\""));
        assert_eq!(groups[2], FilterGroup::from([("Port", "8080")]));
    }

    #[test]
    fn test_match_all_without_split_is_single_group() {
        let input = filters(&[("SrcK8S_Namespace", "a"), ("Proto", "6"), ("SrcPort", "53")]);
        let groups = group_filters(&config(), &input, MatchMode::All).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_match_all_duplicate_key_last_wins() {
        let input = filters(&[("Proto", "6"), ("Proto", "17")]);
        let groups = group_filters(&config(), &input, MatchMode::All).unwrap();
        assert_eq!(groups, vec![FilterGroup::from([("Proto", "17")])]);
    }

    #[test]
    fn test_grouping_error_propagates() {
        let input = filters(&[("Port", "80"), ("K8S_Object", "Pod")]);
        assert!(group_filters(&config(), &input, MatchMode::Any).is_err());
    }

    #[test]
    fn test_group_all_concatenates() {
        let decoded = vec![
            filters(&[("K8S_Namespace", "a")]),
            filters(&[("Proto", "17")]),
        ];
        let groups = group_all(&config(), &decoded, MatchMode::All).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2], FilterGroup::from([("Proto", "17")]));
        assert!(group_all(&config(), &[], MatchMode::All).unwrap().is_empty());
    }
}
