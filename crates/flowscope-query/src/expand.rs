use flowscope_loki::LokiConfig;
use flowscope_types::{Filter, FilterGroup, Side, fields};

use crate::error::FlowError;

/// Result of expanding one user filter into concrete field filters
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expansion {
    /// Filters that apply as-is
    Plain(FilterGroup),
    /// Alternatives that must be queried separately, one per side
    Split { src: FilterGroup, dst: FilterGroup },
}

/// Expand resource paths and side-less common fields
///
/// `K8S_Object=Pod.default.test` becomes type, namespace and name filters with
/// exact values. Unprefixed keys whose Src/Dst variants are stream labels or
/// IP fields are split into one alternative per side.
pub fn expand(config: &LokiConfig, filter: &Filter) -> Result<Expansion, FlowError> {
    if fields::is_resource_path(&filter.key) {
        return expand_resource_path(filter);
    }

    if fields::prefix_of(&filter.key).is_none() {
        let (src_key, dst_key) = fields::to_src_dst(&filter.key);
        if config.is_label(&src_key) || config.is_label(&dst_key) || fields::is_ip(&filter.key) {
            return Ok(Expansion::Split {
                src: FilterGroup::from([(src_key, filter.value.as_str())]),
                dst: FilterGroup::from([(dst_key, filter.value.as_str())]),
            });
        }
    }

    Ok(Expansion::Plain(FilterGroup::from([(
        filter.key.as_str(),
        filter.value.as_str(),
    )])))
}

fn expand_resource_path(filter: &Filter) -> Result<Expansion, FlowError> {
    let key = filter.key.as_str();
    let parts: Vec<&str> = filter.value.split('.').collect();
    let [kind, namespace, name] = parts.as_slice() else {
        return Err(FlowError::UserInput(format!("invalid resource path: {}", filter)));
    };

    Ok(match fields::prefix_of(key) {
        Some(side) => Expansion::Plain(resource_filters(key, side, kind, namespace, name)),
        None => Expansion::Split {
            src: resource_filters(key, Side::Src, kind, namespace, name),
            dst: resource_filters(key, Side::Dst, kind, namespace, name),
        },
    })
}

fn resource_filters(key: &str, side: Side, kind: &str, namespace: &str, name: &str) -> FilterGroup {
    let (type_field, name_field) = if fields::is_owner_path(key) {
        (fields::K8S_OWNER_TYPE, fields::K8S_OWNER_NAME)
    } else {
        (fields::K8S_TYPE, fields::K8S_NAME)
    };
    FilterGroup::from([
        (fields::with_side(side, type_field), exact(kind)),
        (fields::with_side(side, fields::K8S_NAMESPACE), exact(namespace)),
        (fields::with_side(side, name_field), exact(name)),
    ])
}

/// Quoted values match exactly
fn exact(value: &str) -> String {
    format!("\"{}\"", value)
}
