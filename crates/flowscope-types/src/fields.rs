//! Flow record field names and their declared kinds

use crate::Side;

pub const SRC: &str = "Src";
pub const DST: &str = "Dst";

/// Compound `Kind.Namespace.Name` reference to a workload
pub const K8S_OBJECT: &str = "K8S_Object";
/// Compound `Kind.Namespace.Name` reference to a workload owner
pub const K8S_OWNER_OBJECT: &str = "K8S_OwnerObject";

pub const K8S_TYPE: &str = "K8S_Type";
pub const K8S_NAMESPACE: &str = "K8S_Namespace";
pub const K8S_NAME: &str = "K8S_Name";
pub const K8S_OWNER_TYPE: &str = "K8S_OwnerType";
pub const K8S_OWNER_NAME: &str = "K8S_OwnerName";

pub const FLOW_DIRECTION: &str = "FlowDirection";
pub const APP_LABEL: &str = "app";

/// Field names (without side prefix) holding integers
const NUMERIC_FIELDS: &[&str] = &[
    "Port",
    "Proto",
    "Bytes",
    "Packets",
    "FlowDirection",
    "IfDirection",
    "Dscp",
    "Flags",
    "Etype",
];

/// Field names (without side prefix) holding IP addresses
const IP_FIELDS: &[&str] = &["Addr", "K8S_HostIP"];

/// Declared kind of a flow field, driving how its filter values are rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Numeric,
    Ip,
}

/// Side prefix carried by a key, if any
pub fn prefix_of(key: &str) -> Option<Side> {
    if key.starts_with(SRC) {
        Some(Side::Src)
    } else if key.starts_with(DST) {
        Some(Side::Dst)
    } else {
        None
    }
}

/// Key without its side prefix
pub fn strip_prefix(key: &str) -> &str {
    key.strip_prefix(SRC)
        .or_else(|| key.strip_prefix(DST))
        .unwrap_or(key)
}

/// Prefix a base field name with a side
pub fn with_side(side: Side, base: &str) -> String {
    format!("{}{}", side.prefix(), base)
}

/// Src and Dst variants of a key
pub fn to_src_dst(key: &str) -> (String, String) {
    let base = strip_prefix(key);
    (with_side(Side::Src, base), with_side(Side::Dst, base))
}

/// Whether the key is a compound `Kind.Namespace.Name` reference
pub fn is_resource_path(key: &str) -> bool {
    matches!(strip_prefix(key), K8S_OBJECT | K8S_OWNER_OBJECT)
}

/// Whether the resource path points at an owner (Deployment, DaemonSet...)
pub fn is_owner_path(key: &str) -> bool {
    strip_prefix(key) == K8S_OWNER_OBJECT
}

/// Declared kind of a field, regardless of side prefix
pub fn kind_of(key: &str) -> FieldKind {
    let base = strip_prefix(key);
    if IP_FIELDS.contains(&base) {
        FieldKind::Ip
    } else if NUMERIC_FIELDS.contains(&base) {
        FieldKind::Numeric
    } else {
        FieldKind::Text
    }
}

/// Whether the field holds IP addresses
pub fn is_ip(key: &str) -> bool {
    kind_of(key) == FieldKind::Ip
}

/// Whether the field holds integers
pub fn is_numeric(key: &str) -> bool {
    kind_of(key) == FieldKind::Numeric
}
