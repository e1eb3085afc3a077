use percent_encoding::percent_decode_str;

use flowscope_types::Filter;

/// Separates alternative filter groups
const GROUP_SEPARATOR: char = '|';

/// Decode the raw `filters` parameter into groups of filters
///
/// The input is percent-decoded once, split into groups on `|`, then into
/// `key=value` pairs on `&` or `;`. Pairs without exactly one `=` are dropped,
/// and so are groups left empty.
pub fn decode_filters(raw: &str) -> Vec<Vec<Filter>> {
    if raw.is_empty() {
        return Vec::new();
    }
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    decoded
        .split(GROUP_SEPARATOR)
        .map(|group| {
            group
                .split(['&', ';'])
                .filter_map(|pair| {
                    let mut parts = pair.split('=');
                    match (parts.next(), parts.next(), parts.next()) {
                        (Some(key), Some(value), None) => Some(Filter::new(key, value)),
                        _ => None,
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}
