//! Utility helpers shared by the snapshot codecs.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Characters that must be escaped inside a query component: everything the
/// snapshot grammar itself uses as structure (`& = , : . /`), plus the usual
/// URL suspects.
const COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']');

/// Percent-encode a value for use inside a snapshot query string.
#[must_use]
pub fn encode_query_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Decode a percent-encoded query component (lossy on bad UTF-8).
#[must_use]
pub fn decode_query_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Split a query string into `(key, raw_value)` pairs.
///
/// Keys are decoded; values are returned raw because some snapshot forms
/// embed further structure (`,`-joined lists) that must be split before
/// decoding. A leading `?` is tolerated; empty segments are skipped; a
/// segment without `=` yields an empty value.
#[must_use]
pub fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((key, value)) => (decode_query_component(key), value.to_string()),
            None => (decode_query_component(segment), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_structure_characters() {
        let raw = "a&b=c,d:e/f";
        let encoded = encode_query_component(raw);
        assert!(!encoded.contains('&'));
        assert!(!encoded.contains('='));
        assert!(!encoded.contains(','));
        assert_eq!(decode_query_component(&encoded), raw);
    }

    #[test]
    fn splits_pairs_without_decoding_values() {
        let pairs = parse_query_pairs("?filter.cat=A%2CB,C&sort=p:asc");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("filter.cat".to_string(), "A%2CB,C".to_string()));
        assert_eq!(pairs[1], ("sort".to_string(), "p:asc".to_string()));
    }
}
