//! REST paths of the service API.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped in a path segment (RFC 3986 unreserved).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const MULTI_QUERY_PATH: &str = "/1/indexes/*/queries";

pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

pub fn query_path(index: &str) -> String {
    format!("/1/indexes/{}/query", encode_segment(index))
}

pub fn task_path(index: &str, task_id: u64) -> String {
    format!("/1/indexes/{}/task/{}", encode_segment(index), task_id)
}

pub fn operation_path(index: &str) -> String {
    format!("/1/indexes/{}/operation", encode_segment(index))
}
