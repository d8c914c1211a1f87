//! Batch decoding for the publish endpoint.
//!
//! A publish request carries a single string holding several brace-delimited
//! fragments, e.g. `[{"a":1},{"b":2}]` or `{a},{b},{c}`. The outer pair of
//! characters is stripped, the remainder is split on `},{`, and the braces eaten
//! by the split are put back on each fragment.

use thiserror::Error;

/// Separator between two fragments once the outer characters are stripped.
pub const FRAGMENT_SEPARATOR: &str = "},{";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("batch body must be at least 2 characters, got {0}")]
    InputTooShort(usize),
}

/// Splits a batch string into individual `{...}` fragments, in input order.
///
/// Fragments that are already wrapped in braces are kept as they are. Older
/// gateways silently dropped such fragments (they only emitted the three repair
/// cases); that behavior is not reproduced here.
pub fn decode_batch(source: &str) -> Result<Vec<String>, BatchError> {
    let inner = strip_outer(source)?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    Ok(inner.split(FRAGMENT_SEPARATOR).map(repair_fragment).collect())
}

/// Drops exactly the first and last character.
fn strip_outer(source: &str) -> Result<&str, BatchError> {
    let mut chars = source.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return Err(BatchError::InputTooShort(source.chars().count()));
    };

    Ok(&source[first.len_utf8()..source.len() - last.len_utf8()])
}

fn repair_fragment(fragment: &str) -> String {
    match (fragment.starts_with('{'), fragment.ends_with('}')) {
        (true, true) => fragment.to_string(),
        (false, true) => format!("{{{fragment}"),
        (true, false) => format!("{fragment}}}"),
        (false, false) => format!("{{{fragment}}}"),
    }
}
