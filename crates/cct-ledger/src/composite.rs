//! Composite keys in the Fabric layout.
//!
//! A composite key is `\0<object type>\0<attr 1>\0<attr 2>\0...`. The leading
//! NUL keeps composite keys out of plain range scans, and a partial key
//! (object type plus a prefix of the attributes) addresses a contiguous
//! range in key order.

use crate::error::{LedgerError, LedgerResult};

const NAMESPACE: char = '\u{0}';
const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Build a composite key from an object type and its attributes.
pub fn create_composite_key(object_type: &str, attributes: &[&str]) -> LedgerResult<String> {
    validate_component(object_type)?;
    let mut key = String::with_capacity(
        2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>(),
    );
    key.push(NAMESPACE);
    key.push_str(object_type);
    key.push(NAMESPACE);
    for attribute in attributes {
        validate_component(attribute)?;
        key.push_str(attribute);
        key.push(NAMESPACE);
    }
    Ok(key)
}

/// Split a composite key back into its object type and attributes.
pub fn split_composite_key(key: &str) -> LedgerResult<(String, Vec<String>)> {
    let body = key
        .strip_prefix(NAMESPACE)
        .and_then(|rest| rest.strip_suffix(NAMESPACE))
        .ok_or_else(|| LedgerError::InvalidCompositeKey(format!("{key:?}")))?;
    let mut parts = body.split(NAMESPACE).map(str::to_string);
    let object_type = parts
        .next()
        .ok_or_else(|| LedgerError::InvalidCompositeKey(format!("{key:?}")))?;
    Ok((object_type, parts.collect()))
}

/// Returns `true` if `key` lives in the composite key namespace.
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(NAMESPACE)
}

/// `[start, end)` bounds covering every key under a partial composite key.
pub(crate) fn partial_key_range(
    object_type: &str,
    attributes: &[&str],
) -> LedgerResult<(String, String)> {
    let start = create_composite_key(object_type, attributes)?;
    let mut end = start.clone();
    end.push(MAX_UNICODE_RUNE);
    Ok((start, end))
}

fn validate_component(component: &str) -> LedgerResult<()> {
    if component.contains(NAMESPACE) || component.contains(MAX_UNICODE_RUNE) {
        return Err(LedgerError::InvalidCompositeKey(format!(
            "component {component:?} contains a reserved character"
        )));
    }
    Ok(())
}
