//! Composite byte keys
//!
//! Two key families share one sorted keyspace:
//!
//! ```text
//! content key: "c" SEP root SEP id
//! index key:   "i" SEP root SEP name SEP value [SEP id]
//! ```
//!
//! `root` is the lower-cased entity type name, `name` the lower-cased index
//! name and `value` the output of [`Value::encode`](crate::Value::encode).
//! Omitting the trailing id gives the scan boundaries used by range queries.
//!
//! String values are not escaped, so a string containing [`SEPARATOR`] makes
//! its index key ambiguous. Ids are always the last [`ID_LEN`] bytes, which
//! is what [`extract_id`] and [`strip_id`] rely on.

use std::cmp::Ordering;

use crate::id::{Id, ID_LEN};

/// Leading segment of content keys
pub const CONTENT_PREFIX: &[u8] = b"c";

/// Leading segment of index keys
pub const INDEX_PREFIX: &[u8] = b"i";

/// Segment separator (`~±^` in UTF-8)
pub const SEPARATOR: &[u8] = "~±^".as_bytes();

fn join(segments: &[&[u8]]) -> Vec<u8> {
    let len = segments.iter().map(|s| s.len()).sum::<usize>()
        + SEPARATOR.len() * segments.len().saturating_sub(1);
    let mut key = Vec::with_capacity(len);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            key.extend_from_slice(SEPARATOR);
        }
        key.extend_from_slice(segment);
    }
    key
}

/// Content key for one entity, or the prefix shared by all entities of
/// `root` when `id` is `None` or nil
///
/// The prefix ends in a separator so that it never matches a longer root.
pub fn content_key(root: &str, id: Option<&Id>) -> Vec<u8> {
    let id = id.filter(|id| !id.is_nil());
    join(&[
        CONTENT_PREFIX,
        root.as_bytes(),
        id.map(|id| &id.as_bytes()[..]).unwrap_or_default(),
    ])
}

/// Index key written for entity `id` having `value` in index `name`
pub fn index_key(root: &str, name: &str, value: &[u8], id: &Id) -> Vec<u8> {
    let name = name.to_lowercase();
    join(&[
        INDEX_PREFIX,
        root.as_bytes(),
        name.as_bytes(),
        value,
        id.as_bytes(),
    ])
}

/// Index key without an id, used as a range scan boundary
///
/// With `value` set to `None` the result ends in a separator and is the
/// prefix of every key in the index.
pub fn index_range_key(root: &str, name: &str, value: Option<&[u8]>) -> Vec<u8> {
    let name = name.to_lowercase();
    join(&[
        INDEX_PREFIX,
        root.as_bytes(),
        name.as_bytes(),
        value.unwrap_or_default(),
    ])
}

/// Id stored in the last [`ID_LEN`] bytes of a key
pub fn extract_id(key: &[u8]) -> Option<Id> {
    let start = key.len().checked_sub(ID_LEN)?;
    Id::from_slice(&key[start..])
}

/// Key with its trailing separator and id removed
///
/// Keys too short to carry an id are returned unchanged.
pub fn strip_id(key: &[u8]) -> &[u8] {
    match key.len().checked_sub(ID_LEN + SEPARATOR.len()) {
        Some(end) if key[end..].starts_with(SEPARATOR) => &key[..end],
        _ => key,
    }
}

/// Encoded value segment of an index key
///
/// `root` and `name` must be the ones the key was built with.
pub fn index_value_segment<'k>(key: &'k [u8], root: &str, name: &str) -> Option<&'k [u8]> {
    let prefix = index_range_key(root, name, None);
    let rest = key.strip_prefix(prefix.as_slice())?;
    let end = rest.len().checked_sub(ID_LEN + SEPARATOR.len())?;
    rest[end..].starts_with(SEPARATOR).then(|| &rest[..end])
}

/// Whether `candidate` is still on the valid side of `boundary`
///
/// Forward scans keep keys up to and including the boundary, reverse scans
/// keep keys down to and including it. With `strip` set the candidate's id
/// is removed first, so a bare-value boundary admits every id for that value.
pub fn is_within(boundary: &[u8], candidate: &[u8], reverse: bool, strip: bool) -> bool {
    let candidate = if strip { strip_id(candidate) } else { candidate };
    let ordering = candidate.cmp(boundary);
    if reverse {
        ordering != Ordering::Less
    } else {
        ordering != Ordering::Greater
    }
}
