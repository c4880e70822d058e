//! Shared entity contract, id generation and shallow patching.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Fields a patch may never overwrite.
pub const IMMUTABLE_FIELDS: &[&str] = &["id", "createdAt"];

/// Entity stored in a list-valued domain.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    fn id(&self) -> &str;
}

/// Generates an opaque entity id: base36 epoch millis plus a random suffix.
///
/// Ids from the same millisecond differ by the random suffix, so collision
/// probability is negligible without any coordination.
pub fn new_entity_id(now_ms: i64) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}", to_base36(now_ms.max(0) as u64), &random[..10])
}

/// Shallow-merges `patch` into `entity` through its JSON form.
///
/// Top-level keys in `patch` replace the entity's values wholesale;
/// immutable fields are ignored.
///
/// # Errors
/// Returns the deserialization error when the patched shape no longer fits
/// the entity type; `entity` is untouched in that case.
pub fn apply_patch<E: Entity>(entity: &E, patch: &Map<String, Value>) -> serde_json::Result<E> {
    let mut value = serde_json::to_value(entity)?;
    if let Value::Object(fields) = &mut value {
        for (key, next) in patch {
            if IMMUTABLE_FIELDS.contains(&key.as_str()) {
                continue;
            }
            fields.insert(key.clone(), next.clone());
        }
    }
    serde_json::from_value(value)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::{new_entity_id, to_base36};
    use std::collections::HashSet;

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn ids_from_same_millisecond_are_distinct() {
        let ids: HashSet<String> = (0..500).map(|_| new_entity_id(1_700_000_000_000)).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.starts_with("loyw3v28-")));
    }
}
