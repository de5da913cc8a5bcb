//! Payload normalization at the API boundary.
//!
//! The backend serializes people in several shapes depending on which controller
//! produced the response (flat ids, nested `user.academician`, postgraduate
//! records, ...). Everything is folded into a single [`PartyRef`] here so that
//! nothing downstream has to look for alternative keys.

use crate::model::{PartyRef, ViewerRole};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const ID_PATHS: &[&[&str]] = &[
    &["academician_id"],
    &["academician", "academician_id"],
    &["user", "academician", "academician_id"],
    &["postgraduate_id"],
    &["user", "postgraduate", "postgraduate_id"],
    &["id"],
];

const NAME_PATHS: &[&[&str]] = &[
    &["full_name"],
    &["name"],
    &["user", "full_name"],
    &["user", "name"],
];

const EMAIL_PATHS: &[&[&str]] = &[&["email"], &["user", "email"]];

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .filter(|v| !v.is_null())
}

fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first<T>(value: &Value, paths: &[&[&str]], conv: impl Fn(&Value) -> Option<T>) -> Option<T> {
    paths
        .iter()
        .find_map(|path| lookup(value, path).and_then(&conv))
}

/// Fold any known party shape into a [`PartyRef`].
///
/// Returns `None` for `null`, non-objects, and objects that carry neither an id nor a name.
pub fn party(value: &Value) -> Option<PartyRef> {
    if !value.is_object() {
        return None;
    }
    let id = first(value, ID_PATHS, as_id);
    let name = first(value, NAME_PATHS, as_text);
    let email = first(value, EMAIL_PATHS, as_text);
    if id.is_none() && name.is_none() {
        return None;
    }
    Some(PartyRef { id, name, email })
}

pub fn party_opt<'de, D>(deserializer: D) -> Result<Option<PartyRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(party(&value))
}

pub fn party_list<'de, D>(deserializer: D) -> Result<Vec<PartyRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .iter()
        .filter_map(|v| party(v).or_else(|| bare_id(v)))
        .collect())
}

/// A list entry that is only an id, as sent back from a rejection body.
fn bare_id(value: &Value) -> Option<PartyRef> {
    as_id(value).map(|id| PartyRef {
        id: Some(id),
        name: None,
        email: None,
    })
}

/// Side of a relationship, accepting the backend's model names and any casing.
/// Anything else is treated as unknown rather than failing the whole record.
pub fn viewer_role_opt<'de, D>(deserializer: D) -> Result<Option<ViewerRole>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let role = value
        .as_ref()
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .and_then(|s| match s.as_str() {
            "student" | "postgraduate" => Some(ViewerRole::Student),
            "supervisor" | "academician" => Some(ViewerRole::Supervisor),
            _ => None,
        });
    Ok(role)
}

/// Treat an explicit `null` the same as a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_academician() {
        let p = party(&json!({ "academician_id": 4, "full_name": "Dr. Wong", "email": "w@uni.my" }))
            .unwrap();
        assert_eq!(p.id, Some(4));
        assert_eq!(p.name.as_deref(), Some("Dr. Wong"));
        assert_eq!(p.email.as_deref(), Some("w@uni.my"));
    }

    #[test]
    fn nested_academician_prefers_academician_id_over_row_id() {
        let p = party(&json!({
            "id": 900,
            "academician": { "academician_id": 12 },
            "user": { "name": "Prof. Ali", "email": "ali@uni.my" }
        }))
        .unwrap();
        assert_eq!(p.id, Some(12));
        assert_eq!(p.name.as_deref(), Some("Prof. Ali"));
        assert_eq!(p.email.as_deref(), Some("ali@uni.my"));
    }

    #[test]
    fn user_academician_path_and_string_id() {
        let p = party(&json!({
            "user": { "full_name": "Dr. Chen", "academician": { "academician_id": " 31 " } }
        }))
        .unwrap();
        assert_eq!(p.id, Some(31));
        assert_eq!(p.name.as_deref(), Some("Dr. Chen"));
    }

    #[test]
    fn postgraduate_shapes() {
        let direct = party(&json!({ "postgraduate_id": 8, "full_name": "Nur" })).unwrap();
        assert_eq!(direct.id, Some(8));
        let nested = party(&json!({
            "user": { "name": "Raj", "postgraduate": { "postgraduate_id": 9 } }
        }))
        .unwrap();
        assert_eq!(nested.id, Some(9));
    }

    #[test]
    fn party_list_keeps_bare_ids() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "party_list")]
            parties: Vec<PartyRef>,
        }
        let w: Wrapper =
            serde_json::from_value(json!({ "parties": [8, "9", "x", { "full_name": "Dr. Ong" }] }))
                .unwrap();
        let ids: Vec<Option<u64>> = w.parties.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(8), Some(9), None]);
        assert_eq!(w.parties[0].display_name(), "#8");
    }

    #[test]
    fn empty_or_null_values_are_skipped() {
        assert!(party(&Value::Null).is_none());
        assert!(party(&json!("Dr. X")).is_none());
        assert!(party(&json!({ "full_name": "  ", "email": "a@b" })).is_none());
        let p = party(&json!({ "full_name": null, "name": "Fallback" })).unwrap();
        assert_eq!(p.name.as_deref(), Some("Fallback"));
        assert_eq!(p.id, None);
    }
}
