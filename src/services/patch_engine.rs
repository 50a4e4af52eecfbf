//! Structural patching of metric snapshots.
//!
//! A patch is a JSON object. Four reserved keys edit arrays in place instead of
//! replacing them:
//!
//! - `dimensions_add` / `dimensions_remove` edit the top-level `dimensions`
//!   array as an ordered set.
//! - `filters_add` / `filters_remove` edit `definition.logic.filters`,
//!   comparing entries by structural equality.
//!
//! Every other key is deep-merged: objects merge recursively, anything else
//! (arrays and `null` included) replaces the base value. The reserved keys are
//! processed first, so an explicit `dimensions` in the same patch wins.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::errors::DomainError;

pub const DIMENSIONS_ADD: &str = "dimensions_add";
pub const DIMENSIONS_REMOVE: &str = "dimensions_remove";
pub const FILTERS_ADD: &str = "filters_add";
pub const FILTERS_REMOVE: &str = "filters_remove";

/// Keys with array-editing semantics. They never appear in a patched document.
pub const OP_KEYS: [&str; 4] = [DIMENSIONS_ADD, DIMENSIONS_REMOVE, FILTERS_ADD, FILTERS_REMOVE];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("{0} must be a JSON object")]
    NotAnObject(&'static str),

    #[error("{key} must be an array, found {found}")]
    OpNotArray { key: &'static str, found: &'static str },

    #[error("existing {0} is not an array")]
    TargetNotArray(&'static str),

    #[error("existing {0} is not an object")]
    ContainerNotObject(&'static str),
}

impl From<PatchError> for DomainError {
    fn from(err: PatchError) -> Self {
        DomainError::ValidationFailed(err.to_string())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Value of an op-key as an array. Absent and `null` are both `None`.
fn op_array<'a>(patch: &'a Map<String, Value>, key: &'static str) -> Result<Option<&'a Vec<Value>>, PatchError> {
    match patch.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(PatchError::OpNotArray { key, found: kind(other) }),
    }
}

/// Check that `patch` is a well-formed patch document without applying it.
pub fn validate_patch(patch: &Value) -> Result<(), PatchError> {
    let patch = patch.as_object().ok_or(PatchError::NotAnObject("overlay_patch"))?;
    for key in OP_KEYS {
        op_array(patch, key)?;
    }
    Ok(())
}

/// Apply `patch` to `base`, returning a new document. Neither input is modified.
pub fn apply(base: &Value, patch: &Value) -> Result<Value, PatchError> {
    let base = base.as_object().ok_or(PatchError::NotAnObject("base document"))?;
    let patch = patch.as_object().ok_or(PatchError::NotAnObject("overlay_patch"))?;

    let dimensions_add = op_array(patch, DIMENSIONS_ADD)?;
    let dimensions_remove = op_array(patch, DIMENSIONS_REMOVE)?;
    let filters_add = op_array(patch, FILTERS_ADD)?;
    let filters_remove = op_array(patch, FILTERS_REMOVE)?;

    let mut out = base.clone();

    if dimensions_add.is_some() || dimensions_remove.is_some() {
        let current = existing_array(out.get("dimensions"), "dimensions")?;
        let edited = edit_ordered_set(current, dimensions_remove, dimensions_add);
        out.insert("dimensions".to_string(), Value::Array(edited));
    }

    if filters_add.is_some() || filters_remove.is_some() {
        let definition = object_entry(&mut out, "definition", "definition")?;
        let logic = object_entry(definition, "logic", "definition.logic")?;
        let current = existing_array(logic.get("filters"), "definition.logic.filters")?;
        let edited = edit_ordered_set(current, filters_remove, filters_add);
        logic.insert("filters".to_string(), Value::Array(edited));
    }

    for (key, value) in patch {
        if OP_KEYS.contains(&key.as_str()) {
            continue;
        }
        merge_key(&mut out, key, value);
    }

    Ok(Value::Object(out))
}

fn existing_array(value: Option<&Value>, path: &'static str) -> Result<Vec<Value>, PatchError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(PatchError::TargetNotArray(path)),
    }
}

/// Get `map[key]` as an object, creating it when missing or `null`.
fn object_entry<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
    path: &'static str,
) -> Result<&'a mut Map<String, Value>, PatchError> {
    let slot = map.entry(key.to_string()).or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut().ok_or(PatchError::ContainerNotObject(path))
}

/// Drop every element of `remove`, then append each element of `add` that is
/// not yet present. Relative order of surviving elements is kept.
fn edit_ordered_set(current: Vec<Value>, remove: Option<&Vec<Value>>, add: Option<&Vec<Value>>) -> Vec<Value> {
    let mut items: Vec<Value> = match remove {
        Some(remove) => current.into_iter().filter(|item| !remove.contains(item)).collect(),
        None => current,
    };
    for item in add.into_iter().flatten() {
        if !items.contains(item) {
            items.push(item.clone());
        }
    }
    items
}

fn merge_key(target: &mut Map<String, Value>, key: &str, value: &Value) {
    match (target.get_mut(key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                merge_key(existing, k, v);
            }
        }
        _ => {
            target.insert(key.to_string(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge_preserves_unmentioned_keys_and_replaces_arrays() {
        let base = json!({
            "definition": {"display": "A", "logic": {"type": "sum", "field": "x", "filters": []}},
            "dimensions": ["country", "channel"],
            "meta": {"tags": ["a"]}
        });
        let patch = json!({"definition": {"display": "B"}, "dimensions": ["channel", "campaign"]});

        let out = apply(&base, &patch).unwrap();
        assert_eq!(out["definition"]["display"], "B");
        assert_eq!(out["definition"]["logic"]["field"], "x");
        assert_eq!(out["dimensions"], json!(["channel", "campaign"]));
        assert_eq!(out["meta"], json!({"tags": ["a"]}));
    }

    #[test]
    fn test_dimension_ops_treat_dimensions_as_ordered_set() {
        let base = json!({"dimensions": ["a", "b", "c"]});
        let patch = json!({"dimensions_remove": ["b"], "dimensions_add": ["d", "a"]});

        let out = apply(&base, &patch).unwrap();
        assert_eq!(out, json!({"dimensions": ["a", "c", "d"]}));
    }

    #[test]
    fn test_dimension_add_skips_duplicates_within_itself() {
        let out = apply(&json!({}), &json!({"dimensions_add": ["x", "x", "y"]})).unwrap();
        assert_eq!(out["dimensions"], json!(["x", "y"]));
    }

    #[test]
    fn test_filter_ops_use_structural_equality() {
        let base = json!({"definition": {"logic": {"filters": [{"field": "x", "op": "=", "value": 1}]}}});
        // key order differs from the stored filter
        let patch = json!({
            "filters_remove": [{"value": 1, "op": "=", "field": "x"}],
            "filters_add": [{"field": "y", "op": "=", "value": 2}]
        });

        let out = apply(&base, &patch).unwrap();
        assert_eq!(out["definition"]["logic"]["filters"], json!([{"field": "y", "op": "=", "value": 2}]));
    }

    #[test]
    fn test_filter_equality_distinguishes_integer_and_float() {
        let base = json!({"definition": {"logic": {"filters": [{"field": "x", "value": 1}]}}});
        let out = apply(&base, &json!({"filters_remove": [{"field": "x", "value": 1.0}]})).unwrap();
        assert_eq!(out["definition"]["logic"]["filters"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_filter_ops_create_missing_containers() {
        let out = apply(&json!({"grain": "day"}), &json!({"filters_add": [{"field": "y"}]})).unwrap();
        assert_eq!(out["definition"]["logic"]["filters"], json!([{"field": "y"}]));
        assert_eq!(out["grain"], "day");
    }

    #[test]
    fn test_op_keys_never_reach_output() {
        let out = apply(
            &json!({"dimensions": []}),
            &json!({"dimensions_add": ["a"], "filters_remove": [], "units": "usd"}),
        )
        .unwrap();
        for key in OP_KEYS {
            assert!(out.get(key).is_none(), "{key} leaked into output");
        }
        assert_eq!(out["units"], "usd");
    }

    #[test]
    fn test_null_op_key_is_absent() {
        let base = json!({"dimensions": ["a"]});
        let out = apply(&base, &json!({"dimensions_add": null})).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn test_null_in_patch_replaces_value() {
        let out = apply(&json!({"units": "usd", "grain": "day"}), &json!({"units": null})).unwrap();
        assert_eq!(out, json!({"units": null, "grain": "day"}));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let base = json!({"dimensions": ["a"], "definition": {"display": "x"}});
        let patch = json!({"dimensions_add": ["b"], "definition": {"display": "y"}});
        let base_before = base.clone();
        let patch_before = patch.clone();

        let _ = apply(&base, &patch).unwrap();
        assert_eq!(base, base_before);
        assert_eq!(patch, patch_before);
    }

    #[test]
    fn test_precondition_errors() {
        assert_eq!(apply(&json!([]), &json!({})), Err(PatchError::NotAnObject("base document")));
        assert_eq!(apply(&json!({}), &json!("x")), Err(PatchError::NotAnObject("overlay_patch")));
        assert_eq!(
            apply(&json!({}), &json!({"dimensions_add": "a"})),
            Err(PatchError::OpNotArray { key: DIMENSIONS_ADD, found: "string" })
        );
        assert_eq!(
            apply(&json!({"dimensions": "a"}), &json!({"dimensions_add": ["b"]})),
            Err(PatchError::TargetNotArray("dimensions"))
        );
        assert_eq!(
            apply(&json!({"definition": {"logic": 3}}), &json!({"filters_add": []})),
            Err(PatchError::ContainerNotObject("definition.logic"))
        );
    }

    #[test]
    fn test_validate_patch() {
        assert!(validate_patch(&json!({"dimensions_add": ["a"], "filters_remove": null})).is_ok());
        assert!(validate_patch(&json!({"filters_add": {"field": "x"}})).is_err());
        assert!(validate_patch(&json!(null)).is_err());
    }

    #[test]
    fn test_patch_error_maps_to_validation_failure() {
        let err: DomainError = PatchError::NotAnObject("overlay_patch").into();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }
}
