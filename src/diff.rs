// json-revisions keeps an append-only revision history for JSON documents
// Copyright (C) 2025  Peoples Grocers LLC
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// To purchase a license under different terms contact admin@peoplesgrocers.com
// To request changes, report bugs, or give user feedback contact
// marxism@peoplesgrocers.com
//

use serde_json::{Map, Value};

use crate::ops::EditOp;
use crate::pointer::Path;

/// Compute the edits that turn `old` into `new`.
///
/// The output is deterministic. For objects, removals come first in `old`'s key
/// order, then nested changes in `old`'s key order, then additions in `new`'s
/// key order. Arrays are compared position by position: common indices are
/// diffed recursively, surplus old elements are removed from the highest index
/// down, and surplus new elements are added in ascending order. Reordered array
/// elements therefore show up as replacements, never as moves.
///
/// Identical inputs produce an empty list.
pub fn diff(old: &Value, new: &Value) -> Vec<EditOp> {
    let mut result = Vec::new();
    let mut path = Path::root();
    diff_recursive(old, new, &mut path, &mut result);
    result
}

fn diff_recursive(old: &Value, new: &Value, path: &mut Path, result: &mut Vec<EditOp>) {
    match (old, new) {
        (Value::Object(old_obj), Value::Object(new_obj)) => {
            diff_objects(old_obj, new_obj, path, result);
        }
        (Value::Array(old_arr), Value::Array(new_arr)) => {
            diff_arrays(old_arr, new_arr, path, result);
        }
        _ => {
            if !same_value(old, new) {
                result.push(EditOp::replace(path.clone(), new.clone()));
            }
        }
    }
}

fn diff_objects(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    path: &mut Path,
    result: &mut Vec<EditOp>,
) {
    for key in old.keys() {
        if !new.contains_key(key) {
            result.push(EditOp::remove(path.child(key.as_str())));
        }
    }

    for (key, old_value) in old {
        if let Some(new_value) = new.get(key) {
            if !same_value(old_value, new_value) {
                path.push(key.as_str());
                diff_recursive(old_value, new_value, path, result);
                path.pop();
            }
        }
    }

    for (key, new_value) in new {
        if !old.contains_key(key) {
            result.push(EditOp::add(path.child(key.as_str()), new_value.clone()));
        }
    }
}

fn diff_arrays(old: &[Value], new: &[Value], path: &mut Path, result: &mut Vec<EditOp>) {
    let common = old.len().min(new.len());

    for index in 0..common {
        if !same_value(&old[index], &new[index]) {
            path.push(index);
            diff_recursive(&old[index], &new[index], path, result);
            path.pop();
        }
    }

    // Highest index first so each removal leaves the remaining paths valid.
    for index in (common..old.len()).rev() {
        result.push(EditOp::remove(path.child(index)));
    }

    for (index, value) in new.iter().enumerate().skip(common) {
        result.push(EditOp::add(path.child(index), value.clone()));
    }
}

/// `Value` equality, except that floats compare by bit pattern so a change
/// between `0.0` and `-0.0` is still an edit.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_f64() && y.is_f64() => {
            x.as_f64().map(f64::to_bits) == y.as_f64().map(f64::to_bits)
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).map_or(false, |y| same_value(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ordered_eq;
    use crate::patch::apply;
    use crate::pointer::PathSegment;
    use proptest::prelude::*;
    use serde_json::json;

    fn p(segments: &[&str]) -> Path {
        segments
            .iter()
            .map(|s| match s.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(s.to_string()),
            })
            .collect()
    }

    #[test]
    fn test_negative_zero_is_a_change() {
        let result = diff(&json!({"x": 0.0, "y": [0.0]}), &json!({"x": -0.0, "y": [-0.0]}));
        assert_eq!(
            result,
            vec![
                EditOp::replace(p(&["x"]), json!(-0.0)),
                EditOp::replace(p(&["y", "0"]), json!(-0.0)),
            ]
        );
        assert!(diff(&json!(-0.0), &json!(-0.0)).is_empty());
        assert!(diff(&json!(1.5), &json!(1.5)).is_empty());
    }

    #[test]
    fn test_identical_is_empty() {
        let doc = json!({"a": [1, {"b": null}], "c": "x"});
        assert!(diff(&doc, &doc).is_empty());
        assert!(diff(&json!(null), &json!(null)).is_empty());
    }

    #[test]
    fn test_object_replace_then_add() {
        let result = diff(&json!({"a": 1}), &json!({"a": 2, "b": true}));
        assert_eq!(
            result,
            vec![
                EditOp::replace(p(&["a"]), json!(2)),
                EditOp::add(p(&["b"]), json!(true)),
            ]
        );
    }

    #[test]
    fn test_object_ordering_policy() {
        let old = json!({"keep": {"x": 1}, "gone1": 1, "same": 0, "gone2": 2});
        let new = json!({"new2": 2, "same": 0, "keep": {"x": 2}, "new1": 1});
        let result = diff(&old, &new);
        assert_eq!(
            result,
            vec![
                EditOp::remove(p(&["gone1"])),
                EditOp::remove(p(&["gone2"])),
                EditOp::replace(p(&["keep", "x"]), json!(2)),
                EditOp::add(p(&["new2"]), json!(2)),
                EditOp::add(p(&["new1"]), json!(1)),
            ]
        );
    }

    #[test]
    fn test_nested_object() {
        let old = json!({"user": {"name": "Alice", "age": 30}});
        let new = json!({"user": {"name": "Alice", "age": 31}});
        assert_eq!(
            diff(&old, &new),
            vec![EditOp::replace(p(&["user", "age"]), json!(31))]
        );
    }

    #[test]
    fn test_array_truncate() {
        let result = diff(&json!({"list": [1, 2, 3]}), &json!({"list": [1, 2]}));
        assert_eq!(result, vec![EditOp::remove(p(&["list", "2"]))]);
    }

    #[test]
    fn test_array_removes_highest_first() {
        let result = diff(&json!([1, 2, 3, 4]), &json!([1]));
        assert_eq!(
            result,
            vec![
                EditOp::remove(p(&["3"])),
                EditOp::remove(p(&["2"])),
                EditOp::remove(p(&["1"])),
            ]
        );
    }

    #[test]
    fn test_array_appends_ascending() {
        let result = diff(&json!(["a"]), &json!(["a", "b", "c"]));
        assert_eq!(
            result,
            vec![
                EditOp::add(p(&["1"]), json!("b")),
                EditOp::add(p(&["2"]), json!("c")),
            ]
        );
    }

    #[test]
    fn test_array_is_positional() {
        // A rotation is three replacements, not a move.
        let result = diff(&json!(["a", "b", "c"]), &json!(["c", "a", "b"]));
        assert_eq!(
            result,
            vec![
                EditOp::replace(p(&["0"]), json!("c")),
                EditOp::replace(p(&["1"]), json!("a")),
                EditOp::replace(p(&["2"]), json!("b")),
            ]
        );
    }

    #[test]
    fn test_array_recurses_into_elements() {
        let old = json!([{"id": 1, "tags": ["x"]}]);
        let new = json!([{"id": 1, "tags": ["x", "y"]}]);
        assert_eq!(
            diff(&old, &new),
            vec![EditOp::add(p(&["0", "tags", "1"]), json!("y"))]
        );
    }

    #[test]
    fn test_type_mismatch_replaces_subtree() {
        let result = diff(&json!({"a": {"b": 1}}), &json!({"a": [1]}));
        assert_eq!(result, vec![EditOp::replace(p(&["a"]), json!([1]))]);

        let result = diff(&json!([1]), &json!({"0": 1}));
        assert_eq!(result, vec![EditOp::replace(Path::root(), json!({"0": 1}))]);

        let result = diff(&json!(1), &json!(1.0));
        assert_eq!(result, vec![EditOp::replace(Path::root(), json!(1.0))]);
    }

    #[test]
    fn test_key_reorder_only_is_empty() {
        let old = crate::document::parse_document(r#"{"a": 1, "b": 2}"#).unwrap();
        let new = crate::document::parse_document(r#"{"b": 2, "a": 1}"#).unwrap();
        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn test_escape_sequences_in_keys() {
        let result = diff(&json!({}), &json!({"foo/bar": "value", "foo~bar": "value2"}));
        let rendered: Vec<String> = result.iter().map(|op| op.path().to_string()).collect();
        assert_eq!(rendered, vec!["/foo~1bar", "/foo~0bar"]);
    }

    #[test]
    fn test_added_keys_keep_new_order_after_patch() {
        let old = json!({"a": 1});
        let new = crate::document::parse_document(r#"{"a": 1, "z": 1, "m": 2}"#).unwrap();
        let patched = apply(&old, &diff(&old, &new)).unwrap();
        assert!(ordered_eq(&patched, &new));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            (-4000i32..4000).prop_map(|n| json!(f64::from(n) / 4.0)),
            "[a-z]{0,4}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::vec(("[a-e]{1,2}", inner), 0..6)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn self_diff_is_empty_and_identity(a in arb_json()) {
            let edits = diff(&a, &a);
            prop_assert!(edits.is_empty());
            prop_assert_eq!(apply(&a, &edits).unwrap(), a);
        }

        #[test]
        fn patch_reconstructs_target(a in arb_json(), b in arb_json()) {
            let edits = diff(&a, &b);
            let patched = apply(&a, &edits).unwrap();
            prop_assert_eq!(&patched, &b);
        }

        #[test]
        fn diff_is_deterministic(a in arb_json(), b in arb_json()) {
            prop_assert_eq!(diff(&a, &b), diff(&a, &b));
        }

        #[test]
        fn wire_form_survives_serialization(a in arb_json(), b in arb_json()) {
            let edits = diff(&a, &b);
            let text = serde_json::to_string(&edits).unwrap();
            let parsed: Vec<EditOp> = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(apply(&a, &parsed).unwrap(), b);
        }
    }
}
