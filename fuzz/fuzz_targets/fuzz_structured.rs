#![no_main]

use libfuzzer_sys::fuzz_target;
use arbitrary::Arbitrary;
use json_revisions::{apply, diff, parse_document, to_canonical_string};
use serde_json::{json, Map, Value};

#[derive(Arbitrary, Debug)]
struct FuzzPair {
    old: FuzzValue,
    new: FuzzValue,
}

#[derive(Arbitrary, Debug)]
enum FuzzValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Array(Vec<FuzzValue>),
    Object(Vec<(String, FuzzValue)>),
}

impl FuzzValue {
    fn to_json(&self) -> Value {
        match self {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => Value::Bool(*b),
            FuzzValue::Integer(n) => json!(n),
            FuzzValue::Number(n) => json!(n),
            FuzzValue::String(s) => Value::String(s.clone()),
            FuzzValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            FuzzValue::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            }
        }
    }
}

fuzz_target!(|pair: FuzzPair| {
    let old = pair.old.to_json();
    let new = pair.new.to_json();

    let edits = diff(&old, &new);
    let patched = apply(&old, &edits).expect("diff output must apply to its own input");
    assert_eq!(patched, new);

    assert_eq!(diff(&old, &new), edits);
    assert!(diff(&new, &new).is_empty());

    // The edit list survives its wire form
    let wire = serde_json::to_string(&edits).expect("edits serialize");
    let parsed: Vec<json_revisions::EditOp> = serde_json::from_str(&wire).expect("edits parse");
    assert_eq!(parsed.len(), edits.len());
    for (a, b) in parsed.iter().zip(&edits) {
        assert_eq!(a.kind(), b.kind());
        assert_eq!(a.path(), b.path());
    }

    // Canonical text parses back under the strict parser
    assert!(parse_document(&to_canonical_string(&new)).is_ok());
});
