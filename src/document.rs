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

//! The document model.
//!
//! Documents are plain `serde_json::Value` trees built with the `preserve_order`
//! feature, so object keys keep their insertion order through parsing,
//! patching and serialization. `Value`'s own `PartialEq` compares objects by key
//! set and values, which is the equality the diff engine wants. Use
//! [`ordered_eq`] when the key order matters too.
//!
//! serde_json silently keeps the last of several duplicate keys. A revision
//! history built on that would record a document nobody wrote, so
//! [`parse_document`] drives serde with its own visitor and refuses duplicates.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};
use std::fmt;

use crate::diagnostics::{Diagnostic, DiagnosticCode};

pub fn parse_document(text: &str) -> Result<Value, Diagnostic> {
    serde_json::from_str::<StrictValue>(text)
        .map(|strict| strict.0)
        .map_err(malformed)
}

pub fn parse_document_bytes(bytes: &[u8]) -> Result<Value, Diagnostic> {
    serde_json::from_slice::<StrictValue>(bytes)
        .map(|strict| strict.0)
        .map_err(malformed)
}

fn malformed(e: serde_json::Error) -> Diagnostic {
    Diagnostic::fatal(
        DiagnosticCode::MalformedDocument,
        format!("I couldn't read this as a JSON document: {}", e),
    )
    .with_snippet(format!("line {}, column {}", e.line(), e.column()))
    .with_advice(
        "A document must be exactly one JSON value, and every object must use \
         each key at most once."
            .to_string(),
    )
}

/// Compact serialization in key insertion order.
pub fn to_canonical_string(value: &Value) -> String {
    value.to_string()
}

pub fn to_pretty_string(value: &Value) -> String {
    format!("{:#}", value)
}

/// Structural equality that also requires object keys to appear in the same order.
pub fn ordered_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && ordered_eq(va, vb))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| ordered_eq(x, y))
        }
        _ => a == b,
    }
}

pub trait ValueTypeExt {
    fn type_name(&self) -> &'static str;
}

impl ValueTypeExt for Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

struct StrictValue(Value);

impl<'de> Deserialize<'de> for StrictValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StrictValueVisitor)
    }
}

struct StrictValueVisitor;

impl<'de> Visitor<'de> for StrictValueVisitor {
    type Value = StrictValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E>(self, b: bool) -> Result<Self::Value, E> {
        Ok(StrictValue(Value::Bool(b)))
    }

    fn visit_i64<E>(self, n: i64) -> Result<Self::Value, E> {
        Ok(StrictValue(Value::Number(n.into())))
    }

    fn visit_u64<E>(self, n: u64) -> Result<Self::Value, E> {
        Ok(StrictValue(Value::Number(n.into())))
    }

    fn visit_f64<E>(self, n: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Number::from_f64(n)
            .map(|n| StrictValue(Value::Number(n)))
            .ok_or_else(|| E::custom(format!("{} is not a finite number", n)))
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E> {
        Ok(StrictValue(Value::String(s.to_owned())))
    }

    fn visit_string<E>(self, s: String) -> Result<Self::Value, E> {
        Ok(StrictValue(Value::String(s)))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(StrictValue(Value::Null))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(StrictValue(Value::Null))
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        StrictValue::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(StrictValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(StrictValue(Value::Array(items)))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            if map.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key '{}'", key)));
            }
            let StrictValue(value) = access.next_value()?;
            map.insert(key, value);
        }
        Ok(StrictValue(Value::Object(map)))
    }
}
