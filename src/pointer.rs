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

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::document::ValueTypeExt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key.replace('~', "~0").replace('/', "~1")),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl Serialize for PathSegment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PathSegment::Key(key) => serializer.serialize_str(key),
            PathSegment::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

struct PathSegmentVisitor;

impl<'de> Visitor<'de> for PathSegmentVisitor {
    type Value = PathSegment;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object key (string) or an array index (non-negative integer)")
    }

    fn visit_str<E>(self, key: &str) -> Result<Self::Value, E> {
        Ok(PathSegment::Key(key.to_string()))
    }

    fn visit_string<E>(self, key: String) -> Result<Self::Value, E> {
        Ok(PathSegment::Key(key))
    }

    fn visit_u64<E>(self, index: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        usize::try_from(index)
            .map(PathSegment::Index)
            .map_err(|_| E::custom(format!("array index {} is too large", index)))
    }

    fn visit_i64<E>(self, index: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        usize::try_from(index)
            .map(PathSegment::Index)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(index), &self))
    }
}

impl<'de> Deserialize<'de> for PathSegment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PathSegmentVisitor)
    }
}

/// Address of a node inside a document. The empty path is the root.
///
/// Segments are typed: a key only ever matches an object member and an index
/// only ever matches an array element, so a path means the same thing no matter
/// what the keys look like. `Display` renders the RFC 6901 form (`/a/0/b~1c`)
/// for humans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Parse an RFC 6901 pointer, using `document` to decide which tokens are
    /// array indices.
    pub fn from_pointer(pointer: &str, document: &Value) -> Result<Self, Diagnostic> {
        if pointer.is_empty() {
            return Ok(Self::root());
        }

        if !pointer.starts_with('/') {
            return Err(Diagnostic::fatal(
                DiagnosticCode::InvalidPointerSyntax,
                format!(
                    "I couldn't parse the path '{}': Path must start with '/'",
                    pointer
                ),
            )
            .with_advice(
                "JSON Pointer paths must start with '/' and use '/' to separate segments.\n\
                 Special characters: use ~0 for ~ and ~1 for /"
                    .to_string(),
            ));
        }

        let mut segments = Vec::new();
        let mut current = document;

        for raw in pointer[1..].split('/') {
            let token = unescape(raw, pointer)?;
            match current {
                Value::Array(arr) => {
                    let index = parse_index(&token)?;
                    current = arr.get(index).ok_or_else(|| index_not_found(index, arr.len()))?;
                    segments.push(PathSegment::Index(index));
                }
                Value::Object(obj) => {
                    current = obj.get(&token).ok_or_else(|| key_not_found(&token))?;
                    segments.push(PathSegment::Key(token));
                }
                _ => return Err(cannot_descend(current, &PathSegment::Key(token))),
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.segments.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut child = self.clone();
        child.push(segment);
        child
    }

    /// Split into the parent path and the final segment. `None` for the root.
    pub fn split_last(&self) -> Option<(&[PathSegment], &PathSegment)> {
        self.segments
            .split_last()
            .map(|(last, parent)| (parent, last))
    }

    pub fn parent(&self) -> Option<Path> {
        self.split_last().map(|(parent, _)| Path::new(parent.to_vec()))
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn get<'a>(&self, value: &'a Value) -> Result<&'a Value, Diagnostic> {
        resolve(&self.segments, value)
    }

    pub fn get_mut<'a>(&self, value: &'a mut Value) -> Result<&'a mut Value, Diagnostic> {
        resolve_mut(&self.segments, value)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

pub(crate) fn resolve<'a>(segments: &[PathSegment], value: &'a Value) -> Result<&'a Value, Diagnostic> {
    let mut current = value;

    for segment in segments {
        current = match (current, segment) {
            (Value::Object(obj), PathSegment::Key(key)) => {
                obj.get(key).ok_or_else(|| key_not_found(key))?
            }
            (Value::Array(arr), PathSegment::Index(index)) => arr
                .get(*index)
                .ok_or_else(|| index_not_found(*index, arr.len()))?,
            _ => return Err(cannot_descend(current, segment)),
        };
    }

    Ok(current)
}

pub(crate) fn resolve_mut<'a>(
    segments: &[PathSegment],
    value: &'a mut Value,
) -> Result<&'a mut Value, Diagnostic> {
    let mut current = value;

    for segment in segments {
        current = match (current, segment) {
            (Value::Object(obj), PathSegment::Key(key)) => {
                obj.get_mut(key).ok_or_else(|| key_not_found(key))?
            }
            (Value::Array(arr), PathSegment::Index(index)) => {
                let array_len = arr.len();
                arr.get_mut(*index)
                    .ok_or_else(|| index_not_found(*index, array_len))?
            }
            (other, _) => return Err(cannot_descend(other, segment)),
        };
    }

    Ok(current)
}

pub(crate) fn key_not_found(key: &str) -> Diagnostic {
    Diagnostic::fatal(
        DiagnosticCode::PathNotFound,
        format!("I couldn't find the key '{}'", key),
    )
}

pub(crate) fn index_not_found(index: usize, len: usize) -> Diagnostic {
    Diagnostic::fatal(
        DiagnosticCode::PathNotFound,
        format!("I couldn't find index {} (array length is {})", index, len),
    )
}

pub(crate) fn cannot_descend(value: &Value, segment: &PathSegment) -> Diagnostic {
    let what = match segment {
        PathSegment::Key(key) => format!("key '{}'", key),
        PathSegment::Index(index) => format!("index {}", index),
    };
    Diagnostic::fatal(
        DiagnosticCode::PathNotFound,
        format!("I can't look up {} inside {}", what, value.type_name()),
    )
}

fn unescape(token: &str, pointer: &str) -> Result<String, Diagnostic> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => {
                return Err(Diagnostic::fatal(
                    DiagnosticCode::InvalidPointerSyntax,
                    format!(
                        "I couldn't parse the path '{}': '~' must be followed by 0 or 1",
                        pointer
                    ),
                ))
            }
        }
    }
    Ok(out)
}

fn parse_index(token: &str) -> Result<usize, Diagnostic> {
    let leading_zero = token.len() > 1 && token.starts_with('0');
    match token.parse::<usize>() {
        Ok(index) if !leading_zero && !token.starts_with('+') => Ok(index),
        _ => Err(Diagnostic::fatal(
            DiagnosticCode::InvalidArrayIndex,
            format!("I couldn't parse '{}' as an array index", token),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_path() {
        let value = json!({"foo": "bar"});
        assert_eq!(Path::root().get(&value).unwrap(), &value);
        assert_eq!(Path::root().to_string(), "");
    }

    #[test]
    fn test_nested_access() {
        let value = json!({"items": [{"name": "first"}, {"name": "second"}]});
        let path: Path = vec![
            PathSegment::from("items"),
            PathSegment::from(1),
            PathSegment::from("name"),
        ]
        .into_iter()
        .collect();
        assert_eq!(path.get(&value).unwrap(), &json!("second"));
        assert_eq!(path.to_string(), "/items/1/name");
    }

    #[test]
    fn test_missing_key_and_index() {
        let value = json!({"items": ["a"]});

        let err = Path::new(vec!["nope".into()]).get(&value).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::PathNotFound);

        let err = Path::new(vec!["items".into(), 3.into()]).get(&value).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::PathNotFound);
        assert!(err.description.contains("array length is 1"));
    }

    #[test]
    fn test_segment_kind_must_match_container() {
        let value = json!({"items": ["a"], "0": "zero"});

        let err = Path::new(vec!["items".into(), "0".into()]).get(&value).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::PathNotFound);

        let err = Path::new(vec![0.into()]).get(&value).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::PathNotFound);

        assert_eq!(
            Path::new(vec!["0".into()]).get(&value).unwrap(),
            &json!("zero")
        );
    }

    #[test]
    fn test_get_mut() {
        let mut value = json!({"a": {"b": [1, 2]}});
        let path = Path::new(vec!["a".into(), "b".into(), 1.into()]);
        *path.get_mut(&mut value).unwrap() = json!(20);
        assert_eq!(value, json!({"a": {"b": [1, 20]}}));
    }

    #[test]
    fn test_parent_and_last() {
        let path = Path::new(vec!["a".into(), 3.into()]);
        assert_eq!(path.parent(), Some(Path::new(vec!["a".into()])));
        assert_eq!(path.last(), Some(&PathSegment::Index(3)));
        assert_eq!(Path::root().parent(), None);
        assert_eq!(Path::root().last(), None);
    }

    #[test]
    fn test_display_escapes_keys() {
        let path = Path::new(vec!["foo/bar".into(), "foo~bar".into()]);
        assert_eq!(path.to_string(), "/foo~1bar/foo~0bar");
    }

    #[test]
    fn test_from_pointer_types_segments_by_document() {
        let doc = json!({"list": [{"x~y": 1}], "7": {"a/b": true}});

        let path = Path::from_pointer("/list/0/x~0y", &doc).unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("list".to_string()),
                PathSegment::Index(0),
                PathSegment::Key("x~y".to_string()),
            ]
        );

        let path = Path::from_pointer("/7/a~1b", &doc).unwrap();
        assert_eq!(path.get(&doc).unwrap(), &json!(true));
    }

    #[test]
    fn test_from_pointer_errors() {
        let doc = json!({"list": [1, 2]});

        let err = Path::from_pointer("list", &doc).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::InvalidPointerSyntax);

        let err = Path::from_pointer("/list/01", &doc).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::InvalidArrayIndex);

        let err = Path::from_pointer("/list/-", &doc).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::InvalidArrayIndex);

        let err = Path::from_pointer("/bad~2", &doc).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::InvalidPointerSyntax);

        let err = Path::from_pointer("/list/5", &doc).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::PathNotFound);
    }

    #[test]
    fn test_serialized_form_mixes_strings_and_integers() {
        let path = Path::new(vec!["list".into(), 2.into()]);
        let serialized = serde_json::to_value(&path).unwrap();
        assert_eq!(serialized, json!(["list", 2]));

        let parsed: Path = serde_json::from_value(json!(["a", 0, "1"])).unwrap();
        assert_eq!(
            parsed.segments(),
            &[
                PathSegment::Key("a".to_string()),
                PathSegment::Index(0),
                PathSegment::Key("1".to_string()),
            ]
        );

        assert!(serde_json::from_value::<Path>(json!([-1])).is_err());
        assert!(serde_json::from_value::<Path>(json!([true])).is_err());
    }
}
