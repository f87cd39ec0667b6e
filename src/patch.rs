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

//! Applying edit sequences.
//!
//! `add` never overwrites: adding an object key that already exists is a
//! `ConflictingAdd`, which matches the diff engine, since it only emits `add`
//! for keys the old document lacks. Array adds may target any index in
//! `0..=len` and shift later elements right.

use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::ops::EditOp;
use crate::pointer::{cannot_descend, index_not_found, key_not_found, resolve_mut, Path, PathSegment};

/// Apply `ops` in order to a copy of `document`. The input is left untouched,
/// and nothing is returned unless every operation succeeds.
pub fn apply(document: &Value, ops: &[EditOp]) -> Result<Value, Diagnostic> {
    let mut state = document.clone();
    apply_in_place(&mut state, ops)?;
    Ok(state)
}

/// Apply `ops` to `state` directly.
///
/// On error `state` holds the result of every operation before the failing one.
pub fn apply_in_place(state: &mut Value, ops: &[EditOp]) -> Result<(), Diagnostic> {
    for (index, op) in ops.iter().enumerate() {
        apply_op(state, op).map_err(|diag| {
            diag.with_snippet(format!("operation {} of {}: {}", index + 1, ops.len(), op))
        })?;
    }
    Ok(())
}

pub fn apply_op(state: &mut Value, op: &EditOp) -> Result<(), Diagnostic> {
    match op {
        EditOp::Add { path, value } => apply_add(state, path, value.clone()),
        EditOp::Remove { path } => apply_remove(state, path).map(|_| ()),
        EditOp::Replace { path, value } => apply_replace(state, path, value.clone()),
    }
}

pub fn apply_add(state: &mut Value, path: &Path, value: Value) -> Result<(), Diagnostic> {
    let Some((parent, last)) = path.split_last() else {
        return Err(Diagnostic::fatal(
            DiagnosticCode::ConflictingAdd,
            "I can't add a value at the document root because the root always exists."
                .to_string(),
        )
        .with_advice("Use replace to overwrite the whole document.".to_string()));
    };

    let container = resolve_mut(parent, state).map_err(|diag| {
        diag.with_advice(
            "For add operations, the parent path must exist. \
             For example, to add /a/b/c, the paths /a and /a/b must already exist."
                .to_string(),
        )
    })?;

    match (container, last) {
        (Value::Object(obj), PathSegment::Key(key)) => {
            if obj.contains_key(key) {
                return Err(Diagnostic::fatal(
                    DiagnosticCode::ConflictingAdd,
                    format!("I can't add the key '{}' at {} because it already exists", key, path),
                )
                .with_advice("Use replace to change the value of an existing key.".to_string()));
            }
            obj.insert(key.clone(), value);
            Ok(())
        }
        (Value::Array(arr), PathSegment::Index(index)) => {
            if *index > arr.len() {
                return Err(Diagnostic::fatal(
                    DiagnosticCode::PathNotFound,
                    format!(
                        "I couldn't insert at index {} (array length is {})",
                        index,
                        arr.len()
                    ),
                ));
            }
            arr.insert(*index, value);
            Ok(())
        }
        (other, segment) => Err(cannot_descend(other, segment)),
    }
}

pub fn apply_remove(state: &mut Value, path: &Path) -> Result<Value, Diagnostic> {
    let Some((parent, last)) = path.split_last() else {
        return Err(Diagnostic::fatal(
            DiagnosticCode::InvalidOperation,
            "I can't remove the document root".to_string(),
        ));
    };

    let container = resolve_mut(parent, state)?;

    match (container, last) {
        (Value::Object(obj), PathSegment::Key(key)) => obj
            .shift_remove(key)
            .ok_or_else(|| key_not_found(key)),
        (Value::Array(arr), PathSegment::Index(index)) => {
            if *index < arr.len() {
                Ok(arr.remove(*index))
            } else {
                Err(index_not_found(*index, arr.len()))
            }
        }
        (other, segment) => Err(cannot_descend(other, segment)),
    }
}

pub fn apply_replace(state: &mut Value, path: &Path, value: Value) -> Result<(), Diagnostic> {
    let target = path.get_mut(state)?;
    *target = value;
    Ok(())
}
