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

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::pointer::Path;

/// One structural edit. A sequence of these is applied in order, each against
/// the document produced by the ones before it.
///
/// Serialized as `{"op": "add", "path": ["list", 0], "value": ...}`. `remove`
/// carries no `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EditOp {
    Add { path: Path, value: Value },
    Remove { path: Path },
    Replace { path: Path, value: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Add,
    Remove,
    Replace,
}

impl EditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditKind::Add => "add",
            EditKind::Remove => "remove",
            EditKind::Replace => "replace",
        }
    }
}

impl EditOp {
    pub fn add(path: Path, value: Value) -> Self {
        EditOp::Add { path, value }
    }

    pub fn remove(path: Path) -> Self {
        EditOp::Remove { path }
    }

    pub fn replace(path: Path, value: Value) -> Self {
        EditOp::Replace { path, value }
    }

    pub fn kind(&self) -> EditKind {
        match self {
            EditOp::Add { .. } => EditKind::Add,
            EditOp::Remove { .. } => EditKind::Remove,
            EditOp::Replace { .. } => EditKind::Replace,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            EditOp::Add { path, .. } | EditOp::Remove { path } | EditOp::Replace { path, .. } => {
                path
            }
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            EditOp::Add { value, .. } | EditOp::Replace { value, .. } => Some(value),
            EditOp::Remove { .. } => None,
        }
    }
}

/// One line per edit, e.g. `replace /a 2`.
impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path().to_string();
        let path = if path.is_empty() { "/" } else { path.as_str() };
        match self.value() {
            Some(value) => write!(f, "{} {} {}", self.kind().as_str(), path, value),
            None => write!(f, "{} {}", self.kind().as_str(), path),
        }
    }
}
