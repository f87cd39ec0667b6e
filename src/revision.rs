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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ops::EditOp;

/// One committed version of a configuration. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: String,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    /// The full document, when this revision stores one. `None` means it has to
    /// be replayed from an earlier revision. A stored `null` document is
    /// `Some(Value::Null)`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_document"
    )]
    pub document: Option<Value>,
    /// Edits from the previous version. Empty for version 1.
    #[serde(default)]
    pub edits: Vec<EditOp>,
    /// Set when this revision was produced by rolling back to an older version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_of: Option<u64>,
}

fn deserialize_document<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Revision {
    pub fn new(
        version: u64,
        author: String,
        document: Option<Value>,
        edits: Vec<EditOp>,
    ) -> Self {
        Self {
            id: format!("rev-{}", Uuid::new_v4()),
            version,
            timestamp: Utc::now(),
            author,
            document,
            edits,
            rollback_of: None,
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.document.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Every revision carries its full document.
    FullDocuments,
    /// Only version 1, and every `snapshot_interval`th version when set, carry
    /// the full document. Everything else is replayed from edits.
    DiffsOnly { snapshot_interval: Option<u64> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    pub mode: StorageMode,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::FullDocuments,
        }
    }
}

impl ChainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diffs_only(mut self) -> Self {
        self.mode = StorageMode::DiffsOnly {
            snapshot_interval: None,
        };
        self
    }

    pub fn with_snapshot_interval(mut self, interval: u64) -> Self {
        self.mode = StorageMode::DiffsOnly {
            snapshot_interval: Some(interval),
        };
        self
    }

    pub fn stores_document(&self, version: u64) -> bool {
        match self.mode {
            StorageMode::FullDocuments => true,
            StorageMode::DiffsOnly { snapshot_interval } => {
                version == 1
                    || snapshot_interval
                        .map(|interval| interval > 0 && version % interval == 0)
                        .unwrap_or(false)
            }
        }
    }
}
