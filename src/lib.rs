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

pub mod archive;
pub mod chain;
pub mod diagnostics;
pub mod diff;
pub mod document;
pub mod ops;
pub mod patch;
pub mod pointer;
pub mod revision;
pub mod store;

pub use archive::ArchiveStore;
pub use chain::{RevisionChain, StagedCommit};
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector, DiagnosticLevel};
pub use diff::diff;
pub use document::{parse_document, to_canonical_string, to_pretty_string, ValueTypeExt};
pub use ops::{EditKind, EditOp};
pub use patch::{apply, apply_in_place};
pub use pointer::{Path, PathSegment};
pub use revision::{ChainConfig, Revision, StorageMode};
pub use store::{MemoryStore, RevisionStore};
