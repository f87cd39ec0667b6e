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

use json_revisions::{ArchiveStore, ChainConfig, Diagnostic, DiagnosticCode, RevisionChain};
use std::path::{Path, PathBuf};

pub mod commit;
pub mod log;
pub mod show;

/// Open the chain stored under `--store`, or the current directory.
fn open_chain(store: &Option<PathBuf>, config: ChainConfig) -> Result<RevisionChain<ArchiveStore>, Diagnostic> {
    let root = store.as_deref().unwrap_or_else(|| Path::new("."));
    let store = ArchiveStore::open(root)?;
    Ok(RevisionChain::with_config(store, config))
}

fn chain_config(diffs_only: bool, snapshot_interval: Option<u64>) -> Result<ChainConfig, Diagnostic> {
    match (diffs_only, snapshot_interval) {
        (_, Some(0)) => Err(Diagnostic::fatal(
            DiagnosticCode::InvalidArgument,
            "I need a snapshot interval of at least 1".to_string(),
        )),
        (_, Some(interval)) => Ok(ChainConfig::new().with_snapshot_interval(interval)),
        (true, None) => Ok(ChainConfig::new().diffs_only()),
        (false, None) => Ok(ChainConfig::new()),
    }
}

fn author_or_default(author: &Option<String>) -> String {
    author
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn is_json_output(output: &Option<String>) -> bool {
    output.as_deref() == Some("json")
}
