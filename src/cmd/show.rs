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

use crate::flags;
use json_revisions::document::to_pretty_string;
use json_revisions::{ChainConfig, Diagnostic, DiagnosticCode, EditOp, Path};

use super::{is_json_output, open_chain};

pub fn run(flags: &flags::Show) -> Vec<Diagnostic> {
    let chain = match open_chain(&flags.store, ChainConfig::default()) {
        Ok(chain) => chain,
        Err(diagnostic) => return vec![diagnostic],
    };

    let version = match flags.version {
        Some(version) => version,
        None => match chain.head(&flags.config) {
            Ok(Some(head)) => head.version,
            Ok(None) => return vec![no_versions(&flags.config)],
            Err(diagnostic) => return vec![diagnostic],
        },
    };

    let document = match chain.reconstruct(&flags.config, version) {
        Ok(document) => document,
        Err(diagnostic) => return vec![diagnostic],
    };

    let value = match &flags.path {
        Some(pointer) => match Path::from_pointer(pointer, &document)
            .and_then(|path| path.get(&document).cloned())
        {
            Ok(value) => value,
            Err(diagnostic) => return vec![diagnostic],
        },
        None => document,
    };

    println!("{}", to_pretty_string(&value));
    Vec::new()
}

pub fn diff(flags: &flags::Diff) -> Vec<Diagnostic> {
    let chain = match open_chain(&flags.store, ChainConfig::default()) {
        Ok(chain) => chain,
        Err(diagnostic) => return vec![diagnostic],
    };

    let to = target_version(flags.from, flags.to);

    let edits = match chain.diff_between(&flags.config, flags.from, to) {
        Ok(edits) => edits,
        Err(diagnostic) => return vec![diagnostic],
    };

    if is_json_output(&flags.output) {
        match serde_json::to_string_pretty(&edits) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                return vec![Diagnostic::fatal(
                    DiagnosticCode::StorageFailure,
                    format!("I couldn't serialize the edits to JSON: {}", e),
                )];
            }
        }
    } else {
        print_edits(flags.from, to, &edits);
    }

    Vec::new()
}

/// `TO` defaults to the version right after `FROM`.
fn target_version(from: u64, to: Option<u64>) -> u64 {
    to.unwrap_or(from.saturating_add(1))
}

fn print_edits(from: u64, to: u64, edits: &[EditOp]) {
    println!("Version {} -> {}", from, to);
    if edits.is_empty() {
        println!("No changes");
        return;
    }
    for edit in edits {
        println!("  {}", edit);
    }
}

fn no_versions(config_id: &str) -> Diagnostic {
    Diagnostic::fatal(
        DiagnosticCode::VersionNotFound,
        format!("I couldn't find any versions of '{}'", config_id),
    )
    .with_advice(format!(
        "Commit a document first: json-revisions commit {} <file.json>",
        config_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_version_defaults_to_next() {
        assert_eq!(target_version(3, None), 4);
        assert_eq!(target_version(3, Some(1)), 1);
        assert_eq!(target_version(u64::MAX, None), u64::MAX);
    }
}
