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
use json_revisions::document::parse_document_bytes;
use json_revisions::{Diagnostic, DiagnosticCode, DiagnosticCollector, DiagnosticLevel, Revision};
use serde_json::Value;
use std::path::Path;

use super::{author_or_default, chain_config, open_chain};

pub fn run(flags: &flags::Commit) -> Vec<Diagnostic> {
    let config = match chain_config(flags.diffs_only, flags.snapshot_interval) {
        Ok(config) => config,
        Err(diagnostic) => return vec![diagnostic],
    };

    let document = match read_document(&flags.file) {
        Ok(document) => document,
        Err(diagnostic) => return vec![diagnostic],
    };

    let chain = match open_chain(&flags.store, config) {
        Ok(chain) => chain,
        Err(diagnostic) => return vec![diagnostic],
    };

    let author = author_or_default(&flags.author);
    let revision = match chain.commit(&flags.config, document, &author) {
        Ok(revision) => revision,
        Err(diagnostic) => return vec![diagnostic],
    };

    print_committed(&flags.config, &revision);

    let mut diagnostics = DiagnosticCollector::new();
    if revision.version > 1 && revision.edits.is_empty() {
        diagnostics.add(
            Diagnostic::new(
                DiagnosticLevel::Warning,
                DiagnosticCode::InvalidArgument,
                format!(
                    "{} matches version {}, so version {} records no changes.",
                    flags.file.display(),
                    revision.version - 1,
                    revision.version
                ),
            )
            .with_advice(
                "Versions are still created for unchanged documents. Key order \
                 differences alone do not count as changes."
                    .to_string(),
            ),
        );
    }
    diagnostics.into_diagnostics()
}

pub fn rollback(flags: &flags::Rollback) -> Vec<Diagnostic> {
    let config = match chain_config(flags.diffs_only, flags.snapshot_interval) {
        Ok(config) => config,
        Err(diagnostic) => return vec![diagnostic],
    };

    let chain = match open_chain(&flags.store, config) {
        Ok(chain) => chain,
        Err(diagnostic) => return vec![diagnostic],
    };

    let author = author_or_default(&flags.author);
    match chain.rollback(&flags.config, flags.to, &author) {
        Ok(revision) => {
            print_committed(&flags.config, &revision);
            Vec::new()
        }
        Err(diagnostic) => vec![diagnostic],
    }
}

fn read_document(path: &Path) -> Result<Value, Diagnostic> {
    let bytes = std::fs::read(path).map_err(|e| {
        Diagnostic::fatal(
            DiagnosticCode::StorageFailure,
            format!("I couldn't read the input file {}: {}", path.display(), e),
        )
        .with_advice(
            "Make sure the file path is correct and the file exists. \
             Check for typos in the filename."
                .to_string(),
        )
    })?;

    parse_document_bytes(&bytes).map_err(|diagnostic| Diagnostic {
        description: format!("{}: {}", path.display(), diagnostic.description),
        ..diagnostic
    })
}

fn print_committed(config_id: &str, revision: &Revision) {
    let changes = match revision.edits.len() {
        1 => "1 change".to_string(),
        n => format!("{} changes", n),
    };
    match revision.rollback_of {
        Some(target) => println!(
            "Rolled {} back to version {} as version {} ({})",
            config_id, target, revision.version, changes
        ),
        None => println!(
            "Committed {} version {} ({})",
            config_id, revision.version, changes
        ),
    }
    println!("  id: {}", revision.id);
}
