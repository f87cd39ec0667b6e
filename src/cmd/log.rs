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
use chrono::{DateTime, Utc};
use json_revisions::{ChainConfig, Diagnostic, DiagnosticCode, Revision};
use serde::Serialize;

use super::{is_json_output, open_chain};

#[derive(Serialize)]
struct JsonRevision {
    version: u64,
    id: String,
    timestamp: String,
    author: String,
    changes: usize,
    snapshot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rollback_of: Option<u64>,
}

#[derive(Serialize)]
struct JsonLogOutput {
    config: String,
    file: String,
    revisions: Vec<JsonRevision>,
}

pub fn run(flags: &flags::Log) -> Vec<Diagnostic> {
    let chain = match open_chain(&flags.store, ChainConfig::default()) {
        Ok(chain) => chain,
        Err(diagnostic) => return vec![diagnostic],
    };

    let revisions = match chain.history(&flags.config) {
        Ok(revisions) => revisions,
        Err(diagnostic) => return vec![diagnostic],
    };

    let file = chain.store().chain_path(&flags.config).display().to_string();

    if is_json_output(&flags.output) {
        let output = JsonLogOutput {
            config: flags.config.clone(),
            file,
            revisions: revisions
                .iter()
                .map(|revision| JsonRevision {
                    version: revision.version,
                    id: revision.id.clone(),
                    timestamp: revision.timestamp.to_rfc3339(),
                    author: revision.author.clone(),
                    changes: revision.edits.len(),
                    snapshot: revision.is_snapshot(),
                    rollback_of: revision.rollback_of,
                })
                .collect(),
        };

        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                return vec![Diagnostic::fatal(
                    DiagnosticCode::StorageFailure,
                    format!("I couldn't serialize the history to JSON: {}", e),
                )];
            }
        }
        return Vec::new();
    }

    println!("Configuration: {}", flags.config);
    println!("File: {}", file);

    let (Some(first), Some(last)) = (revisions.first(), revisions.last()) else {
        println!("No versions found");
        return Vec::new();
    };

    println!();
    if revisions.len() == 1 {
        println!("1 version on {}", format_timestamp(&first.timestamp));
    } else {
        println!(
            "{} versions from {} to {}",
            revisions.len(),
            format_timestamp(&first.timestamp),
            format_timestamp(&last.timestamp)
        );
    }
    println!();

    println!("  Version  Revision ID               Date & Time                Author        Changes  Stored");
    println!("───────────────────────────────────────────────────────────────────────────────────────────────────");

    for revision in &revisions {
        println!(
            "  {:7}  {:24}  {:25}  {:12}  {:7}  {}",
            revision.version,
            truncate(&revision.id, 24),
            format_timestamp(&revision.timestamp),
            truncate(&revision.author, 12),
            changes_display(revision),
            stored_display(revision)
        );
    }

    println!();
    println!("To get the document at a specific version:");
    println!("  json-revisions show {} --version <version>", flags.config);

    Vec::new()
}

fn changes_display(revision: &Revision) -> String {
    if revision.version == 1 {
        "-".to_string()
    } else {
        revision.edits.len().to_string()
    }
}

fn stored_display(revision: &Revision) -> String {
    let stored = if revision.is_snapshot() { "document" } else { "edits" };
    match revision.rollback_of {
        Some(target) => format!("{} (rollback to {})", stored, target),
        None => stored.to_string(),
    }
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%a %H:%M:%S %d-%b-%Y").to_string()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
