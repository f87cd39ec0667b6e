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

use json_revisions::{Diagnostic, DiagnosticCollector};
use std::process;
use tracing::Level;

mod cmd;
mod flags;

fn main() {
    let flags = flags::JsonRevisions::from_env_or_exit();

    let level = if flags.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut diagnostics = DiagnosticCollector::new();
    diagnostics.extend(run(flags));

    for diagnostic in diagnostics.diagnostics() {
        eprintln!("{}", diagnostic);
    }

    if diagnostics.has_fatal() {
        process::exit(1);
    }
}

fn run(flags: flags::JsonRevisions) -> Vec<Diagnostic> {
    match flags.subcommand {
        flags::JsonRevisionsCmd::Commit(commit_flags) => cmd::commit::run(&commit_flags),
        flags::JsonRevisionsCmd::Rollback(rollback_flags) => cmd::commit::rollback(&rollback_flags),
        flags::JsonRevisionsCmd::Show(show_flags) => cmd::show::run(&show_flags),
        flags::JsonRevisionsCmd::Diff(diff_flags) => cmd::show::diff(&diff_flags),
        flags::JsonRevisionsCmd::Log(log_flags) => cmd::log::run(&log_flags),
    }
}
