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

use std::path::PathBuf;

xflags::xflags! {
    cmd json-revisions {
        /// Log what the store and chain are doing to stderr
        optional -v, --verbose

        /// Commit a JSON file as the next version of a configuration
        cmd commit {
            /// Configuration id
            required config: String

            /// JSON document to commit
            required file: PathBuf

            /// Directory holding the revision files (defaults to the current directory)
            optional --store store: PathBuf

            /// Author recorded on the revision
            optional --author author: String

            /// Store edits instead of full documents after version 1
            optional --diffs-only

            /// With --diffs-only, still store the full document every N versions
            optional -s, --snapshot-interval snapshot_interval: u64
        }

        /// Print the document at a version (the head by default)
        cmd show {
            required config: String

            optional --store store: PathBuf

            /// Version to reconstruct
            optional --version version: u64

            /// Print only the value at this JSON Pointer
            optional --path path: String
        }

        /// Print the edits between two versions
        cmd diff {
            required config: String

            /// Version to diff from
            required from: u64

            /// Version to diff to (defaults to the version after FROM)
            optional to: u64

            optional --store store: PathBuf

            /// Output format: human-readable (default) or json
            optional --output output: String
        }

        /// Commit the document from an older version as the new head
        cmd rollback {
            required config: String

            /// Version to restore
            required to: u64

            optional --store store: PathBuf

            optional --author author: String

            optional --diffs-only

            optional -s, --snapshot-interval snapshot_interval: u64
        }

        /// List every version of a configuration
        cmd log {
            required config: String

            optional --store store: PathBuf

            /// Output format: human-readable (default) or json
            optional --output output: String
        }
    }
}
