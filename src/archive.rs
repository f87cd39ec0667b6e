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

//! File-backed revision storage.
//!
//! Each configuration lives in its own newline-delimited JSON file inside the
//! store directory. The first line is a [`Header`]; every further line is one
//! serialized [`Revision`], oldest first. Lines starting with `#` and blank
//! lines are skipped, so a file can be annotated by hand.
//!
//! ```text
//! {"type":"json-revisions","version":1,"created":"2025-01-15T10:00:00Z","config_id":"checkout"}
//! {"id":"rev-...","version":1,"timestamp":"...","author":"alice","document":{"a":1},"edits":[]}
//! {"id":"rev-...","version":2,"timestamp":"...","author":"bob","document":{"a":2},"edits":[{"op":"replace","path":["a"],"value":2}]}
//! ```
//!
//! Appends are serialized per configuration within one process. Two processes
//! appending to the same file at once are not coordinated.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::revision::Revision;
use crate::store::{check_next_version, concurrent_modification, RevisionStore};

pub const FILE_TYPE: &str = "json-revisions";
pub const FORMAT_VERSION: u32 = 1;
pub const FILE_EXTENSION: &str = "revisions";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Kept as the first key so the file type is visible at the start of the file.
    #[serde(rename = "type")]
    pub file_type: String,
    pub version: u32,
    pub created: DateTime<Utc>,
    pub config_id: String,
}

impl Header {
    pub fn new(config_id: String) -> Self {
        Self {
            file_type: FILE_TYPE.to_string(),
            version: FORMAT_VERSION,
            created: Utc::now(),
            config_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainFile {
    pub header: Header,
    pub revisions: Vec<Revision>,
}

impl ChainFile {
    pub fn head_version(&self) -> u64 {
        self.revisions.last().map(|r| r.version).unwrap_or(0)
    }
}

/// Read and validate a chain file: header first, then gapless versions from 1.
pub fn read_chain_file(path: &Path) -> Result<ChainFile, Diagnostic> {
    let filename = path.display().to_string();
    let file = File::open(path).map_err(|e| {
        Diagnostic::fatal(
            DiagnosticCode::StorageFailure,
            format!("I couldn't open the revision file {}: {}", filename, e),
        )
    })?;
    let mut lines = BufReader::new(file).lines().enumerate();

    let header = match lines.next() {
        Some((_, Ok(line))) => parse_header(&line, &filename)?,
        Some((idx, Err(e))) => return Err(read_failure(&filename, idx + 1, e)),
        None => {
            return Err(Diagnostic::fatal(
                DiagnosticCode::InvalidRevision,
                "I found an empty revision file, but I need at least a header line.".to_string(),
            )
            .with_location(filename, 1))
        }
    };

    let mut revisions: Vec<Revision> = Vec::new();

    for (idx, line_result) in lines {
        let line_number = idx + 1;
        let line = line_result.map_err(|e| read_failure(&filename, line_number, e))?;

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let revision: Revision = serde_json::from_str(trimmed).map_err(|e| {
            Diagnostic::fatal(
                DiagnosticCode::InvalidRevision,
                format!("I couldn't parse this line as a revision: {}", e),
            )
            .with_location(filename.clone(), line_number)
            .with_snippet(format!("{} | {}", line_number, line))
            .with_advice(
                "Each line after the header must be a comment starting with # \
                 or one revision object. A partially written last line usually \
                 means a write was interrupted."
                    .to_string(),
            )
        })?;

        let expected = revisions.last().map(|r| r.version).unwrap_or(0) + 1;
        if revision.version != expected {
            return Err(Diagnostic::fatal(
                DiagnosticCode::InvalidRevision,
                format!(
                    "I found version {} where I expected version {}.",
                    revision.version, expected
                ),
            )
            .with_location(filename.clone(), line_number)
            .with_advice("Versions in a revision file must start at 1 and have no gaps.".to_string()));
        }

        revisions.push(revision);
    }

    Ok(ChainFile { header, revisions })
}

fn parse_header(line: &str, filename: &str) -> Result<Header, Diagnostic> {
    let header: Header = serde_json::from_str(line).map_err(|e| {
        Diagnostic::fatal(
            DiagnosticCode::InvalidRevision,
            format!("I couldn't parse the header: {}", e),
        )
        .with_location(filename.to_string(), 1)
        .with_snippet(format!("1 | {}", line))
        .with_advice(format!(
            "The first line must be a header object containing:\n\
             - type: \"{}\"\n\
             - version: {}\n\
             - created: an ISO-8601 timestamp\n\
             - config_id: the configuration this file belongs to",
            FILE_TYPE, FORMAT_VERSION
        ))
    })?;

    if header.file_type != FILE_TYPE {
        return Err(Diagnostic::fatal(
            DiagnosticCode::InvalidRevision,
            format!(
                "I expected a '{}' file but the header says '{}'.",
                FILE_TYPE, header.file_type
            ),
        )
        .with_location(filename.to_string(), 1));
    }

    if header.version != FORMAT_VERSION {
        return Err(Diagnostic::fatal(
            DiagnosticCode::InvalidRevision,
            format!(
                "I only understand format version {}, but this file is version {}.",
                FORMAT_VERSION, header.version
            ),
        )
        .with_location(filename.to_string(), 1));
    }

    Ok(header)
}

fn read_failure(filename: &str, line_number: usize, e: io::Error) -> Diagnostic {
    if e.kind() == ErrorKind::InvalidData {
        return Diagnostic::fatal(
            DiagnosticCode::InvalidRevision,
            format!("I found invalid UTF-8 bytes at line {}.", line_number),
        )
        .with_location(filename.to_string(), line_number);
    }
    Diagnostic::fatal(
        DiagnosticCode::StorageFailure,
        format!("I couldn't read {}: {}", filename, e),
    )
    .with_location(filename.to_string(), line_number)
}

/// File name for a configuration id. Anything outside `[A-Za-z0-9_.-]`, and a
/// leading `.`, is percent-encoded byte by byte so ids can't escape the store
/// directory.
pub fn file_name_for(config_id: &str) -> String {
    let mut name = String::with_capacity(config_id.len() + FILE_EXTENSION.len() + 1);
    for (i, byte) in config_id.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || byte == b'-'
            || byte == b'_'
            || (byte == b'.' && i > 0);
        if keep {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    name.push('.');
    name.push_str(FILE_EXTENSION);
    name
}

pub struct ArchiveStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArchiveStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, Diagnostic> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            Diagnostic::fatal(
                DiagnosticCode::StorageFailure,
                format!("I couldn't create the store directory {}: {}", root.display(), e),
            )
            .with_advice(
                "Make sure you have write permission in this directory and that the path is valid."
                    .to_string(),
            )
        })?;
        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chain_path(&self, config_id: &str) -> PathBuf {
        self.root.join(file_name_for(config_id))
    }

    /// The whole chain, or `None` when the configuration has never been committed.
    pub fn read_chain(&self, config_id: &str) -> Result<Option<ChainFile>, Diagnostic> {
        check_config_id(config_id)?;
        let path = self.chain_path(config_id);
        if !path.exists() {
            return Ok(None);
        }
        let chain = read_chain_file(&path)?;
        if chain.header.config_id != config_id {
            return Err(Diagnostic::fatal(
                DiagnosticCode::InvalidRevision,
                format!(
                    "I expected {} to hold '{}' but its header says '{}'.",
                    path.display(),
                    config_id,
                    chain.header.config_id
                ),
            )
            .with_location(path.display().to_string(), 1));
        }
        Ok(Some(chain))
    }

    fn lock_for(&self, config_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(config_id.to_string())
            .or_default()
            .clone()
    }

    /// Append `line`, creating the file with its header first if needed.
    ///
    /// A failed write never leaves bytes behind: an existing file is truncated
    /// back to its previous length and a file created by this call is removed.
    fn write_line<W>(&self, path: &Path, config_id: &str, line: &str, write: W) -> Result<(), Diagnostic>
    where
        W: FnOnce(&mut File, &[u8]) -> io::Result<()>,
    {
        let filename = path.display().to_string();
        let write_failure = |e: io::Error| {
            Diagnostic::fatal(
                DiagnosticCode::StorageFailure,
                format!("I couldn't write to the revision file {}: {}", filename, e),
            )
        };

        let mut buffer = String::new();
        let created = !path.exists();
        let mut file = if created {
            let header = serde_json::to_string(&Header::new(config_id.to_string())).map_err(|e| {
                Diagnostic::fatal(
                    DiagnosticCode::StorageFailure,
                    format!("I couldn't serialize the header to JSON: {}", e),
                )
            })?;
            buffer.push_str(&header);
            buffer.push('\n');
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map_err(write_failure)?
        } else {
            OpenOptions::new().append(true).open(path).map_err(write_failure)?
        };
        let previous_len = file.metadata().map_err(write_failure)?.len();

        buffer.push_str(line);
        buffer.push('\n');

        if let Err(e) = write(&mut file, buffer.as_bytes()) {
            let restored = if created {
                drop(file);
                fs::remove_file(path)
            } else {
                file.set_len(previous_len).and_then(|()| file.sync_data())
            };
            if let Err(restore_error) = restored {
                warn!(
                    target: "json_revisions::archive",
                    file = %filename,
                    error = %restore_error,
                    "Couldn't undo a failed append"
                );
            }
            return Err(write_failure(e));
        }
        Ok(())
    }
}

fn write_durably(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_data()
}

fn check_config_id(config_id: &str) -> Result<(), Diagnostic> {
    if config_id.is_empty() {
        return Err(Diagnostic::fatal(
            DiagnosticCode::InvalidArgument,
            "I need a non-empty configuration id.".to_string(),
        ));
    }
    Ok(())
}

impl RevisionStore for ArchiveStore {
    fn load_head(&self, config_id: &str) -> Result<Option<Revision>, Diagnostic> {
        Ok(self
            .read_chain(config_id)?
            .and_then(|mut chain| chain.revisions.pop()))
    }

    fn load_revision(&self, config_id: &str, version: u64) -> Result<Option<Revision>, Diagnostic> {
        let Some(chain) = self.read_chain(config_id)? else {
            return Ok(None);
        };
        Ok(chain
            .revisions
            .into_iter()
            .find(|revision| revision.version == version))
    }

    fn load_range(
        &self,
        config_id: &str,
        versions: RangeInclusive<u64>,
    ) -> Result<Vec<Revision>, Diagnostic> {
        let Some(chain) = self.read_chain(config_id)? else {
            return Ok(Vec::new());
        };
        Ok(chain
            .revisions
            .into_iter()
            .filter(|revision| versions.contains(&revision.version))
            .collect())
    }

    fn append_revision(
        &self,
        config_id: &str,
        expected_previous: u64,
        revision: Revision,
    ) -> Result<(), Diagnostic> {
        check_next_version(config_id, expected_previous, &revision)?;

        let lock = self.lock_for(config_id);
        let _guard = lock.lock();

        let actual = self
            .read_chain(config_id)?
            .map(|chain| chain.head_version())
            .unwrap_or(0);
        if actual != expected_previous {
            return Err(concurrent_modification(config_id, expected_previous, actual));
        }

        let line = serde_json::to_string(&revision).map_err(|e| {
            Diagnostic::fatal(
                DiagnosticCode::StorageFailure,
                format!("I couldn't serialize revision {} to JSON: {}", revision.version, e),
            )
        })?;

        let path = self.chain_path(config_id);
        self.write_line(&path, config_id, &line, write_durably)?;

        debug!(
            target: "json_revisions::archive",
            config_id,
            version = revision.version,
            file = %path.display(),
            "Appended revision"
        );
        Ok(())
    }
}
