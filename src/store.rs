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

//! The storage boundary.
//!
//! The chain manager never touches persistence directly. It reads through
//! [`RevisionStore::load_head`] and [`RevisionStore::load_revision`] and writes
//! only through [`RevisionStore::append_revision`], which must be atomic: either
//! the head was still `expected_previous` and the revision is now the new head,
//! or nothing changed and the call failed with `ConcurrentModification`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::revision::Revision;

pub trait RevisionStore {
    fn load_head(&self, config_id: &str) -> Result<Option<Revision>, Diagnostic>;

    fn load_revision(&self, config_id: &str, version: u64) -> Result<Option<Revision>, Diagnostic>;

    /// The stored revisions with versions in `versions`, oldest first. Versions
    /// past the head are left out.
    fn load_range(
        &self,
        config_id: &str,
        versions: RangeInclusive<u64>,
    ) -> Result<Vec<Revision>, Diagnostic> {
        let mut revisions = Vec::new();
        for version in versions {
            match self.load_revision(config_id, version)? {
                Some(revision) => revisions.push(revision),
                None => break,
            }
        }
        Ok(revisions)
    }

    /// `expected_previous` is the head version the revision was computed
    /// against, 0 for an empty chain.
    fn append_revision(
        &self,
        config_id: &str,
        expected_previous: u64,
        revision: Revision,
    ) -> Result<(), Diagnostic>;
}

impl<S: RevisionStore + ?Sized> RevisionStore for &S {
    fn load_head(&self, config_id: &str) -> Result<Option<Revision>, Diagnostic> {
        (**self).load_head(config_id)
    }

    fn load_revision(&self, config_id: &str, version: u64) -> Result<Option<Revision>, Diagnostic> {
        (**self).load_revision(config_id, version)
    }

    fn load_range(
        &self,
        config_id: &str,
        versions: RangeInclusive<u64>,
    ) -> Result<Vec<Revision>, Diagnostic> {
        (**self).load_range(config_id, versions)
    }

    fn append_revision(
        &self,
        config_id: &str,
        expected_previous: u64,
        revision: Revision,
    ) -> Result<(), Diagnostic> {
        (**self).append_revision(config_id, expected_previous, revision)
    }
}

impl<S: RevisionStore + ?Sized> RevisionStore for Arc<S> {
    fn load_head(&self, config_id: &str) -> Result<Option<Revision>, Diagnostic> {
        (**self).load_head(config_id)
    }

    fn load_revision(&self, config_id: &str, version: u64) -> Result<Option<Revision>, Diagnostic> {
        (**self).load_revision(config_id, version)
    }

    fn load_range(
        &self,
        config_id: &str,
        versions: RangeInclusive<u64>,
    ) -> Result<Vec<Revision>, Diagnostic> {
        (**self).load_range(config_id, versions)
    }

    fn append_revision(
        &self,
        config_id: &str,
        expected_previous: u64,
        revision: Revision,
    ) -> Result<(), Diagnostic> {
        (**self).append_revision(config_id, expected_previous, revision)
    }
}

pub fn concurrent_modification(config_id: &str, expected: u64, actual: u64) -> Diagnostic {
    Diagnostic::fatal(
        DiagnosticCode::ConcurrentModification,
        format!(
            "I couldn't append to '{}': the revision was computed against version {}, \
             but the head is now version {}",
            config_id, expected, actual
        ),
    )
    .with_advice("Reload the head and commit again.".to_string())
}

pub fn check_next_version(
    config_id: &str,
    expected_previous: u64,
    revision: &Revision,
) -> Result<(), Diagnostic> {
    if revision.version != expected_previous + 1 {
        return Err(Diagnostic::fatal(
            DiagnosticCode::InvalidRevision,
            format!(
                "I can't append version {} to '{}' after version {}: versions must be gapless",
                revision.version, config_id, expected_previous
            ),
        ));
    }
    Ok(())
}

type Chain = Arc<RwLock<Vec<Revision>>>;

/// Keeps every chain in memory.
///
/// The outer map is only locked long enough to find or create a chain's
/// handle. Reads and appends then lock that one chain, so commits to different
/// configurations never wait on each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chains: RwLock<HashMap<String, Chain>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn chain(&self, config_id: &str) -> Option<Chain> {
        self.chains.read().get(config_id).cloned()
    }

    fn chain_or_create(&self, config_id: &str) -> Chain {
        if let Some(chain) = self.chain(config_id) {
            return chain;
        }
        self.chains
            .write()
            .entry(config_id.to_string())
            .or_default()
            .clone()
    }
}

impl RevisionStore for MemoryStore {
    fn load_head(&self, config_id: &str) -> Result<Option<Revision>, Diagnostic> {
        let Some(chain) = self.chain(config_id) else {
            return Ok(None);
        };
        let head = chain.read().last().cloned();
        Ok(head)
    }

    fn load_revision(&self, config_id: &str, version: u64) -> Result<Option<Revision>, Diagnostic> {
        let (Some(chain), Ok(index)) = (self.chain(config_id), usize::try_from(version)) else {
            return Ok(None);
        };
        if index == 0 {
            return Ok(None);
        }
        let revision = chain.read().get(index - 1).cloned();
        Ok(revision)
    }

    fn load_range(
        &self,
        config_id: &str,
        versions: RangeInclusive<u64>,
    ) -> Result<Vec<Revision>, Diagnostic> {
        let Some(chain) = self.chain(config_id) else {
            return Ok(Vec::new());
        };
        let revisions = chain
            .read()
            .iter()
            .filter(|revision| versions.contains(&revision.version))
            .cloned()
            .collect();
        Ok(revisions)
    }

    fn append_revision(
        &self,
        config_id: &str,
        expected_previous: u64,
        revision: Revision,
    ) -> Result<(), Diagnostic> {
        check_next_version(config_id, expected_previous, &revision)?;

        let chain = self.chain_or_create(config_id);
        let mut revisions = chain.write();
        let actual = revisions.last().map(|r| r.version).unwrap_or(0);
        if actual != expected_previous {
            return Err(concurrent_modification(config_id, expected_previous, actual));
        }
        revisions.push(revision);
        Ok(())
    }
}
