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

//! The version chain manager.
//!
//! Every configuration id owns an append-only chain of [`Revision`]s numbered
//! 1, 2, 3, ... with no gaps. The manager is the only writer. A commit reads the
//! head, diffs the candidate against the head's document, and appends with the
//! head's version as a precondition. If another commit got there first the
//! append fails with `ConcurrentModification` and nothing is written; the
//! caller reloads and tries again:
//!
//! ```no_run
//! # use json_revisions::{MemoryStore, RevisionChain};
//! # let chain = RevisionChain::new(MemoryStore::new());
//! # let candidate = serde_json::json!({});
//! let revision = loop {
//!     match chain.commit("checkout", candidate.clone(), "alice") {
//!         Err(diag) if diag.is_retryable() => continue,
//!         other => break other,
//!     }
//! };
//! ```

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::diff::diff;
use crate::ops::EditOp;
use crate::patch::apply_in_place;
use crate::revision::{ChainConfig, Revision};
use crate::store::RevisionStore;

/// A revision computed against a specific head, not yet appended.
#[derive(Debug, Clone)]
pub struct StagedCommit {
    pub config_id: String,
    pub expected_previous: u64,
    pub revision: Revision,
}

pub struct RevisionChain<S> {
    store: S,
    config: ChainConfig,
}

impl<S: RevisionStore> RevisionChain<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: ChainConfig::default(),
        }
    }

    pub fn with_config(store: S, config: ChainConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn head(&self, config_id: &str) -> Result<Option<Revision>, Diagnostic> {
        self.store.load_head(config_id)
    }

    /// Append `candidate` as the next version of `config_id`.
    pub fn commit(
        &self,
        config_id: &str,
        candidate: Value,
        author: &str,
    ) -> Result<Revision, Diagnostic> {
        let staged = self.stage(config_id, candidate, author)?;
        self.publish(staged)
    }

    /// Compute the next revision against the current head without appending it.
    pub fn stage(
        &self,
        config_id: &str,
        candidate: Value,
        author: &str,
    ) -> Result<StagedCommit, Diagnostic> {
        let head = self.store.load_head(config_id)?;

        let (expected_previous, edits) = match head {
            Some(head) => {
                let version = head.version;
                let head_document = self.materialize(config_id, head)?;
                (version, diff(&head_document, &candidate))
            }
            None => (0, Vec::new()),
        };

        let version = expected_previous + 1;
        let document = if self.config.stores_document(version) {
            Some(candidate)
        } else {
            None
        };

        debug!(
            target: "json_revisions::chain",
            config_id,
            version,
            edits = edits.len(),
            snapshot = document.is_some(),
            "Staged commit"
        );

        Ok(StagedCommit {
            config_id: config_id.to_string(),
            expected_previous,
            revision: Revision::new(version, author.to_string(), document, edits),
        })
    }

    /// Append a staged revision if the head is still the one it was computed against.
    pub fn publish(&self, staged: StagedCommit) -> Result<Revision, Diagnostic> {
        let StagedCommit {
            config_id,
            expected_previous,
            revision,
        } = staged;

        match self
            .store
            .append_revision(&config_id, expected_previous, revision.clone())
        {
            Ok(()) => {
                info!(
                    target: "json_revisions::chain",
                    config_id = %config_id,
                    version = revision.version,
                    author = %revision.author,
                    "Committed revision"
                );
                Ok(revision)
            }
            Err(diag) => {
                if diag.is_retryable() {
                    warn!(
                        target: "json_revisions::chain",
                        config_id = %config_id,
                        expected_previous,
                        "Commit lost the race for the head"
                    );
                }
                Err(diag)
            }
        }
    }

    /// The document as it was at `version`.
    pub fn reconstruct(&self, config_id: &str, version: u64) -> Result<Value, Diagnostic> {
        let head = self.require_head(config_id)?;
        check_range(config_id, version, head.version)?;

        if version == head.version {
            return self.materialize(config_id, head);
        }
        let revision = self.require_revision(config_id, version)?;
        self.materialize(config_id, revision)
    }

    /// Edits that turn version `from` into version `to`.
    ///
    /// Adjacent versions return the stored edits. Anything else is recomputed
    /// from the two reconstructed documents, because positional array edits do
    /// not compose by concatenation in general.
    pub fn diff_between(
        &self,
        config_id: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<EditOp>, Diagnostic> {
        let head = self.require_head(config_id)?;
        check_range(config_id, from, head.version)?;
        check_range(config_id, to, head.version)?;

        if to == from + 1 {
            return Ok(self.require_revision(config_id, to)?.edits);
        }

        let old = self.reconstruct(config_id, from)?;
        let new = self.reconstruct(config_id, to)?;
        Ok(diff(&old, &new))
    }

    /// Commit the document from `version` as a new head. History is never rewritten.
    pub fn rollback(
        &self,
        config_id: &str,
        version: u64,
        author: &str,
    ) -> Result<Revision, Diagnostic> {
        let document = self.reconstruct(config_id, version)?;
        let mut staged = self.stage(config_id, document, author)?;
        staged.revision.rollback_of = Some(version);
        self.publish(staged)
    }

    /// Every revision from 1 to the head, oldest first.
    pub fn history(&self, config_id: &str) -> Result<Vec<Revision>, Diagnostic> {
        let Some(head) = self.store.load_head(config_id)? else {
            return Ok(Vec::new());
        };
        if head.version == 1 {
            return Ok(vec![head]);
        }

        let mut revisions = self.require_range(config_id, 1, head.version - 1)?;
        revisions.push(head);
        Ok(revisions)
    }

    /// Produce the full document for `revision`, replaying edits forward from
    /// the nearest earlier revision that stores one.
    ///
    /// Earlier revisions are fetched in batches that double in size, so a long
    /// run of edit-only revisions costs a handful of store reads.
    fn materialize(&self, config_id: &str, mut revision: Revision) -> Result<Value, Diagnostic> {
        if let Some(document) = revision.document.take() {
            return Ok(document);
        }

        let mut pending: Vec<Revision> = vec![revision];
        let mut batch_size: u64 = 16;

        let (base_version, mut document) = 'search: loop {
            let oldest = pending.last().map(|r| r.version).unwrap_or(1);
            if oldest <= 1 {
                return Err(Diagnostic::fatal(
                    DiagnosticCode::InvalidRevision,
                    format!(
                        "I couldn't rebuild '{}': version {} has no stored document to replay from",
                        config_id, oldest
                    ),
                ));
            }

            let hi = oldest - 1;
            let lo = hi.saturating_sub(batch_size - 1).max(1);
            for mut earlier in self.require_range(config_id, lo, hi)?.into_iter().rev() {
                if let Some(document) = earlier.document.take() {
                    break 'search (earlier.version, document);
                }
                pending.push(earlier);
            }
            batch_size = batch_size.saturating_mul(2);
        };

        debug!(
            target: "json_revisions::chain",
            config_id,
            from = base_version,
            steps = pending.len(),
            "Replaying edits"
        );

        for revision in pending.iter().rev() {
            apply_in_place(&mut document, &revision.edits).map_err(|diag| {
                let description = format!(
                    "I couldn't replay version {} of '{}': {}",
                    revision.version, config_id, diag.description
                );
                Diagnostic { description, ..diag }
            })?;
        }

        Ok(document)
    }

    /// Versions `lo..=hi`, all present and in order.
    fn require_range(&self, config_id: &str, lo: u64, hi: u64) -> Result<Vec<Revision>, Diagnostic> {
        let revisions = self.store.load_range(config_id, lo..=hi)?;
        if !revisions.iter().map(|r| r.version).eq(lo..=hi) {
            return Err(Diagnostic::fatal(
                DiagnosticCode::InvalidRevision,
                format!(
                    "I couldn't load versions {} to {} of '{}' even though the head is past them",
                    lo, hi, config_id
                ),
            ));
        }
        Ok(revisions)
    }

    fn require_head(&self, config_id: &str) -> Result<Revision, Diagnostic> {
        self.store.load_head(config_id)?.ok_or_else(|| {
            Diagnostic::fatal(
                DiagnosticCode::VersionNotFound,
                format!("I couldn't find any versions of '{}'", config_id),
            )
            .with_advice("Commit a document first.".to_string())
        })
    }

    fn require_revision(&self, config_id: &str, version: u64) -> Result<Revision, Diagnostic> {
        self.store.load_revision(config_id, version)?.ok_or_else(|| {
            Diagnostic::fatal(
                DiagnosticCode::InvalidRevision,
                format!(
                    "I couldn't load version {} of '{}' even though the head is past it",
                    version, config_id
                ),
            )
        })
    }
}

fn check_range(config_id: &str, version: u64, head: u64) -> Result<(), Diagnostic> {
    if version == 0 || version > head {
        return Err(Diagnostic::fatal(
            DiagnosticCode::VersionNotFound,
            format!(
                "I couldn't find version {} of '{}' (versions run from 1 to {})",
                version, config_id, head
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveStore;
    use crate::document::{ordered_eq, parse_document};
    use crate::pointer::Path;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn key(k: &str) -> Path {
        Path::new(vec![k.into()])
    }

    fn versions(chain: &RevisionChain<impl RevisionStore>, config_id: &str) -> Vec<u64> {
        chain
            .history(config_id)
            .unwrap()
            .iter()
            .map(|r| r.version)
            .collect()
    }

    #[test]
    fn test_first_commit_is_version_one_with_empty_diff() {
        let chain = RevisionChain::new(MemoryStore::new());
        let revision = chain.commit("cfg", json!({"a": 1}), "alice").unwrap();
        assert_eq!(revision.version, 1);
        assert!(revision.edits.is_empty());
        assert_eq!(revision.author, "alice");
        assert_eq!(revision.document, Some(json!({"a": 1})));
        assert_eq!(revision.rollback_of, None);
    }

    #[test]
    fn test_replace_then_add_between_versions() {
        let chain = RevisionChain::new(MemoryStore::new());
        chain.commit("cfg", json!({"a": 1}), "alice").unwrap();
        chain.commit("cfg", json!({"a": 2, "b": true}), "alice").unwrap();

        assert_eq!(
            chain.diff_between("cfg", 1, 2).unwrap(),
            vec![
                EditOp::replace(key("a"), json!(2)),
                EditOp::add(key("b"), json!(true)),
            ]
        );
    }

    #[test]
    fn test_list_shrink_is_single_remove() {
        let chain = RevisionChain::new(MemoryStore::new());
        chain.commit("cfg", json!({"list": [1, 2, 3]}), "alice").unwrap();
        let revision = chain.commit("cfg", json!({"list": [1, 2]}), "alice").unwrap();

        let expected = vec![EditOp::remove(Path::new(vec!["list".into(), 2.into()]))];
        assert_eq!(revision.edits, expected);
        assert_eq!(chain.diff_between("cfg", 1, 2).unwrap(), expected);
    }

    #[test]
    fn test_old_versions_survive_later_commits() {
        for config in [
            ChainConfig::new(),
            ChainConfig::new().diffs_only(),
            ChainConfig::new().with_snapshot_interval(4),
        ] {
            let chain = RevisionChain::with_config(MemoryStore::new(), config);
            let original = json!({"name": "v1", "items": [1, 2, 3], "nested": {"flag": false}});
            chain.commit("cfg", original.clone(), "alice").unwrap();

            for i in 0..10 {
                chain
                    .commit(
                        "cfg",
                        json!({"name": format!("v{}", i + 2), "items": vec![i; i as usize % 4], "extra": i}),
                        "bob",
                    )
                    .unwrap();
            }

            assert_eq!(chain.reconstruct("cfg", 1).unwrap(), original);
            assert_eq!(versions(&chain, "cfg"), (1..=11).collect::<Vec<u64>>());
        }
    }

    #[test]
    fn test_diffs_only_mode_replays() {
        let chain =
            RevisionChain::with_config(MemoryStore::new(), ChainConfig::new().with_snapshot_interval(3));
        let docs: Vec<Value> = (0..7)
            .map(|i| json!({"count": i, "tags": (0..i).map(|t| format!("t{}", t)).collect::<Vec<_>>()}))
            .collect();
        for doc in &docs {
            chain.commit("cfg", doc.clone(), "alice").unwrap();
        }

        let stored: Vec<bool> = chain
            .history("cfg")
            .unwrap()
            .iter()
            .map(|r| r.is_snapshot())
            .collect();
        assert_eq!(stored, vec![true, false, true, false, false, true, false]);

        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(&chain.reconstruct("cfg", i as u64 + 1).unwrap(), doc);
        }
    }

    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        single_reads: AtomicUsize,
        range_reads: AtomicUsize,
    }

    impl CountingStore {
        fn reset(&self) -> (usize, usize) {
            (
                self.single_reads.swap(0, Ordering::SeqCst),
                self.range_reads.swap(0, Ordering::SeqCst),
            )
        }
    }

    impl RevisionStore for CountingStore {
        fn load_head(&self, config_id: &str) -> Result<Option<Revision>, Diagnostic> {
            self.inner.load_head(config_id)
        }

        fn load_revision(&self, config_id: &str, version: u64) -> Result<Option<Revision>, Diagnostic> {
            self.single_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.load_revision(config_id, version)
        }

        fn load_range(
            &self,
            config_id: &str,
            versions: std::ops::RangeInclusive<u64>,
        ) -> Result<Vec<Revision>, Diagnostic> {
            self.range_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.load_range(config_id, versions)
        }

        fn append_revision(
            &self,
            config_id: &str,
            expected_previous: u64,
            revision: Revision,
        ) -> Result<(), Diagnostic> {
            self.inner.append_revision(config_id, expected_previous, revision)
        }
    }

    #[test]
    fn test_long_replay_reads_store_in_batches() {
        let chain = RevisionChain::with_config(CountingStore::default(), ChainConfig::new().diffs_only());
        for n in 1..=200 {
            chain.commit("cfg", json!({"n": n, "items": vec![n; (n % 5) as usize]}), "alice").unwrap();
        }
        chain.store().reset();

        assert_eq!(
            chain.reconstruct("cfg", 200).unwrap(),
            json!({"n": 200, "items": []})
        );
        let (single, ranged) = chain.store().reset();
        assert_eq!(single, 0);
        assert!(ranged <= 4, "{} range reads", ranged);

        chain.commit("cfg", json!({"n": 201}), "alice").unwrap();
        let (single, ranged) = chain.store().reset();
        assert_eq!(single, 0);
        assert!(ranged <= 4, "{} range reads", ranged);

        assert_eq!(versions(&chain, "cfg"), (1..=201).collect::<Vec<u64>>());
        assert_eq!(chain.store().reset(), (0, 1));
    }

    #[test]
    fn test_negative_zero_survives_replay() {
        let chain = RevisionChain::with_config(MemoryStore::new(), ChainConfig::new().diffs_only());
        chain.commit("cfg", json!({"x": 0.0}), "alice").unwrap();
        let revision = chain.commit("cfg", json!({"x": -0.0}), "alice").unwrap();
        assert_eq!(revision.edits.len(), 1);

        let replayed = chain.reconstruct("cfg", 2).unwrap();
        let x = replayed["x"].as_f64().unwrap();
        assert!(x == 0.0 && x.is_sign_negative());
    }

    #[test]
    fn test_full_documents_keep_exact_key_order() {
        let chain = RevisionChain::new(MemoryStore::new());
        let v1 = parse_document(r#"{"b": 1, "a": 2}"#).unwrap();
        let v2 = parse_document(r#"{"a": 2, "b": 1}"#).unwrap();
        chain.commit("cfg", v1.clone(), "alice").unwrap();
        let revision = chain.commit("cfg", v2.clone(), "alice").unwrap();

        assert!(revision.edits.is_empty());
        assert!(ordered_eq(&chain.reconstruct("cfg", 1).unwrap(), &v1));
        assert!(ordered_eq(&chain.reconstruct("cfg", 2).unwrap(), &v2));
    }

    #[test]
    fn test_no_op_commit_still_advances() {
        let chain = RevisionChain::new(MemoryStore::new());
        chain.commit("cfg", json!({"a": 1}), "alice").unwrap();
        let revision = chain.commit("cfg", json!({"a": 1}), "alice").unwrap();
        assert_eq!(revision.version, 2);
        assert!(revision.edits.is_empty());
    }

    #[test]
    fn test_version_not_found() {
        let chain = RevisionChain::new(MemoryStore::new());

        let err = chain.reconstruct("cfg", 1).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::VersionNotFound);

        chain.commit("cfg", json!(1), "alice").unwrap();
        chain.commit("cfg", json!(2), "alice").unwrap();

        for version in [0, 3, 99] {
            let err = chain.reconstruct("cfg", version).unwrap_err();
            assert_eq!(err.code, DiagnosticCode::VersionNotFound);
        }

        let err = chain.diff_between("cfg", 1, 3).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::VersionNotFound);

        let err = chain.rollback("cfg", 5, "alice").unwrap_err();
        assert_eq!(err.code, DiagnosticCode::VersionNotFound);
        assert_eq!(versions(&chain, "cfg"), vec![1, 2]);
    }

    #[test]
    fn test_diff_between_non_adjacent_recomputes() {
        let chain = RevisionChain::new(MemoryStore::new());
        chain.commit("cfg", json!({"list": [1, 2, 3]}), "alice").unwrap();
        chain.commit("cfg", json!({"list": [1, 2]}), "alice").unwrap();
        chain.commit("cfg", json!({"list": [1, 2, 4]}), "alice").unwrap();

        // Concatenating the stored steps would give remove then add.
        assert_eq!(
            chain.diff_between("cfg", 1, 3).unwrap(),
            vec![EditOp::replace(
                Path::new(vec!["list".into(), 2.into()]),
                json!(4)
            )]
        );
        assert!(chain.diff_between("cfg", 2, 2).unwrap().is_empty());
        assert_eq!(
            chain.diff_between("cfg", 3, 2).unwrap(),
            vec![EditOp::remove(Path::new(vec!["list".into(), 2.into()]))]
        );
    }

    #[test]
    fn test_rollback_appends_historical_content() {
        let chain = RevisionChain::new(MemoryStore::new());
        chain.commit("cfg", json!({"mode": "a"}), "alice").unwrap();
        chain.commit("cfg", json!({"mode": "b", "x": 1}), "bob").unwrap();
        chain.commit("cfg", json!({"mode": "c"}), "carol").unwrap();

        let before = chain.reconstruct("cfg", 2).unwrap();
        let revision = chain.rollback("cfg", 2, "dave").unwrap();

        assert_eq!(revision.version, 4);
        assert_eq!(revision.rollback_of, Some(2));
        assert_eq!(revision.author, "dave");
        assert_eq!(chain.reconstruct("cfg", 4).unwrap(), before);
        assert_eq!(chain.reconstruct("cfg", 3).unwrap(), json!({"mode": "c"}));
        assert_eq!(versions(&chain, "cfg"), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_rollback_in_diffs_only_mode() {
        let chain = RevisionChain::with_config(MemoryStore::new(), ChainConfig::new().diffs_only());
        chain.commit("cfg", json!({"v": [1]}), "alice").unwrap();
        chain.commit("cfg", json!({"v": [1, 2]}), "alice").unwrap();
        chain.commit("cfg", json!({"w": true}), "alice").unwrap();

        let revision = chain.rollback("cfg", 2, "alice").unwrap();
        assert!(!revision.is_snapshot());
        assert_eq!(chain.reconstruct("cfg", 4).unwrap(), json!({"v": [1, 2]}));
    }

    #[test]
    fn test_racing_commit_gets_concurrent_modification() {
        let chain = RevisionChain::new(MemoryStore::new());
        for i in 1..=5 {
            chain.commit("cfg", json!({"n": i}), "setup").unwrap();
        }

        let first = chain.stage("cfg", json!({"n": 6, "by": "first"}), "first").unwrap();
        let second = chain.stage("cfg", json!({"n": 6, "by": "second"}), "second").unwrap();
        assert_eq!(first.expected_previous, 5);
        assert_eq!(second.expected_previous, 5);

        let winner = chain.publish(first).unwrap();
        assert_eq!(winner.version, 6);

        let err = chain.publish(second).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::ConcurrentModification);
        assert!(err.is_retryable());

        assert_eq!(versions(&chain, "cfg"), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            chain.reconstruct("cfg", 6).unwrap(),
            json!({"n": 6, "by": "first"})
        );

        let retried = chain
            .commit("cfg", json!({"n": 6, "by": "second"}), "second")
            .unwrap();
        assert_eq!(retried.version, 7);
        assert_eq!(
            retried.edits,
            vec![EditOp::replace(key("by"), json!("second"))]
        );
    }

    #[test]
    fn test_threaded_commits_stay_gapless() {
        let chain = Arc::new(RevisionChain::new(Arc::new(MemoryStore::new())));
        let writers = 8;
        let commits_per_writer = 20;
        let barrier = Arc::new(Barrier::new(writers));

        let handles: Vec<_> = (0..writers)
            .map(|writer| {
                let chain = Arc::clone(&chain);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut conflicts = 0;
                    for n in 0..commits_per_writer {
                        let candidate = json!({"writer": writer, "n": n});
                        loop {
                            match chain.commit("shared", candidate.clone(), "worker") {
                                Ok(_) => break,
                                Err(diag) if diag.is_retryable() => conflicts += 1,
                                Err(diag) => panic!("unexpected failure: {}", diag),
                            }
                        }
                    }
                    conflicts
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let total = (writers * commits_per_writer) as u64;
        assert_eq!(versions(&*chain, "shared"), (1..=total).collect::<Vec<u64>>());

        // Every stored step must replay onto its predecessor.
        for version in 2..=total {
            let before = chain.reconstruct("shared", version - 1).unwrap();
            let after = chain.reconstruct("shared", version).unwrap();
            let step = chain.diff_between("shared", version - 1, version).unwrap();
            assert_eq!(crate::patch::apply(&before, &step).unwrap(), after);
        }
    }

    #[test]
    fn test_configs_are_independent() {
        let chain = RevisionChain::new(MemoryStore::new());
        chain.commit("a", json!(1), "alice").unwrap();
        chain.commit("a", json!(2), "alice").unwrap();
        let revision = chain.commit("b", json!(10), "alice").unwrap();

        assert_eq!(revision.version, 1);
        assert_eq!(chain.head("a").unwrap().unwrap().version, 2);
        assert!(chain.history("c").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_edit_surfaces_on_replay() {
        let store = MemoryStore::new();
        store
            .append_revision("cfg", 0, Revision::new(1, "a".into(), Some(json!({})), vec![]))
            .unwrap();
        store
            .append_revision(
                "cfg",
                1,
                Revision::new(2, "a".into(), None, vec![EditOp::remove(key("missing"))]),
            )
            .unwrap();

        let chain = RevisionChain::new(store);
        let err = chain.reconstruct("cfg", 2).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::PathNotFound);
        assert!(err.description.contains("version 2"));
    }

    #[test]
    fn test_missing_base_document() {
        let store = MemoryStore::new();
        store
            .append_revision("cfg", 0, Revision::new(1, "a".into(), None, vec![]))
            .unwrap();
        let chain = RevisionChain::new(store);
        let err = chain.reconstruct("cfg", 1).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::InvalidRevision);
    }

    #[test]
    fn test_archive_store_backed_chain() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let config = ChainConfig::new().with_snapshot_interval(2);
        {
            let chain = RevisionChain::with_config(ArchiveStore::open(dir.path())?, config);
            chain.commit("app/prod", json!({"replicas": 1}), "alice")?;
            chain.commit("app/prod", json!({"replicas": 2, "image": "v2"}), "bob")?;
            chain.commit("app/prod", json!({"replicas": 3, "image": "v2"}), "carol")?;
        }

        // A fresh store over the same directory sees the same history.
        let chain = RevisionChain::with_config(ArchiveStore::open(dir.path())?, config);
        assert_eq!(chain.head("app/prod")?.map(|r| r.version), Some(3));
        assert_eq!(
            chain.reconstruct("app/prod", 3)?,
            json!({"replicas": 3, "image": "v2"})
        );
        assert_eq!(
            chain.diff_between("app/prod", 1, 2)?,
            vec![
                EditOp::replace(key("replicas"), json!(2)),
                EditOp::add(key("image"), json!("v2")),
            ]
        );

        let revision = chain.rollback("app/prod", 1, "dave")?;
        assert_eq!(revision.version, 4);
        assert_eq!(chain.reconstruct("app/prod", 4)?, json!({"replicas": 1}));
        Ok(())
    }
}
