//! Allowlist store: the set of permitted destination domains.
//!
//! The store holds one immutable [`Snapshot`] behind an `ArcSwap`. `replace`
//! builds the next snapshot off to the side and swaps the pointer, so a
//! concurrent `contains` observes either the previous set or the new one in
//! full. Until the first `replace` the snapshot is empty and every lookup
//! fails (fail-closed).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::authority::normalize_host;

/// Immutable allowlist contents at one point in time.
#[derive(Debug, Default)]
pub struct Snapshot {
    domains: HashSet<String>,
    revision: u64,
}

impl Snapshot {
    /// Revision of this snapshot. 0 means "never refreshed".
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Exact membership check. `host` must already be normalized.
    pub fn contains_normalized(&self, host: &str) -> bool {
        !host.is_empty() && self.domains.contains(host)
    }

    /// Sorted copy of the domains (logging and diagnostics).
    pub fn sorted(&self) -> Vec<String> {
        let mut out: Vec<String> = self.domains.iter().cloned().collect();
        out.sort();
        out
    }
}

/// Single-writer / many-reader allowlist scoped to one filter instance.
#[derive(Debug, Default)]
pub struct AllowlistStore {
    current: ArcSwap<Snapshot>,
    revisions: AtomicU64,
}

impl AllowlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new snapshot, discarding the old one entirely.
    ///
    /// Entries are trimmed and lowercased; empty entries are dropped.
    /// Returns the revision of the installed snapshot.
    pub fn replace<I, S>(&self, domains: I) -> u64
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains: HashSet<String> = domains
            .into_iter()
            .filter_map(|d| {
                let d = d.as_ref().trim();
                (!d.is_empty()).then(|| d.to_ascii_lowercase())
            })
            .collect();

        let revision = self.revisions.fetch_add(1, Ordering::AcqRel) + 1;
        self.current.store(Arc::new(Snapshot { domains, revision }));
        revision
    }

    /// True iff the normalized `host` is in the current snapshot.
    pub fn contains(&self, host: &str) -> bool {
        let host = normalize_host(host);
        self.current.load().contains_normalized(&host)
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.current.load().revision()
    }

    /// True once at least one refresh has been installed (even an empty one).
    pub fn is_populated(&self) -> bool {
        self.revision() > 0
    }
}
