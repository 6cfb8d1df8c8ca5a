//! Content fingerprinting for transfer payloads
//!
//! Transfers are correlated across the event log by a content hash over the
//! transferred bytes. The hash function is pluggable; two payloads with equal
//! fingerprints are presumed identical unless the optional collision auditor
//! proves otherwise by byte comparison.

use std::collections::BTreeMap;

use tracing::warn;
use xxhash_rust::xxh3::xxh3_64;

/// Default cap on bytes retained by the collision auditor (256 MiB).
pub const DEFAULT_AUDIT_BUDGET: u64 = 256 * 1024 * 1024;

/// Content-hash capability bound at engine construction.
pub trait Fingerprinter: Send + Sync {
    /// Hash a byte range. Equal inputs must produce equal outputs; the
    /// result is value-comparable and totally ordered.
    fn hash(&self, bytes: &[u8]) -> u64;
}

/// Default fingerprinter backed by XXH3-64.
#[derive(Debug, Default, Clone, Copy)]
pub struct Xxh3Fingerprinter;

impl Fingerprinter for Xxh3Fingerprinter {
    fn hash(&self, bytes: &[u8]) -> u64 {
        xxh3_64(bytes)
    }
}

/// Summary counts produced by the collision auditor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionSummary {
    /// Distinct byte patterns observed minus distinct hash values.
    pub collisions: u64,
    /// Distinct byte patterns observed.
    pub unique_keys: u64,
}

impl CollisionSummary {
    /// Collision rate as a percentage of unique keys.
    pub fn rate_percent(&self) -> f64 {
        if self.unique_keys == 0 {
            return 0.0;
        }
        self.collisions as f64 / self.unique_keys as f64 * 100.0
    }
}

/// Tracks, per fingerprint, the set of byte-exact distinct payloads observed.
///
/// Every inserted payload is byte-compared against the stored patterns under
/// the same hash; a novel pattern is retained as an owned copy. Retained
/// bytes are bounded by a budget; once exceeded, auditing degrades (new
/// patterns are no longer stored) with a single warning.
#[derive(Debug)]
pub struct CollisionAuditor {
    entries: BTreeMap<u64, Vec<Box<[u8]>>>,
    bytes_stored: u64,
    budget: u64,
    degraded: bool,
}

impl CollisionAuditor {
    pub fn new(budget: u64) -> Self {
        Self {
            entries: BTreeMap::new(),
            bytes_stored: 0,
            budget,
            degraded: false,
        }
    }

    /// Record one observed payload under its fingerprint.
    pub fn record(&mut self, hash: u64, payload: &[u8]) {
        let patterns = self.entries.entry(hash).or_default();
        if patterns.iter().any(|p| p.as_ref() == payload) {
            return;
        }
        if self.bytes_stored + payload.len() as u64 > self.budget {
            if !self.degraded {
                warn!("memory budget exceeded; hash collision checking is degraded");
                self.degraded = true;
            }
            return;
        }
        self.bytes_stored += payload.len() as u64;
        patterns.push(payload.to_vec().into_boxed_slice());
    }

    pub fn summary(&self) -> CollisionSummary {
        let mut collisions = 0u64;
        let mut unique_keys = 0u64;
        for patterns in self.entries.values() {
            collisions += patterns.len() as u64 - 1;
            unique_keys += patterns.len() as u64;
        }
        CollisionSummary {
            collisions,
            unique_keys,
        }
    }
}
