//! Append-only proof history with hash-chained records.
//!
//! Records are stored in completion order. Lookup by content hash is O(1)
//! through a side index, and aggregate statistics are computed on demand
//! rather than maintained incrementally. The store is internally synchronized
//! and owned by the orchestrator.
//!
//! Retention is unbounded: records accumulate for the life of the process.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::record::ProofRecord;
use crate::{ProofId, ProofMode};

/// Aggregate statistics over the stored history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryStats {
    /// Total number of records.
    pub count: usize,
    /// Records produced by the real prover.
    pub real_count: usize,
    /// Records produced by the fallback simulation.
    pub fallback_count: usize,
    /// Mean generation time in milliseconds, 0 when empty.
    pub mean_elapsed_ms: f64,
    /// Mean reported payload size in bytes, 0 when empty.
    pub mean_payload_size: f64,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<ProofRecord>,
    by_id: HashMap<ProofId, usize>,
    by_hash: HashMap<u64, usize>,
}

/// Stores every completed proof of this process, in completion order.
#[derive(Debug, Default)]
pub struct ProofHistoryStore {
    inner: RwLock<Inner>,
}

impl ProofHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a completed record.
    ///
    /// A record reusing an existing content hash replaces the index entry, so
    /// lookups always resolve to the newest record with that hash. The
    /// positional sequence is never rewritten.
    pub fn append(&self, record: ProofRecord) {
        let mut inner = self.inner.write();
        let index = inner.records.len();
        inner.by_id.insert(record.id, index);
        inner.by_hash.insert(record.content_hash, index);
        inner.records.push(record);
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// All records in completion order.
    #[must_use]
    pub fn all(&self) -> Vec<ProofRecord> {
        self.inner.read().records.clone()
    }

    /// The most recent record, if any.
    #[must_use]
    pub fn last(&self) -> Option<ProofRecord> {
        self.inner.read().records.last().cloned()
    }

    /// Content hash of the most recent record, used to chain the next one.
    #[must_use]
    pub fn last_content_hash(&self) -> Option<u64> {
        self.inner.read().records.last().map(|r| r.content_hash)
    }

    /// Looks up a record by its proof id.
    #[must_use]
    pub fn by_id(&self, id: ProofId) -> Option<ProofRecord> {
        let inner = self.inner.read();
        inner
            .by_id
            .get(&id)
            .map(|&index| inner.records[index].clone())
    }

    /// Looks up a record by its content hash.
    #[must_use]
    pub fn by_hash(&self, content_hash: u64) -> Option<ProofRecord> {
        let inner = self.inner.read();
        inner
            .by_hash
            .get(&content_hash)
            .map(|&index| inner.records[index].clone())
    }

    /// Number of records produced in the given mode.
    #[must_use]
    pub fn count_by_mode(&self, mode: ProofMode) -> usize {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| r.mode == mode)
            .count()
    }

    /// Computes aggregate statistics over the current contents.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        let inner = self.inner.read();
        let count = inner.records.len();
        if count == 0 {
            return HistoryStats {
                count: 0,
                real_count: 0,
                fallback_count: 0,
                mean_elapsed_ms: 0.0,
                mean_payload_size: 0.0,
            };
        }

        let mut real_count = 0;
        let mut elapsed_total: u128 = 0;
        let mut size_total: u128 = 0;
        for record in &inner.records {
            if record.mode == ProofMode::Real {
                real_count += 1;
            }
            elapsed_total += u128::from(record.elapsed_ms);
            size_total += u128::from(record.payload_size);
        }

        HistoryStats {
            count,
            real_count,
            fallback_count: count - real_count,
            mean_elapsed_ms: elapsed_total as f64 / count as f64,
            mean_payload_size: size_total as f64 / count as f64,
        }
    }
}
