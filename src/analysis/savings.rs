//! Potential-savings aggregation
//!
//! Each detector marks a subset of its findings as avoidable; those op
//! identities are unioned into one set before totalling so that an op
//! flagged by several detectors is only counted once. The per-category call
//! counts are reported independently and may add up to more than the
//! deduplicated totals.

use std::collections::BTreeSet;

use crate::analysis::{OpGroup, PairGroup};
use crate::event::DataOp;

/// Non-double-counted savings totals plus per-category call counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Savings {
    /// Duplicate transfers beyond the first of each group.
    pub duplicate_calls: u64,
    /// Number of duplicate groups (distinct content hashes).
    pub duplicate_unique_hashes: u64,
    pub round_trip_calls: u64,
    /// Repeated allocations beyond the first of each group.
    pub repeated_alloc_calls: u64,
    pub unused_alloc_calls: u64,
    pub unused_transfer_calls: u64,
    /// Summed elapsed time of the deduplicated avoidable ops.
    pub time: u64,
    /// `time` as a fraction of total execution time.
    pub time_share: f64,
    pub transfer_calls: u64,
    pub transfer_bytes: u64,
    pub alloc_calls: u64,
    pub alloc_bytes: u64,
}

/// Apply the per-detector avoidability rules and total the union.
pub fn aggregate(
    ops: &[DataOp],
    duplicate_transfers: &[OpGroup],
    round_trips: &[PairGroup],
    repeated_allocs: &[PairGroup],
    unused_allocs: &[PairGroup],
    unused_transfers: &[OpGroup],
    exec_time: u64,
) -> Savings {
    let mut avoidable: BTreeSet<usize> = BTreeSet::new();
    let mut savings = Savings {
        duplicate_unique_hashes: duplicate_transfers.len() as u64,
        ..Savings::default()
    };

    // Duplicate transfers: the first of each group is unavoidable.
    for group in duplicate_transfers {
        savings.duplicate_calls += group.ops.len() as u64 - 1;
        avoidable.extend(group.ops.iter().skip(1));
    }

    // Round trips: every return leg, plus every outbound leg after the
    // first of each group.
    for group in round_trips {
        savings.round_trip_calls += group.pairs.len() as u64;
        for (i, &(tx_idx, rx_idx)) in group.pairs.iter().enumerate() {
            if i != 0 {
                avoidable.insert(tx_idx);
            }
            avoidable.insert(rx_idx);
        }
    }

    // Repeated allocations: the first allocation and the last delete of each
    // group are unavoidable.
    for group in repeated_allocs {
        savings.repeated_alloc_calls += group.pairs.len() as u64 - 1;
        let last = group.pairs.len() - 1;
        for (i, &(alloc_idx, delete_idx)) in group.pairs.iter().enumerate() {
            if i != 0 {
                avoidable.insert(alloc_idx);
            }
            if i != last {
                avoidable.insert(delete_idx);
            }
        }
    }

    // Unused allocations: both ops of every member.
    for group in unused_allocs {
        savings.unused_alloc_calls += group.pairs.len() as u64;
        for &(alloc_idx, delete_idx) in &group.pairs {
            avoidable.insert(alloc_idx);
            avoidable.insert(delete_idx);
        }
    }

    // Unused transfers: every member.
    for group in unused_transfers {
        savings.unused_transfer_calls += group.ops.len() as u64;
        avoidable.extend(group.ops.iter());
    }

    for &idx in &avoidable {
        let op = &ops[idx];
        let duration = op.duration();
        savings.time += duration;
        if exec_time > 0 {
            savings.time_share += duration as f64 / exec_time as f64;
        }
        if op.kind.is_alloc() {
            savings.alloc_calls += 1;
            savings.alloc_bytes += op.bytes;
        } else if op.kind.is_transfer() {
            savings.transfer_calls += 1;
            savings.transfer_bytes += op.bytes;
        }
    }

    savings
}
