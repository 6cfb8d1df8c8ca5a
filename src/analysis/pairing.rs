//! Allocation/deletion pairing and peak memory accounting
//!
//! Walks the data-op log chronologically, matching each delete with the live
//! allocation at the same `(address, device)` and tracking allocated bytes
//! per device. A delete with no live allocation is an ingest anomaly (warn
//! and skip); allocations still live at the end of the walk are reported as
//! a warning and excluded from the detectors that need closed lifetimes.

use std::collections::BTreeMap;

use tracing::warn;

use crate::analysis::device_slot;
use crate::event::{DataOp, DeviceId};

/// Result of the pairing walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPairing {
    /// `(alloc_index, delete_index)` pairs, sorted by
    /// `(alloc.start, delete.start, alloc.end, delete.end)`.
    pub pairs: Vec<(usize, usize)>,
    /// Peak allocated bytes per target device, with a trailing host slot.
    pub peak_allocated_bytes: Vec<u64>,
    /// Allocations with no matching delete (leak or truncated capture).
    pub unmatched_allocs: u64,
}

pub fn pair_allocations(ops: &[DataOp], num_devices: u32) -> AllocationPairing {
    let slots = num_devices as usize + 1;
    let mut live: BTreeMap<(u64, DeviceId), usize> = BTreeMap::new();
    let mut allocated = vec![0u64; slots];
    let mut peak = vec![0u64; slots];
    let mut pairs = Vec::new();

    for (idx, op) in ops.iter().enumerate() {
        if op.kind.is_alloc() {
            live.insert((op.dest_addr, op.dest_device), idx);
            let slot = device_slot(op.dest_device, num_devices);
            allocated[slot] += op.bytes;
            if allocated[slot] > peak[slot] {
                peak[slot] = allocated[slot];
            }
        } else if op.kind.is_delete() {
            match live.remove(&(op.src_addr, op.src_device)) {
                Some(alloc_idx) => {
                    pairs.push((alloc_idx, idx));
                    let alloc = &ops[alloc_idx];
                    let slot = device_slot(alloc.dest_device, num_devices);
                    debug_assert!(allocated[slot] >= alloc.bytes);
                    allocated[slot] = allocated[slot].saturating_sub(alloc.bytes);
                }
                None => {
                    warn!(
                        "delete of {:#x} on device {} has no matching allocation; skipping",
                        op.src_addr, op.src_device
                    );
                }
            }
        }
    }

    let unmatched_allocs = live.len() as u64;
    if unmatched_allocs > 0 {
        warn!(
            "{unmatched_allocs} allocation(s) were never deleted; \
             excluded from paired-lifetime analysis"
        );
    }

    pairs.sort_by_key(|&(alloc_idx, delete_idx)| {
        let alloc = &ops[alloc_idx];
        let delete = &ops[delete_idx];
        (
            alloc.start_time,
            delete.start_time,
            alloc.end_time,
            delete.end_time,
        )
    });

    AllocationPairing {
        pairs,
        peak_allocated_bytes: peak,
        unmatched_allocs,
    }
}
