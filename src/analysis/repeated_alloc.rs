//! Repeated-allocation detection
//!
//! Multiple alloc/delete pairs for the same host address, target device, and
//! size across the run: the buffer could have been allocated once and
//! reused.

use std::collections::BTreeMap;

use crate::analysis::PairGroup;
use crate::event::{DataOp, DeviceId};

/// Group the allocation pair list by `(host_addr, tgt_device, bytes)` and
/// keep the groups with at least two members, ranked ascending by the summed
/// alloc + delete durations.
pub fn detect(ops: &[DataOp], pairs: &[(usize, usize)]) -> Vec<PairGroup> {
    let mut repeated: BTreeMap<(u64, DeviceId, u64), Vec<(usize, usize)>> = BTreeMap::new();
    for &(alloc_idx, delete_idx) in pairs {
        let alloc = &ops[alloc_idx];
        repeated
            .entry((alloc.src_addr, alloc.dest_device, alloc.bytes))
            .or_default()
            .push((alloc_idx, delete_idx));
    }

    let mut groups = Vec::new();
    for members in repeated.into_values() {
        if members.len() < 2 {
            continue;
        }
        let total_time = members
            .iter()
            .map(|&(alloc_idx, delete_idx)| ops[alloc_idx].duration() + ops[delete_idx].duration())
            .sum();
        groups.push(PairGroup {
            total_time,
            pairs: members,
        });
    }
    groups.sort_by_key(|group| group.total_time);
    groups
}
