//! Unused-allocation detection
//!
//! An allocation whose whole lifetime (alloc start through delete end) never
//! overlaps a device-execution region on its device was never used by target
//! code. Overlap is closed-interval: touching endpoints count as use.

use std::collections::BTreeMap;

use crate::analysis::PairGroup;
use crate::event::{DataOp, DeviceId, TargetRegion};

/// Walk each device's pair list against its region list with a shared
/// cursor; both are chronological. Groups are keyed
/// `(host_addr, tgt_device, bytes)`; a single unused allocation is still a
/// finding.
pub fn detect(
    ops: &[DataOp],
    regions: &[TargetRegion],
    device_regions: &[Vec<usize>],
    device_pairs: &[Vec<(usize, usize)>],
) -> Vec<PairGroup> {
    let mut unused: BTreeMap<(u64, DeviceId, u64), Vec<(usize, usize)>> = BTreeMap::new();

    for (region_idxs, pair_list) in device_regions.iter().zip(device_pairs) {
        let mut region_cursor = 0usize;
        for &(alloc_idx, delete_idx) in pair_list {
            let alloc = &ops[alloc_idx];
            let delete = &ops[delete_idx];
            // First region that might overlap this allocation's lifetime.
            while region_cursor < region_idxs.len()
                && regions[region_idxs[region_cursor]].end_time < alloc.start_time
            {
                region_cursor += 1;
            }
            let overlaps = region_cursor < region_idxs.len()
                && regions[region_idxs[region_cursor]].start_time <= delete.end_time;
            if !overlaps {
                unused
                    .entry((alloc.src_addr, alloc.dest_device, alloc.bytes))
                    .or_default()
                    .push((alloc_idx, delete_idx));
            }
        }
    }

    let mut groups = Vec::new();
    for members in unused.into_values() {
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
