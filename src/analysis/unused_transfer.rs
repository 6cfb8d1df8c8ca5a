//! Unused-transfer detection
//!
//! A transfer to a device is unused when its payload is never consumed by a
//! subsequent device-execution region: either the device is never active
//! again, or another transfer to the same host address supersedes the
//! payload before any region runs.

use std::collections::BTreeMap;

use crate::analysis::OpGroup;
use crate::event::{DataOp, DeviceId, TargetRegion};

/// Walk each device's inbound transfers against its region list. Groups are
/// keyed `(host_addr, tgt_device, bytes)`.
pub fn detect(
    ops: &[DataOp],
    regions: &[TargetRegion],
    device_regions: &[Vec<usize>],
    device_transfers: &[Vec<usize>],
) -> Vec<OpGroup> {
    let mut unused: BTreeMap<(u64, DeviceId, u64), Vec<usize>> = BTreeMap::new();

    for (region_idxs, transfer_idxs) in device_regions.iter().zip(device_transfers) {
        let mut region_cursor = 0usize;
        // Transfers that landed in a gap before any device activity; the key
        // is the host address they copied from.
        let mut candidates: BTreeMap<u64, usize> = BTreeMap::new();
        for &transfer_idx in transfer_idxs {
            let transfer = &ops[transfer_idx];
            while region_cursor < region_idxs.len()
                && regions[region_idxs[region_cursor]].end_time < transfer.start_time
            {
                region_cursor += 1;
            }
            if region_cursor == region_idxs.len() {
                // The device never becomes active again.
                unused
                    .entry((transfer.src_addr, transfer.dest_device, transfer.bytes))
                    .or_default()
                    .push(transfer_idx);
            } else if regions[region_idxs[region_cursor]].start_time > transfer.start_time {
                // Lands in a gap before the next region; a candidate until a
                // region consumes it or a newer transfer supersedes it.
                if let Some(prior_idx) = candidates.insert(transfer.src_addr, transfer_idx) {
                    let prior = &ops[prior_idx];
                    unused
                        .entry((prior.src_addr, prior.dest_device, prior.bytes))
                        .or_default()
                        .push(prior_idx);
                }
            } else {
                // The transfer overlaps a device region; pending candidates
                // are presumed consumed.
                candidates.clear();
            }
        }
    }

    let mut groups = Vec::new();
    for members in unused.into_values() {
        let total_time = members.iter().map(|&idx| ops[idx].duration()).sum();
        groups.push(OpGroup {
            total_time,
            ops: members,
        });
    }
    groups.sort_by_key(|group| group.total_time);
    groups
}
