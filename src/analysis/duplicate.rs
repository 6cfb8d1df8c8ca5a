//! Duplicate-transfer detection
//!
//! Two or more transfers carrying the same content to the same destination
//! device are duplicates: the payload already arrived once and could have
//! been reused.

use std::collections::BTreeMap;

use crate::analysis::OpGroup;
use crate::event::{DataOp, DeviceId};

/// Group transfers by `(fingerprint, dest_device)` and keep the groups with
/// at least two members, ranked ascending by total elapsed time.
pub fn detect(ops: &[DataOp]) -> Vec<OpGroup> {
    let mut received: BTreeMap<(u64, DeviceId), Vec<usize>> = BTreeMap::new();
    for (idx, op) in ops.iter().enumerate() {
        if !op.kind.is_transfer() {
            continue;
        }
        received
            .entry((op.fingerprint, op.dest_device))
            .or_default()
            .push(idx);
    }

    let mut groups = Vec::new();
    for members in received.into_values() {
        if members.len() < 2 {
            // a unique hash is not a duplicate transfer
            continue;
        }
        let total_time = members.iter().map(|&idx| ops[idx].duration()).sum();
        groups.push(OpGroup {
            total_time,
            ops: members,
        });
    }
    groups.sort_by_key(|group| group.total_time);
    groups
}
