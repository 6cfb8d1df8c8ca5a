//! Round-trip transfer detection
//!
//! A round trip is an outbound transfer of content F from device A to device
//! B followed by a transfer of the same (unmodified) content from B back to
//! A. Matching is first-in-first-out: for each outbound leg the earliest
//! inbound transfer of F into A is taken as the return leg, and the outbound
//! leg is popped from its own bucket so it cannot be credited to a second
//! trip.

use std::collections::{BTreeMap, VecDeque};

use crate::analysis::PairGroup;
use crate::event::{DataOp, DeviceId};

/// Detect round trips, grouped by `(fingerprint, src_device, dest_device)`
/// and ranked ascending by the summed duration of both legs.
pub fn detect(ops: &[DataOp]) -> Vec<PairGroup> {
    // All transfers keyed by (fingerprint, dest_device), chronological
    // because the log is normalized.
    let mut received: BTreeMap<(u64, DeviceId), VecDeque<usize>> = BTreeMap::new();
    for (idx, op) in ops.iter().enumerate() {
        if !op.kind.is_transfer() {
            continue;
        }
        received
            .entry((op.fingerprint, op.dest_device))
            .or_default()
            .push_back(idx);
    }

    let mut trips: BTreeMap<(u64, DeviceId, DeviceId), Vec<(usize, usize)>> = BTreeMap::new();
    for (tx_idx, op) in ops.iter().enumerate() {
        if !op.kind.is_transfer() {
            continue;
        }
        // Is this content later received back by the source device?
        let rx_key = (op.fingerprint, op.src_device);
        let Some(rx_idx) = received.get(&rx_key).and_then(|bucket| bucket.front().copied())
        else {
            // the round trip is never completed; the data is not sent back
            continue;
        };
        trips
            .entry((op.fingerprint, op.src_device, op.dest_device))
            .or_default()
            .push((tx_idx, rx_idx));
        // Remove the outbound leg from its own bucket so it is not counted
        // as the completion of another trip.
        if let Some(own_bucket) = received.get_mut(&(op.fingerprint, op.dest_device)) {
            own_bucket.pop_front();
        }
    }

    let mut groups = Vec::new();
    for legs in trips.into_values() {
        let total_time = legs
            .iter()
            .map(|&(tx, rx)| ops[tx].duration() + ops[rx].duration())
            .sum();
        groups.push(PairGroup {
            total_time,
            pairs: legs,
        });
    }
    groups.sort_by_key(|group| group.total_time);
    groups
}
