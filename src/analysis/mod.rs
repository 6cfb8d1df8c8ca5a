//! Post-mortem analysis passes
//!
//! Runs after capture completes, over the normalized event logs. Five
//! independent detectors produce grouped findings; the savings aggregator
//! unions their avoidable-op sets; the code-location profiler and per-kind
//! summary give the orthogonal cost breakdowns.
//!
//! Derived structures reference ops by index into the normalized data-op log
//! so findings stay valid for the lifetime of the analysis pass without
//! borrowing from the logs. Grouping maps are `BTreeMap`s and rankings are
//! stable sorts, so identical inputs produce bit-identical reports.

pub mod codeptr;
pub mod duplicate;
pub mod pairing;
pub mod repeated_alloc;
pub mod round_trip;
pub mod savings;
pub mod unused_alloc;
pub mod unused_transfer;

#[cfg(test)]
mod tests;

use crate::event::{DataOp, DeviceId, TargetRegion};

/// A ranked finding over individual ops (duplicate transfers, unused
/// transfers, code locations). `ops` holds indices into the data-op log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpGroup {
    /// Sum of member durations in nanoseconds.
    pub total_time: u64,
    pub ops: Vec<usize>,
}

/// A ranked finding over op pairs: (alloc, delete) for allocation findings,
/// (tx, rx) for round trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairGroup {
    /// Sum of member durations in nanoseconds.
    pub total_time: u64,
    pub pairs: Vec<(usize, usize)>,
}

/// Everything the reporter needs, computed in one pass over the logs.
#[derive(Debug)]
pub struct Analysis {
    pub duplicate_transfers: Vec<OpGroup>,
    pub round_trips: Vec<PairGroup>,
    pub repeated_allocs: Vec<PairGroup>,
    pub unused_allocs: Vec<PairGroup>,
    pub unused_transfers: Vec<OpGroup>,
    pub savings: savings::Savings,
    /// Peak allocated bytes per target device (`0..num_devices`), with a
    /// trailing host slot.
    pub peak_allocated_bytes: Vec<u64>,
    pub code_locations: Vec<OpGroup>,
    pub op_summary: Vec<codeptr::OpKindSummary>,
}

/// Run every analysis pass over the normalized logs.
pub fn analyze(
    ops: &[DataOp],
    regions: &[TargetRegion],
    num_devices: u32,
    exec_time: u64,
) -> Analysis {
    let duplicate_transfers = duplicate::detect(ops);
    let round_trips = round_trip::detect(ops);

    let pairing = pairing::pair_allocations(ops, num_devices);
    let repeated_allocs = repeated_alloc::detect(ops, &pairing.pairs);

    let device_regions = bucket_regions_by_device(regions, num_devices);
    let device_pairs = bucket_pairs_by_device(ops, &pairing.pairs, num_devices);
    let device_transfers = bucket_inbound_transfers(ops, num_devices);

    let unused_allocs = unused_alloc::detect(ops, regions, &device_regions, &device_pairs);
    let unused_transfers =
        unused_transfer::detect(ops, regions, &device_regions, &device_transfers);

    let savings = savings::aggregate(
        ops,
        &duplicate_transfers,
        &round_trips,
        &repeated_allocs,
        &unused_allocs,
        &unused_transfers,
        exec_time,
    );

    let code_locations = codeptr::profile(ops);
    let op_summary = codeptr::summarize_kinds(ops);

    Analysis {
        duplicate_transfers,
        round_trips,
        repeated_allocs,
        unused_allocs,
        unused_transfers,
        savings,
        peak_allocated_bytes: pairing.peak_allocated_bytes,
        code_locations,
        op_summary,
    }
}

/// Region indices per target device, in log order.
pub fn bucket_regions_by_device(regions: &[TargetRegion], num_devices: u32) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); num_devices as usize];
    for (idx, region) in regions.iter().enumerate() {
        if let Some(bucket) = buckets.get_mut(region.device as usize) {
            bucket.push(idx);
        }
    }
    buckets
}

/// Allocation pairs per target device (by the alloc's destination), keeping
/// the pair list's chronological order.
pub fn bucket_pairs_by_device(
    ops: &[DataOp],
    pairs: &[(usize, usize)],
    num_devices: u32,
) -> Vec<Vec<(usize, usize)>> {
    let mut buckets = vec![Vec::new(); num_devices as usize];
    for &(alloc_idx, delete_idx) in pairs {
        let device = ops[alloc_idx].dest_device as usize;
        if let Some(bucket) = buckets.get_mut(device) {
            bucket.push((alloc_idx, delete_idx));
        }
    }
    buckets
}

/// Inbound (host-to-device) transfer indices per target device, in log order.
pub fn bucket_inbound_transfers(ops: &[DataOp], num_devices: u32) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); num_devices as usize];
    for (idx, op) in ops.iter().enumerate() {
        if !op.kind.is_transfer_to() {
            continue;
        }
        if let Some(bucket) = buckets.get_mut(op.dest_device as usize) {
            bucket.push(idx);
        }
    }
    buckets
}

/// Slot for indexing the per-device byte counters; ids past the device range
/// fold into the host slot.
pub(crate) fn device_slot(device: DeviceId, num_devices: u32) -> usize {
    device.min(num_devices) as usize
}
