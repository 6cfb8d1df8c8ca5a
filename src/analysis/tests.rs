// Cross-detector tests driving the full analysis pass over synthetic,
// already-normalized event logs.

use super::*;
use crate::event::OpKind;

const EXEC_TIME: u64 = 100;

fn transfer_to(fp: u64, host_addr: u64, dev_addr: u64, bytes: u64, start: u64, end: u64) -> DataOp {
    DataOp {
        kind: OpKind::TransferToDevice,
        src_addr: host_addr,
        dest_addr: dev_addr,
        src_device: 1,
        dest_device: 0,
        bytes,
        code_loc: 0x100,
        start_time: start,
        end_time: end,
        fingerprint: fp,
    }
}

fn transfer_from(fp: u64, dev_addr: u64, host_addr: u64, bytes: u64, start: u64, end: u64) -> DataOp {
    DataOp {
        kind: OpKind::TransferFromDevice,
        src_addr: dev_addr,
        dest_addr: host_addr,
        src_device: 0,
        dest_device: 1,
        bytes,
        code_loc: 0x110,
        start_time: start,
        end_time: end,
        fingerprint: fp,
    }
}

fn alloc(host_addr: u64, dev_addr: u64, bytes: u64, start: u64, end: u64) -> DataOp {
    DataOp {
        kind: OpKind::Alloc,
        src_addr: host_addr,
        dest_addr: dev_addr,
        src_device: 1,
        dest_device: 0,
        bytes,
        code_loc: 0x120,
        start_time: start,
        end_time: end,
        fingerprint: 0,
    }
}

fn delete(dev_addr: u64, bytes: u64, start: u64, end: u64) -> DataOp {
    DataOp {
        kind: OpKind::Delete,
        src_addr: dev_addr,
        dest_addr: 0,
        src_device: 0,
        dest_device: 1,
        bytes,
        code_loc: 0x130,
        start_time: start,
        end_time: end,
        fingerprint: 0,
    }
}

fn region(start: u64, end: u64) -> TargetRegion {
    TargetRegion {
        device: 0,
        start_time: start,
        end_time: end,
    }
}

#[test]
fn test_scenario_duplicate_transfer() {
    // Same content to the same device from two different host buffers; a
    // later region consumes both so only the duplicate detector fires.
    let ops = vec![
        transfer_to(0xAB, 0x1, 0xA, 4, 0, 10),
        transfer_to(0xAB, 0x2, 0xA, 4, 20, 28),
    ];
    let regions = vec![region(30, 40)];
    let analysis = analyze(&ops, &regions, 1, EXEC_TIME);

    assert_eq!(analysis.duplicate_transfers.len(), 1);
    let group = &analysis.duplicate_transfers[0];
    assert_eq!(group.ops.len(), 2);
    assert_eq!(group.total_time, 18);

    // The second transfer is avoidable: 8ns, 4 bytes.
    assert_eq!(analysis.savings.duplicate_calls, 1);
    assert_eq!(analysis.savings.transfer_calls, 1);
    assert_eq!(analysis.savings.transfer_bytes, 4);
    assert_eq!(analysis.savings.time, 8);
}

#[test]
fn test_scenario_round_trip() {
    let ops = vec![
        transfer_to(0xCD, 0x1, 0xA, 4, 0, 5),
        transfer_from(0xCD, 0xA, 0x1, 4, 25, 30),
    ];
    let regions = vec![region(10, 20)];
    let analysis = analyze(&ops, &regions, 1, EXEC_TIME);

    assert_eq!(analysis.round_trips.len(), 1);
    let trip = &analysis.round_trips[0];
    assert_eq!(trip.pairs, vec![(0, 1)]);
    assert_eq!(trip.total_time, 10);

    assert_eq!(analysis.savings.round_trip_calls, 1);
    assert_eq!(analysis.savings.time, 5);
    assert_eq!(analysis.savings.transfer_bytes, 4);
}

#[test]
fn test_scenario_repeated_alloc() {
    let ops = vec![
        alloc(0x1, 0xA, 1024, 0, 2),
        delete(0xA, 1024, 3, 4),
        alloc(0x1, 0xA, 1024, 5, 7),
        delete(0xA, 1024, 8, 9),
    ];
    let analysis = analyze(&ops, &[region(0, 100)], 1, EXEC_TIME);

    assert_eq!(analysis.repeated_allocs.len(), 1);
    assert_eq!(analysis.repeated_allocs[0].pairs.len(), 2);

    // Second alloc and first delete are avoidable.
    assert_eq!(analysis.savings.repeated_alloc_calls, 1);
    assert_eq!(analysis.savings.alloc_calls, 1);
    assert_eq!(analysis.savings.alloc_bytes, 1024);
}

#[test]
fn test_scenario_unused_alloc() {
    let ops = vec![alloc(0x1, 0xA, 64, 0, 1), delete(0xA, 64, 9, 10)];
    let analysis = analyze(&ops, &[], 1, EXEC_TIME);

    assert_eq!(analysis.unused_allocs.len(), 1);
    assert_eq!(analysis.unused_allocs[0].pairs, vec![(0, 1)]);

    // Both ops are avoidable.
    assert_eq!(analysis.savings.unused_alloc_calls, 1);
    assert_eq!(analysis.savings.time, 2);
    assert_eq!(analysis.savings.alloc_calls, 1);
}

#[test]
fn test_scenario_unused_transfer() {
    let ops = vec![
        transfer_to(0x11, 0x1, 0xA, 4, 0, 1),
        transfer_to(0x22, 0x1, 0xA, 4, 10, 11),
    ];
    let regions = vec![region(20, 30)];
    let analysis = analyze(&ops, &regions, 1, EXEC_TIME);

    assert_eq!(analysis.unused_transfers.len(), 1);
    // The first transfer was superseded before any region; the second is
    // consumed by the region.
    assert_eq!(analysis.unused_transfers[0].ops, vec![0]);
    assert_eq!(analysis.savings.unused_transfer_calls, 1);
}

#[test]
fn test_scenario_peak_memory() {
    let ops = vec![
        alloc(0x1, 0xA, 100, 0, 1),
        alloc(0x2, 0xB, 50, 2, 3),
        delete(0xA, 100, 4, 5),
        alloc(0x3, 0xC, 200, 6, 7),
    ];
    let analysis = analyze(&ops, &[region(0, 100)], 1, EXEC_TIME);
    assert_eq!(analysis.peak_allocated_bytes[0], 250);
}

#[test]
fn test_empty_logs_produce_empty_analysis() {
    let analysis = analyze(&[], &[], 2, EXEC_TIME);
    assert!(analysis.duplicate_transfers.is_empty());
    assert!(analysis.round_trips.is_empty());
    assert!(analysis.repeated_allocs.is_empty());
    assert!(analysis.unused_allocs.is_empty());
    assert!(analysis.unused_transfers.is_empty());
    assert!(analysis.code_locations.is_empty());
    assert!(analysis.op_summary.is_empty());
    assert_eq!(analysis.peak_allocated_bytes, vec![0, 0, 0]);
    assert_eq!(analysis.savings, savings::Savings::default());
}

#[test]
fn test_determinism_identical_inputs_identical_results() {
    let ops = vec![
        transfer_to(0xAB, 0x1, 0xA, 4, 0, 10),
        transfer_to(0xAB, 0x1, 0xA, 4, 20, 28),
        alloc(0x1, 0xD, 64, 30, 31),
        delete(0xD, 64, 32, 33),
        alloc(0x1, 0xD, 64, 34, 35),
        delete(0xD, 64, 36, 37),
    ];
    let regions = vec![region(5, 8)];
    let a = analyze(&ops, &regions, 1, EXEC_TIME);
    let b = analyze(&ops, &regions, 1, EXEC_TIME);
    assert_eq!(a.duplicate_transfers, b.duplicate_transfers);
    assert_eq!(a.repeated_allocs, b.repeated_allocs);
    assert_eq!(a.unused_allocs, b.unused_allocs);
    assert_eq!(a.savings, b.savings);
}

#[test]
fn test_group_total_time_is_sum_of_member_durations() {
    let ops = vec![
        transfer_to(0x7, 0x1, 0xA, 4, 0, 3),
        transfer_to(0x7, 0x1, 0xA, 4, 10, 14),
        transfer_to(0x7, 0x1, 0xA, 4, 20, 25),
    ];
    let analysis = analyze(&ops, &[region(0, 100)], 1, EXEC_TIME);
    let group = &analysis.duplicate_transfers[0];
    let summed: u64 = group.ops.iter().map(|&i| ops[i].duration()).sum();
    assert_eq!(group.total_time, summed);
    assert_eq!(summed, 3 + 4 + 5);
}

#[test]
fn test_round_trip_legs_used_at_most_once() {
    // Ping-pong of the same content: every op serves as tx of at most one
    // trip.
    let ops = vec![
        transfer_to(0x5, 0x1, 0xA, 4, 0, 5),
        transfer_from(0x5, 0xA, 0x1, 4, 10, 15),
        transfer_to(0x5, 0x1, 0xA, 4, 20, 25),
        transfer_from(0x5, 0xA, 0x1, 4, 30, 35),
    ];
    let analysis = analyze(&ops, &[], 1, EXEC_TIME);
    let mut tx_seen = std::collections::BTreeSet::new();
    for group in &analysis.round_trips {
        for &(tx, _) in &group.pairs {
            assert!(tx_seen.insert(tx), "op {tx} credited as tx twice");
        }
    }
}
