//! Code-location profiling and per-kind timing summary
//!
//! Orthogonal to the pattern detectors: every recorded op is attributed to
//! its `(call site, op kind)` group for the profiling table, and to its op
//! kind alone for the timing summary.

use std::collections::BTreeMap;

use crate::analysis::OpGroup;
use crate::event::{DataOp, OpKind};

/// Group all ops by `(code_loc, kind)`, ranked ascending by total elapsed
/// time. The reporter derives calls/avg/min/max/bytes from the members.
pub fn profile(ops: &[DataOp]) -> Vec<OpGroup> {
    let mut by_location: BTreeMap<(u64, OpKind), Vec<usize>> = BTreeMap::new();
    for (idx, op) in ops.iter().enumerate() {
        by_location.entry((op.code_loc, op.kind)).or_default().push(idx);
    }

    let mut groups = Vec::new();
    for members in by_location.into_values() {
        let total_time = members.iter().map(|&idx| ops[idx].duration()).sum();
        groups.push(OpGroup {
            total_time,
            ops: members,
        });
    }
    groups.sort_by_key(|group| group.total_time);
    groups
}

/// Aggregate time, calls, and bytes per op kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpKindSummary {
    pub kind: OpKind,
    pub total_time: u64,
    pub calls: u64,
    pub bytes: u64,
}

/// One summary row per op kind present in the log, ranked ascending by
/// total time.
pub fn summarize_kinds(ops: &[DataOp]) -> Vec<OpKindSummary> {
    let mut by_kind: BTreeMap<OpKind, (u64, u64, u64)> = BTreeMap::new();
    for op in ops {
        let entry = by_kind.entry(op.kind).or_default();
        entry.0 += op.duration();
        entry.1 += 1;
        entry.2 += op.bytes;
    }

    let mut rows: Vec<OpKindSummary> = by_kind
        .into_iter()
        .map(|(kind, (total_time, calls, bytes))| OpKindSummary {
            kind,
            total_time,
            calls,
            bytes,
        })
        .collect();
    rows.sort_by_key(|row| row.total_time);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(kind: OpKind, code_loc: u64, start: u64, end: u64, bytes: u64) -> DataOp {
        DataOp {
            kind,
            src_addr: 0x1,
            dest_addr: 0xA,
            src_device: 1,
            dest_device: 0,
            bytes,
            code_loc,
            start_time: start,
            end_time: end,
            fingerprint: 0,
        }
    }

    #[test]
    fn test_profile_groups_by_location_and_kind() {
        let ops = vec![
            op(OpKind::TransferToDevice, 0x10, 0, 5, 4),
            op(OpKind::TransferToDevice, 0x10, 10, 15, 4),
            op(OpKind::Alloc, 0x10, 20, 22, 64),
            op(OpKind::TransferToDevice, 0x20, 30, 31, 4),
        ];
        let groups = profile(&ops);
        assert_eq!(groups.len(), 3);
        // Same location, different kind: distinct groups.
        let sizes: Vec<usize> = groups.iter().map(|g| g.ops.len()).collect();
        assert!(sizes.contains(&2));
    }

    #[test]
    fn test_profile_ranked_ascending() {
        let ops = vec![
            op(OpKind::Alloc, 0x10, 0, 100, 64),
            op(OpKind::Alloc, 0x20, 0, 5, 64),
        ];
        let groups = profile(&ops);
        assert_eq!(groups[0].total_time, 5);
        assert_eq!(groups[1].total_time, 100);
    }

    #[test]
    fn test_profile_empty_log() {
        assert!(profile(&[]).is_empty());
    }

    #[test]
    fn test_summary_totals_per_kind() {
        let ops = vec![
            op(OpKind::TransferToDevice, 0x10, 0, 5, 4),
            op(OpKind::TransferToDevice, 0x20, 10, 15, 8),
            op(OpKind::Alloc, 0x30, 20, 21, 64),
        ];
        let rows = summarize_kinds(&ops);
        assert_eq!(rows.len(), 2);
        let transfers = rows
            .iter()
            .find(|r| r.kind == OpKind::TransferToDevice)
            .unwrap();
        assert_eq!(transfers.calls, 2);
        assert_eq!(transfers.total_time, 10);
        assert_eq!(transfers.bytes, 12);
    }

    #[test]
    fn test_summary_ranked_ascending_by_time() {
        let ops = vec![
            op(OpKind::Alloc, 0x10, 0, 100, 64),
            op(OpKind::Delete, 0x20, 0, 1, 0),
        ];
        let rows = summarize_kinds(&ops);
        assert_eq!(rows[0].kind, OpKind::Delete);
        assert_eq!(rows[1].kind, OpKind::Alloc);
    }

    #[test]
    fn test_unknown_code_loc_groups_under_zero() {
        let ops = vec![
            op(OpKind::Alloc, 0, 0, 1, 8),
            op(OpKind::Alloc, 0, 2, 3, 8),
        ];
        let groups = profile(&ops);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].ops.len(), 2);
    }
}
