//! Report rendering
//!
//! Fixed-width table renderers for every report section. Each section starts
//! with a `=== <Title> ===` banner; sections with no findings print a
//! success (or "no data") line instead of a table. Ranked tables are clipped
//! to [`LIST_CAP`] rows and sub-tables to [`SUBLIST_CAP`] rows.
//!
//! Renderers return `String`s; the engine concatenates them and writes the
//! result to stderr in one shot at finalize.

use std::collections::BTreeMap;

use crate::analysis::{Analysis, OpGroup, PairGroup};
use crate::engine::HashStats;
use crate::event::{DataOp, DeviceId, OpKind};
use crate::fingerprint::CollisionSummary;
use crate::symbolize::Symbolizer;

/// Maximum number of ranked rows per section.
pub const LIST_CAP: usize = 24;
/// Maximum number of sub-rows per group.
pub const SUBLIST_CAP: usize = 8;

// column widths
const W: usize = 10;
const W_BYTES: usize = 13;
const W_DEVICE: usize = 13;
const W_OPTYPE: usize = 21;

/// Right-align an integer in `width` columns.
pub fn format_uint(value: u64, width: usize) -> String {
    format!("{value:>width$}")
}

/// Render a fraction as a percentage with two decimals and a trailing `%`.
pub fn format_percent(fraction: f64, width: usize) -> String {
    let percent = (fraction * 100.0 * 100.0).round() / 100.0;
    format!("{percent:>w$.2}%", w = width - 1)
}

/// Render a nanosecond duration with the largest unit that keeps the value's
/// integer part in width: `s`, `ms`, `µs`, or `ns`.
pub fn format_duration(ns: u64, width: usize) -> String {
    debug_assert!(width > 2);
    if ns >= 1_000_000_000 {
        let value = significant(ns as f64 / 1e9);
        format!("{value:>w$}s", w = width - 1)
    } else if ns >= 1_000_000 {
        let value = significant(ns as f64 / 1e6);
        format!("{value:>w$}ms", w = width - 2)
    } else if ns >= 1_000 {
        let value = significant(ns as f64 / 1e3);
        format!("{value:>w$}µs", w = width - 2)
    } else {
        format!("{ns:>w$}ns", w = width - 2)
    }
}

/// Render with five significant digits, trailing zeros trimmed.
fn significant(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (4 - magnitude).max(0) as usize;
    let mut s = format!("{value:.decimals$}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

/// Render a float with a fixed decimal count and an attached unit label,
/// right-aligned so that label and number together fill `width`.
pub fn format_float(value: f64, width: usize, decimals: usize, label: &str) -> String {
    let w = width.saturating_sub(label.chars().count());
    format!("{value:>w$.decimals$}{label}")
}

/// Left-align a device id, rendering the host (id == `num_devices`) as the
/// word `host`.
pub fn format_device(num_devices: u32, device: DeviceId, width: usize) -> String {
    let text = if device == num_devices {
        "  host".to_string()
    } else {
        format!("  device {device}")
    };
    format!("{text:<width$}")
}

/// Left-align an op-kind display name.
pub fn format_optype(kind: OpKind, width: usize) -> String {
    format!("  {:<w$}", kind.name(), w = width - 2)
}

/// Resolve a call site to `  symbol:line`, degrading to placeholders when
/// symbolization is unavailable.
pub fn format_symbol(symbolizer: &Symbolizer, code_loc: u64) -> String {
    if code_loc == 0 {
        return "  ".to_string();
    }
    if !symbolizer.is_valid() {
        return "  <symbolizer error>".to_string();
    }
    match symbolizer.locate(code_loc) {
        None => "  <optimized out>".to_string(),
        Some(location) => {
            if location.line > 0 {
                format!("  {}:{}", location.function, location.line)
            } else {
                format!("  {}:<optimized out>", location.function)
            }
        }
    }
}

fn avg_duration(total_time: u64, calls: u64) -> u64 {
    if calls == 0 {
        return 0;
    }
    (total_time as f64 / calls as f64).round() as u64
}

fn time_share(time: u64, exec_time: u64) -> f64 {
    if exec_time == 0 {
        return 0.0;
    }
    time as f64 / exec_time as f64
}

/// Table body shared by the duplicate- and unused-transfer sections: one
/// ranked row per group with a `(src_device, call site)` call-count
/// sub-table.
fn render_duplicate_style(
    ops: &[DataOp],
    groups: &[OpGroup],
    exec_time: u64,
    num_devices: u32,
    symbolizer: &Symbolizer,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>w$}{:>w$}{:>w$}{:>w$}{:>wb$}{:>w$}{:<wd$}   {:>w$}{:<wd$}  location\n",
        "time(%)",
        "time",
        "calls",
        "avg",
        "bytes",
        "size",
        "  dest device",
        "calls",
        "  src device",
        w = W,
        wb = W_BYTES,
        wd = W_DEVICE,
    ));

    // greatest total time first
    for group in groups.iter().rev().take(LIST_CAP) {
        let calls = group.ops.len() as u64;
        let first = &ops[group.ops[0]];
        let transfer_size = first.bytes;
        let bytes = transfer_size * calls;

        // call counts per (src_device, call site)
        let mut calls_by_origin: BTreeMap<(DeviceId, u64), u64> = BTreeMap::new();
        for &idx in &group.ops {
            let op = &ops[idx];
            *calls_by_origin.entry((op.src_device, op.code_loc)).or_default() += 1;
        }
        let mut ranked: Vec<((DeviceId, u64), u64)> = calls_by_origin.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
        let origins = ranked.len();

        for (subidx, &((src_device, code_loc), sub_calls)) in
            ranked.iter().take(SUBLIST_CAP).enumerate()
        {
            if subidx == 0 {
                out.push_str(&format_percent(time_share(group.total_time, exec_time), W));
                out.push_str(&format_duration(group.total_time, W));
                out.push_str(&format_uint(calls, W));
                out.push_str(&format_duration(avg_duration(group.total_time, calls), W));
                out.push_str(&format_uint(bytes, W_BYTES));
                out.push_str(&format_uint(transfer_size, W));
                out.push_str(&format_device(num_devices, first.dest_device, W_DEVICE));
                out.push_str(if origins > 1 { " ┬─" } else { " ──" });
            } else {
                out.push_str(&" ".repeat(5 * W + W_BYTES + W_DEVICE));
                out.push_str(if origins > subidx + 1 { " ├─" } else { " └─" });
            }
            out.push_str(&format_uint(sub_calls, W));
            out.push_str(&format_device(num_devices, src_device, W_DEVICE));
            out.push_str(&format_symbol(symbolizer, code_loc));
            out.push('\n');
        }
    }
    out
}

/// Table body shared by the repeated- and unused-allocation sections: two
/// lines per group, the alloc op then its delete.
fn render_alloc_style(
    ops: &[DataOp],
    groups: &[PairGroup],
    exec_time: u64,
    num_devices: u32,
    symbolizer: &Symbolizer,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>w$}{:>w$}{:>w$}{:>w$}{:>wb$}{:>w$}{:<wd$}     location\n",
        "time(%)",
        "time",
        "allocs",
        "avg",
        "bytes",
        "size",
        "  tgt device",
        w = W,
        wb = W_BYTES,
        wd = W_DEVICE,
    ));

    for group in groups.iter().rev().take(LIST_CAP) {
        let allocs = group.pairs.len() as u64;
        let (alloc_idx, delete_idx) = group.pairs[0];
        let alloc = &ops[alloc_idx];
        let delete = &ops[delete_idx];
        let bytes = allocs * alloc.bytes;

        out.push_str(&format_percent(time_share(group.total_time, exec_time), W));
        out.push_str(&format_duration(group.total_time, W));
        out.push_str(&format_uint(allocs, W));
        out.push_str(&format_duration(avg_duration(group.total_time, allocs), W));
        out.push_str(&format_uint(bytes, W_BYTES));
        out.push_str(&format_uint(alloc.bytes, W));
        out.push_str(&format_device(num_devices, alloc.dest_device, W_DEVICE));
        out.push_str(" ┬─");
        out.push_str(&format_optype(alloc.kind, W_OPTYPE));
        out.push_str(&format_symbol(symbolizer, alloc.code_loc));
        out.push('\n');

        out.push_str(&" ".repeat(5 * W + W_BYTES + W_DEVICE));
        out.push_str(" └─");
        out.push_str(&format_optype(delete.kind, W_OPTYPE));
        out.push_str(&format_symbol(symbolizer, delete.code_loc));
        out.push('\n');
    }
    out
}

pub fn render_duplicate_section(
    ops: &[DataOp],
    groups: &[OpGroup],
    exec_time: u64,
    num_devices: u32,
    symbolizer: &Symbolizer,
) -> String {
    let mut out = String::from("\n=== Duplicate Device Data Transfer Analysis ===\n");
    if groups.is_empty() {
        out.push_str("  SUCCESS - no duplicate data transfers detected\n");
        return out;
    }
    out.push_str(&render_duplicate_style(
        ops, groups, exec_time, num_devices, symbolizer,
    ));
    out
}

pub fn render_round_trip_section(
    ops: &[DataOp],
    groups: &[PairGroup],
    exec_time: u64,
    num_devices: u32,
    symbolizer: &Symbolizer,
) -> String {
    let mut out = String::from("\n=== Round-Trip Device Data Transfer Analysis ===\n");
    if groups.is_empty() {
        out.push_str("  SUCCESS - no round-trip data transfers detected\n");
        return out;
    }
    out.push_str(&format!(
        "{:>w$}{:>w$}{:>w$}{:>w$}{:>wb$}{:>w$}   {:<wd$}{:<wd$}{:<wo$}  location\n",
        "time(%)",
        "time",
        "trips",
        "avg",
        "bytes",
        "size",
        "  src device",
        "  dest device",
        "  optype",
        w = W,
        wb = W_BYTES,
        wd = W_DEVICE,
        wo = W_OPTYPE,
    ));

    for group in groups.iter().rev().take(LIST_CAP) {
        let trips = group.pairs.len() as u64;
        let (tx_idx, rx_idx) = group.pairs[0];
        let tx = &ops[tx_idx];
        let rx = &ops[rx_idx];
        let bytes = trips * (tx.bytes + rx.bytes);

        out.push_str(&format_percent(time_share(group.total_time, exec_time), W));
        out.push_str(&format_duration(group.total_time, W));
        out.push_str(&format_uint(trips, W));
        out.push_str(&format_duration(avg_duration(group.total_time, trips), W));
        out.push_str(&format_uint(bytes, W_BYTES));
        out.push_str(&format_uint(tx.bytes, W));
        out.push_str(" ┬─");
        out.push_str(&format_device(num_devices, tx.src_device, W_DEVICE));
        out.push_str(&format_device(num_devices, tx.dest_device, W_DEVICE));
        out.push_str(&format_optype(tx.kind, W_OPTYPE));
        out.push_str(&format_symbol(symbolizer, tx.code_loc));
        out.push('\n');

        out.push_str(&" ".repeat(5 * W + W_BYTES));
        out.push_str(" └─");
        out.push_str(&format_device(num_devices, tx.dest_device, W_DEVICE));
        out.push_str(&format_device(num_devices, tx.src_device, W_DEVICE));
        out.push_str(&format_optype(rx.kind, W_OPTYPE));
        out.push_str(&format_symbol(symbolizer, rx.code_loc));
        out.push('\n');
    }
    out
}

pub fn render_repeated_alloc_section(
    ops: &[DataOp],
    groups: &[PairGroup],
    exec_time: u64,
    num_devices: u32,
    symbolizer: &Symbolizer,
) -> String {
    let mut out = String::from("\n=== Repeated Device Memory Allocation Analysis ===\n");
    if groups.is_empty() {
        out.push_str("  SUCCESS - no repeated device memory allocations detected\n");
        return out;
    }
    out.push_str(&render_alloc_style(
        ops, groups, exec_time, num_devices, symbolizer,
    ));
    out
}

pub fn render_unused_alloc_section(
    ops: &[DataOp],
    groups: &[PairGroup],
    exec_time: u64,
    num_devices: u32,
    symbolizer: &Symbolizer,
) -> String {
    let mut out = String::from("\n=== Unused Device Memory Allocation Analysis ===\n");
    if groups.is_empty() {
        out.push_str("  SUCCESS - no unused device memory allocations detected\n");
        return out;
    }
    out.push_str(&render_alloc_style(
        ops, groups, exec_time, num_devices, symbolizer,
    ));
    out
}

pub fn render_unused_transfer_section(
    ops: &[DataOp],
    groups: &[OpGroup],
    exec_time: u64,
    num_devices: u32,
    symbolizer: &Symbolizer,
) -> String {
    let mut out = String::from("\n=== Unused Device Data Transfer Analysis ===\n");
    if groups.is_empty() {
        out.push_str("  SUCCESS - no unused data transfers detected\n");
        return out;
    }
    out.push_str(&render_duplicate_style(
        ops, groups, exec_time, num_devices, symbolizer,
    ));
    out
}

pub fn render_savings(savings: &crate::analysis::savings::Savings) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n  Found {} potential duplicate data transfer(s) with {} unique hash(es).\n",
        savings.duplicate_calls, savings.duplicate_unique_hashes
    ));
    out.push_str(&format!(
        "  Found {} potential round trip data transfer(s).\n",
        savings.round_trip_calls
    ));
    out.push_str(&format!(
        "  Found {} potential repeated device memory allocation(s).\n",
        savings.repeated_alloc_calls
    ));
    out.push_str(&format!(
        "  Found {} potential unused device memory allocation(s).\n",
        savings.unused_alloc_calls
    ));
    out.push_str(&format!(
        "  Found {} potential unused data transfer(s).\n",
        savings.unused_transfer_calls
    ));

    let w = W.max(W_BYTES);
    out.push_str("  Potential Resource Savings\n");
    out.push_str(&format!(
        "    time(%)           {}\n",
        format_percent(savings.time_share, w)
    ));
    out.push_str(&format!(
        "    time              {}\n",
        format_duration(savings.time, w)
    ));
    out.push_str(&format!(
        "    data transfers    {}\n",
        format_uint(savings.transfer_calls, w)
    ));
    out.push_str(&format!(
        "    bytes transferred {}\n",
        format_uint(savings.transfer_bytes, w)
    ));
    out.push_str(&format!(
        "    allocations       {}\n",
        format_uint(savings.alloc_calls, w)
    ));
    out.push_str(&format!(
        "    bytes allocated   {}\n",
        format_uint(savings.alloc_bytes, w)
    ));
    out
}

pub fn render_peak_section(peak_allocated_bytes: &[u64], num_devices: u32) -> String {
    let mut out = String::from("\n=== Peak Device Memory Allocation ===\n");
    if num_devices < 1 {
        out.push_str("  no target devices detected\n");
        return out;
    }
    out.push_str(&format!(
        "{:<wd$}{:>wb$}\n",
        "  tgt device",
        "  bytes",
        wd = W_DEVICE,
        wb = W_BYTES,
    ));
    for device in 0..num_devices {
        let bytes = peak_allocated_bytes
            .get(device as usize)
            .copied()
            .unwrap_or(0);
        out.push_str(&format_device(num_devices, device, W_DEVICE));
        out.push_str(&format_uint(bytes, W_BYTES));
        out.push('\n');
    }
    out
}

pub fn render_codeptr_section(
    ops: &[DataOp],
    groups: &[OpGroup],
    exec_time: u64,
    symbolizer: &Symbolizer,
) -> String {
    let mut out = String::from("\n=== Device Data Operations Profiling Results ===\n");
    if groups.is_empty() {
        out.push_str("  no data operations profiled\n");
        return out;
    }
    out.push_str(&format!(
        "{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{:>wb$}{:<wo$}  location\n",
        "time(%)",
        "time",
        "calls",
        "avg",
        "min",
        "max",
        "bytes",
        "  optype",
        w = W,
        wb = W_BYTES,
        wo = W_OPTYPE,
    ));

    for group in groups.iter().rev().take(LIST_CAP) {
        let calls = group.ops.len() as u64;
        let first = &ops[group.ops[0]];
        let mut time_min = u64::MAX;
        let mut time_max = 0u64;
        let mut bytes = 0u64;
        for &idx in &group.ops {
            let duration = ops[idx].duration();
            time_min = time_min.min(duration);
            time_max = time_max.max(duration);
            bytes += ops[idx].bytes;
        }

        out.push_str(&format_percent(time_share(group.total_time, exec_time), W));
        out.push_str(&format_duration(group.total_time, W));
        out.push_str(&format_uint(calls, W));
        out.push_str(&format_duration(avg_duration(group.total_time, calls), W));
        out.push_str(&format_duration(time_min, W));
        out.push_str(&format_duration(time_max, W));
        out.push_str(&format_uint(bytes, W_BYTES));
        out.push_str(&format_optype(first.kind, W_OPTYPE));
        out.push_str(&format_symbol(symbolizer, first.code_loc));
        out.push('\n');
    }
    out
}

pub fn render_summary_section(
    ops: &[DataOp],
    summary: &[crate::analysis::codeptr::OpKindSummary],
    exec_time: u64,
) -> String {
    let mut out = String::from("\n=== Device Data Operations Timing Summary ===\n");
    if ops.is_empty() {
        out.push_str("  no data operations profiled\n");
        return out;
    }
    out.push_str(&format!(
        "{:>w$}{:>w$}{:>w$}{:>wb$}{:<wo$}\n",
        "time(%)",
        "time",
        "calls",
        "bytes",
        "  optype",
        w = W,
        wb = W_BYTES,
        wo = W_OPTYPE,
    ));
    for row in summary.iter().rev() {
        out.push_str(&format_percent(time_share(row.total_time, exec_time), W));
        out.push_str(&format_duration(row.total_time, W));
        out.push_str(&format_uint(row.calls, W));
        out.push_str(&format_uint(row.bytes, W_BYTES));
        out.push_str(&format_optype(row.kind, W_OPTYPE));
        out.push('\n');
    }
    out
}

pub fn render_collision_summary(summary: &CollisionSummary) -> String {
    format!(
        "\nFound {} collisions for {} unique keys for a collision rate of {:.2}%.\n",
        summary.collisions,
        summary.unique_keys,
        summary.rate_percent()
    )
}

pub fn render_hash_overhead(ops: &[DataOp], stats: &HashStats) -> String {
    let hashes = ops.iter().filter(|op| op.kind.is_transfer()).count() as u64;
    let time_per_hash = if hashes > 0 { stats.time / hashes } else { 0 };
    // B / ns = GB / s
    let gb_per_s = if stats.time > 0 {
        stats.bytes as f64 / stats.time as f64
    } else {
        0.0
    };
    let mut out = String::new();
    out.push_str(&format!(
        "\n  bytes hashed   {}\n",
        format_uint(stats.bytes, W)
    ));
    out.push_str(&format!(
        "  hash overhead  {}\n",
        format_duration(stats.time, W)
    ));
    out.push_str(&format!(
        "  avg time/hash  {}\n",
        format_duration(time_per_hash, W)
    ));
    out.push_str(&format!(
        "  avg hash rate  {}\n",
        format_float(gb_per_s, W, 3, "GB/s")
    ));
    out
}

pub fn render_transfer_rate(ops: &[DataOp]) -> String {
    let mut count = 0u64;
    let mut bytes = 0u64;
    let mut overhead = 0u64;
    for op in ops {
        if !op.kind.is_transfer() {
            continue;
        }
        count += 1;
        bytes += op.bytes;
        overhead += op.duration();
    }
    if count == 0 {
        return String::new();
    }
    let time_per_transfer = overhead / count;
    let gb_per_s = if overhead > 0 {
        bytes as f64 / overhead as f64
    } else {
        0.0
    };
    let mut out = String::new();
    out.push_str(&format!(
        "\n  bytes transferred  {}\n",
        format_uint(bytes, W)
    ));
    out.push_str(&format!(
        "  transfer overhead  {}\n",
        format_duration(overhead, W)
    ));
    out.push_str(&format!(
        "  avg time/transfer  {}\n",
        format_duration(time_per_transfer, W)
    ));
    out.push_str(&format!(
        "  avg transfer rate  {}\n",
        format_float(gb_per_s, W, 3, "GB/s")
    ));
    out
}

pub fn render_trailer(exec_time: u64, analysis_time: u64, errmsg: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n  execution time {}\n",
        format_duration(exec_time, W)
    ));
    out.push_str(&format!(
        "  analysis time  {}\n",
        format_duration(analysis_time, W)
    ));
    if let Some(errmsg) = errmsg {
        out.push_str(&format!("\n{errmsg}\n"));
    }
    out
}

/// Assemble every analysis-driven section in report order.
pub fn render_report(
    ops: &[DataOp],
    analysis: &Analysis,
    exec_time: u64,
    num_devices: u32,
    symbolizer: &Symbolizer,
) -> String {
    let mut out = String::new();
    out.push_str(&render_duplicate_section(
        ops,
        &analysis.duplicate_transfers,
        exec_time,
        num_devices,
        symbolizer,
    ));
    out.push_str(&render_round_trip_section(
        ops,
        &analysis.round_trips,
        exec_time,
        num_devices,
        symbolizer,
    ));
    out.push_str(&render_repeated_alloc_section(
        ops,
        &analysis.repeated_allocs,
        exec_time,
        num_devices,
        symbolizer,
    ));
    out.push_str(&render_unused_alloc_section(
        ops,
        &analysis.unused_allocs,
        exec_time,
        num_devices,
        symbolizer,
    ));
    out.push_str(&render_unused_transfer_section(
        ops,
        &analysis.unused_transfers,
        exec_time,
        num_devices,
        symbolizer,
    ));
    out.push_str(&render_savings(&analysis.savings));
    out.push_str(&render_peak_section(
        &analysis.peak_allocated_bytes,
        num_devices,
    ));
    out.push_str(&render_codeptr_section(
        ops,
        &analysis.code_locations,
        exec_time,
        symbolizer,
    ));
    out.push_str(&render_summary_section(ops, &analysis.op_summary, exec_time));
    out
}
