//! gpudataperf - GPU data-movement profiler
//!
//! This library provides the post-mortem analysis engine behind the
//! `gpudataperf` launcher: event capture plumbing, content fingerprinting,
//! inefficient-data-movement detectors (duplicate transfers, round trips,
//! repeated/unused allocations, unused transfers), savings aggregation, and
//! ranked report rendering with DWARF-based source correlation.

pub mod analysis;
pub mod capture;
pub mod cli;
pub mod engine;
pub mod event;
pub mod fingerprint;
pub mod launcher;
pub mod report;
pub mod symbolize;
pub mod trace_export;

pub use engine::{start_tool, start_tool_with, Engine, ToolConfig, ToolHandle};
pub use event::{DataOp, DeviceId, OpKind, TargetRegion};
pub use fingerprint::{Fingerprinter, Xxh3Fingerprinter};
