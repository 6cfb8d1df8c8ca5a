//! JSON export of the captured event logs
//!
//! When `GPUDATAPERF_TRACE_FILE` is set, finalize writes the normalized logs
//! to that path for machine consumption (diffing runs, driving external
//! tooling). Export failures warn and never affect the report.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::ToolConfig;
use crate::event::{DataOp, TargetRegion};

/// Root structure of the exported trace file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFile {
    /// Format version identifier.
    pub version: String,
    pub format: String,
    pub num_devices: u32,
    /// Total execution time of the profiled program in nanoseconds.
    pub exec_time_ns: u64,
    pub data_ops: Vec<DataOp>,
    pub target_regions: Vec<TargetRegion>,
}

impl TraceFile {
    pub fn new(
        ops: &[DataOp],
        regions: &[TargetRegion],
        num_devices: u32,
        exec_time_ns: u64,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "gpudataperf-trace-v1".to_string(),
            num_devices,
            exec_time_ns,
            data_ops: ops.to_vec(),
            target_regions: regions.to_vec(),
        }
    }
}

/// Serialize the logs to `path` as pretty-printed JSON.
pub fn write_json(
    path: &Path,
    ops: &[DataOp],
    regions: &[TargetRegion],
    config: &ToolConfig,
    exec_time_ns: u64,
) -> Result<()> {
    let trace = TraceFile::new(ops, regions, config.num_devices, exec_time_ns);
    let file = File::create(path)
        .with_context(|| format!("failed to create trace file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &trace)
        .context("failed to serialize trace")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::OpKind;
    use tempfile::TempDir;

    fn sample_op() -> DataOp {
        DataOp {
            kind: OpKind::TransferToDevice,
            src_addr: 0x1,
            dest_addr: 0xA,
            src_device: 1,
            dest_device: 0,
            bytes: 4,
            code_loc: 0x100,
            start_time: 0,
            end_time: 10,
            fingerprint: 0xfeed,
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.json");
        let ops = vec![sample_op()];
        let regions = vec![TargetRegion {
            device: 0,
            start_time: 20,
            end_time: 30,
        }];
        let config = ToolConfig::new(1);

        write_json(&path, &ops, &regions, &config, 100).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let trace: TraceFile = serde_json::from_str(&text).unwrap();
        assert_eq!(trace.format, "gpudataperf-trace-v1");
        assert_eq!(trace.num_devices, 1);
        assert_eq!(trace.exec_time_ns, 100);
        assert_eq!(trace.data_ops, ops);
        assert_eq!(trace.target_regions, regions);
    }

    #[test]
    fn test_write_to_invalid_path_errors() {
        let config = ToolConfig::new(1);
        let result = write_json(
            Path::new("/nonexistent/dir/trace.json"),
            &[],
            &[],
            &config,
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_logs_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        let config = ToolConfig::new(0);
        write_json(&path, &[], &[], &config, 0).unwrap();
        let trace: TraceFile =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(trace.data_ops.is_empty());
        assert!(trace.target_regions.is_empty());
    }
}
