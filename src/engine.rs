//! Engine lifecycle: event logs, configuration, and finalize orchestration
//!
//! The engine is constructed by [`start_tool`] when the capture adapter
//! initializes inside the target process. While the target runs, producer
//! threads append records to the mutex-protected logs through a
//! [`Recorder`](crate::capture::Recorder). At target teardown the adapter
//! calls [`ToolHandle::finalize`], which takes logical ownership of the logs,
//! normalizes them, runs the analysis passes, and prints the report to the
//! diagnostic stream.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::analysis;
use crate::capture::Recorder;
use crate::event::{DataOp, DeviceId, TargetRegion};
use crate::fingerprint::{
    CollisionAuditor, CollisionSummary, Fingerprinter, Xxh3Fingerprinter, DEFAULT_AUDIT_BUDGET,
};
use crate::report;
use crate::symbolize::Symbolizer;
use crate::trace_export;

/// Environment variables making up the launcher ↔ engine contract.
pub const ENV_QUIET: &str = "GPUDATAPERF_QUIET";
pub const ENV_VERBOSE_INIT: &str = "GPUDATAPERF_VERBOSE_INIT";
pub const ENV_COLLISION_AUDIT: &str = "GPUDATAPERF_COLLISION_AUDIT";
pub const ENV_COLLISION_AUDIT_BUDGET: &str = "GPUDATAPERF_COLLISION_AUDIT_BUDGET";
pub const ENV_TRACE_FILE: &str = "GPUDATAPERF_TRACE_FILE";

/// Engine configuration, normally derived from the environment the launcher
/// set up.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Number of target devices reported by the runtime. The host is
    /// addressed as device id `num_devices`.
    pub num_devices: u32,
    /// Enable the collision auditor on transfer fingerprints.
    pub collision_audit: bool,
    /// Cap on bytes retained by the collision auditor.
    pub collision_audit_budget: u64,
    /// Suppress warnings on the diagnostic stream.
    pub quiet: bool,
    /// Verbose engine diagnostics.
    pub verbose: bool,
    /// Write the normalized event logs as JSON to this path at finalize.
    pub trace_export: Option<PathBuf>,
}

impl ToolConfig {
    pub fn new(num_devices: u32) -> Self {
        Self {
            num_devices,
            collision_audit: false,
            collision_audit_budget: DEFAULT_AUDIT_BUDGET,
            quiet: false,
            verbose: false,
            trace_export: None,
        }
    }

    /// Read the `GPUDATAPERF_*` environment contract.
    pub fn from_env(num_devices: u32) -> Self {
        let mut config = Self::new(num_devices);
        config.quiet = std::env::var(ENV_QUIET).map(|v| v == "1").unwrap_or(false);
        config.verbose = std::env::var(ENV_VERBOSE_INIT)
            .map(|v| v == "stderr")
            .unwrap_or(false);
        config.collision_audit = std::env::var(ENV_COLLISION_AUDIT)
            .map(|v| v == "1")
            .unwrap_or(false);
        if let Ok(budget) = std::env::var(ENV_COLLISION_AUDIT_BUDGET) {
            match budget.parse::<u64>() {
                Ok(bytes) => config.collision_audit_budget = bytes,
                Err(_) => warn!(
                    "ignoring unparsable {}={:?}",
                    ENV_COLLISION_AUDIT_BUDGET, budget
                ),
            }
        }
        config.trace_export = std::env::var_os(ENV_TRACE_FILE).map(PathBuf::from);
        config
    }

    /// Device id assigned to the host by convention.
    pub fn host_device(&self) -> DeviceId {
        self.num_devices
    }
}

/// Accumulated fingerprinting overhead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashStats {
    pub bytes: u64,
    pub time: u64,
}

/// Shared profiling state for one target-process run.
pub struct Engine {
    config: ToolConfig,
    fingerprinter: Box<dyn Fingerprinter>,
    data_ops: Mutex<Vec<DataOp>>,
    target_regions: Mutex<Vec<TargetRegion>>,
    collision_auditor: Option<Mutex<CollisionAuditor>>,
    hash_stats: Mutex<HashStats>,
    epoch: Instant,
    next_region_id: AtomicU64,
}

impl Engine {
    fn new(config: ToolConfig, fingerprinter: Box<dyn Fingerprinter>) -> Self {
        let collision_auditor = config
            .collision_audit
            .then(|| Mutex::new(CollisionAuditor::new(config.collision_audit_budget)));
        Self {
            config,
            fingerprinter,
            data_ops: Mutex::new(Vec::new()),
            target_regions: Mutex::new(Vec::new()),
            collision_auditor,
            hash_stats: Mutex::new(HashStats::default()),
            epoch: Instant::now(),
            next_region_id: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Monotonic nanoseconds since engine start.
    pub fn now(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Fresh identifier for async target-region tracking.
    pub fn next_region_id(&self) -> u64 {
        self.next_region_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn append_data_op(&self, op: DataOp) {
        self.data_ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
    }

    pub fn append_target_region(&self, region: TargetRegion) {
        self.target_regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(region);
    }

    /// Fingerprint a transfer payload, accounting the hashing overhead and
    /// feeding the collision auditor when enabled.
    pub fn fingerprint(&self, payload: &[u8]) -> u64 {
        let hash_start = Instant::now();
        let hash = self.fingerprinter.hash(payload);
        let elapsed = hash_start.elapsed().as_nanos() as u64;
        {
            let mut stats = self
                .hash_stats
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            stats.bytes += payload.len() as u64;
            stats.time += elapsed;
        }
        if let Some(auditor) = &self.collision_auditor {
            auditor
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(hash, payload);
        }
        hash
    }

    pub fn hash_stats(&self) -> HashStats {
        *self
            .hash_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn collision_summary(&self) -> Option<CollisionSummary> {
        self.collision_auditor.as_ref().map(|auditor| {
            auditor
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .summary()
        })
    }

    /// Drain both logs out of their mutexes. Called once at finalize; no
    /// producer activity is permitted afterwards.
    fn take_logs(&self) -> (Vec<DataOp>, Vec<TargetRegion>) {
        let ops = std::mem::take(&mut *self.data_ops.lock().unwrap_or_else(PoisonError::into_inner));
        let regions = std::mem::take(
            &mut *self
                .target_regions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        (ops, regions)
    }

    /// Run the complete post-mortem analysis and render the report.
    pub fn finalize_report(&self) -> String {
        let exec_time = self.now();
        let analysis_start = Instant::now();

        let (mut ops, mut regions) = self.take_logs();
        normalize_data_ops(&mut ops);
        normalize_target_regions(&mut regions);

        if let Some(path) = &self.config.trace_export {
            if let Err(err) = trace_export::write_json(path, &ops, &regions, &self.config, exec_time)
            {
                warn!("failed to export trace to {}: {err:#}", path.display());
            }
        }

        let symbolizer = Symbolizer::for_current_exe();
        let analysis = analysis::analyze(&ops, &regions, self.config.num_devices, exec_time);

        let mut out = report::render_report(
            &ops,
            &analysis,
            exec_time,
            self.config.num_devices,
            &symbolizer,
        );
        if let Some(summary) = self.collision_summary() {
            out.push_str(&report::render_collision_summary(&summary));
        }
        let hash_stats = self.hash_stats();
        if hash_stats.bytes > 0 || hash_stats.time > 0 {
            out.push_str(&report::render_hash_overhead(&ops, &hash_stats));
        }
        out.push_str(&report::render_transfer_rate(&ops));

        let analysis_time = analysis_start.elapsed().as_nanos() as u64;
        out.push_str(&report::render_trailer(
            exec_time,
            analysis_time,
            symbolizer.errmsg(),
        ));
        out
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`start_tool`]; owns the engine for the duration of
/// the profiled run.
#[derive(Debug, Clone)]
pub struct ToolHandle {
    engine: Arc<Engine>,
}

impl ToolHandle {
    /// Producer-side append interface for the capture adapter.
    pub fn recorder(&self) -> Recorder {
        Recorder::new(Arc::clone(&self.engine))
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Run the analysis and print the report to stderr. The engine always
    /// produces a report; errors never escape.
    pub fn finalize(self) {
        eprint!("{}", self.engine.finalize_report());
    }
}

/// Construct the engine with the default fingerprinter.
pub fn start_tool(config: ToolConfig) -> ToolHandle {
    start_tool_with(config, Box::new(Xxh3Fingerprinter))
}

/// Construct the engine with a caller-supplied fingerprint implementation.
pub fn start_tool_with(config: ToolConfig, fingerprinter: Box<dyn Fingerprinter>) -> ToolHandle {
    init_diagnostics(&config);
    ToolHandle {
        engine: Arc::new(Engine::new(config, fingerprinter)),
    }
}

/// Stable chronological sort by `(start_time, end_time)`. Idempotent.
pub fn normalize_data_ops(ops: &mut [DataOp]) {
    ops.sort_by_key(|op| (op.start_time, op.end_time));
}

/// Stable chronological sort by `(start_time, end_time)`. Idempotent.
pub fn normalize_target_regions(regions: &mut [TargetRegion]) {
    regions.sort_by_key(|region| (region.start_time, region.end_time));
}

fn init_diagnostics(config: &ToolConfig) {
    let default_level = if config.quiet {
        "error"
    } else if config.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gpudataperf={default_level}")));
    // Another subscriber may already be installed by the host process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .try_init();
}
