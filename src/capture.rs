//! Producer-side capture interface
//!
//! The capture adapter observes device runtime callbacks and forwards them
//! here as begin/end pairs. Timing state lives in thread-local storage: the
//! last synchronous begin timestamp, and per-thread maps from an async-op key
//! to its begin timestamp. Async data ops are keyed `(dest_device,
//! dest_addr)`; async target regions use an engine-assigned identifier.
//!
//! Completed records are appended to the engine logs under a mutex. Ingest
//! anomalies (unknown op kinds, missing begin events) are skipped with a
//! warning; analysis continues regardless.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::engine::Engine;
use crate::event::{DataOp, DeviceId, OpKind, TargetRegion};

/// Which end of a begin/end callback pair is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Begin,
    End,
}

/// Anomalies in the event stream delivered by the producer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("unknown data-op kind code {0}; skipping event")]
    UnknownOpKind(u32),
    #[error("no begin recorded for async data op (device {device}, addr {addr:#x}); skipping")]
    MissingAsyncOpBegin { device: DeviceId, addr: u64 },
    #[error("no begin recorded for async target region {id}; skipping")]
    MissingAsyncRegionBegin { id: u64 },
    #[error("transfer op is missing a required address; skipping")]
    NullTransferAddress,
}

/// One data-op callback's argument set, shared by the begin and end legs.
#[derive(Debug, Clone, Copy)]
pub struct DataOpEvent {
    /// Raw runtime op code; decoded via [`OpKind::from_raw`].
    pub raw_kind: u32,
    pub src_addr: u64,
    pub src_device: DeviceId,
    pub dest_addr: u64,
    pub dest_device: DeviceId,
    pub bytes: u64,
    /// Instruction pointer of the call site; 0 if unknown.
    pub code_loc: u64,
}

thread_local! {
    static SYNC_DATA_OP_START: Cell<u64> = const { Cell::new(0) };
    static ASYNC_DATA_OP_STARTS: RefCell<HashMap<(DeviceId, u64), u64>> =
        RefCell::new(HashMap::new());
    static SYNC_TARGET_START: Cell<u64> = const { Cell::new(0) };
    static ASYNC_TARGET_STARTS: RefCell<HashMap<u64, u64>> = RefCell::new(HashMap::new());
}

/// Append interface handed to the capture adapter.
#[derive(Debug, Clone)]
pub struct Recorder {
    engine: Arc<Engine>,
}

impl Recorder {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Engine-assigned identifier for tracking one async target region
    /// across its begin/end pair.
    pub fn region_id(&self) -> u64 {
        self.engine.next_region_id()
    }

    /// Report one leg of a data-op callback pair. For transfer ops, `payload`
    /// carries the host-visible bytes on the `End` leg so the engine can
    /// fingerprint them; it is ignored otherwise.
    pub fn data_op(&self, endpoint: Endpoint, event: &DataOpEvent, payload: Option<&[u8]>) {
        if let Err(err) = self.record_data_op(endpoint, event, payload) {
            warn!("{err}");
        }
    }

    fn record_data_op(
        &self,
        endpoint: Endpoint,
        event: &DataOpEvent,
        payload: Option<&[u8]>,
    ) -> Result<(), IngestError> {
        let kind =
            OpKind::from_raw(event.raw_kind).ok_or(IngestError::UnknownOpKind(event.raw_kind))?;
        if !(kind.is_transfer() || kind.is_alloc() || kind.is_delete()) {
            // Associate/disassociate carry no timing of interest.
            return Ok(());
        }

        let now = self.engine.now();
        match endpoint {
            Endpoint::Begin => {
                if kind.is_async() {
                    let key = (event.dest_device, event.dest_addr);
                    ASYNC_DATA_OP_STARTS.with(|starts| {
                        let prior = starts.borrow_mut().insert(key, now);
                        debug_assert!(prior.is_none(), "duplicate async begin for {key:?}");
                        if prior.is_some() {
                            warn!(
                                "duplicate begin for async data op (device {}, addr {:#x})",
                                key.0, key.1
                            );
                        }
                    });
                } else {
                    SYNC_DATA_OP_START.with(|start| start.set(now));
                }
                Ok(())
            }
            Endpoint::End => {
                let fingerprint = if kind.is_transfer() {
                    debug_assert!(
                        event.src_addr != 0 && event.dest_addr != 0,
                        "transfer op with null address"
                    );
                    if event.src_addr == 0 || event.dest_addr == 0 {
                        return Err(IngestError::NullTransferAddress);
                    }
                    match payload {
                        Some(bytes) => self.engine.fingerprint(bytes),
                        None => {
                            warn!("transfer op delivered without payload; fingerprint unset");
                            0
                        }
                    }
                } else {
                    0
                };

                let start_time = if kind.is_async() {
                    let key = (event.dest_device, event.dest_addr);
                    ASYNC_DATA_OP_STARTS
                        .with(|starts| starts.borrow_mut().remove(&key))
                        .ok_or(IngestError::MissingAsyncOpBegin {
                            device: key.0,
                            addr: key.1,
                        })?
                } else {
                    SYNC_DATA_OP_START.with(|start| start.get())
                };

                self.engine.append_data_op(DataOp {
                    kind,
                    src_addr: event.src_addr,
                    dest_addr: event.dest_addr,
                    src_device: event.src_device,
                    dest_device: event.dest_device,
                    bytes: event.bytes,
                    code_loc: event.code_loc,
                    start_time,
                    end_time: now,
                    fingerprint,
                });
                Ok(())
            }
        }
    }

    /// Report one leg of a target-region (device execution) callback pair.
    /// Async regions pass the identifier obtained from [`Recorder::region_id`]
    /// on both legs.
    pub fn target_region(&self, endpoint: Endpoint, device: DeviceId, async_id: Option<u64>) {
        if let Err(err) = self.record_target_region(endpoint, device, async_id) {
            warn!("{err}");
        }
    }

    fn record_target_region(
        &self,
        endpoint: Endpoint,
        device: DeviceId,
        async_id: Option<u64>,
    ) -> Result<(), IngestError> {
        let now = self.engine.now();
        match endpoint {
            Endpoint::Begin => {
                match async_id {
                    Some(id) => ASYNC_TARGET_STARTS.with(|starts| {
                        starts.borrow_mut().insert(id, now);
                    }),
                    None => SYNC_TARGET_START.with(|start| start.set(now)),
                }
                Ok(())
            }
            Endpoint::End => {
                let start_time = match async_id {
                    Some(id) => ASYNC_TARGET_STARTS
                        .with(|starts| starts.borrow_mut().remove(&id))
                        .ok_or(IngestError::MissingAsyncRegionBegin { id })?,
                    None => SYNC_TARGET_START.with(|start| start.get()),
                };
                self.engine.append_target_region(TargetRegion {
                    device,
                    start_time,
                    end_time: now,
                });
                Ok(())
            }
        }
    }
}
