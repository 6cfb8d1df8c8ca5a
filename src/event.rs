//! Event model for captured device data operations and execution intervals
//!
//! The capture adapter appends these records while the target program runs;
//! the analysis engine consumes them after the target terminates. Records are
//! never mutated after insertion.

use serde::{Deserialize, Serialize};

/// Device identifier. Devices are numbered `0..num_devices`; by convention
/// the host is assigned the id equal to `num_devices`.
pub type DeviceId = u32;

/// Kind of a device data operation.
///
/// The raw codes accepted by [`OpKind::from_raw`] follow the capture
/// runtime's numbering: synchronous kinds occupy 1..=6, asynchronous
/// variants the same code plus 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// Device memory allocation
    Alloc,
    /// Host-to-device data transfer
    TransferToDevice,
    /// Device-to-host data transfer
    TransferFromDevice,
    /// Device memory deallocation
    Delete,
    /// Host/device address association
    Associate,
    /// Host/device address disassociation
    Disassociate,
    /// Asynchronous device memory allocation
    AllocAsync,
    /// Asynchronous host-to-device data transfer
    TransferToDeviceAsync,
    /// Asynchronous device-to-host data transfer
    TransferFromDeviceAsync,
    /// Asynchronous device memory deallocation
    DeleteAsync,
}

impl OpKind {
    /// Decode a raw runtime op code. Returns `None` for unknown codes;
    /// callers skip those with a warning per the producer contract.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(OpKind::Alloc),
            2 => Some(OpKind::TransferToDevice),
            3 => Some(OpKind::TransferFromDevice),
            4 => Some(OpKind::Delete),
            5 => Some(OpKind::Associate),
            6 => Some(OpKind::Disassociate),
            17 => Some(OpKind::AllocAsync),
            18 => Some(OpKind::TransferToDeviceAsync),
            19 => Some(OpKind::TransferFromDeviceAsync),
            20 => Some(OpKind::DeleteAsync),
            _ => None,
        }
    }

    pub fn is_alloc(self) -> bool {
        matches!(self, OpKind::Alloc | OpKind::AllocAsync)
    }

    pub fn is_delete(self) -> bool {
        matches!(self, OpKind::Delete | OpKind::DeleteAsync)
    }

    pub fn is_transfer_to(self) -> bool {
        matches!(self, OpKind::TransferToDevice | OpKind::TransferToDeviceAsync)
    }

    pub fn is_transfer_from(self) -> bool {
        matches!(
            self,
            OpKind::TransferFromDevice | OpKind::TransferFromDeviceAsync
        )
    }

    pub fn is_transfer(self) -> bool {
        self.is_transfer_to() || self.is_transfer_from()
    }

    pub fn is_async(self) -> bool {
        matches!(
            self,
            OpKind::AllocAsync
                | OpKind::TransferToDeviceAsync
                | OpKind::TransferFromDeviceAsync
                | OpKind::DeleteAsync
        )
    }

    /// Display name used in report tables.
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Alloc => "alloc",
            OpKind::TransferToDevice => "to device",
            OpKind::TransferFromDevice => "from device",
            OpKind::Delete => "delete",
            OpKind::Associate => "associate",
            OpKind::Disassociate => "disassociate",
            OpKind::AllocAsync => "alloc (async)",
            OpKind::TransferToDeviceAsync => "to device (async)",
            OpKind::TransferFromDeviceAsync => "from device (async)",
            OpKind::DeleteAsync => "delete (async)",
        }
    }
}

/// A single captured data operation (allocation, deletion, or transfer).
///
/// Timestamps are monotonic nanoseconds since engine start. Addresses are
/// opaque (host pointer or device handle); 0 means absent. The fingerprint
/// is defined only for transfer kinds and is 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataOp {
    pub kind: OpKind,
    pub src_addr: u64,
    pub dest_addr: u64,
    pub src_device: DeviceId,
    pub dest_device: DeviceId,
    pub bytes: u64,
    /// Instruction pointer of the call site; 0 if unknown.
    pub code_loc: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub fingerprint: u64,
}

impl DataOp {
    /// Elapsed time of the operation in nanoseconds.
    pub fn duration(&self) -> u64 {
        self.end_time - self.start_time
    }
}

/// A single captured device-execution interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRegion {
    pub device: DeviceId,
    pub start_time: u64,
    pub end_time: u64,
}

impl TargetRegion {
    pub fn duration(&self) -> u64 {
        self.end_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_known_codes() {
        assert_eq!(OpKind::from_raw(1), Some(OpKind::Alloc));
        assert_eq!(OpKind::from_raw(2), Some(OpKind::TransferToDevice));
        assert_eq!(OpKind::from_raw(3), Some(OpKind::TransferFromDevice));
        assert_eq!(OpKind::from_raw(4), Some(OpKind::Delete));
        assert_eq!(OpKind::from_raw(5), Some(OpKind::Associate));
        assert_eq!(OpKind::from_raw(6), Some(OpKind::Disassociate));
        assert_eq!(OpKind::from_raw(17), Some(OpKind::AllocAsync));
        assert_eq!(OpKind::from_raw(18), Some(OpKind::TransferToDeviceAsync));
        assert_eq!(OpKind::from_raw(19), Some(OpKind::TransferFromDeviceAsync));
        assert_eq!(OpKind::from_raw(20), Some(OpKind::DeleteAsync));
    }

    #[test]
    fn test_from_raw_unknown_codes() {
        assert_eq!(OpKind::from_raw(0), None);
        assert_eq!(OpKind::from_raw(7), None);
        assert_eq!(OpKind::from_raw(16), None);
        assert_eq!(OpKind::from_raw(21), None);
        assert_eq!(OpKind::from_raw(u32::MAX), None);
    }

    #[test]
    fn test_alloc_predicates() {
        assert!(OpKind::Alloc.is_alloc());
        assert!(OpKind::AllocAsync.is_alloc());
        assert!(!OpKind::Delete.is_alloc());
        assert!(!OpKind::TransferToDevice.is_alloc());
    }

    #[test]
    fn test_delete_predicates() {
        assert!(OpKind::Delete.is_delete());
        assert!(OpKind::DeleteAsync.is_delete());
        assert!(!OpKind::Alloc.is_delete());
    }

    #[test]
    fn test_transfer_predicates() {
        assert!(OpKind::TransferToDevice.is_transfer());
        assert!(OpKind::TransferToDeviceAsync.is_transfer());
        assert!(OpKind::TransferFromDevice.is_transfer());
        assert!(OpKind::TransferFromDeviceAsync.is_transfer());
        assert!(!OpKind::Alloc.is_transfer());
        assert!(!OpKind::Associate.is_transfer());

        assert!(OpKind::TransferToDevice.is_transfer_to());
        assert!(!OpKind::TransferToDevice.is_transfer_from());
        assert!(OpKind::TransferFromDevice.is_transfer_from());
        assert!(!OpKind::TransferFromDevice.is_transfer_to());
    }

    #[test]
    fn test_async_predicate() {
        assert!(OpKind::AllocAsync.is_async());
        assert!(OpKind::TransferToDeviceAsync.is_async());
        assert!(OpKind::TransferFromDeviceAsync.is_async());
        assert!(OpKind::DeleteAsync.is_async());
        assert!(!OpKind::Alloc.is_async());
        assert!(!OpKind::Delete.is_async());
        assert!(!OpKind::Associate.is_async());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(OpKind::Alloc.name(), "alloc");
        assert_eq!(OpKind::TransferToDevice.name(), "to device");
        assert_eq!(OpKind::TransferFromDevice.name(), "from device");
        assert_eq!(OpKind::DeleteAsync.name(), "delete (async)");
        assert_eq!(OpKind::TransferToDeviceAsync.name(), "to device (async)");
    }

    #[test]
    fn test_data_op_duration() {
        let op = DataOp {
            kind: OpKind::TransferToDevice,
            src_addr: 0x1000,
            dest_addr: 0xA000,
            src_device: 1,
            dest_device: 0,
            bytes: 64,
            code_loc: 0x4242,
            start_time: 10,
            end_time: 35,
            fingerprint: 0xfeed,
        };
        assert_eq!(op.duration(), 25);
    }

    #[test]
    fn test_target_region_duration() {
        let region = TargetRegion {
            device: 0,
            start_time: 100,
            end_time: 250,
        };
        assert_eq!(region.duration(), 150);
    }

    #[test]
    fn test_data_op_serde_round_trip() {
        let op = DataOp {
            kind: OpKind::TransferFromDevice,
            src_addr: 0xA000,
            dest_addr: 0x1000,
            src_device: 0,
            dest_device: 1,
            bytes: 4096,
            code_loc: 0,
            start_time: 1,
            end_time: 2,
            fingerprint: 7,
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: DataOp = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
