use thiserror::Error;

/// Validation failures when replacing a virtual's segment list.
///
/// These are surfaced synchronously to the caller of the mutating
/// operation and are never partially applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("segments overlap on device '{device_id}': [{a_start},{a_end}] and [{b_start},{b_end}]")]
    Overlap {
        device_id: String,
        a_start: usize,
        a_end: usize,
        b_start: usize,
        b_end: usize,
    },
    #[error("segment [{start},{end}] out of range for device '{device_id}' ({pixel_count} pixels)")]
    OutOfRange {
        device_id: String,
        start: usize,
        end: usize,
        pixel_count: usize,
    },
    #[error("segment references unknown device '{0}'")]
    UnknownDevice(String),
}

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("effect '{effect_type}' cannot be bound to {pixel_count} pixels")]
    LengthMismatch {
        effect_type: String,
        pixel_count: usize,
    },
    #[error("failed to initialize effect '{effect_type}': {reason}")]
    InitFailed {
        effect_type: String,
        reason: String,
    },
    #[error("unknown effect type '{0}'")]
    UnknownType(String),
}

/// Runtime I/O failures at the device boundary.
///
/// These are absorbed where they occur: the device transitions to an
/// unhealthy state and an event is emitted, but the scheduler keeps
/// ticking every other device and virtual.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("flush timed out after {0} ms")]
    Timeout(u64),
    #[error("frame encoding failed: {0}")]
    EncodeFailed(String),
    #[error("device is deactivated")]
    Deactivated,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read state file: {0}")]
    Read(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
