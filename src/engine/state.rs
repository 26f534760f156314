use crate::device::ConnectionState;
use crate::effects::EffectSetup;
use crate::packets::Protocol;
use crate::types::Segment;
use serde::Serialize;

/// Query-side summary of a virtual, shaped for the control layer.
#[derive(Debug, Clone, Serialize)]
pub struct VirtualInfo {
    pub id: String,
    pub name: String,
    pub pixel_count: usize,
    pub segments: Vec<Segment>,
    pub active: bool,
    pub auto_generated: bool,
    pub active_effect: Option<EffectSetup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub pixel_count: usize,
    pub protocol: Protocol,
    pub connection_state: ConnectionState,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlaybackState {
    pub is_paused: bool,
    pub target_fps: u32,
}
