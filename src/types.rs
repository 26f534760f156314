use crate::color::ColorOrder;
use crate::packets::Protocol;
use serde::{Deserialize, Serialize};

/// How a device is reached on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// UDP datagrams to `host:port`.
    Udp { host: String, port: u16 },
    /// A serial link such as an Adalight controller on USB.
    Serial { path: String, baud_rate: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    pub pixel_count: usize,
    pub protocol: Protocol,
    #[serde(default)]
    pub color_order: ColorOrder,
    pub transport: TransportConfig,
    /// Milliseconds a flush may take before it counts as a timeout.
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
}

fn default_flush_timeout_ms() -> u64 {
    500
}

/// One contiguous pixel range on a physical device, owned by exactly
/// one virtual. `start` and `end` are inclusive pixel indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub device_id: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub reversed: bool,
}

impl Segment {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn overlaps(&self, other: &Segment) -> bool {
        self.device_id == other.device_id && self.start <= other.end && other.start <= self.end
    }
}

/// Persisted shape of a virtual: identity plus its segment mapping.
/// The runtime state (active effect, paused flag, output buffer) lives
/// in [`crate::virtuals::Virtual`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    /// True for the 1:1 virtual created automatically with a device.
    #[serde(default)]
    pub auto_generated: bool,
}

impl VirtualConfig {
    /// Pixel count is always derived from the segment list.
    pub fn pixel_count(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(device_id: &str, start: usize, end: usize) -> Segment {
        Segment {
            device_id: device_id.into(),
            start,
            end,
            reversed: false,
        }
    }

    #[test]
    fn overlap_requires_same_device() {
        assert!(seg("a", 0, 9).overlaps(&seg("a", 9, 20)));
        assert!(seg("a", 5, 9).overlaps(&seg("a", 0, 20)));
        assert!(!seg("a", 0, 9).overlaps(&seg("a", 10, 20)));
        assert!(!seg("a", 0, 9).overlaps(&seg("b", 0, 9)));
    }

    #[test]
    fn pixel_count_sums_segment_lengths() {
        let config = VirtualConfig {
            id: "v".into(),
            name: "v".into(),
            segments: vec![seg("a", 0, 14), seg("b", 0, 14)],
            auto_generated: false,
        };
        assert_eq!(config.pixel_count(), 30);
    }
}
