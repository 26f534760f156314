//! Wire-frame builders for the supported controller protocols.
//!
//! Every builder is pure: wire-ordered pixel bytes in, one or more
//! ready-to-send packets out. No I/O happens here, which keeps the
//! encoders deterministic and exhaustively testable.

use serde::{Deserialize, Serialize};

/// Controller protocol, selected per device at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Distributed Display Protocol over UDP (default port 4048).
    Ddp,
    /// WLED realtime UDP (DRGB, falling back to DNRGB for long strips).
    WledUdp,
    /// Adalight framing over a serial link.
    Adalight,
}

impl Protocol {
    /// Build the packet sequence for one full frame.
    ///
    /// `data` is already in the device's wire channel order; `sequence`
    /// is a rolling frame counter used by protocols that carry one.
    pub fn encode(self, data: &[u8], sequence: u8) -> Vec<Vec<u8>> {
        match self {
            Protocol::Ddp => build_ddp_packets(data, 0, sequence),
            Protocol::WledUdp => build_wled_packets(data),
            Protocol::Adalight => vec![build_adalight_packet(data)],
        }
    }
}

/// DDP caps payloads at 480 pixels per datagram.
const DDP_MAX_DATA_LEN: usize = 480 * 3;

/// DDP header: flags, sequence, data type, destination id, byte offset,
/// payload length. The push flag is set only on the final chunk so the
/// controller latches the whole frame at once.
fn build_ddp_packets(data: &[u8], offset: u32, sequence: u8) -> Vec<Vec<u8>> {
    let sequence = (sequence % 15) + 1;
    let mut packets = Vec::new();
    let mut data_offset = 0;
    while data_offset < data.len() {
        let chunk_end = (data_offset + DDP_MAX_DATA_LEN).min(data.len());
        let chunk = &data[data_offset..chunk_end];
        let is_last = chunk_end == data.len();
        let mut header = [0u8; 10];
        header[0] = 0x40 | if is_last { 0x01 } else { 0x00 };
        header[1] = sequence;
        header[2] = 0x01;
        header[3] = 0x01;
        let total_offset = offset + data_offset as u32;
        header[4..8].copy_from_slice(&total_offset.to_be_bytes());
        header[8..10].copy_from_slice(&(chunk.len() as u16).to_be_bytes());
        packets.push([&header[..], chunk].concat());
        data_offset += DDP_MAX_DATA_LEN;
    }
    if packets.is_empty() {
        // Zero-pixel device still gets a push so it blanks.
        packets.push(vec![0x41, sequence, 0x01, 0x01, 0, 0, 0, 0, 0, 0]);
    }
    packets
}

/// WLED stays in realtime mode for this many seconds after the last packet.
const WLED_TIMEOUT_S: u8 = 2;
const WLED_DRGB_MAX_PIXELS: usize = 490;
const WLED_DNRGB_MAX_PIXELS: usize = 489;

fn build_wled_packets(data: &[u8]) -> Vec<Vec<u8>> {
    let pixel_count = data.len() / 3;
    if pixel_count <= WLED_DRGB_MAX_PIXELS {
        let mut packet = Vec::with_capacity(2 + data.len());
        packet.push(0x02); // DRGB
        packet.push(WLED_TIMEOUT_S);
        packet.extend_from_slice(data);
        return vec![packet];
    }
    let mut packets = Vec::new();
    let mut start_pixel = 0usize;
    while start_pixel < pixel_count {
        let end_pixel = (start_pixel + WLED_DNRGB_MAX_PIXELS).min(pixel_count);
        let chunk = &data[start_pixel * 3..end_pixel * 3];
        let mut packet = Vec::with_capacity(4 + chunk.len());
        packet.push(0x04); // DNRGB
        packet.push(WLED_TIMEOUT_S);
        packet.extend_from_slice(&(start_pixel as u16).to_be_bytes());
        packet.extend_from_slice(chunk);
        packets.push(packet);
        start_pixel = end_pixel;
    }
    packets
}

/// Adalight frame: "Ada" magic, pixel count minus one as a big-endian
/// u16, checksum `hi ^ lo ^ 0x55`, then the pixel bytes.
fn build_adalight_packet(data: &[u8]) -> Vec<u8> {
    let pixel_count = data.len() / 3;
    let count = pixel_count.saturating_sub(1) as u16;
    let hi = (count >> 8) as u8;
    let lo = (count & 0xff) as u8;
    let mut packet = Vec::with_capacity(6 + data.len());
    packet.extend_from_slice(b"Ada");
    packet.push(hi);
    packet.push(lo);
    packet.push(hi ^ lo ^ 0x55);
    packet.extend_from_slice(data);
    packet
}
