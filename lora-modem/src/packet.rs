//! Received packets.

use core::ops::Deref;
use heapless::Vec;

/// Largest LoRa payload in bytes.
pub const MAX_PAYLOAD: usize = 255;

/// A received packet and its signal metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RxPacket {
    payload: Vec<u8, MAX_PAYLOAD>,
    /// Tick count (ms) of the interrupt that signalled the packet.
    pub ticks_ms: u32,
    /// Signal to noise ratio in units of 0.25 dB.
    pub snr: i16,
    /// Received signal strength in dBm.
    pub rssi: i16,
    /// False if the packet failed the payload CRC check.
    pub valid_crc: bool,
}

impl RxPacket {
    /// An empty packet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes the payload to `len` zeroed bytes, reusing the storage, and
    /// returns it for the driver to fill.
    pub fn payload_buffer(&mut self, len: usize) -> &mut [u8] {
        let len = len.min(MAX_PAYLOAD);
        self.payload.clear();
        // Cannot fail: len <= capacity.
        let _ = self.payload.resize_default(len);
        &mut self.payload
    }

    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// SNR in whole dB, rounded toward zero.
    pub fn snr_db(&self) -> i16 {
        self.snr / 4
    }
}

impl Deref for RxPacket {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_reuse() {
        let mut packet = RxPacket::new();
        packet.payload_buffer(4).copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(&packet[..], &[1, 2, 3, 4]);

        let buf = packet.payload_buffer(2);
        assert_eq!(buf, &[0, 0]);
        assert_eq!(packet.len(), 2);
    }

    #[test]
    fn test_oversized_is_clamped() {
        let mut packet = RxPacket::new();
        assert_eq!(packet.payload_buffer(1000).len(), MAX_PAYLOAD);
    }
}
