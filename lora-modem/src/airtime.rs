//! LoRa time-on-air calculation.
//!
//! Based on the SX1261/2 datasheet formula (section 6.1.4), which the SX127x
//! datasheet gives in an equivalent form. Everything is computed with integers;
//! symbol counts are kept multiplied by four so the `4.25` preamble term stays
//! exact.

use crate::config::{Bandwidth, Settings};

/// Per-family corrections to the symbol count.
///
/// Both families agree except at the lowest spreading factors, where the
/// SX126x adds two preamble symbols and drops the 8 bit header term.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolOffsets {
    /// Extra symbols added to the preamble, times four.
    pub symbols_x4: i32,
    /// Correction to the payload bit count.
    pub bits: i32,
}

/// Symbol duration in microseconds, `2^SF / BW`.
pub fn symbol_duration_us(sf: u8, bw: Bandwidth) -> u32 {
    ((1u64 << sf) * 1_000_000 / bw.hz() as u64) as u32
}

/// Number of symbols in a packet of `payload_len` bytes, times four.
pub fn n_symbols_x4(settings: &Settings, payload_len: usize, offsets: SymbolOffsets) -> u32 {
    let sf = settings.sf as i32;
    let ldr = settings.low_data_rate_optimize() as i32;

    // Preamble plus the 4.25 symbol sync/SFD, then 8 fixed header symbols.
    let mut n_x4 = (settings.preamble_len as i32) * 4 + 17 + offsets.symbols_x4 + 8 * 4;

    let header_bits = if settings.implicit_header { 0 } else { 20 };
    let bits = 8 * payload_len as i32 + 16 * settings.crc_en as i32 - 4 * sf
        + 8
        + header_bits
        + offsets.bits;
    if bits > 0 {
        let bits_per_symbol = 4 * (sf - 2 * ldr);
        let blocks = (bits + bits_per_symbol - 1) / bits_per_symbol;
        n_x4 += blocks * settings.coding_rate as i32 * 4;
    }
    n_x4.max(0) as u32
}

/// Time on air in microseconds for the given settings.
///
/// Saturates at `u32::MAX` (about 71 minutes), which only very long
/// preambles at SF12 and the narrowest bandwidths reach.
pub fn time_on_air_us(settings: &Settings, payload_len: usize, offsets: SymbolOffsets) -> u32 {
    let n_x4 = n_symbols_x4(settings, payload_len, offsets) as u64;
    let numerator = n_x4 * (1u64 << settings.sf) * 1_000_000;
    u32::try_from(numerator / (4 * settings.bw.hz() as u64)).unwrap_or(u32::MAX)
}
