//! Calibration parameters.

/// Blocks to calibrate with the `Calibrate` command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CalibParam {
    inner: u8,
}

impl CalibParam {
    /// RC64k oscillator.
    pub const RC64K: u8 = 1 << 0;
    /// RC13M oscillator.
    pub const RC13M: u8 = 1 << 1;
    /// PLL.
    pub const PLL: u8 = 1 << 2;
    /// ADC pulse.
    pub const ADC_PULSE: u8 = 1 << 3;
    /// ADC bulk N.
    pub const ADC_BULK_N: u8 = 1 << 4;
    /// ADC bulk P.
    pub const ADC_BULK_P: u8 = 1 << 5;
    /// Image rejection.
    pub const IMAGE: u8 = 1 << 6;

    /// Calibrates every block.
    pub const fn all() -> Self {
        Self { inner: 0x7F }
    }

    /// Calibrates the blocks selected by `mask`.
    pub const fn new(mask: u8) -> Self {
        Self { inner: mask & 0x7F }
    }
}

impl From<CalibParam> for u8 {
    fn from(val: CalibParam) -> Self {
        val.inner
    }
}

/// Frequency band for the image calibration, as two 4 MHz step bounds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CalibImageFreq {
    freq1: u8,
    freq2: u8,
}

impl CalibImageFreq {
    /// Picks the band containing `freq_hz`.
    ///
    /// ISM bands use the datasheet values; anything else gets a narrow band
    /// around the frequency itself.
    pub fn from_rf_frequency(freq_hz: u32) -> Self {
        let mhz = freq_hz / 1_000_000;
        let (freq1, freq2) = match mhz {
            430..=440 => (0x6B, 0x6F),
            470..=510 => (0x75, 0x81),
            779..=787 => (0xC1, 0xC5),
            863..=870 => (0xD7, 0xDB),
            902..=928 => (0xE1, 0xE9),
            _ => {
                let step = (mhz / 4) as u8;
                (step.saturating_sub(1), step.saturating_add(1))
            }
        };
        Self { freq1, freq2 }
    }
}

impl From<CalibImageFreq> for [u8; 2] {
    fn from(val: CalibImageFreq) -> Self {
        [val.freq1, val.freq2]
    }
}
