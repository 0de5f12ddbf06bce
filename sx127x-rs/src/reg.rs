//! Register map and bit fields of the SX127x in LoRa mode.

use lora_modem::{Bandwidth, ConfigError};

/// SX127x registers (LoRa page unless noted).
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    Fifo = 0x00,
    OpMode = 0x01,
    /// Carrier frequency, MSB first over three registers.
    FrfMsb = 0x06,
    PaConfig = 0x09,
    PaRamp = 0x0A,
    Ocp = 0x0B,
    Lna = 0x0C,
    FifoAddrPtr = 0x0D,
    FifoTxBaseAddr = 0x0E,
    FifoRxBaseAddr = 0x0F,
    FifoRxCurrentAddr = 0x10,
    IrqFlagsMask = 0x11,
    IrqFlags = 0x12,
    RxNbBytes = 0x13,
    PktSnrValue = 0x19,
    PktRssiValue = 0x1A,
    ModemConfig1 = 0x1D,
    ModemConfig2 = 0x1E,
    SymbTimeoutLsb = 0x1F,
    PreambleMsb = 0x20,
    PayloadLength = 0x22,
    MaxPayloadLength = 0x23,
    ModemConfig3 = 0x26,
    /// Receiver IF frequency, set per bandwidth (errata 2.3).
    IfFreq2 = 0x2F,
    IfFreq1 = 0x30,
    DetectOptimize = 0x31,
    InvertIq = 0x33,
    /// 500 kHz sensitivity optimization (errata 2.1).
    HighBwOptimize1 = 0x36,
    DetectionThreshold = 0x37,
    SyncWord = 0x39,
    HighBwOptimize2 = 0x3A,
    /// `RegInvertIQ2` in LoRa mode, `RegImageCal` in FSK mode.
    InvertIq2 = 0x3B,
    DioMapping1 = 0x40,
    Version = 0x42,
    Tcxo = 0x4B,
    PaDac = 0x4D,
}

impl Register {
    /// The FSK page register sharing the address of [`Register::InvertIq2`].
    pub const IMAGE_CAL: Register = Register::InvertIq2;
}

impl From<Register> for u8 {
    fn from(reg: Register) -> Self {
        reg as u8
    }
}

/// Silicon revision of every production SX1276/77/78/79.
pub const CHIP_VERSION: u8 = 0x12;

/// `RegOpMode` LongRangeMode bit.
pub const LONG_RANGE_MODE: u8 = 0x80;
/// `RegOpMode` LowFrequencyModeOn bit.
pub const LOW_FREQUENCY_MODE: u8 = 0x08;
const MODE_MASK: u8 = 0x07;

/// Transceiver modes of `RegOpMode`.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Sleep = 0x00,
    Standby = 0x01,
    Tx = 0x03,
    RxContinuous = 0x05,
    RxSingle = 0x06,
}

impl Mode {
    /// True if `op_mode` (a `RegOpMode` value) is in this mode in LoRa.
    pub fn matches(self, op_mode: u8) -> bool {
        op_mode & (LONG_RANGE_MODE | MODE_MASK) == LONG_RANGE_MODE | self as u8
    }
}

/// `RegImageCal` ImageCalStart bit.
pub const IMAGE_CAL_START: u8 = 0x40;
/// `RegImageCal` ImageCalRunning bit.
pub const IMAGE_CAL_RUNNING: u8 = 0x20;

/// LoRa interrupt flags of `RegIrqFlags`.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IrqFlag {
    CadDetected = 0x01,
    FhssChangeChannel = 0x02,
    CadDone = 0x04,
    TxDone = 0x08,
    ValidHeader = 0x10,
    PayloadCrcError = 0x20,
    RxDone = 0x40,
    RxTimeout = 0x80,
}

/// A `RegIrqFlags` value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IrqFlags(pub u8);

impl IrqFlags {
    /// True if `flag` is set.
    pub fn has(self, flag: IrqFlag) -> bool {
        self.0 & flag as u8 != 0
    }

    /// A packet arrived without a timeout or CRC error and, in explicit
    /// header mode, with a valid header.
    pub fn rx_ok(self, implicit_header: bool) -> bool {
        self.has(IrqFlag::RxDone)
            && !self.has(IrqFlag::RxTimeout)
            && !self.has(IrqFlag::PayloadCrcError)
            && (implicit_header || self.has(IrqFlag::ValidHeader))
    }
}

/// `RegDioMapping1` while receiving: DIO0 RxDone, DIO1 RxTimeout.
pub const DIO_MAPPING_RX: u8 = 0x00;
/// `RegDioMapping1` while transmitting: DIO0 TxDone.
pub const DIO_MAPPING_TX: u8 = 0x40;

/// `RegModemConfig1` bandwidth field, bits 7:4.
pub fn bandwidth_bits(bw: Bandwidth) -> u8 {
    let code = match bw {
        Bandwidth::Khz7_8 => 0,
        Bandwidth::Khz10_4 => 1,
        Bandwidth::Khz15_6 => 2,
        Bandwidth::Khz20_8 => 3,
        Bandwidth::Khz31_25 => 4,
        Bandwidth::Khz41_7 => 5,
        Bandwidth::Khz62_5 => 6,
        Bandwidth::Khz125 => 7,
        Bandwidth::Khz250 => 8,
        Bandwidth::Khz500 => 9,
    };
    code << 4
}

/// `RegModemConfig1` coding rate field, bits 3:1, from the denominator.
pub fn coding_rate_bits(denominator: u8) -> Result<u8, ConfigError> {
    match denominator {
        5..=8 => Ok((denominator - 4) << 1),
        _ => Err(ConfigError::CodingRate(denominator)),
    }
}

/// `RegIfFreq2` value for `bw` below 500 kHz (errata 2.3).
pub fn if_freq2(bw: Bandwidth) -> u8 {
    match bw {
        Bandwidth::Khz7_8 => 0x48,
        Bandwidth::Khz62_5 | Bandwidth::Khz125 | Bandwidth::Khz250 => 0x40,
        _ => 0x44,
    }
}

/// `RegPaRamp` code for a ramp time of exactly `us` microseconds.
pub fn pa_ramp_bits(us: u32) -> Result<u8, ConfigError> {
    const RAMPS_US: [u32; 16] = [
        3400, 2000, 1000, 500, 250, 125, 100, 62, 50, 40, 31, 25, 20, 15, 12, 10,
    ];
    RAMPS_US
        .iter()
        .position(|r| *r == us)
        .map(|code| code as u8)
        .ok_or(ConfigError::PaRamp(us))
}

/// `RegOcp` value for a current limit in mA (OcpOn set).
pub fn ocp_bits(max_ma: u16) -> u8 {
    let trim = match max_ma {
        0..=120 => (max_ma.max(45) - 45) / 5,
        _ => (max_ma.min(240) + 30) / 10,
    };
    0x20 | trim as u8
}

/// Frequency register value for a 32 MHz crystal.
pub fn frf(freq_hz: u32) -> u32 {
    (((freq_hz as u64) << 19) / 32_000_000) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frf() {
        assert_eq!(frf(868_000_000), 0xD9_0000);
        assert_eq!(frf(915_000_000), 0xE4_C000);
        assert_eq!(frf(433_000_000), 0x6C_4000);
    }

    #[test]
    fn test_mode_readback() {
        assert!(Mode::Standby.matches(0x81));
        assert!(Mode::Standby.matches(0x89));
        assert!(!Mode::Standby.matches(0x01));
        assert!(!Mode::RxSingle.matches(0x85));
    }

    #[test]
    fn test_ocp_trim() {
        assert_eq!(ocp_bits(100), 0x2B);
        assert_eq!(ocp_bits(120), 0x2F);
        assert_eq!(ocp_bits(140), 0x31);
        assert_eq!(ocp_bits(500), 0x3B);
    }

    #[test]
    fn test_field_encodings() {
        assert_eq!(bandwidth_bits(Bandwidth::Khz125), 0x70);
        assert_eq!(coding_rate_bits(5), Ok(0x02));
        assert_eq!(coding_rate_bits(8), Ok(0x08));
        assert_eq!(coding_rate_bits(9), Err(ConfigError::CodingRate(9)));
        assert_eq!(pa_ramp_bits(40), Ok(0x09));
        assert_eq!(pa_ramp_bits(41), Err(ConfigError::PaRamp(41)));
    }

    #[test]
    fn test_rx_ok_needs_valid_header_when_explicit() {
        let done = IrqFlags(IrqFlag::RxDone as u8);
        assert!(!done.rx_ok(false));
        assert!(done.rx_ok(true));
        assert!(IrqFlags(0x50).rx_ok(false));
        assert!(!IrqFlags(0x70).rx_ok(false));
    }
}
