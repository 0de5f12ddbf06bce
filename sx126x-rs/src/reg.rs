//! Register addresses used by the driver.

/// SX126x registers accessed with `WriteRegister`/`ReadRegister`.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    /// IQ polarity setup, bit 2 must be cleared with inverted IQ (errata 15.4).
    IqPolarity = 0x0736,
    /// LoRa sync word, MSB first.
    LoRaSyncWordMsb = 0x0740,
    /// TX modulation quality, bit 2 cleared for 500 kHz only (errata 15.1).
    TxModulation = 0x0889,
    /// RX gain: 0x94 power saving, 0x96 boosted.
    RxGain = 0x08AC,
    /// TX clamp configuration (errata 15.2).
    TxClampConfig = 0x08D8,
    /// Over current protection, 2.5 mA steps.
    OcpConfiguration = 0x08E7,
    /// RTC control, stopped after a timed receive (errata 15.3).
    RtcControl = 0x0902,
    /// Event clear register, bit 1 clears the RTC timeout event.
    EventMask = 0x0944,
}

impl From<Register> for u16 {
    fn from(reg: Register) -> Self {
        reg as u16
    }
}
