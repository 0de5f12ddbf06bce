//! TCXO control through DIO3.

/// Supply voltage DIO3 provides to the TCXO.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TcxoVoltage {
    /// 1.6V
    Volt1_6 = 0x00,
    /// 1.7V
    Volt1_7 = 0x01,
    /// 1.8V
    Volt1_8 = 0x02,
    /// 2.2V
    Volt2_2 = 0x03,
    /// 2.4V
    Volt2_4 = 0x04,
    /// 2.7V
    Volt2_7 = 0x05,
    /// 3.0V
    Volt3_0 = 0x06,
    /// 3.3V
    Volt3_3 = 0x07,
}

/// Time the chip waits for the TCXO to stabilise, in 15.625 us steps.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TcxoDelay {
    inner: [u8; 3],
}

impl From<TcxoDelay> for [u8; 3] {
    fn from(val: TcxoDelay) -> Self {
        val.inner
    }
}

impl TcxoDelay {
    /// Creates a TCXO delay from a duration in milliseconds.
    pub const fn from_ms(ms: u32) -> Self {
        let steps = ms << 6;
        let b = steps.to_be_bytes();
        Self {
            inner: [b[1], b[2], b[3]],
        }
    }
}
