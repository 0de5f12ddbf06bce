//! Transmit and receive parameters.

use lora_modem::ConfigError;

/// A 24 bit timeout for `SetRx`/`SetTx`, in 15.625 us steps.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RxTxTimeout {
    inner: [u8; 3],
}

impl From<RxTxTimeout> for [u8; 3] {
    fn from(val: RxTxTimeout) -> Self {
        val.inner
    }
}

impl RxTxTimeout {
    /// Longest timeout the chip can count, in milliseconds.
    pub const MAX_MS: u32 = 0x00FF_FFFE >> 6;

    /// Creates a timeout from a duration in milliseconds, saturating at
    /// [`MAX_MS`](Self::MAX_MS).
    pub const fn from_ms(ms: u32) -> Self {
        let ms = if ms > Self::MAX_MS { Self::MAX_MS } else { ms };
        let b = (ms << 6).to_be_bytes();
        Self {
            inner: [b[1], b[2], b[3]],
        }
    }

    /// No timeout: RX ends after one packet, TX after the packet is sent.
    pub const fn single() -> Self {
        Self {
            inner: [0x00, 0x00, 0x00],
        }
    }

    /// Continuous receive mode.
    pub const fn continuous_rx() -> Self {
        Self {
            inner: [0xFF, 0xFF, 0xFF],
        }
    }
}

/// Power amplifier ramp time.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RampTime {
    /// 10 µs
    Ramp10u = 0x00,
    /// 20 µs
    Ramp20u = 0x01,
    /// 40 µs
    Ramp40u = 0x02,
    /// 80 µs
    Ramp80u = 0x03,
    /// 200 µs
    Ramp200u = 0x04,
    /// 800 µs
    Ramp800u = 0x05,
    /// 1700 µs
    Ramp1700u = 0x06,
    /// 3400 µs
    Ramp3400u = 0x07,
}

impl RampTime {
    /// The ramp time for exactly `us` microseconds.
    pub fn from_us(us: u32) -> Result<Self, ConfigError> {
        Ok(match us {
            10 => Self::Ramp10u,
            20 => Self::Ramp20u,
            40 => Self::Ramp40u,
            80 => Self::Ramp80u,
            200 => Self::Ramp200u,
            800 => Self::Ramp800u,
            1700 => Self::Ramp1700u,
            3400 => Self::Ramp3400u,
            _ => return Err(ConfigError::PaRamp(us)),
        })
    }
}

/// A builder for transmit (TX) parameters.
#[derive(Copy, Clone, Debug)]
pub struct TxParams {
    power_dbm: i8,
    ramp_time: RampTime,
}

impl Default for TxParams {
    fn default() -> Self {
        Self {
            power_dbm: 0,
            ramp_time: RampTime::Ramp10u,
        }
    }
}

impl From<TxParams> for [u8; 2] {
    fn from(val: TxParams) -> Self {
        [val.power_dbm as u8, val.ramp_time as u8]
    }
}

impl TxParams {
    /// Sets the power parameter in dBm.
    ///
    /// The valid range depends on the selected power amplifier (PA):
    /// - Low power PA: -17 to +14 dBm
    /// - High power PA: -9 to +22 dBm
    pub fn set_power_dbm(mut self, power_dbm: i8) -> Self {
        self.power_dbm = power_dbm;
        self
    }

    /// Sets the power amplifier ramp time.
    pub fn set_ramp_time(mut self, ramp_time: RampTime) -> Self {
        self.ramp_time = ramp_time;
        self
    }
}

/// The power amplifier selected with `SetPaConfig`.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceSel {
    /// High power PA (SX1262).
    SX1262 = 0x00,
    /// Low power PA (SX1261).
    SX1261 = 0x01,
}

/// A builder for power amplifier (PA) configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PaConfig {
    pa_duty_cycle: u8,
    hp_max: u8,
    device_sel: DeviceSel,
}

impl From<PaConfig> for [u8; 4] {
    fn from(val: PaConfig) -> Self {
        [val.pa_duty_cycle, val.hp_max, val.device_sel as u8, 0x01]
    }
}

impl Default for PaConfig {
    fn default() -> Self {
        Self {
            pa_duty_cycle: 0x00,
            hp_max: 0x00,
            device_sel: DeviceSel::SX1262,
        }
    }
}

impl PaConfig {
    /// Sets the PA duty cycle.
    pub fn set_pa_duty_cycle(mut self, pa_duty_cycle: u8) -> Self {
        self.pa_duty_cycle = pa_duty_cycle;
        self
    }

    /// Sets the maximum output power for the high-power PA.
    pub fn set_hp_max(mut self, hp_max: u8) -> Self {
        self.hp_max = hp_max;
        self
    }

    /// Sets the device type (SX1261 or SX1262).
    pub fn set_device_sel(mut self, device_sel: DeviceSel) -> Self {
        self.device_sel = device_sel;
        self
    }
}

/// Length and start of the last received payload in the data buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RxBufferStatus {
    payload_length_rx: u8,
    rx_start_buffer_pointer: u8,
}

impl From<[u8; 2]> for RxBufferStatus {
    fn from(raw: [u8; 2]) -> Self {
        Self {
            payload_length_rx: raw[0],
            rx_start_buffer_pointer: raw[1],
        }
    }
}

impl RxBufferStatus {
    /// Returns the length of the received payload.
    pub fn payload_length_rx(&self) -> u8 {
        self.payload_length_rx
    }

    /// Returns the starting address of the payload in the buffer.
    pub fn rx_start_buffer_pointer(&self) -> u8 {
        self.rx_start_buffer_pointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_encoding() {
        let raw: [u8; 3] = RxTxTimeout::from_ms(1_000).into();
        assert_eq!(raw, [0x00, 0xFA, 0x00]);
        let raw: [u8; 3] = RxTxTimeout::from_ms(u32::MAX).into();
        assert_eq!(raw, [0xFF, 0xFF, 0xC0]);
        assert_ne!(RxTxTimeout::from_ms(u32::MAX), RxTxTimeout::continuous_rx());
    }

    #[test]
    fn test_ramp_time_only_exact_values() {
        assert_eq!(RampTime::from_us(40), Ok(RampTime::Ramp40u));
        assert_eq!(RampTime::from_us(41), Err(ConfigError::PaRamp(41)));
    }
}
