//! Hardware options of an SX127x module.

use lora_modem::PaOutput;

/// Which RF port the receiver uses, selecting the RSSI offset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RssiBand {
    /// Band 1 (862-1020 MHz) on the SX1276/77/79: RSSI offset -157 dBm.
    HighFrequency,
    /// Bands 2 and 3 (below 525 MHz): RSSI offset -164 dBm.
    LowFrequency,
}

impl RssiBand {
    /// Band of the port that serves `freq_khz`.
    pub fn for_frequency(freq_khz: u32) -> Self {
        if freq_khz >= 525_000 {
            Self::HighFrequency
        } else {
            Self::LowFrequency
        }
    }

    /// Offset added to `RegPktRssiValue`, in dBm.
    pub fn offset(self) -> i16 {
        match self {
            Self::HighFrequency => -157,
            Self::LowFrequency => -164,
        }
    }
}

/// Board level configuration, fixed for the lifetime of the driver.
///
/// Radio parameters live in [`lora_modem::ModemConfig`] instead.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    /// RSSI offset band. `None` picks it from the carrier frequency.
    pub rssi_band: Option<RssiBand>,
    /// Amplifier used when the settings leave `tx_ant` unset. Most modules only
    /// wire `PaBoost`.
    pub default_output: PaOutput,
    /// The clock is a TCXO on XTA rather than a crystal.
    pub tcxo: bool,
    /// How long a mode change may take to show in `RegOpMode`, in microseconds.
    pub mode_timeout_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rssi_band: None,
            default_output: PaOutput::PaBoost,
            tcxo: false,
            mode_timeout_us: 10_000,
        }
    }
}
