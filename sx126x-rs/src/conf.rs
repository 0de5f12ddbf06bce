//! Hardware options of an SX126x module.

use super::op::*;

/// Which chip of the family is fitted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Low power PA only, up to +15 dBm.
    Sx1261,
    /// High power PA only, up to +22 dBm.
    Sx1262,
}

/// Board level configuration, fixed for the lifetime of the driver.
///
/// Radio parameters (frequency, spreading factor, power, ...) live in
/// [`lora_modem::ModemConfig`] instead.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    /// The fitted chip.
    pub variant: Variant,
    /// TCXO supply voltage and start-up delay, if DIO3 powers a TCXO.
    pub tcxo_opts: Option<(TcxoVoltage, TcxoDelay)>,
    /// Let DIO2 drive the module's RF switch.
    pub dio2_rf_switch: bool,
    /// Use the DC-DC regulator instead of the LDO.
    pub use_dcdc: bool,
    /// How long to wait for BUSY to go low before a command, in microseconds.
    pub busy_timeout_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variant: Variant::Sx1262,
            tcxo_opts: None,
            dio2_rf_switch: true,
            use_dcdc: true,
            busy_timeout_us: 100_000,
        }
    }
}
