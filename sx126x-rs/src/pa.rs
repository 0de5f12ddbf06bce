//! Output power to power amplifier register mapping.
//!
//! Powers listed in the datasheet's optimal settings tables use those
//! duty cycle / HP max combinations; any other power keeps the full power
//! amplifier configuration and lets the power parameter of `SetTxParams`
//! scale the output.

use lora_modem::{ConfigError, Error, PaOutput};

use crate::conf::Variant;
use crate::op::{DeviceSel, PaConfig};

/// Concrete PA register values for one output power.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PaSetting {
    /// `SetPaConfig` arguments.
    pub pa_config: PaConfig,
    /// Power parameter of `SetTxParams`, in dBm.
    pub power: i8,
    /// Over current protection limit in 2.5 mA steps.
    pub ocp: u8,
}

// (dBm, paDutyCycle, hpMax, power parameter)
const SX1262_TABLE: [(i8, u8, u8, i8); 4] = [
    (22, 0x04, 0x07, 22),
    (20, 0x03, 0x05, 22),
    (17, 0x02, 0x03, 22),
    (14, 0x02, 0x02, 22),
];

const SX1261_TABLE: [(i8, u8, u8, i8); 3] = [
    (15, 0x06, 0x00, 14),
    (14, 0x04, 0x00, 14),
    (10, 0x01, 0x00, 13),
];

/// 140 mA
const SX1262_OCP: u8 = 0x38;
/// 60 mA
const SX1261_OCP: u8 = 0x18;

/// Maps `dbm` on the amplifier path `output` to register values.
///
/// The SX1262 only has the high power (`PaBoost`) path and the SX1261 only
/// the low power (`Rfo`) path; selecting the other one is an invalid argument.
pub fn pa_setting<E>(
    variant: Variant,
    dbm: i8,
    output: Option<PaOutput>,
) -> Result<PaSetting, Error<E>> {
    let (table, range, device_sel, hp_fallback, ocp): (&[(i8, u8, u8, i8)], _, _, _, _) =
        match variant {
            Variant::Sx1262 => {
                if output == Some(PaOutput::Rfo) {
                    return Err(Error::InvalidArgument("SX1262 has no RFO output"));
                }
                (&SX1262_TABLE, -9..=22, DeviceSel::SX1262, 0x07, SX1262_OCP)
            }
            Variant::Sx1261 => {
                if output == Some(PaOutput::PaBoost) {
                    return Err(Error::InvalidArgument("SX1261 has no PA_BOOST output"));
                }
                (&SX1261_TABLE, -17..=15, DeviceSel::SX1261, 0x00, SX1261_OCP)
            }
        };

    if !range.contains(&dbm) {
        return Err(ConfigError::OutputPower(dbm).into());
    }

    let (duty_cycle, hp_max, power) = match table.iter().find(|(level, ..)| *level == dbm) {
        Some(&(_, duty_cycle, hp_max, power)) => (duty_cycle, hp_max, power),
        None => (0x04, hp_fallback, dbm),
    };

    Ok(PaSetting {
        pa_config: PaConfig::default()
            .set_pa_duty_cycle(duty_cycle)
            .set_hp_max(hp_max)
            .set_device_sel(device_sel),
        power,
        ocp,
    })
}
