//! Output power to power amplifier register mapping.
//!
//! `PA_BOOST` levels with a datasheet setting use it (the +20 dBm mode needs
//! `RegPaDac` and a higher current limit); every other level is derived
//! linearly from the `RegPaConfig` output power formula of its path.

use lora_modem::{ConfigError, Error, PaOutput};

use crate::reg::ocp_bits;

/// Concrete PA register values for one output power.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PaSetting {
    /// `RegPaConfig`.
    pub pa_config: u8,
    /// `RegPaDac`.
    pub pa_dac: u8,
    /// `RegOcp`.
    pub ocp: u8,
}

const PA_SELECT_BOOST: u8 = 0x80;
/// MaxPower 7, Pmax = 15 dBm.
const MAX_POWER_15: u8 = 0x70;
const PA_DAC_DEFAULT: u8 = 0x84;
const PA_DAC_HIGH_POWER: u8 = 0x87;

// (dBm, RegPaConfig, RegPaDac, OCP mA)
const PA_BOOST_TABLE: [(i8, u8, u8, u16); 2] = [
    (20, PA_SELECT_BOOST | MAX_POWER_15 | 0x0F, PA_DAC_HIGH_POWER, 140),
    (17, PA_SELECT_BOOST | MAX_POWER_15 | 0x0F, PA_DAC_DEFAULT, 100),
];

/// Maps `dbm` on `output` (or `default_output` if unset) to register values.
pub fn pa_setting<E>(
    dbm: i8,
    output: Option<PaOutput>,
    default_output: PaOutput,
) -> Result<PaSetting, Error<E>> {
    let out_of_range = || Error::Config(ConfigError::OutputPower(dbm));
    let (pa_config, pa_dac, ocp_ma) = match output.unwrap_or(default_output) {
        PaOutput::PaBoost => {
            if let Some(&(_, pa_config, pa_dac, ocp)) =
                PA_BOOST_TABLE.iter().find(|(level, ..)| *level == dbm)
            {
                (pa_config, pa_dac, ocp)
            } else {
                match dbm {
                    // Pout = 2 + OutputPower
                    2..=16 => (
                        PA_SELECT_BOOST | MAX_POWER_15 | (dbm - 2) as u8,
                        PA_DAC_DEFAULT,
                        100,
                    ),
                    // Pout = 5 + OutputPower with the high power DAC
                    18..=19 => (
                        PA_SELECT_BOOST | MAX_POWER_15 | (dbm - 5) as u8,
                        PA_DAC_HIGH_POWER,
                        140,
                    ),
                    _ => return Err(out_of_range()),
                }
            }
        }
        PaOutput::Rfo => match dbm {
            // Pout = Pmax - (15 - OutputPower), Pmax = 15 dBm
            0..=15 => (MAX_POWER_15 | dbm as u8, PA_DAC_DEFAULT, 100),
            // MaxPower 0, Pmax = 10.8 dBm
            -4..=-1 => ((dbm + 4) as u8, PA_DAC_DEFAULT, 100),
            _ => return Err(out_of_range()),
        },
    };
    Ok(PaSetting {
        pa_config,
        pa_dac,
        ocp: ocp_bits(ocp_ma),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(dbm: i8, output: Option<PaOutput>) -> Result<PaSetting, Error<()>> {
        pa_setting(dbm, output, PaOutput::PaBoost)
    }

    #[test]
    fn test_table_levels() {
        let pa = map(20, None).unwrap();
        assert_eq!(pa.pa_config, 0xFF);
        assert_eq!(pa.pa_dac, 0x87);
        assert_eq!(pa.ocp, 0x31);

        let pa = map(17, Some(PaOutput::PaBoost)).unwrap();
        assert_eq!(pa.pa_config, 0xFF);
        assert_eq!(pa.pa_dac, 0x84);
    }

    #[test]
    fn test_linear_fallback() {
        assert_eq!(map(14, None).unwrap().pa_config, 0xFC);
        assert_eq!(map(2, None).unwrap().pa_config, 0xF0);
        assert_eq!(map(19, None).unwrap().pa_config, 0xFE);
        assert_eq!(map(10, Some(PaOutput::Rfo)).unwrap().pa_config, 0x7A);
        assert_eq!(map(-4, Some(PaOutput::Rfo)).unwrap().pa_config, 0x00);
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            map(21, None),
            Err(Error::Config(ConfigError::OutputPower(21)))
        ));
        assert!(matches!(
            map(1, None),
            Err(Error::Config(ConfigError::OutputPower(1)))
        ));
        assert!(matches!(
            map(16, Some(PaOutput::Rfo)),
            Err(Error::Config(ConfigError::OutputPower(16)))
        ));
        let rfo_default = pa_setting::<()>(15, None, PaOutput::Rfo).unwrap();
        assert_eq!(rfo_default.pa_config, 0x7F);
    }
}
