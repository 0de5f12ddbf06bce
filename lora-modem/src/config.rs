//! Modem configuration: partial updates and the resolved settings they merge into.

use crate::airtime::symbol_duration_us;
use crate::err::ConfigError;

/// Symbol durations at or above this need low data rate optimization.
const LDR_THRESHOLD_US: u32 = 16_000;

/// LoRa signal bandwidth.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bandwidth {
    /// 7.8 kHz
    Khz7_8,
    /// 10.4 kHz
    Khz10_4,
    /// 15.6 kHz
    Khz15_6,
    /// 20.8 kHz
    Khz20_8,
    /// 31.25 kHz
    Khz31_25,
    /// 41.7 kHz
    Khz41_7,
    /// 62.5 kHz
    Khz62_5,
    /// 125 kHz
    Khz125,
    /// 250 kHz
    Khz250,
    /// 500 kHz
    Khz500,
}

impl Bandwidth {
    /// Bandwidth in Hz.
    pub const fn hz(self) -> u32 {
        match self {
            Self::Khz7_8 => 7_800,
            Self::Khz10_4 => 10_400,
            Self::Khz15_6 => 15_600,
            Self::Khz20_8 => 20_800,
            Self::Khz31_25 => 31_250,
            Self::Khz41_7 => 41_700,
            Self::Khz62_5 => 62_500,
            Self::Khz125 => 125_000,
            Self::Khz250 => 250_000,
            Self::Khz500 => 500_000,
        }
    }

    /// Parses the kHz notation used by configuration stores ("7.8", "125", ...).
    pub fn from_khz_str(value: &str) -> Result<Self, ConfigError> {
        Ok(match value.trim() {
            "7.8" => Self::Khz7_8,
            "10.4" => Self::Khz10_4,
            "15.6" => Self::Khz15_6,
            "20.8" => Self::Khz20_8,
            "31.25" => Self::Khz31_25,
            "41.7" => Self::Khz41_7,
            "62.5" => Self::Khz62_5,
            "125" => Self::Khz125,
            "250" => Self::Khz250,
            "500" => Self::Khz500,
            _ => return Err(ConfigError::Bandwidth),
        })
    }
}

/// Physical power-amplifier output used for transmission.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PaOutput {
    /// Low power "RFO" output.
    Rfo,
    /// High power "PA_BOOST" output.
    PaBoost,
}

/// A partial configuration update. `None` fields leave the current value unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModemConfig {
    /// Carrier frequency in kHz.
    pub freq_khz: Option<u32>,
    /// Spreading factor.
    pub sf: Option<u8>,
    /// Signal bandwidth.
    pub bw: Option<Bandwidth>,
    /// Coding rate denominator, 5..=8 for 4/5..4/8.
    pub coding_rate: Option<u8>,
    /// Preamble length in symbols.
    pub preamble_len: Option<u16>,
    /// Payload CRC enable.
    pub crc_en: Option<bool>,
    /// Implicit (fixed length) header mode.
    pub implicit_header: Option<bool>,
    /// LoRa sync word. Single byte values are expanded by the driver as needed.
    pub sync_word: Option<u16>,
    /// Output power in dBm.
    pub output_power: Option<i8>,
    /// Amplifier path; `None` in the resolved settings means the chip default.
    pub tx_ant: Option<PaOutput>,
    /// PA ramp time in microseconds.
    pub pa_ramp_us: Option<u32>,
    /// Invert IQ while receiving.
    pub invert_iq_rx: Option<bool>,
    /// Invert IQ while transmitting.
    pub invert_iq_tx: Option<bool>,
    /// Receiver gain boost.
    pub rx_boost: Option<bool>,
    /// Force low data rate optimization on or off instead of deriving it.
    pub ldr_override: Option<bool>,
    /// Recalibrate the image rejection automatically when the frequency changes.
    pub auto_image_cal: Option<bool>,
    /// Hand out packets that failed the CRC check instead of dropping them.
    pub rx_report_crc_errors: Option<bool>,
}

impl ModemConfig {
    /// Sets the carrier frequency in kHz.
    pub fn set_freq_khz(mut self, freq_khz: u32) -> Self {
        self.freq_khz = Some(freq_khz);
        self
    }

    /// Sets the spreading factor.
    pub fn set_spreading_factor(mut self, sf: u8) -> Self {
        self.sf = Some(sf);
        self
    }

    /// Sets the bandwidth.
    pub fn set_bandwidth(mut self, bw: Bandwidth) -> Self {
        self.bw = Some(bw);
        self
    }

    /// Sets the coding rate denominator (5..=8).
    pub fn set_coding_rate(mut self, coding_rate: u8) -> Self {
        self.coding_rate = Some(coding_rate);
        self
    }

    /// Sets the preamble length.
    pub fn set_preamble_len(mut self, preamble_len: u16) -> Self {
        self.preamble_len = Some(preamble_len);
        self
    }

    /// Enables or disables the payload CRC.
    pub fn set_crc_en(mut self, crc_en: bool) -> Self {
        self.crc_en = Some(crc_en);
        self
    }

    /// Selects implicit header mode.
    pub fn set_implicit_header(mut self, implicit_header: bool) -> Self {
        self.implicit_header = Some(implicit_header);
        self
    }

    /// Sets the sync word.
    pub fn set_sync_word(mut self, sync_word: u16) -> Self {
        self.sync_word = Some(sync_word);
        self
    }

    /// Sets the output power in dBm.
    pub fn set_output_power(mut self, output_power: i8) -> Self {
        self.output_power = Some(output_power);
        self
    }

    /// Selects the amplifier output.
    pub fn set_tx_ant(mut self, tx_ant: PaOutput) -> Self {
        self.tx_ant = Some(tx_ant);
        self
    }

    /// Sets the PA ramp time.
    pub fn set_pa_ramp_us(mut self, pa_ramp_us: u32) -> Self {
        self.pa_ramp_us = Some(pa_ramp_us);
        self
    }

    /// Sets IQ inversion for receive.
    pub fn set_invert_iq_rx(mut self, invert: bool) -> Self {
        self.invert_iq_rx = Some(invert);
        self
    }

    /// Sets IQ inversion for transmit.
    pub fn set_invert_iq_tx(mut self, invert: bool) -> Self {
        self.invert_iq_tx = Some(invert);
        self
    }

    /// Enables the receiver gain boost.
    pub fn set_rx_boost(mut self, rx_boost: bool) -> Self {
        self.rx_boost = Some(rx_boost);
        self
    }

    /// Forces low data rate optimization.
    pub fn set_ldr_override(mut self, ldr: bool) -> Self {
        self.ldr_override = Some(ldr);
        self
    }

    /// Enables automatic image calibration.
    pub fn set_auto_image_cal(mut self, enabled: bool) -> Self {
        self.auto_image_cal = Some(enabled);
        self
    }

    /// Reports packets with CRC errors from `poll_recv`.
    pub fn set_rx_report_crc_errors(mut self, enabled: bool) -> Self {
        self.rx_report_crc_errors = Some(enabled);
        self
    }

    /// Applies one entry of a string keyed configuration store.
    ///
    /// Unknown keys are ignored so that stores may carry a superset of keys.
    pub fn apply_key(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "freq_khz" => self.freq_khz = Some(parse_freq_khz(value)?),
            "sf" => self.sf = Some(parse_num(value, "sf")?),
            "bw" => self.bw = Some(Bandwidth::from_khz_str(value)?),
            "coding_rate" => self.coding_rate = Some(parse_num(value, "coding_rate")?),
            "preamble_len" => self.preamble_len = Some(parse_num(value, "preamble_len")?),
            "crc_en" => self.crc_en = Some(parse_bool(value, "crc_en")?),
            "implicit_header" => {
                self.implicit_header = Some(parse_bool(value, "implicit_header")?)
            }
            "sync_word" => self.sync_word = Some(parse_sync_word(value)?),
            "output_power" => self.output_power = Some(parse_num(value, "output_power")?),
            "tx_ant" => {
                self.tx_ant = Some(match value {
                    "PA_BOOST" => PaOutput::PaBoost,
                    "RFO" => PaOutput::Rfo,
                    _ => return Err(ConfigError::Value("tx_ant")),
                })
            }
            "pa_ramp_us" => self.pa_ramp_us = Some(parse_num(value, "pa_ramp_us")?),
            "invert_iq_rx" => self.invert_iq_rx = Some(parse_bool(value, "invert_iq_rx")?),
            "invert_iq_tx" => self.invert_iq_tx = Some(parse_bool(value, "invert_iq_tx")?),
            "rx_boost" | "lna_gain" => self.rx_boost = Some(parse_bool(value, "rx_boost")?),
            "ldr" => self.ldr_override = Some(parse_bool(value, "ldr")?),
            "auto_image_cal" => {
                self.auto_image_cal = Some(parse_bool(value, "auto_image_cal")?)
            }
            "rx_report_crc_errors" => {
                self.rx_report_crc_errors = Some(parse_bool(value, "rx_report_crc_errors")?)
            }
            _ => log::trace!("lora::config ignoring unknown key {key}"),
        }
        Ok(())
    }

    /// Builds an update from `(key, value)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut cfg = Self::default();
        for (key, value) in pairs {
            cfg.apply_key(key, value)?;
        }
        Ok(cfg)
    }

    /// True if the update touches a value that affects symbol timing.
    pub fn changes_timing(&self) -> bool {
        self.sf.is_some() || self.bw.is_some() || self.ldr_override.is_some()
    }
}

fn parse_num<T: core::str::FromStr>(value: &str, key: &'static str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Value(key))
}

fn parse_bool(value: &str, key: &'static str) -> Result<bool, ConfigError> {
    match value {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" => Ok(false),
        _ => Err(ConfigError::Value(key)),
    }
}

fn parse_sync_word(value: &str) -> Result<u16, ConfigError> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).map_err(|_| ConfigError::Value("sync_word")),
        None => parse_num(value, "sync_word"),
    }
}

/// Accepts whole kHz or kHz with a fractional part ("868100" or "868100.5").
fn parse_freq_khz(value: &str) -> Result<u32, ConfigError> {
    let whole = value.split('.').next().unwrap_or(value);
    parse_num(whole, "freq_khz")
}

/// A fully resolved modem configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Carrier frequency in kHz.
    pub freq_khz: u32,
    /// Spreading factor.
    pub sf: u8,
    /// Signal bandwidth.
    pub bw: Bandwidth,
    /// Coding rate denominator.
    pub coding_rate: u8,
    /// Preamble length in symbols.
    pub preamble_len: u16,
    /// Payload CRC enable.
    pub crc_en: bool,
    /// Implicit header mode.
    pub implicit_header: bool,
    /// Sync word.
    pub sync_word: u16,
    /// Output power in dBm.
    pub output_power: i8,
    /// Amplifier path, chip default when `None`.
    pub tx_ant: Option<PaOutput>,
    /// PA ramp time in microseconds.
    pub pa_ramp_us: u32,
    /// Invert IQ while receiving.
    pub invert_iq_rx: bool,
    /// Invert IQ while transmitting.
    pub invert_iq_tx: bool,
    /// Receiver gain boost.
    pub rx_boost: bool,
    /// Low data rate optimization override.
    pub ldr_override: Option<bool>,
    /// Automatic image calibration on frequency change.
    pub auto_image_cal: bool,
    /// Report packets failing CRC.
    pub rx_report_crc_errors: bool,
    t_sym_us: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let mut settings = Self {
            freq_khz: 868_000,
            sf: 7,
            bw: Bandwidth::Khz125,
            coding_rate: 5,
            preamble_len: 12,
            crc_en: true,
            implicit_header: false,
            sync_word: 0x12,
            output_power: 14,
            tx_ant: None,
            pa_ramp_us: 40,
            invert_iq_rx: false,
            invert_iq_tx: false,
            rx_boost: false,
            ldr_override: None,
            auto_image_cal: true,
            rx_report_crc_errors: false,
            t_sym_us: 0,
        };
        settings.t_sym_us = symbol_duration_us(settings.sf, settings.bw);
        settings
    }
}

impl Settings {
    /// Returns a copy of these settings with `update` applied.
    ///
    /// Only generic ranges are checked here; chip-specific limits are checked by
    /// the driver. Nothing is changed on `self`.
    pub fn merge(&self, update: &ModemConfig) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        if let Some(v) = update.freq_khz {
            next.freq_khz = v;
        }
        if let Some(v) = update.sf {
            next.sf = v;
        }
        if let Some(v) = update.bw {
            next.bw = v;
        }
        if let Some(v) = update.coding_rate {
            next.coding_rate = v;
        }
        if let Some(v) = update.preamble_len {
            next.preamble_len = v;
        }
        if let Some(v) = update.crc_en {
            next.crc_en = v;
        }
        if let Some(v) = update.implicit_header {
            next.implicit_header = v;
        }
        if let Some(v) = update.sync_word {
            next.sync_word = v;
        }
        if let Some(v) = update.output_power {
            next.output_power = v;
        }
        if update.tx_ant.is_some() {
            next.tx_ant = update.tx_ant;
        }
        if let Some(v) = update.pa_ramp_us {
            next.pa_ramp_us = v;
        }
        if let Some(v) = update.invert_iq_rx {
            next.invert_iq_rx = v;
        }
        if let Some(v) = update.invert_iq_tx {
            next.invert_iq_tx = v;
        }
        if let Some(v) = update.rx_boost {
            next.rx_boost = v;
        }
        if update.ldr_override.is_some() {
            next.ldr_override = update.ldr_override;
        }
        if let Some(v) = update.auto_image_cal {
            next.auto_image_cal = v;
        }
        if let Some(v) = update.rx_report_crc_errors {
            next.rx_report_crc_errors = v;
        }

        next.validate()?;
        if update.changes_timing() {
            next.t_sym_us = symbol_duration_us(next.sf, next.bw);
        }
        Ok(next)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=12).contains(&self.sf) {
            return Err(ConfigError::SpreadingFactor(self.sf));
        }
        if !(5..=8).contains(&self.coding_rate) {
            return Err(ConfigError::CodingRate(self.coding_rate));
        }
        if self.preamble_len == 0 {
            return Err(ConfigError::PreambleLength(self.preamble_len));
        }
        if self.freq_khz == 0 {
            return Err(ConfigError::Frequency(self.freq_khz));
        }
        Ok(())
    }

    /// Cached symbol duration in microseconds.
    pub fn symbol_duration_us(&self) -> u32 {
        self.t_sym_us
    }

    /// Whether low data rate optimization is in effect.
    pub fn low_data_rate_optimize(&self) -> bool {
        self.ldr_override
            .unwrap_or(self.t_sym_us >= LDR_THRESHOLD_US)
    }

    /// Carrier frequency in Hz.
    pub fn freq_hz(&self) -> u32 {
        self.freq_khz * 1000
    }

    /// Sync word as a single byte, for chips taking the short form.
    pub fn sync_word_byte(&self) -> u8 {
        if self.sync_word > 0xFF {
            // Two-byte form 0xX4Y4 maps back to 0xXY.
            (((self.sync_word >> 8) & 0xF0) | ((self.sync_word >> 4) & 0x0F)) as u8
        } else {
            self.sync_word as u8
        }
    }

    /// Sync word in the two-byte register form (0x12 -> 0x1424).
    pub fn sync_word_wide(&self) -> u16 {
        if self.sync_word > 0xFF {
            self.sync_word
        } else {
            0x0404 | ((self.sync_word & 0xF0) << 8) | ((self.sync_word & 0x0F) << 4)
        }
    }
}
