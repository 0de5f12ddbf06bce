//! [`Chip`] implementation: modem intents to SX126x command sequences.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use lora_modem::airtime::SymbolOffsets;
use lora_modem::{
    Bandwidth, BusError, Chip, ConfigError, Error, IrqEvents, PaOutput, RxPacket, RxRequest,
    Settings,
};

use crate::conf::Variant;
use crate::op::*;
use crate::pa::{pa_setting, PaSetting};
use crate::SX126x;

/// Synthesizer range in kHz.
const FREQ_RANGE_KHZ: core::ops::RangeInclusive<u32> = 150_000..=960_000;

fn differs<T: PartialEq>(prev: Option<&Settings>, next: &Settings, f: impl Fn(&Settings) -> T) -> bool {
    prev.map_or(true, |prev| f(prev) != f(next))
}

impl<TSPI, TNRST, TBUSY, TDELAY, TSPIERR, TPINERR> Chip for SX126x<TSPI, TNRST, TBUSY, TDELAY>
where
    TSPIERR: Debug,
    TPINERR: Debug,
    TSPI: SpiDevice<Error = TSPIERR>,
    TNRST: OutputPin<Error = TPINERR>,
    TBUSY: InputPin<Error = TPINERR>,
    TDELAY: DelayNs,
{
    type BusError = BusError<TSPIERR, TPINERR>;
    type PaSetting = PaSetting;

    fn init(&mut self) -> Result<(), Error<Self::BusError>> {
        log::trace!("lora::init start");
        self.reset()?;
        self.set_standby(StandbyConfig::StbyRc)?;
        if let Some((tcxo_voltage, tcxo_delay)) = self.conf.tcxo_opts {
            self.set_dio3_as_tcxo_ctrl(tcxo_voltage, tcxo_delay)?;
            self.clear_device_errors()?;
        }
        if self.conf.use_dcdc {
            self.set_regulator_mode(RegulatorMode::DcDc)?;
        }
        self.calibrate(CalibParam::all())?;
        self.set_packet_type(PacketType::LoRa)?;
        self.set_buffer_base_address(0x00, 0x00)?;
        self.set_dio2_as_rf_switch_ctrl(self.conf.dio2_rf_switch)?;
        let events = IrqMask::modem_events();
        self.set_dio_irq_params(events, events, IrqMask::none(), IrqMask::none())?;
        if self.conf.variant == Variant::Sx1262 {
            self.fix_tx_clamp()?;
        }
        self.clear_irq_status(IrqMask::all())?;

        let errors = self.get_device_errors()?;
        if !errors.is_empty() {
            log::warn!("lora::init device errors: {errors:?}");
        }
        log::trace!("lora::init done");
        Ok(())
    }

    fn validate(&self, settings: &Settings) -> Result<(), Error<Self::BusError>> {
        LoraModParams::from_settings(settings)?;
        if !FREQ_RANGE_KHZ.contains(&settings.freq_khz) {
            return Err(ConfigError::Frequency(settings.freq_khz).into());
        }
        RampTime::from_us(settings.pa_ramp_us)?;
        self.map_output_power(settings.output_power, settings.tx_ant)?;
        Ok(())
    }

    fn configure(
        &mut self,
        prev: Option<&Settings>,
        next: &Settings,
    ) -> Result<(), Error<Self::BusError>> {
        if differs(prev, next, |s| s.freq_khz) {
            self.set_rf_frequency(next.freq_hz())?;
            if next.auto_image_cal {
                self.calibrate_image(CalibImageFreq::from_rf_frequency(next.freq_hz()))?;
            }
        }
        if differs(prev, next, |s| {
            (s.sf, s.bw, s.coding_rate, s.low_data_rate_optimize())
        }) {
            self.set_mod_params(LoraModParams::from_settings(next)?.into())?;
        }
        if differs(prev, next, |s| s.sync_word) {
            self.set_sync_word(next.sync_word_wide())?;
        }
        if differs(prev, next, |s| (s.output_power, s.tx_ant, s.pa_ramp_us)) {
            let pa = self.map_output_power(next.output_power, next.tx_ant)?;
            self.set_pa_config(pa.pa_config)?;
            self.set_ocp(pa.ocp)?;
            self.set_tx_params(
                TxParams::default()
                    .set_power_dbm(pa.power)
                    .set_ramp_time(RampTime::from_us(next.pa_ramp_us)?),
            )?;
        }
        if differs(prev, next, |s| s.rx_boost) {
            self.set_rx_gain(next.rx_boost)?;
        }
        log::trace!("lora::configure done");
        Ok(())
    }

    fn standby(&mut self) -> Result<(), Error<Self::BusError>> {
        self.set_standby(StandbyConfig::StbyRc)
    }

    fn sleep(&mut self) -> Result<(), Error<Self::BusError>> {
        self.set_sleep(SleepConfig::WarmStart)
    }

    fn calibrate(&mut self) -> Result<(), Error<Self::BusError>> {
        SX126x::calibrate(self, CalibParam::all())
    }

    fn calibrate_image(&mut self, settings: &Settings) -> Result<(), Error<Self::BusError>> {
        SX126x::calibrate_image(self, CalibImageFreq::from_rf_frequency(settings.freq_hz()))
    }

    fn start_rx(
        &mut self,
        settings: &Settings,
        request: RxRequest,
    ) -> Result<(), Error<Self::BusError>> {
        self.clear_irq_status(IrqMask::all())?;
        let payload_len = if settings.implicit_header {
            request.rx_length
        } else {
            0xFF
        };
        self.set_packet_params(
            LoRaPacketParams::from_settings(settings)
                .set_payload_len(payload_len)
                .set_invert_iq(settings.invert_iq_rx.into())
                .into(),
        )?;
        self.set_iq_polarity(settings.invert_iq_rx)?;

        let timeout = if request.continuous {
            RxTxTimeout::continuous_rx()
        } else {
            match request.timeout_ms {
                Some(ms) => RxTxTimeout::from_ms(ms),
                None => RxTxTimeout::single(),
            }
        };
        self.set_rx(timeout)
    }

    fn finish_rx(&mut self, timed: bool) -> Result<(), Error<Self::BusError>> {
        if timed {
            self.stop_rtc()?;
        }
        Ok(())
    }

    fn prepare_tx(
        &mut self,
        settings: &Settings,
        packet: &[u8],
    ) -> Result<(), Error<Self::BusError>> {
        self.clear_irq_status(IrqMask::all())?;
        self.write_buffer(0x00, packet)?;
        self.set_packet_params(
            LoRaPacketParams::from_settings(settings)
                .set_payload_len(packet.len() as u8)
                .set_invert_iq(settings.invert_iq_tx.into())
                .into(),
        )?;
        self.set_iq_polarity(settings.invert_iq_tx)
    }

    fn start_tx(&mut self, settings: &Settings) -> Result<(), Error<Self::BusError>> {
        self.set_tx_modulation(settings.bw == Bandwidth::Khz500)?;
        self.set_tx(RxTxTimeout::single())
    }

    fn read_irq(&mut self, clear: bool) -> Result<u16, Error<Self::BusError>> {
        let status = self.get_irq_status()?;
        log::trace!("lora::read_irq {status:?}");
        let raw = u16::from(status);
        if clear && raw != 0 {
            self.clear_irq_status(raw.into())?;
        }
        Ok(raw)
    }

    fn classify_irq(&self, flags: u16) -> IrqEvents {
        let status = IrqStatus::from(flags);
        IrqEvents {
            tx_done: status.tx_done(),
            rx_done: status.rx_done(),
            rx_timeout: status.timeout(),
            rx_ok: status.rx_ok(),
        }
    }

    fn read_packet(
        &mut self,
        _settings: &Settings,
        packet: &mut RxPacket,
    ) -> Result<(), Error<Self::BusError>> {
        let rx_status = self.get_rx_buffer_status()?;
        let len = rx_status.payload_length_rx() as usize;
        self.read_buffer(rx_status.rx_start_buffer_pointer(), packet.payload_buffer(len))?;

        let status = self.get_packet_status()?;
        packet.rssi = status.rssi_pkt();
        packet.snr = status.snr_pkt();
        Ok(())
    }

    fn map_output_power(
        &self,
        dbm: i8,
        output: Option<PaOutput>,
    ) -> Result<PaSetting, Error<Self::BusError>> {
        pa_setting(self.conf.variant, dbm, output)
    }

    fn symbol_offsets(&self, settings: &Settings) -> SymbolOffsets {
        // SF5 and SF6 add two preamble symbols and have no 8 bit header term.
        if settings.sf <= 6 {
            SymbolOffsets {
                symbols_x4: 8,
                bits: -8,
            }
        } else {
            SymbolOffsets::default()
        }
    }
}
