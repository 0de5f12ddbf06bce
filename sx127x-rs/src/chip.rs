//! [`Chip`] implementation: modem intents to SX127x register sequences.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use lora_modem::{
    Bandwidth, BusError, Chip, ConfigError, Error, IrqEvents, PaOutput, RxPacket, RxRequest,
    Settings,
};

use crate::conf::RssiBand;
use crate::pa::{pa_setting, PaSetting};
use crate::reg::*;
use crate::SX127x;

/// Synthesizer range over the family (SX1276 band 3 to band 1), in kHz.
const FREQ_RANGE_KHZ: core::ops::RangeInclusive<u32> = 137_000..=1_020_000;
/// `RegSymbTimeout` is ten bits wide.
const MAX_SYMBOL_TIMEOUT: u64 = 0x3FF;
const MIN_SYMBOL_TIMEOUT: u64 = 4;
/// AgcAutoOn in `RegModemConfig3`.
const AGC_AUTO_ON: u8 = 0x04;
const LOW_DATA_RATE_OPTIMIZE: u8 = 0x08;
const TCXO_INPUT_ON: u8 = 0x10;
/// Highest LNA gain, with the HF boost when asked for.
const LNA_G1: u8 = 0x20;
const LNA_BOOST_HF: u8 = 0x03;

fn differs<T: PartialEq>(prev: Option<&Settings>, next: &Settings, f: impl Fn(&Settings) -> T) -> bool {
    prev.map_or(true, |prev| f(prev) != f(next))
}

impl<TSPI, TNRST, TDELAY, TSPIERR, TPINERR> SX127x<TSPI, TNRST, TDELAY>
where
    TSPIERR: Debug,
    TPINERR: Debug,
    TSPI: SpiDevice<Error = TSPIERR>,
    TNRST: OutputPin<Error = TPINERR>,
    TDELAY: DelayNs,
{
    /// Receiver errata 2.1 and 2.3, depending on bandwidth and band.
    fn apply_bandwidth_errata(&mut self, settings: &Settings) -> Result<(), Error<BusError<TSPIERR, TPINERR>>> {
        if settings.bw == Bandwidth::Khz500 {
            self.modify_register(Register::DetectOptimize, |v| v | 0x80)?;
            self.write_u8(Register::HighBwOptimize1, 0x02)?;
            let opt2 = if settings.freq_khz >= 862_000 { 0x64 } else { 0x7F };
            self.write_u8(Register::HighBwOptimize2, opt2)
        } else {
            self.modify_register(Register::DetectOptimize, |v| v & !0x80)?;
            self.write_u8(Register::HighBwOptimize1, 0x03)?;
            self.write_u8(Register::IfFreq2, if_freq2(settings.bw))?;
            self.write_u8(Register::IfFreq1, 0x00)
        }
    }
}

impl<TSPI, TNRST, TDELAY, TSPIERR, TPINERR> Chip for SX127x<TSPI, TNRST, TDELAY>
where
    TSPIERR: Debug,
    TPINERR: Debug,
    TSPI: SpiDevice<Error = TSPIERR>,
    TNRST: OutputPin<Error = TPINERR>,
    TDELAY: DelayNs,
{
    type BusError = BusError<TSPIERR, TPINERR>;
    type PaSetting = PaSetting;

    fn init(&mut self) -> Result<(), Error<Self::BusError>> {
        log::trace!("lora::init start");
        self.reset()?;
        let version = self.version()?;
        if version != CHIP_VERSION {
            log::warn!("lora::init unexpected silicon version {version:#04x}");
            return Err(Error::Command { status: version });
        }
        self.enter_lora()?;
        self.set_mode(Mode::Standby)?;
        self.write_u8(Register::FifoTxBaseAddr, 0x00)?;
        self.write_u8(Register::FifoRxBaseAddr, 0x00)?;
        if self.conf.tcxo {
            self.modify_register(Register::Tcxo, |v| v | TCXO_INPUT_ON)?;
        }
        self.write_u8(Register::IrqFlagsMask, 0x00)?;
        self.clear_irq_flags(0xFF)?;
        log::trace!("lora::init done");
        Ok(())
    }

    fn validate(&self, settings: &Settings) -> Result<(), Error<Self::BusError>> {
        if !(6..=12).contains(&settings.sf) {
            return Err(ConfigError::SpreadingFactor(settings.sf).into());
        }
        if settings.sf == 6 && !settings.implicit_header {
            return Err(ConfigError::Unsupported("SF6 needs implicit header mode").into());
        }
        coding_rate_bits(settings.coding_rate)?;
        if !FREQ_RANGE_KHZ.contains(&settings.freq_khz) {
            return Err(ConfigError::Frequency(settings.freq_khz).into());
        }
        pa_ramp_bits(settings.pa_ramp_us)?;
        self.map_output_power(settings.output_power, settings.tx_ant)?;
        Ok(())
    }

    fn configure(
        &mut self,
        prev: Option<&Settings>,
        next: &Settings,
    ) -> Result<(), Error<Self::BusError>> {
        let freq_changed = differs(prev, next, |s| s.freq_khz);
        if freq_changed {
            self.set_frequency(next.freq_hz())?;
            if next.auto_image_cal {
                self.run_image_calibration()?;
            }
        }
        if freq_changed || differs(prev, next, |s| s.bw) {
            self.apply_bandwidth_errata(next)?;
        }
        if differs(prev, next, |s| (s.bw, s.coding_rate, s.implicit_header)) {
            let config1 = bandwidth_bits(next.bw)
                | coding_rate_bits(next.coding_rate)?
                | next.implicit_header as u8;
            self.write_u8(Register::ModemConfig1, config1)?;
        }
        if differs(prev, next, |s| (s.sf, s.crc_en)) {
            let (sf, crc) = (next.sf, next.crc_en as u8);
            self.modify_register(Register::ModemConfig2, |v| (v & 0x03) | sf << 4 | crc << 2)?;
            let (optimize, threshold) = if sf == 6 { (0x05, 0x0C) } else { (0x03, 0x0A) };
            self.modify_register(Register::DetectOptimize, |v| (v & 0xF8) | optimize)?;
            self.write_u8(Register::DetectionThreshold, threshold)?;
        }
        if differs(prev, next, |s| s.low_data_rate_optimize()) {
            let ldr = if next.low_data_rate_optimize() {
                LOW_DATA_RATE_OPTIMIZE
            } else {
                0
            };
            self.write_u8(Register::ModemConfig3, AGC_AUTO_ON | ldr)?;
        }
        if differs(prev, next, |s| s.preamble_len) {
            self.write_register(Register::PreambleMsb, &next.preamble_len.to_be_bytes())?;
        }
        if differs(prev, next, |s| s.sync_word) {
            self.write_u8(Register::SyncWord, next.sync_word_byte())?;
        }
        if differs(prev, next, |s| (s.output_power, s.tx_ant)) {
            let pa = self.map_output_power(next.output_power, next.tx_ant)?;
            self.write_u8(Register::PaConfig, pa.pa_config)?;
            self.write_u8(Register::PaDac, pa.pa_dac)?;
            self.write_u8(Register::Ocp, pa.ocp)?;
        }
        if differs(prev, next, |s| s.pa_ramp_us) {
            let ramp = pa_ramp_bits(next.pa_ramp_us)?;
            self.modify_register(Register::PaRamp, |v| (v & 0xF0) | ramp)?;
        }
        if differs(prev, next, |s| s.rx_boost) {
            let boost = if next.rx_boost { LNA_BOOST_HF } else { 0 };
            self.write_u8(Register::Lna, LNA_G1 | boost)?;
        }
        self.implicit_header = next.implicit_header;
        log::trace!("lora::configure done");
        Ok(())
    }

    fn standby(&mut self) -> Result<(), Error<Self::BusError>> {
        self.set_mode(Mode::Standby)
    }

    fn sleep(&mut self) -> Result<(), Error<Self::BusError>> {
        self.set_mode(Mode::Sleep)
    }

    /// RC oscillators calibrate themselves at power up; the image calibration
    /// is the only one that depends on the carrier.
    fn calibrate(&mut self) -> Result<(), Error<Self::BusError>> {
        self.run_image_calibration()
    }

    fn calibrate_image(&mut self, _settings: &Settings) -> Result<(), Error<Self::BusError>> {
        self.run_image_calibration()
    }

    fn start_rx(
        &mut self,
        settings: &Settings,
        request: RxRequest,
    ) -> Result<(), Error<Self::BusError>> {
        self.clear_irq_flags(0xFF)?;
        self.write_u8(Register::DioMapping1, DIO_MAPPING_RX)?;
        self.set_invert_iq(settings.invert_iq_rx, false)?;
        if settings.implicit_header {
            self.write_u8(Register::PayloadLength, request.rx_length)?;
        } else {
            self.write_u8(Register::MaxPayloadLength, 0xFF)?;
        }
        self.write_u8(Register::FifoRxBaseAddr, 0x00)?;
        self.write_u8(Register::FifoAddrPtr, 0x00)?;

        let mode = match (request.continuous, request.timeout_ms) {
            (false, Some(ms)) => {
                // The hardware counts symbols; a longer wait is extended in software.
                let symbols = (ms as u64 * 1_000 / settings.symbol_duration_us().max(1) as u64)
                    .clamp(MIN_SYMBOL_TIMEOUT, MAX_SYMBOL_TIMEOUT) as u16;
                log::trace!("lora::start_rx {ms} ms as {symbols} symbols");
                let [msb, lsb] = symbols.to_be_bytes();
                self.modify_register(Register::ModemConfig2, |v| (v & !0x03) | msb)?;
                self.write_u8(Register::SymbTimeoutLsb, lsb)?;
                Mode::RxSingle
            }
            _ => Mode::RxContinuous,
        };
        self.set_mode(mode)
    }

    /// Single receives without a timeout run in continuous mode, so the
    /// receiver is stopped here once the modem is done with it.
    fn finish_rx(&mut self, _timed: bool) -> Result<(), Error<Self::BusError>> {
        self.set_mode(Mode::Standby)
    }

    fn prepare_tx(
        &mut self,
        settings: &Settings,
        packet: &[u8],
    ) -> Result<(), Error<Self::BusError>> {
        self.clear_irq_flags(0xFF)?;
        self.write_u8(Register::FifoTxBaseAddr, 0x00)?;
        self.write_fifo(0x00, packet)?;
        self.write_u8(Register::PayloadLength, packet.len() as u8)?;
        self.set_invert_iq(false, settings.invert_iq_tx)
    }

    fn start_tx(&mut self, _settings: &Settings) -> Result<(), Error<Self::BusError>> {
        self.write_u8(Register::DioMapping1, DIO_MAPPING_TX)?;
        self.set_mode(Mode::Tx)
    }

    fn read_irq(&mut self, clear: bool) -> Result<u16, Error<Self::BusError>> {
        let flags = self.irq_flags()?;
        log::trace!("lora::read_irq {flags:?}");
        if clear && flags.0 != 0 {
            self.clear_irq_flags(flags.0)?;
        }
        Ok(flags.0 as u16)
    }

    fn classify_irq(&self, flags: u16) -> IrqEvents {
        let flags = IrqFlags(flags as u8);
        IrqEvents {
            tx_done: flags.has(IrqFlag::TxDone),
            rx_done: flags.has(IrqFlag::RxDone),
            rx_timeout: flags.has(IrqFlag::RxTimeout),
            rx_ok: flags.rx_ok(self.implicit_header),
        }
    }

    fn read_packet(
        &mut self,
        settings: &Settings,
        packet: &mut RxPacket,
    ) -> Result<(), Error<Self::BusError>> {
        let len = self.read_u8(Register::RxNbBytes)?;
        let start = self.read_u8(Register::FifoRxCurrentAddr)?;
        self.read_fifo(start, packet.payload_buffer(len as usize))?;

        let snr = self.read_u8(Register::PktSnrValue)? as i8 as i16;
        let band = self
            .conf
            .rssi_band
            .unwrap_or_else(|| RssiBand::for_frequency(settings.freq_khz));
        let mut rssi = band.offset() + self.read_u8(Register::PktRssiValue)? as i16;
        if snr < 0 {
            rssi += snr / 4;
        }
        packet.snr = snr;
        packet.rssi = rssi;
        Ok(())
    }

    fn map_output_power(
        &self,
        dbm: i8,
        output: Option<PaOutput>,
    ) -> Result<PaSetting, Error<Self::BusError>> {
        pa_setting(dbm, output, self.conf.default_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::Config;
    use crate::sim::{driver, Sim, SimDriver};
    use lora_modem::airtime::SymbolOffsets;
    use lora_modem::{IrqSignal, Modem, ModemConfig, NoAntennaSwitch, RecvPoll, SendPoll};
    use std::cell::Cell;
    use std::rc::Rc;

    fn settings(cfg: ModemConfig) -> Settings {
        Settings::default().merge(&cfg).unwrap()
    }

    fn configured(cfg: ModemConfig) -> (SimDriver, Sim, Settings) {
        let (mut sx, sim) = driver(Config::default());
        let s = settings(cfg);
        sx.configure(None, &s).unwrap();
        sim.state_mut().writes.clear();
        (sx, sim, s)
    }

    #[test]
    fn test_init_checks_version() {
        let (mut sx, sim) = driver(Config::default());
        sx.init().unwrap();
        assert_eq!(sim.reg(0x01), 0x81);

        let (mut sx, sim) = driver(Config::default());
        sim.state_mut().regs[0x42] = 0x22;
        assert!(matches!(sx.init(), Err(Error::Command { status: 0x22 })));
    }

    #[test]
    fn test_init_with_tcxo() {
        let conf = Config {
            tcxo: true,
            ..Config::default()
        };
        let (mut sx, sim) = driver(conf);
        sim.state_mut().regs[0x4B] = 0x09;
        sx.init().unwrap();
        assert_eq!(sim.reg(0x4B), 0x19);
    }

    #[test]
    fn test_first_configure() {
        let (mut sx, sim) = driver(Config::default());
        let s = settings(ModemConfig::default());
        sx.configure(None, &s).unwrap();

        assert_eq!([sim.reg(0x06), sim.reg(0x07), sim.reg(0x08)], [0xD9, 0x00, 0x00]);
        assert_eq!(sim.state().image_cals, 1);
        assert_eq!(sim.reg(0x1D), 0x72);
        assert_eq!(sim.reg(0x1E) & 0xFC, 0x74);
        assert_eq!(sim.reg(0x26), 0x04);
        assert_eq!([sim.reg(0x20), sim.reg(0x21)], [0x00, 12]);
        assert_eq!(sim.reg(0x39), 0x12);
        assert_eq!(sim.reg(0x09), 0xFC);
        assert_eq!(sim.reg(0x4D), 0x84);
        assert_eq!(sim.reg(0x0B), 0x2B);
        assert_eq!(sim.reg(0x0A) & 0x0F, 0x09);
        assert_eq!(sim.reg(0x0C), 0x20);
        assert_eq!(sim.reg(0x2F), 0x40);
        assert_eq!(sim.reg(0x36), 0x03);
        assert_eq!(sim.reg(0x31) & 0x87, 0x03);
        assert_eq!(sim.reg(0x37), 0x0A);
    }

    #[test]
    fn test_configure_only_writes_changes() {
        let (mut sx, sim, prev) = configured(ModemConfig::default());
        let next = prev.merge(&ModemConfig::default().set_sync_word(0x34)).unwrap();
        sx.configure(Some(&prev), &next).unwrap();
        assert_eq!(sim.state().written(), [0x39]);
        assert_eq!(sim.reg(0x39), 0x34);
    }

    #[test]
    fn test_500khz_errata() {
        let (mut sx, sim, prev) = configured(ModemConfig::default().set_freq_khz(915_000));
        let next = prev
            .merge(&ModemConfig::default().set_bandwidth(Bandwidth::Khz500))
            .unwrap();
        sx.configure(Some(&prev), &next).unwrap();
        assert_eq!(sim.reg(0x31) & 0x80, 0x80);
        assert_eq!(sim.reg(0x36), 0x02);
        assert_eq!(sim.reg(0x3A), 0x64);
        assert_eq!(sim.reg(0x1D) & 0xF0, 0x90);
        // Only the initial calibration; a bandwidth change needs none.
        assert_eq!(sim.state().image_cals, 1);

        let back = next
            .merge(&ModemConfig::default().set_bandwidth(Bandwidth::Khz7_8))
            .unwrap();
        sx.configure(Some(&next), &back).unwrap();
        assert_eq!(sim.reg(0x31) & 0x80, 0x00);
        assert_eq!(sim.reg(0x2F), 0x48);
        assert_eq!(sim.reg(0x30), 0x00);
    }

    #[test]
    fn test_validate_family_limits() {
        let (sx, _sim) = driver(Config::default());
        assert!(sx.validate(&settings(ModemConfig::default())).is_ok());
        assert!(matches!(
            sx.validate(&settings(ModemConfig::default().set_spreading_factor(5))),
            Err(Error::Config(ConfigError::SpreadingFactor(5)))
        ));
        assert!(matches!(
            sx.validate(&settings(ModemConfig::default().set_spreading_factor(6))),
            Err(Error::Config(ConfigError::Unsupported(_)))
        ));
        assert!(sx
            .validate(&settings(
                ModemConfig::default()
                    .set_spreading_factor(6)
                    .set_implicit_header(true)
            ))
            .is_ok());
        assert!(matches!(
            sx.validate(&settings(ModemConfig::default().set_pa_ramp_us(30))),
            Err(Error::Config(ConfigError::PaRamp(30)))
        ));
        assert!(matches!(
            sx.validate(&settings(ModemConfig::default().set_output_power(21))),
            Err(Error::Config(ConfigError::OutputPower(21)))
        ));
    }

    #[test]
    fn test_timed_rx_uses_symbol_timeout() {
        let (mut sx, sim, s) = configured(ModemConfig::default());
        // SF7 at 125 kHz: 1024 us per symbol.
        let request = RxRequest {
            timeout_ms: Some(100),
            continuous: false,
            rx_length: 0xFF,
        };
        sx.start_rx(&s, request).unwrap();
        assert_eq!(sim.reg(0x1F), 97);
        assert_eq!(sim.reg(0x1E) & 0x03, 0);
        assert_eq!(sim.reg(0x01) & 0x07, Mode::RxSingle as u8);

        // Saturates at the ten bit maximum.
        let request = RxRequest {
            timeout_ms: Some(10_000),
            ..request
        };
        sx.start_rx(&s, request).unwrap();
        assert_eq!(sim.reg(0x1F), 0xFF);
        assert_eq!(sim.reg(0x1E) & 0x03, 0x03);
    }

    #[test]
    fn test_untimed_rx_is_continuous() {
        let (mut sx, sim, s) = configured(ModemConfig::default());
        let request = RxRequest {
            timeout_ms: None,
            continuous: false,
            rx_length: 0xFF,
        };
        sx.start_rx(&s, request).unwrap();
        assert_eq!(sim.reg(0x01) & 0x07, Mode::RxContinuous as u8);
        assert_eq!(sim.reg(0x40), DIO_MAPPING_RX);
        sx.finish_rx(false).unwrap();
        assert_eq!(sim.reg(0x01) & 0x07, Mode::Standby as u8);
    }

    #[test]
    fn test_tx_sequence() {
        let (mut sx, sim, s) = configured(ModemConfig::default().set_invert_iq_tx(true));
        sx.prepare_tx(&s, b"ping").unwrap();
        sx.start_tx(&s).unwrap();
        assert_eq!(&sim.state().fifo[..4], b"ping");
        assert_eq!(sim.reg(0x22), 4);
        assert_eq!(sim.reg(0x33) & 0x41, 0x00);
        assert_eq!(sim.reg(0x40), DIO_MAPPING_TX);
        assert_eq!(sim.reg(0x01) & 0x07, Mode::Tx as u8);
    }

    #[test]
    fn test_classify_explicit_header() {
        let (sx, _sim, _s) = configured(ModemConfig::default());
        let events = sx.classify_irq(0x50);
        assert!(events.rx_done && events.rx_ok);
        assert!(!sx.classify_irq(0x40).rx_ok);
        assert!(!sx.classify_irq(0x70).rx_ok);
        assert!(sx.classify_irq(0x80).rx_timeout);
        assert!(sx.classify_irq(0x08).tx_done);
    }

    #[test]
    fn test_read_packet_signal_quality() {
        let (mut sx, sim, s) = configured(ModemConfig::default());
        {
            let mut state = sim.state_mut();
            state.fifo[0x20..0x23].copy_from_slice(b"abc");
            state.regs[0x13] = 3;
            state.regs[0x10] = 0x20;
            state.regs[0x19] = (-8i8) as u8;
            state.regs[0x1A] = 60;
        }
        let mut packet = RxPacket::new();
        sx.read_packet(&s, &mut packet).unwrap();
        assert_eq!(packet.payload(), b"abc");
        assert_eq!(packet.snr, -8);
        assert_eq!(packet.rssi, -157 + 60 - 2);

        let lf = settings(ModemConfig::default().set_freq_khz(433_000));
        sim.state_mut().regs[0x19] = 20;
        sx.read_packet(&lf, &mut packet).unwrap();
        assert_eq!(packet.rssi, -164 + 60);
    }

    #[test]
    fn test_no_symbol_offsets() {
        let (sx, _sim) = driver(Config::default());
        let sf6 = settings(
            ModemConfig::default()
                .set_spreading_factor(6)
                .set_implicit_header(true),
        );
        assert_eq!(sx.symbol_offsets(&sf6), SymbolOffsets::default());
    }

    #[test]
    fn test_modem_timed_receive_over_sx1276() {
        let (sx, sim) = driver(Config::default());
        let irq = IrqSignal::new();
        let now = Rc::new(Cell::new(0u32));
        let clock = {
            let now = now.clone();
            move || now.get()
        };
        let mut modem = Modem::new(sx, clock, NoAntennaSwitch, &irq, &ModemConfig::default()).unwrap();

        modem.start_recv(Some(2_000), false, 0xFF).unwrap();
        assert_eq!(sim.reg(0x01) & 0x07, Mode::RxSingle as u8);

        // The hardware symbol timeout is shorter than the request.
        sim.raise(IrqFlag::RxTimeout as u8);
        now.set(1_050);
        irq.on_irq(now.get());
        assert_eq!(modem.poll_recv(None).unwrap(), RecvPoll::Receiving);
        assert_eq!(sim.reg(0x01) & 0x07, Mode::RxSingle as u8);
        assert_eq!(sim.reg(0x12), 0);

        {
            let mut state = sim.state_mut();
            state.fifo[..2].copy_from_slice(b"ok");
            state.regs[0x13] = 2;
            state.regs[0x10] = 0;
        }
        sim.raise(IrqFlag::RxDone as u8 | IrqFlag::ValidHeader as u8);
        now.set(1_500);
        irq.on_irq(now.get());
        let RecvPoll::Packet(packet) = modem.poll_recv(None).unwrap() else {
            panic!("expected a packet");
        };
        assert_eq!(packet.payload(), b"ok");
        assert_eq!(packet.ticks_ms, 1_500);
        assert_eq!(sim.reg(0x01) & 0x07, Mode::Standby as u8);

        modem.prepare_send(b"reply").unwrap();
        modem.start_send().unwrap();
        sim.raise(IrqFlag::TxDone as u8);
        now.set(1_600);
        irq.on_irq(now.get());
        assert_eq!(modem.poll_send().unwrap(), SendPoll::Done(1_600));
    }
}
