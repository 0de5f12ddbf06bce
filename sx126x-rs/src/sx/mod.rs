//! The command layer of the SX126x driver.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::Operation;
use embedded_hal::spi::SpiDevice;
use lora_modem::{BusError, Error, PinError, SpiError};

use crate::conf::Config;
use crate::op::*;
use crate::reg::*;

/// Result of a driver command.
pub type SxResult<T, TSPIERR, TPINERR> = Result<T, Error<BusError<TSPIERR, TPINERR>>>;

type Pins<TNRST, TBUSY> = (TNRST, TBUSY);

const NOP: u8 = 0x00;
/// Opcode, up to eight argument bytes and the status NOP.
const MAX_HEADER: usize = 10;
const BUSY_POLL_US: u32 = 10;
/// Calibration takes a few milliseconds; allow plenty.
const CALIBRATION_TIMEOUT_US: u32 = 50_000;
/// NSS low time that wakes the chip from sleep.
const WAKE_PULSE_NS: u32 = 100_000;

/// Calculates the `SetRfFrequency` argument for a 32 MHz crystal.
///
/// # Example
///
/// `calc_rf_freq(868_000_000)` for an 868 MHz carrier.
pub fn calc_rf_freq(freq_hz: u32) -> u32 {
    (((freq_hz as u64) << 25) / 32_000_000) as u32
}

/// A wrapper around a Semtech SX1261/62 LoRa modem.
pub struct SX126x<TSPI, TNRST, TBUSY, TDELAY> {
    spi: TSPI,
    nrst_pin: TNRST,
    busy_pin: TBUSY,
    delay: TDELAY,
    pub(crate) conf: Config,
    sleeping: bool,
}

impl<TSPI, TNRST, TBUSY, TDELAY, TSPIERR, TPINERR> SX126x<TSPI, TNRST, TBUSY, TDELAY>
where
    TSPI: SpiDevice<Error = TSPIERR>,
    TNRST: OutputPin<Error = TPINERR>,
    TBUSY: InputPin<Error = TPINERR>,
    TDELAY: DelayNs,
{
    /// Creates a new `SX126x` driver instance.
    ///
    /// # Arguments
    ///
    /// * `spi` - The SPI device; chip select is handled by the device.
    /// * `pins` - A tuple containing the required GPIO pins: (NRESET, BUSY).
    /// * `delay` - Used for reset timing and busy polling.
    /// * `conf` - Board level options.
    pub fn new(spi: TSPI, pins: Pins<TNRST, TBUSY>, delay: TDELAY, conf: Config) -> Self {
        let (nrst_pin, busy_pin) = pins;
        Self {
            spi,
            nrst_pin,
            busy_pin,
            delay,
            conf,
            sleeping: false,
        }
    }

    /// Board level options the driver was created with.
    pub fn config(&self) -> &Config {
        &self.conf
    }

    /// True between `set_sleep` and the next command.
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Issues one command frame.
    ///
    /// `args` follow the opcode, then `bulk_write` is sent. With a `response`
    /// buffer a NOP is clocked after the arguments to fetch the status byte,
    /// which is checked, and the response bytes are read after it.
    ///
    /// Wakes the chip first if it is asleep.
    pub fn execute(
        &mut self,
        opcode: u8,
        args: &[u8],
        bulk_write: &[u8],
        response: Option<&mut [u8]>,
    ) -> SxResult<Status, TSPIERR, TPINERR> {
        if args.len() + 2 > MAX_HEADER {
            return Err(Error::InvalidArgument("command arguments too long"));
        }
        if self.sleeping {
            self.wake()?;
        }
        self.wait_on_busy(self.conf.busy_timeout_us)?;

        let reading = response.is_some();
        let len = 1 + args.len() + reading as usize;
        let mut header = [NOP; MAX_HEADER];
        header[0] = opcode;
        header[1..=args.len()].copy_from_slice(args);
        let result = match response {
            Some(response) if !response.is_empty() => self.spi.transaction(&mut [
                Operation::TransferInPlace(&mut header[..len]),
                Operation::Read(response),
            ]),
            _ if !bulk_write.is_empty() => self.spi.transaction(&mut [
                Operation::TransferInPlace(&mut header[..len]),
                Operation::Write(bulk_write),
            ]),
            _ => self
                .spi
                .transaction(&mut [Operation::TransferInPlace(&mut header[..len])]),
        };
        result.map_err(SpiError::Transfer)?;

        let status = Status::from(header[len - 1]);
        if reading && status.is_error() {
            log::warn!("lora::execute opcode {opcode:#04x} failed: {status:?}");
            return Err(Error::Command {
                status: status.raw(),
            });
        }
        Ok(status)
    }

    fn write_command(&mut self, opcode: u8, args: &[u8]) -> SxResult<(), TSPIERR, TPINERR> {
        self.execute(opcode, args, &[], None).map(|_| ())
    }

    fn read_command(
        &mut self,
        opcode: u8,
        args: &[u8],
        response: &mut [u8],
    ) -> SxResult<Status, TSPIERR, TPINERR> {
        self.execute(opcode, args, &[], Some(response))
    }

    /// Waits until the BUSY pin goes low, for at most `timeout_us`.
    pub fn wait_on_busy(&mut self, timeout_us: u32) -> SxResult<(), TSPIERR, TPINERR> {
        let mut waited_us = 0;
        while self.busy_pin.is_high().map_err(PinError::Input)? {
            if waited_us >= timeout_us {
                log::warn!("lora::wait_on_busy still busy after {waited_us} us");
                return Err(Error::HardwareTimeout);
            }
            self.delay.delay_us(BUSY_POLL_US);
            waited_us += BUSY_POLL_US;
        }
        Ok(())
    }

    /// Resets the device by pulling the NRESET pin low.
    pub fn reset(&mut self) -> SxResult<(), TSPIERR, TPINERR> {
        self.nrst_pin.set_low().map_err(PinError::Output)?;
        // The pin should be held low for typically 100 μs for the Reset to happen.
        self.delay.delay_us(200);
        self.nrst_pin.set_high().map_err(PinError::Output)?;
        self.sleeping = false;
        self.wait_on_busy(self.conf.busy_timeout_us)
    }

    /// Wakes the chip from sleep with an NSS pulse.
    fn wake(&mut self) -> SxResult<(), TSPIERR, TPINERR> {
        log::trace!("lora::wake");
        self.sleeping = false;
        self.spi
            .transaction(&mut [Operation::DelayNs(WAKE_PULSE_NS)])
            .map_err(SpiError::Write)?;
        self.wait_on_busy(self.conf.busy_timeout_us)?;
        // The oscillator start check trips spuriously on wake.
        self.clear_device_errors()
    }

    /// Puts the modem in a specified standby mode.
    pub fn set_standby(&mut self, standby_config: StandbyConfig) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x80, &[standby_config as u8])
    }

    /// Puts the modem to sleep. The next command wakes it transparently.
    pub fn set_sleep(&mut self, sleep_config: SleepConfig) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x84, &[sleep_config as u8])?;
        self.sleeping = true;
        Ok(())
    }

    /// Selects the regulator.
    pub fn set_regulator_mode(&mut self, mode: RegulatorMode) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x96, &[mode as u8])
    }

    /// Sets the modem packet type (LoRa or GFSK).
    pub fn set_packet_type(&mut self, packet_type: PacketType) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x8A, &[packet_type as u8])
    }

    /// Gets the current status of the modem.
    pub fn get_status(&mut self) -> SxResult<Status, TSPIERR, TPINERR> {
        let status = self.read_command(0xC0, &[], &mut [])?;
        log::trace!("lora::get_status {status:?}");
        Ok(status)
    }

    /// Gets the packet counters.
    pub fn get_stats(&mut self) -> SxResult<Stats, TSPIERR, TPINERR> {
        let mut result = [NOP; 6];
        self.read_command(0x10, &[], &mut result)?;
        Ok(result.into())
    }

    /// Calibrates the image rejection filter for a given frequency range.
    pub fn calibrate_image(&mut self, freq: CalibImageFreq) -> SxResult<(), TSPIERR, TPINERR> {
        let freq: [u8; 2] = freq.into();
        self.write_command(0x98, &freq)?;
        self.wait_on_busy(CALIBRATION_TIMEOUT_US)
    }

    /// Calibrates the blocks selected by `calib_param` and waits for the end.
    pub fn calibrate(&mut self, calib_param: CalibParam) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x89, &[calib_param.into()])?;
        self.wait_on_busy(CALIBRATION_TIMEOUT_US)
    }

    /// Writes data to consecutive registers.
    pub fn write_register(&mut self, register: Register, data: &[u8]) -> SxResult<(), TSPIERR, TPINERR> {
        let start_addr = u16::from(register).to_be_bytes();
        self.execute(0x0D, &start_addr, data, None).map(|_| ())
    }

    /// Reads data from consecutive registers.
    pub fn read_register(&mut self, register: Register, result: &mut [u8]) -> SxResult<(), TSPIERR, TPINERR> {
        debug_assert!(!result.is_empty());
        let start_addr = u16::from(register).to_be_bytes();
        self.read_command(0x1D, &start_addr, result).map(|_| ())
    }

    /// Read-modify-write of a single register.
    pub fn modify_register(
        &mut self,
        register: Register,
        f: impl FnOnce(u8) -> u8,
    ) -> SxResult<(), TSPIERR, TPINERR> {
        let mut value = [0u8];
        self.read_register(register, &mut value)?;
        self.write_register(register, &[f(value[0])])
    }

    /// Writes data to the modem's buffer at a given offset.
    pub fn write_buffer(&mut self, offset: u8, data: &[u8]) -> SxResult<(), TSPIERR, TPINERR> {
        self.execute(0x0E, &[offset], data, None).map(|_| ())
    }

    /// Reads data from the modem's buffer at a given offset.
    pub fn read_buffer(&mut self, offset: u8, result: &mut [u8]) -> SxResult<(), TSPIERR, TPINERR> {
        if result.is_empty() {
            return Ok(());
        }
        self.read_command(0x1E, &[offset], result).map(|_| ())
    }

    /// Configures the DIO2 pin as an RF control switch.
    pub fn set_dio2_as_rf_switch_ctrl(&mut self, enable: bool) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x9D, &[enable as u8])
    }

    /// Configures the DIO3 pin as a TCXO control switch.
    pub fn set_dio3_as_tcxo_ctrl(
        &mut self,
        tcxo_voltage: TcxoVoltage,
        tcxo_delay: TcxoDelay,
    ) -> SxResult<(), TSPIERR, TPINERR> {
        let d: [u8; 3] = tcxo_delay.into();
        self.write_command(0x97, &[tcxo_voltage as u8, d[0], d[1], d[2]])
    }

    /// Gets the status of the last received packet (RSSI, SNR).
    pub fn get_packet_status(&mut self) -> SxResult<PacketStatus, TSPIERR, TPINERR> {
        let mut result = [NOP; 3];
        self.read_command(0x14, &[], &mut result)?;
        Ok(result.into())
    }

    /// Gets the RX buffer status: length and start pointer of the last packet.
    pub fn get_rx_buffer_status(&mut self) -> SxResult<RxBufferStatus, TSPIERR, TPINERR> {
        let mut result = [NOP; 2];
        self.read_command(0x13, &[], &mut result)?;
        log::trace!("lora::get_rx_buffer_status raw response: {result:?}");
        Ok(result.into())
    }

    /// Clears the device error register.
    pub fn clear_device_errors(&mut self) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x07, &[NOP, NOP])
    }

    /// Gets the current device errors.
    pub fn get_device_errors(&mut self) -> SxResult<DeviceErrors, TSPIERR, TPINERR> {
        let mut result = [NOP; 2];
        self.read_command(0x17, &[], &mut result)?;
        Ok(DeviceErrors::from(u16::from_be_bytes(result)))
    }

    /// Configures the interrupt (IRQ) masks for the DIO pins.
    pub fn set_dio_irq_params(
        &mut self,
        irq_mask: IrqMask,
        dio1_mask: IrqMask,
        dio2_mask: IrqMask,
        dio3_mask: IrqMask,
    ) -> SxResult<(), TSPIERR, TPINERR> {
        let irq = u16::from(irq_mask).to_be_bytes();
        let dio1 = u16::from(dio1_mask).to_be_bytes();
        let dio2 = u16::from(dio2_mask).to_be_bytes();
        let dio3 = u16::from(dio3_mask).to_be_bytes();
        self.write_command(
            0x08,
            &[
                irq[0], irq[1], dio1[0], dio1[1], dio2[0], dio2[1], dio3[0], dio3[1],
            ],
        )
    }

    /// Gets the current IRQ status.
    pub fn get_irq_status(&mut self) -> SxResult<IrqStatus, TSPIERR, TPINERR> {
        let mut status = [NOP; 2];
        self.read_command(0x12, &[], &mut status)?;
        Ok(u16::from_be_bytes(status).into())
    }

    /// Clears the specified IRQ status flags.
    pub fn clear_irq_status(&mut self, mask: IrqMask) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x02, &u16::from(mask).to_be_bytes())
    }

    /// Puts the device in TX mode.
    pub fn set_tx(&mut self, timeout: RxTxTimeout) -> SxResult<(), TSPIERR, TPINERR> {
        let timeout: [u8; 3] = timeout.into();
        self.write_command(0x83, &timeout)
    }

    /// Puts the device in RX mode.
    pub fn set_rx(&mut self, timeout: RxTxTimeout) -> SxResult<(), TSPIERR, TPINERR> {
        let timeout: [u8; 3] = timeout.into();
        self.write_command(0x82, &timeout)
    }

    /// Sets the packet parameters.
    pub fn set_packet_params(&mut self, params: PacketParams) -> SxResult<(), TSPIERR, TPINERR> {
        let params: [u8; 9] = params.into();
        // Only the first six bytes matter for LoRa.
        self.write_command(0x8C, &params[..6])
    }

    /// Sets the modulation parameters.
    pub fn set_mod_params(&mut self, params: ModParams) -> SxResult<(), TSPIERR, TPINERR> {
        let params: [u8; 8] = params.into();
        self.write_command(0x8B, &params[..4])
    }

    /// Sets the TX parameters (output power, ramp time).
    pub fn set_tx_params(&mut self, params: TxParams) -> SxResult<(), TSPIERR, TPINERR> {
        let params: [u8; 2] = params.into();
        self.write_command(0x8E, &params)
    }

    /// Sets the Over Current Protection (OCP) limit in 2.5 mA steps.
    pub fn set_ocp(&mut self, ocp: u8) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_register(Register::OcpConfiguration, &[ocp])
    }

    /// Sets the RF frequency in Hz.
    pub fn set_rf_frequency(&mut self, freq_hz: u32) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x86, &calc_rf_freq(freq_hz).to_be_bytes())
    }

    /// Sets the Power Amplifier (PA) configuration.
    pub fn set_pa_config(&mut self, pa_config: PaConfig) -> SxResult<(), TSPIERR, TPINERR> {
        let pa_config: [u8; 4] = pa_config.into();
        self.write_command(0x95, &pa_config)
    }

    /// Configures the base addresses for the TX and RX buffers.
    pub fn set_buffer_base_address(
        &mut self,
        tx_base_addr: u8,
        rx_base_addr: u8,
    ) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_command(0x8F, &[tx_base_addr, rx_base_addr])
    }

    /// Sets the LoRa sync word in its two byte register form.
    pub fn set_sync_word(&mut self, sync_word: u16) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_register(Register::LoRaSyncWordMsb, &sync_word.to_be_bytes())
    }

    /// Selects boosted (more sensitive) or power saving receiver gain.
    pub fn set_rx_gain(&mut self, boosted: bool) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_register(Register::RxGain, &[if boosted { 0x96 } else { 0x94 }])
    }

    /// Keeps the PA from clamping under antenna mismatch. SX1262 only.
    pub fn fix_tx_clamp(&mut self) -> SxResult<(), TSPIERR, TPINERR> {
        self.modify_register(Register::TxClampConfig, |v| v | 0x1E)
    }

    /// Sets up IQ polarity so inverted IQ packets are received reliably.
    pub fn set_iq_polarity(&mut self, inverted: bool) -> SxResult<(), TSPIERR, TPINERR> {
        self.modify_register(Register::IqPolarity, |v| {
            if inverted {
                v & !0x04
            } else {
                v | 0x04
            }
        })
    }

    /// Sets the modulation quality bit. Must be redone before every transmission.
    pub fn set_tx_modulation(&mut self, bw_500khz: bool) -> SxResult<(), TSPIERR, TPINERR> {
        self.modify_register(Register::TxModulation, |v| {
            if bw_500khz {
                v & !0x04
            } else {
                v | 0x04
            }
        })
    }

    /// Stops the RTC and clears its pending event after a receive with a timeout.
    /// Otherwise the next timed receive may end early.
    pub fn stop_rtc(&mut self) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_register(Register::RtcControl, &[0x00])?;
        self.modify_register(Register::EventMask, |v| v | 0x02)
    }
}
