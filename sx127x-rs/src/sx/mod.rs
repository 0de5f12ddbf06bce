//! The register layer of the SX127x driver.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::Operation;
use embedded_hal::spi::SpiDevice;
use lora_modem::{BusError, Error, PinError, SpiError};

use crate::conf::Config;
use crate::reg::*;

/// Result of a driver operation.
pub type SxResult<T, TSPIERR, TPINERR> = Result<T, Error<BusError<TSPIERR, TPINERR>>>;

const WRITE_FLAG: u8 = 0x80;
const MODE_POLL_US: u32 = 10;
/// Image calibration takes about 10 ms.
const CALIBRATION_TIMEOUT_US: u32 = 50_000;
/// Time after reset before the chip accepts SPI access.
const RESET_READY_MS: u32 = 10;

/// A wrapper around a Semtech SX1276/77/78/79 LoRa modem.
pub struct SX127x<TSPI, TNRST, TDELAY> {
    spi: TSPI,
    nrst_pin: TNRST,
    delay: TDELAY,
    pub(crate) conf: Config,
    sleeping: bool,
    /// `RegOpMode` LowFrequencyModeOn for the configured carrier.
    pub(crate) low_frequency: bool,
    /// Header mode of the current settings, needed to classify interrupts.
    pub(crate) implicit_header: bool,
}

impl<TSPI, TNRST, TDELAY, TSPIERR, TPINERR> SX127x<TSPI, TNRST, TDELAY>
where
    TSPI: SpiDevice<Error = TSPIERR>,
    TNRST: OutputPin<Error = TPINERR>,
    TDELAY: DelayNs,
{
    /// Creates a new `SX127x` driver instance.
    ///
    /// # Arguments
    ///
    /// * `spi` - The SPI device; chip select is handled by the device.
    /// * `nrst_pin` - The NRESET pin.
    /// * `delay` - Used for reset timing and mode polling.
    /// * `conf` - Board level options.
    pub fn new(spi: TSPI, nrst_pin: TNRST, delay: TDELAY, conf: Config) -> Self {
        Self {
            spi,
            nrst_pin,
            delay,
            conf,
            sleeping: false,
            low_frequency: false,
            implicit_header: false,
        }
    }

    /// Board level options the driver was created with.
    pub fn config(&self) -> &Config {
        &self.conf
    }

    /// True after entering sleep mode until the next mode change.
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Writes data to consecutive registers.
    pub fn write_register(&mut self, register: Register, data: &[u8]) -> SxResult<(), TSPIERR, TPINERR> {
        let addr = u8::from(register) | WRITE_FLAG;
        self.spi
            .transaction(&mut [Operation::Write(&[addr]), Operation::Write(data)])
            .map_err(SpiError::Write)?;
        Ok(())
    }

    /// Reads data from consecutive registers.
    pub fn read_register(&mut self, register: Register, result: &mut [u8]) -> SxResult<(), TSPIERR, TPINERR> {
        let addr = u8::from(register) & !WRITE_FLAG;
        self.spi
            .transaction(&mut [Operation::Write(&[addr]), Operation::Read(result)])
            .map_err(SpiError::Transfer)?;
        Ok(())
    }

    /// Reads a single register.
    pub fn read_u8(&mut self, register: Register) -> SxResult<u8, TSPIERR, TPINERR> {
        let mut value = [0u8];
        self.read_register(register, &mut value)?;
        Ok(value[0])
    }

    /// Writes a single register.
    pub fn write_u8(&mut self, register: Register, value: u8) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_register(register, &[value])
    }

    /// Read-modify-write of a single register.
    pub fn modify_register(
        &mut self,
        register: Register,
        f: impl FnOnce(u8) -> u8,
    ) -> SxResult<(), TSPIERR, TPINERR> {
        let value = self.read_u8(register)?;
        self.write_u8(register, f(value))
    }

    /// Resets the device by pulling the NRESET pin low.
    pub fn reset(&mut self) -> SxResult<(), TSPIERR, TPINERR> {
        self.nrst_pin.set_low().map_err(PinError::Output)?;
        self.delay.delay_us(100);
        self.nrst_pin.set_high().map_err(PinError::Output)?;
        self.delay.delay_ms(RESET_READY_MS);
        self.sleeping = false;
        Ok(())
    }

    /// Reads the silicon revision.
    pub fn version(&mut self) -> SxResult<u8, TSPIERR, TPINERR> {
        self.read_u8(Register::Version)
    }

    /// Writes a raw `RegOpMode` value and waits until the readback matches.
    fn write_op_mode(&mut self, op_mode: u8) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_u8(Register::OpMode, op_mode)?;
        let mut waited_us = 0;
        loop {
            let readback = self.read_u8(Register::OpMode)?;
            if readback & 0x87 == op_mode & 0x87 {
                return Ok(());
            }
            if waited_us >= self.conf.mode_timeout_us {
                log::warn!("lora::set_mode {op_mode:#04x} not reached, reads {readback:#04x}");
                return Err(Error::HardwareTimeout);
            }
            self.delay.delay_us(MODE_POLL_US);
            waited_us += MODE_POLL_US;
        }
    }

    /// Switches the LoRa transceiver mode.
    pub fn set_mode(&mut self, mode: Mode) -> SxResult<(), TSPIERR, TPINERR> {
        let lf = if self.low_frequency {
            LOW_FREQUENCY_MODE
        } else {
            0
        };
        self.write_op_mode(LONG_RANGE_MODE | lf | mode as u8)?;
        self.sleeping = mode == Mode::Sleep;
        Ok(())
    }

    /// Puts the chip into LoRa sleep, switching from FSK if needed.
    ///
    /// The LongRangeMode bit can only change in sleep, so this goes through
    /// FSK sleep first.
    pub fn enter_lora(&mut self) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_op_mode(Mode::Sleep as u8)?;
        self.set_mode(Mode::Sleep)
    }

    /// Runs the receiver image and RSSI calibration for the current carrier.
    ///
    /// Calibration is only reachable from FSK standby, so the chip leaves
    /// LoRa mode for its duration and comes back in LoRa standby.
    pub fn run_image_calibration(&mut self) -> SxResult<(), TSPIERR, TPINERR> {
        log::trace!("lora::calibrate_image start");
        self.set_mode(Mode::Sleep)?;
        self.write_op_mode(Mode::Sleep as u8)?;
        self.write_op_mode(Mode::Standby as u8)?;
        self.modify_register(Register::IMAGE_CAL, |v| v | IMAGE_CAL_START)?;

        let mut waited_us = 0;
        while self.read_u8(Register::IMAGE_CAL)? & IMAGE_CAL_RUNNING != 0 {
            if waited_us >= CALIBRATION_TIMEOUT_US {
                log::warn!("lora::calibrate_image still running after {waited_us} us");
                return Err(Error::HardwareTimeout);
            }
            self.delay.delay_us(MODE_POLL_US);
            waited_us += MODE_POLL_US;
        }

        self.enter_lora()?;
        self.set_mode(Mode::Standby)?;
        log::trace!("lora::calibrate_image done");
        Ok(())
    }

    /// Sets the carrier frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: u32) -> SxResult<(), TSPIERR, TPINERR> {
        let bytes = frf(freq_hz).to_be_bytes();
        self.write_register(Register::FrfMsb, &bytes[1..])?;
        self.low_frequency = freq_hz < 525_000_000;
        Ok(())
    }

    /// Writes `data` to the FIFO starting at `offset`.
    pub fn write_fifo(&mut self, offset: u8, data: &[u8]) -> SxResult<(), TSPIERR, TPINERR> {
        self.wake()?;
        self.write_u8(Register::FifoAddrPtr, offset)?;
        self.write_register(Register::Fifo, data)
    }

    /// Reads the FIFO starting at `offset` into `result`.
    pub fn read_fifo(&mut self, offset: u8, result: &mut [u8]) -> SxResult<(), TSPIERR, TPINERR> {
        if result.is_empty() {
            return Ok(());
        }
        self.wake()?;
        self.write_u8(Register::FifoAddrPtr, offset)?;
        self.read_register(Register::Fifo, result)
    }

    /// Reads the interrupt flags.
    pub fn irq_flags(&mut self) -> SxResult<IrqFlags, TSPIERR, TPINERR> {
        Ok(IrqFlags(self.read_u8(Register::IrqFlags)?))
    }

    /// Clears the interrupt flags set in `mask`.
    pub fn clear_irq_flags(&mut self, mask: u8) -> SxResult<(), TSPIERR, TPINERR> {
        self.write_u8(Register::IrqFlags, mask)
    }

    /// Sets IQ inversion for both directions.
    pub fn set_invert_iq(&mut self, rx: bool, tx: bool) -> SxResult<(), TSPIERR, TPINERR> {
        let rx_bit = if rx { 0x40 } else { 0x00 };
        // The TX bit is active low.
        let tx_bit = if tx { 0x00 } else { 0x01 };
        self.modify_register(Register::InvertIq, |v| (v & !0x41) | rx_bit | tx_bit)?;
        self.write_u8(Register::InvertIq2, if rx || tx { 0x19 } else { 0x1D })
    }

    /// The FIFO is not accessible in sleep.
    fn wake(&mut self) -> SxResult<(), TSPIERR, TPINERR> {
        if self.sleeping {
            log::trace!("lora::wake");
            self.set_mode(Mode::Standby)?;
        }
        Ok(())
    }
}
