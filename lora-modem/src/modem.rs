//! The chip-independent modem state machine.

use crate::airtime::{self, SymbolOffsets};
use crate::antenna::AntennaSwitch;
use crate::chip::{Chip, RxRequest};
use crate::clock::{ticks_add, ticks_diff, Clock};
use crate::config::{ModemConfig, PaOutput, Settings};
use crate::err::Error;
use crate::irq::IrqSignal;
use crate::packet::{RxPacket, MAX_PAYLOAD};

/// Longest receive timeout; deadlines must stay within half the tick range.
pub const MAX_RX_TIMEOUT_MS: u32 = i32::MAX as u32;

/// Logical receive intent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RxIntent {
    Off,
    NoDeadline,
    Until(u32),
}

/// What the chip was last left doing when neither receiving nor transmitting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Rest {
    Standby,
    Idle,
    Sleep,
}

/// Observable modem state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModemState {
    /// A receive or transmit finished and nothing is pending.
    Idle,
    /// Explicitly put in standby (also the initial state).
    Standby,
    /// Explicitly put to sleep.
    Sleep,
    /// Receiving until a packet arrives (or forever, if continuous).
    ReceivingNoDeadline,
    /// Receiving until the given tick count.
    ReceivingWithDeadline(u32),
    /// A transmission is in progress. A receive may be pending behind it.
    Transmitting,
}

/// Result of [`Modem::poll_recv`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecvPoll {
    /// No receive is in progress.
    NotReceiving,
    /// Still receiving, nothing new.
    Receiving,
    /// A packet arrived.
    Packet(RxPacket),
}

/// Result of [`Modem::poll_send`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SendPoll {
    /// No transmission is in progress.
    NotSending,
    /// Still transmitting.
    Sending,
    /// The transmission finished at the given tick count. Reported once.
    Done(u32),
}

/// A LoRa modem: shared receive/transmit bookkeeping over a chip family driver.
pub struct Modem<'a, C, CLK, ANT> {
    chip: C,
    clock: CLK,
    ant: ANT,
    irq: &'a IrqSignal,
    settings: Settings,
    rx: RxIntent,
    rx_continuous: bool,
    rx_length: u8,
    tx: bool,
    tx_prepared: bool,
    // `Some(timed)` while a hardware receive is running.
    hw_rx: Option<bool>,
    rest: Rest,
}

impl<'a, C, CLK, ANT> Modem<'a, C, CLK, ANT>
where
    C: Chip,
    CLK: Clock,
    ANT: AntennaSwitch,
{
    /// Initializes the chip and applies `config` on top of the defaults.
    ///
    /// `irq` must be signalled by the platform's handler for the chip's
    /// interrupt line(s).
    pub fn new(
        mut chip: C,
        clock: CLK,
        mut ant: ANT,
        irq: &'a IrqSignal,
        config: &ModemConfig,
    ) -> Result<Self, Error<C::BusError>> {
        let settings = Settings::default().merge(config)?;
        chip.validate(&settings)?;
        log::trace!("lora::new init chip");
        chip.init()?;
        chip.configure(None, &settings)?;
        ant.idle();
        irq.clear();
        log::debug!("lora::new ready: {settings:?}");
        Ok(Self {
            chip,
            clock,
            ant,
            irq,
            settings,
            rx: RxIntent::Off,
            rx_continuous: false,
            rx_length: 0xFF,
            tx: false,
            tx_prepared: false,
            hw_rx: None,
            rest: Rest::Standby,
        })
    }

    /// Applies a partial configuration update.
    ///
    /// The merged result is validated completely before any register is
    /// written. A receive in progress is paused and resumed around the update.
    pub fn configure(&mut self, update: &ModemConfig) -> Result<(), Error<C::BusError>> {
        if self.tx {
            return Err(Error::InvalidArgument("cannot configure while transmitting"));
        }
        let next = self.settings.merge(update)?;
        self.chip.validate(&next)?;

        let was_receiving = self.hw_rx.is_some();
        if was_receiving {
            self.chip.standby()?;
            self.end_hw_rx()?;
        }
        self.chip.configure(Some(&self.settings), &next)?;
        log::trace!("lora::configure applied {update:?}");
        self.settings = next;
        if was_receiving {
            self.check_recv()?;
        }
        Ok(())
    }

    /// The current resolved configuration.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The chip driver, for family-specific extras.
    pub fn chip(&mut self) -> &mut C {
        &mut self.chip
    }

    /// Current tick count of the modem's clock.
    pub fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    /// Observable state of the modem.
    pub fn state(&self) -> ModemState {
        if self.tx {
            return ModemState::Transmitting;
        }
        match self.rx {
            RxIntent::NoDeadline => ModemState::ReceivingNoDeadline,
            RxIntent::Until(deadline) => ModemState::ReceivingWithDeadline(deadline),
            RxIntent::Off => match self.rest {
                Rest::Standby => ModemState::Standby,
                Rest::Idle => ModemState::Idle,
                Rest::Sleep => ModemState::Sleep,
            },
        }
    }

    /// Registers a function called from interrupt context after each IRQ, and
    /// after a receive times out in software.
    pub fn set_irq_callback(&mut self, callback: Option<fn()>) {
        self.irq.set_callback(callback);
    }

    /// True if an interrupt arrived that no poll has consumed yet.
    pub fn irq_triggered(&self) -> bool {
        self.irq.is_pending()
    }

    /// Cancels any receive or transmit and puts the chip in standby.
    pub fn standby(&mut self) -> Result<(), Error<C::BusError>> {
        self.rx = RxIntent::Off;
        self.tx = false;
        self.tx_prepared = false;
        self.irq.clear();
        self.ant.idle();
        self.chip.standby()?;
        self.end_hw_rx()?;
        self.rest = Rest::Standby;
        Ok(())
    }

    /// Cancels any activity and puts the chip to sleep.
    pub fn sleep(&mut self) -> Result<(), Error<C::BusError>> {
        self.standby()?;
        self.chip.sleep()?;
        self.rest = Rest::Sleep;
        log::trace!("lora::sleep");
        Ok(())
    }

    /// Runs the chip calibration. Cancels any receive or transmit.
    pub fn calibrate(&mut self) -> Result<(), Error<C::BusError>> {
        self.standby()?;
        self.chip.calibrate()
    }

    /// Calibrates image rejection for the current frequency. Cancels any
    /// receive or transmit.
    pub fn calibrate_image(&mut self) -> Result<(), Error<C::BusError>> {
        self.standby()?;
        self.chip.calibrate_image(&self.settings)
    }

    /// Time on air in microseconds of a packet with `payload_len` bytes.
    pub fn get_time_on_air_us(&self, payload_len: usize) -> u32 {
        airtime::time_on_air_us(&self.settings, payload_len, self.symbol_offsets())
    }

    /// Symbol count of a `payload_len` packet, times four.
    pub fn get_n_symbols_x4(&self, payload_len: usize) -> u32 {
        airtime::n_symbols_x4(&self.settings, payload_len, self.symbol_offsets())
    }

    fn symbol_offsets(&self) -> SymbolOffsets {
        self.chip.symbol_offsets(&self.settings)
    }

    /// Starts receiving.
    ///
    /// `timeout_ms` and `continuous` are mutually exclusive, and `timeout_ms` is
    /// capped at [`MAX_RX_TIMEOUT_MS`]. If a transmission is in progress the
    /// receive is recorded and started once it completes.
    /// Returns true: completion is signalled through the interrupt.
    pub fn start_recv(
        &mut self,
        timeout_ms: Option<u32>,
        continuous: bool,
        rx_length: u8,
    ) -> Result<bool, Error<C::BusError>> {
        if continuous && timeout_ms.is_some() {
            return Err(Error::InvalidArgument(
                "continuous receive cannot have a timeout",
            ));
        }
        let timeout_ms = timeout_ms.map(|ms| ms.min(MAX_RX_TIMEOUT_MS));
        self.rx = match timeout_ms {
            Some(ms) => RxIntent::Until(ticks_add(self.clock.now_ms(), ms)),
            None => RxIntent::NoDeadline,
        };
        self.rx_continuous = continuous;
        self.rx_length = rx_length;

        if self.tx {
            log::debug!("lora::start_recv deferred until send completes");
            return Ok(true);
        }
        self.start_hw_rx(timeout_ms)
    }

    fn start_hw_rx(&mut self, timeout_ms: Option<u32>) -> Result<bool, Error<C::BusError>> {
        self.chip.standby()?;
        self.end_hw_rx()?;
        let request = RxRequest {
            timeout_ms: timeout_ms.map(|ms| ms.max(1)),
            continuous: self.rx_continuous,
            rx_length: self.rx_length,
        };
        self.ant.rx();
        self.chip.start_rx(&self.settings, request)?;
        self.hw_rx = Some(timeout_ms.is_some());
        log::trace!("lora::start_recv {request:?}");
        Ok(true)
    }

    fn end_hw_rx(&mut self) -> Result<(), Error<C::BusError>> {
        if let Some(timed) = self.hw_rx.take() {
            self.chip.finish_rx(timed)?;
        }
        Ok(())
    }

    /// Polls an in-progress receive.
    ///
    /// `rx_packet` is reused for the result if given. Call repeatedly while
    /// receiving; this is also what restarts a receive that the hardware ended
    /// early (hardware timeout shorter than requested, CRC error, or a
    /// transmission that pre-empted it).
    pub fn poll_recv(
        &mut self,
        rx_packet: Option<RxPacket>,
    ) -> Result<RecvPoll, Error<C::BusError>> {
        if self.rx == RxIntent::Off {
            return Ok(RecvPoll::NotReceiving);
        }

        let mut result = RecvPoll::Receiving;
        if self.hw_rx.is_some() {
            if let Some(ticks_ms) = self.irq.take() {
                let flags = self.chip.read_irq(true)?;
                let events = self.chip.classify_irq(flags);
                log::trace!("lora::poll_recv irq {flags:#06x} {events:?}");

                if events.rx_done {
                    let deliver = events.rx_ok || self.settings.rx_report_crc_errors;
                    if deliver {
                        let mut packet = rx_packet.unwrap_or_default();
                        self.chip.read_packet(&self.settings, &mut packet)?;
                        packet.ticks_ms = ticks_ms;
                        packet.valid_crc = events.rx_ok;
                        result = RecvPoll::Packet(packet);
                    } else {
                        log::debug!("lora::poll_recv dropping packet with CRC error");
                    }
                    if !self.rx_continuous {
                        self.end_hw_rx()?;
                        if deliver {
                            self.rx = RxIntent::Off;
                            self.rest = Rest::Idle;
                            self.ant.idle();
                        }
                    }
                } else if events.rx_timeout {
                    log::trace!("lora::poll_recv hardware timeout");
                    self.end_hw_rx()?;
                } else if flags != 0 {
                    log::warn!("lora::poll_recv unexpected irq flags {flags:#06x}");
                }
            }
        }

        self.check_recv()?;
        Ok(result)
    }

    /// Restarts the hardware receive if one is logically pending but the chip
    /// is idle. A pending deadline is only checked here.
    fn check_recv(&mut self) -> Result<bool, Error<C::BusError>> {
        if self.tx || self.hw_rx.is_some() {
            return Ok(false);
        }
        let timeout_ms = match self.rx {
            RxIntent::Off => return Ok(false),
            RxIntent::NoDeadline => None,
            RxIntent::Until(deadline) => {
                let left = ticks_diff(deadline, self.clock.now_ms());
                if left <= 0 {
                    log::debug!("lora::check_recv receive timed out");
                    self.rx = RxIntent::Off;
                    self.rest = Rest::Idle;
                    self.ant.idle();
                    self.irq.soft_irq();
                    return Ok(false);
                }
                Some(left as u32)
            }
        };
        log::debug!("lora::check_recv resuming receive, timeout {timeout_ms:?}");
        self.start_hw_rx(timeout_ms)
    }

    /// Loads a packet for transmission. A receive in progress is paused and
    /// resumes after the transmission completes.
    pub fn prepare_send(&mut self, packet: &[u8]) -> Result<(), Error<C::BusError>> {
        if packet.len() > MAX_PAYLOAD {
            return Err(Error::InvalidArgument("packet longer than 255 bytes"));
        }
        if self.tx {
            return Err(Error::InvalidArgument("transmission already in progress"));
        }
        self.chip.standby()?;
        self.end_hw_rx()?;
        self.chip.prepare_tx(&self.settings, packet)?;
        self.tx_prepared = true;
        log::trace!("lora::prepare_send {} bytes", packet.len());
        Ok(())
    }

    /// Starts transmitting the packet loaded by [`prepare_send`](Self::prepare_send).
    pub fn start_send(&mut self) -> Result<(), Error<C::BusError>> {
        if !self.tx_prepared {
            return Err(Error::InvalidArgument("no packet prepared"));
        }
        self.irq.clear();
        self.ant.tx(self.settings.tx_ant == Some(PaOutput::PaBoost));
        self.chip.start_tx(&self.settings)?;
        self.tx_prepared = false;
        self.tx = true;
        log::trace!("lora::start_send");
        Ok(())
    }

    /// Polls an in-progress transmission.
    pub fn poll_send(&mut self) -> Result<SendPoll, Error<C::BusError>> {
        if !self.tx {
            return Ok(SendPoll::NotSending);
        }
        let Some(ticks_ms) = self.irq.take() else {
            return Ok(SendPoll::Sending);
        };

        let flags = self.chip.read_irq(true)?;
        let events = self.chip.classify_irq(flags);
        log::trace!("lora::poll_send irq {flags:#06x} {events:?}");
        if !events.tx_done {
            log::warn!("lora::poll_send unexpected irq flags {flags:#06x}");
            return Ok(SendPoll::Sending);
        }

        self.tx = false;
        self.rest = Rest::Idle;
        self.ant.idle();
        self.check_recv()?;
        Ok(SendPoll::Done(ticks_ms))
    }
}
