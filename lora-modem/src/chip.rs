//! The capability trait a chip family implements to be driven by [`Modem`](crate::Modem).

use core::fmt::Debug;

use crate::airtime::SymbolOffsets;
use crate::config::{PaOutput, Settings};
use crate::err::Error;
use crate::packet::RxPacket;

/// Parameters of a hardware receive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RxRequest {
    /// Hardware timeout; `None` receives until a packet (or forever if continuous).
    pub timeout_ms: Option<u32>,
    /// Keep receiving after each packet.
    pub continuous: bool,
    /// Expected payload length, used in implicit header mode.
    pub rx_length: u8,
}

/// Family-agnostic reading of the chip's interrupt flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IrqEvents {
    /// Transmission finished.
    pub tx_done: bool,
    /// A packet was received (valid or not).
    pub rx_done: bool,
    /// The hardware receive timeout expired.
    pub rx_timeout: bool,
    /// The received packet passed the family's integrity checks.
    pub rx_ok: bool,
}

/// Hooks a chip family provides to the modem state machine.
///
/// Implementations own the bus and all chip bookkeeping (sleep state, scratch
/// buffers, calibration). They never touch the modem's receive/transmit state.
pub trait Chip {
    /// Transport error of the bus and pins.
    type BusError: Debug;
    /// Concrete power amplifier register values.
    type PaSetting: Copy + Debug;

    /// Resets the chip and puts it into LoRa standby.
    fn init(&mut self) -> Result<(), Error<Self::BusError>>;

    /// Checks family limits on fully merged settings, without bus traffic.
    fn validate(&self, settings: &Settings) -> Result<(), Error<Self::BusError>>;

    /// Writes `next` to the chip. `prev` is `None` on the first call.
    fn configure(
        &mut self,
        prev: Option<&Settings>,
        next: &Settings,
    ) -> Result<(), Error<Self::BusError>>;

    /// Enters standby, aborting any receive or transmit.
    fn standby(&mut self) -> Result<(), Error<Self::BusError>>;

    /// Enters low power sleep. The next command wakes the chip.
    fn sleep(&mut self) -> Result<(), Error<Self::BusError>>;

    /// Runs the chip's block calibration.
    fn calibrate(&mut self) -> Result<(), Error<Self::BusError>>;

    /// Calibrates image rejection for the configured frequency.
    fn calibrate_image(&mut self, settings: &Settings) -> Result<(), Error<Self::BusError>>;

    /// Programs and starts a hardware receive. The chip is already in standby.
    fn start_rx(
        &mut self,
        settings: &Settings,
        request: RxRequest,
    ) -> Result<(), Error<Self::BusError>>;

    /// Called when a hardware receive ends. `timed` is true if it was started
    /// with a timeout.
    fn finish_rx(&mut self, _timed: bool) -> Result<(), Error<Self::BusError>> {
        Ok(())
    }

    /// Loads `packet` into the chip. The chip is already in standby.
    fn prepare_tx(
        &mut self,
        settings: &Settings,
        packet: &[u8],
    ) -> Result<(), Error<Self::BusError>>;

    /// Starts transmitting the prepared packet.
    fn start_tx(&mut self, settings: &Settings) -> Result<(), Error<Self::BusError>>;

    /// Reads the raw interrupt flags, clearing them if `clear` is set.
    fn read_irq(&mut self, clear: bool) -> Result<u16, Error<Self::BusError>>;

    /// Decodes raw interrupt flags.
    fn classify_irq(&self, flags: u16) -> IrqEvents;

    /// Reads the last received packet and its signal quality into `packet`.
    fn read_packet(
        &mut self,
        settings: &Settings,
        packet: &mut RxPacket,
    ) -> Result<(), Error<Self::BusError>>;

    /// Maps an output power and amplifier path to register values.
    fn map_output_power(
        &self,
        dbm: i8,
        output: Option<PaOutput>,
    ) -> Result<Self::PaSetting, Error<Self::BusError>>;

    /// Corrections to the time-on-air symbol count.
    fn symbol_offsets(&self, _settings: &Settings) -> SymbolOffsets {
        SymbolOffsets::default()
    }
}
