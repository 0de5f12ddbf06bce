//! A `no_std`, chip-family independent LoRa modem core.
//!
//! [`Modem`] owns the receive/transmit state machine, interrupt bookkeeping,
//! configuration merging and time-on-air math. The register level work is
//! delegated to a [`Chip`] implementation such as the `sx126x` or `sx127x`
//! crates of this workspace.
//!
//! # Usage
//!
//! The platform's DIO interrupt handler calls [`IrqSignal::on_irq`]; everything
//! else happens from the main loop through [`Modem::poll_recv`] and
//! [`Modem::poll_send`], or the blocking [`Modem::send`] and [`Modem::recv`].

#![cfg_attr(not(test), no_std)]

pub mod airtime;
pub mod antenna;
pub mod chip;
pub mod clock;
pub mod config;
pub mod err;
pub mod irq;
pub mod modem;
pub mod packet;
mod sync;

pub use antenna::{AntennaSwitch, NoAntennaSwitch, PinAntennaSwitch};
pub use chip::{Chip, IrqEvents, RxRequest};
pub use clock::{ticks_add, ticks_diff, Clock};
pub use config::{Bandwidth, ModemConfig, PaOutput, Settings};
pub use err::{BusError, ConfigError, Error, PinError, SpiError};
pub use irq::IrqSignal;
pub use modem::{Modem, ModemState, RecvPoll, SendPoll, MAX_RX_TIMEOUT_MS};
pub use packet::{RxPacket, MAX_PAYLOAD};
