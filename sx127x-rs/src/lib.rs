//! A blocking, `no_std` driver for the Semtech SX127x family of LoRa transceivers.
//!
//! Covers the SX1276, SX1277, SX1278 and SX1279 (and modules built on them
//! such as the RFM95) in LoRa mode. The register layer is built on the
//! `embedded-hal` 1.0 traits and [`lora_modem::Chip`] is implemented so the
//! chips can be driven by [`lora_modem::Modem`].
//!
//! These chips have no BUSY line: a mode change is complete once the
//! `RegOpMode` readback shows the requested mode.

#![cfg_attr(not(test), no_std)]

pub mod conf;
pub mod pa;
pub mod reg;

mod chip;
#[cfg(test)]
mod sim;
mod sx;
pub use sx::*;
