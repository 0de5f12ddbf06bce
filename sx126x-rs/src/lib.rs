//! A blocking, `no_std` driver for the Semtech SX126x family of LoRa transceivers.
//!
//! This crate provides the command layer for the SX1261 and SX1262 chips on
//! top of the `embedded-hal` 1.0 traits, and implements
//! [`lora_modem::Chip`] so the chips can be driven by [`lora_modem::Modem`].
//!
//! The main entry point is the `SX126x` struct, which takes an SPI device,
//! the NRESET and BUSY pins and a delay provider.

#![cfg_attr(not(test), no_std)]

pub mod conf;
pub mod op;
pub mod pa;
pub mod reg;

mod chip;
#[cfg(test)]
mod sim;
mod sx;
pub use sx::*;
