#![cfg_attr(not(test), no_std)]
#![doc = "Blocking shared bus implementations for embedded-hal."]

pub mod spi;
