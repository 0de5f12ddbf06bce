//! Typed arguments and responses of the SX126x command set.

pub mod calib;
pub mod err;
pub mod init;
pub mod irq;
pub mod modulation;
pub mod packet;
pub mod rxtx;
pub mod status;
pub mod tcxo;

pub use calib::*;
pub use err::*;
pub use init::*;
pub use irq::*;
pub use modulation::*;
pub use packet::*;
pub use rxtx::*;
pub use status::*;
pub use tcxo::*;
