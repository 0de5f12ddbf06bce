//! Antenna switch control.
//!
//! The switch is driven only by the modem state machine so its position always
//! matches what the radio is doing.

use embedded_hal::digital::OutputPin;

/// An RF switch with idle, receive and transmit positions.
pub trait AntennaSwitch {
    /// No RF activity.
    fn idle(&mut self);
    /// Route the antenna to the receiver.
    fn rx(&mut self);
    /// Route the antenna to the transmitter. `tx_boost` selects the high power path.
    fn tx(&mut self, tx_boost: bool);
}

/// For boards whose switch is driven by the radio itself (or that have none).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAntennaSwitch;

impl AntennaSwitch for NoAntennaSwitch {
    fn idle(&mut self) {}
    fn rx(&mut self) {}
    fn tx(&mut self, _tx_boost: bool) {}
}

/// A switch with one enable pin per direction.
pub struct PinAntennaSwitch<TRX, TTX> {
    rx_pin: TRX,
    tx_pin: TTX,
}

impl<TRX, TTX, TPINERR> PinAntennaSwitch<TRX, TTX>
where
    TPINERR: core::fmt::Debug,
    TRX: OutputPin<Error = TPINERR>,
    TTX: OutputPin<Error = TPINERR>,
{
    /// Creates the switch and parks it in the idle position.
    pub fn new(rx_pin: TRX, tx_pin: TTX) -> Self {
        let mut switch = Self { rx_pin, tx_pin };
        switch.idle();
        switch
    }

    fn set(&mut self, rx: bool, tx: bool) {
        // Break before make.
        let result = if rx {
            self.tx_pin.set_low().and_then(|_| self.rx_pin.set_high())
        } else if tx {
            self.rx_pin.set_low().and_then(|_| self.tx_pin.set_high())
        } else {
            self.rx_pin.set_low().and_then(|_| self.tx_pin.set_low())
        };
        if let Err(err) = result {
            log::warn!("Error setting antenna switch: {err:?}");
        }
    }
}

impl<TRX, TTX, TPINERR> AntennaSwitch for PinAntennaSwitch<TRX, TTX>
where
    TPINERR: core::fmt::Debug,
    TRX: OutputPin<Error = TPINERR>,
    TTX: OutputPin<Error = TPINERR>,
{
    fn idle(&mut self) {
        self.set(false, false);
    }

    fn rx(&mut self) {
        self.set(true, false);
    }

    fn tx(&mut self, _tx_boost: bool) {
        self.set(false, true);
    }
}
