//! Interrupt handoff between the IRQ handler and the polling code.
//!
//! The handler only ever gets a `&IrqSignal`, never the bus, so it cannot
//! issue commands to the radio.

use core::cell::Cell;
use critical_section::Mutex;

/// Single-writer, single-reader cell holding the time of the last interrupt.
///
/// A newer interrupt overwrites an unconsumed older one.
pub struct IrqSignal {
    last_irq: Mutex<Cell<Option<u32>>>,
    callback: Mutex<Cell<Option<fn()>>>,
}

impl Default for IrqSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqSignal {
    /// Creates an empty signal. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            last_irq: Mutex::new(Cell::new(None)),
            callback: Mutex::new(Cell::new(None)),
        }
    }

    /// Records an interrupt. Call this from the DIO interrupt handler.
    pub fn on_irq(&self, now_ms: u32) {
        let callback = critical_section::with(|cs| {
            self.last_irq.borrow(cs).set(Some(now_ms));
            self.callback.borrow(cs).get()
        });
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Takes the pending timestamp, leaving the cell empty.
    pub fn take(&self) -> Option<u32> {
        critical_section::with(|cs| self.last_irq.borrow(cs).take())
    }

    /// True if an interrupt has been recorded and not yet consumed.
    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.last_irq.borrow(cs).get().is_some())
    }

    /// Drops any pending timestamp.
    pub fn clear(&self) {
        let _ = self.take();
    }

    /// Registers the function invoked after each interrupt (or `None`).
    pub fn set_callback(&self, callback: Option<fn()>) {
        critical_section::with(|cs| self.callback.borrow(cs).set(callback));
    }

    /// Wakes a waiter without a hardware interrupt, e.g. after a software timeout.
    pub(crate) fn soft_irq(&self) {
        let callback = critical_section::with(|cs| self.callback.borrow(cs).get());
        if let Some(callback) = callback {
            callback();
        }
    }
}
