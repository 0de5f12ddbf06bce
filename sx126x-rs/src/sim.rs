//! A simulated SX126x on the other end of a fake SPI device.

use core::convert::Infallible;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};

use crate::conf::Config;
use crate::SX126x;

pub struct SimState {
    pub regs: HashMap<u16, u8>,
    pub buffer: [u8; 256],
    pub irq: u16,
    pub rx_buffer_status: [u8; 2],
    pub packet_status: [u8; 3],
    pub status: u8,
    pub device_errors: u16,
    /// Bytes written per transaction, wake pulses excluded.
    pub commands: Vec<Vec<u8>>,
    pub wake_pulses: usize,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            regs: HashMap::new(),
            buffer: [0; 256],
            irq: 0,
            rx_buffer_status: [0; 2],
            packet_status: [0; 3],
            status: 0x2 << 4,
            device_errors: 0,
            commands: Vec::new(),
            wake_pulses: 0,
        }
    }
}

impl SimState {
    pub fn opcodes(&self) -> Vec<u8> {
        self.commands.iter().map(|c| c[0]).collect()
    }

    /// The last frame sent with `opcode`.
    pub fn last(&self, opcode: u8) -> Option<&Vec<u8>> {
        self.commands.iter().rev().find(|c| c[0] == opcode)
    }

    fn respond(&self, header: &[u8], out: &mut [u8]) {
        match header[0] {
            0x12 => out.copy_from_slice(&self.irq.to_be_bytes()),
            0x13 => out.copy_from_slice(&self.rx_buffer_status),
            0x14 => out.copy_from_slice(&self.packet_status),
            0x17 => out.copy_from_slice(&self.device_errors.to_be_bytes()),
            0x1D => {
                let addr = u16::from_be_bytes([header[1], header[2]]);
                for (i, b) in out.iter_mut().enumerate() {
                    *b = self.regs.get(&(addr + i as u16)).copied().unwrap_or(0);
                }
            }
            0x1E => {
                let offset = header[1] as usize;
                for (i, b) in out.iter_mut().enumerate() {
                    *b = self.buffer[(offset + i) % 256];
                }
            }
            _ => out.fill(0),
        }
    }

    fn apply(&mut self, frame: &[u8]) {
        match frame[0] {
            0x0D => {
                let addr = u16::from_be_bytes([frame[1], frame[2]]);
                for (i, b) in frame[3..].iter().enumerate() {
                    self.regs.insert(addr + i as u16, *b);
                }
            }
            0x0E => {
                let offset = frame[1] as usize;
                for (i, b) in frame[2..].iter().enumerate() {
                    self.buffer[(offset + i) % 256] = *b;
                }
            }
            0x02 => {
                let mask = u16::from_be_bytes([frame[1], frame[2]]);
                self.irq &= !mask;
            }
            0x07 => self.device_errors = 0,
            _ => {}
        }
    }
}

#[derive(Clone, Default)]
pub struct Sim {
    state: Rc<RefCell<SimState>>,
    busy: Rc<Cell<bool>>,
}

impl Sim {
    pub fn state(&self) -> Ref<'_, SimState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, SimState> {
        self.state.borrow_mut()
    }

    pub fn reg(&self, addr: u16) -> u8 {
        self.state().regs.get(&addr).copied().unwrap_or(0)
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.set(busy);
    }
}

pub struct FakeSpi(Rc<RefCell<SimState>>);

impl ErrorType for FakeSpi {
    type Error = Infallible;
}

impl SpiDevice for FakeSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let mut state = self.0.borrow_mut();
        let mut written = Vec::new();
        for op in operations.iter_mut() {
            match op {
                Operation::TransferInPlace(buf) => {
                    written.extend_from_slice(buf);
                    buf.fill(state.status);
                }
                Operation::Write(buf) => written.extend_from_slice(buf),
                Operation::Read(buf) => state.respond(&written, buf),
                Operation::Transfer(read, write) => {
                    written.extend_from_slice(write);
                    read.fill(state.status);
                }
                Operation::DelayNs(_) => {}
            }
        }
        if written.is_empty() {
            state.wake_pulses += 1;
        } else {
            state.apply(&written);
            state.commands.push(written);
        }
        Ok(())
    }
}

pub struct FakeBusy(Rc<Cell<bool>>);

impl PinErrorType for FakeBusy {
    type Error = Infallible;
}

impl InputPin for FakeBusy {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
}

/// A BUSY pin that can never be read.
pub struct FaultyBusy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl PinErrorType for FaultyBusy {
    type Error = PinFault;
}

impl InputPin for FaultyBusy {
    fn is_high(&mut self) -> Result<bool, PinFault> {
        Err(PinFault)
    }

    fn is_low(&mut self) -> Result<bool, PinFault> {
        Err(PinFault)
    }
}

/// A reset pin sharing [`FaultyBusy`]'s error type.
pub struct PlainReset;

impl PinErrorType for PlainReset {
    type Error = PinFault;
}

impl OutputPin for PlainReset {
    fn set_low(&mut self) -> Result<(), PinFault> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        Ok(())
    }
}

pub struct FakeReset;

impl PinErrorType for FakeReset {
    type Error = Infallible;
}

impl OutputPin for FakeReset {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

pub type SimDriver = SX126x<FakeSpi, FakeReset, FakeBusy, NoDelay>;

pub fn driver(conf: Config) -> (SimDriver, Sim) {
    let sim = Sim::default();
    let sx = SX126x::new(
        FakeSpi(sim.state.clone()),
        (FakeReset, FakeBusy(sim.busy.clone())),
        NoDelay,
        conf,
    );
    (sx, sim)
}

pub fn driver_with_faulty_busy(
    conf: Config,
) -> (SX126x<FakeSpi, PlainReset, FaultyBusy, NoDelay>, Sim) {
    let sim = Sim::default();
    let sx = SX126x::new(
        FakeSpi(sim.state.clone()),
        (PlainReset, FaultyBusy),
        NoDelay,
        conf,
    );
    (sx, sim)
}
