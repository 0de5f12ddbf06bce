//! A simulated SX127x register file on the other end of a fake SPI device.

use core::convert::Infallible;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};

use crate::conf::Config;
use crate::SX127x;

const FIFO: usize = 0x00;
const OP_MODE: usize = 0x01;
const FIFO_ADDR_PTR: usize = 0x0D;
const IRQ_FLAGS: usize = 0x12;
const IMAGE_CAL: usize = 0x3B;

pub struct SimState {
    pub regs: [u8; 0x80],
    pub fifo: [u8; 256],
    /// Register writes as (address, data), in order.
    pub writes: Vec<(u8, Vec<u8>)>,
    /// Reads of `RegOpMode` that still return the previous mode.
    pub mode_lag: usize,
    /// `RegOpMode` ignores writes.
    pub mode_stuck: bool,
    pub op_mode_reads: usize,
    pub image_cals: usize,
    pending_mode: Option<u8>,
}

impl Default for SimState {
    fn default() -> Self {
        let mut regs = [0u8; 0x80];
        regs[OP_MODE] = 0x09;
        regs[0x42] = 0x12;
        regs[0x33] = 0x27;
        Self {
            regs,
            fifo: [0; 256],
            writes: Vec::new(),
            mode_lag: 0,
            mode_stuck: false,
            op_mode_reads: 0,
            image_cals: 0,
            pending_mode: None,
        }
    }
}

impl SimState {
    /// Data of the last write to `addr`.
    pub fn last_write(&self, addr: u8) -> Option<&[u8]> {
        self.writes
            .iter()
            .rev()
            .find(|(a, _)| *a == addr)
            .map(|(_, data)| data.as_slice())
    }

    /// Addresses written, in order.
    pub fn written(&self) -> Vec<u8> {
        self.writes.iter().map(|(addr, _)| *addr).collect()
    }

    fn write(&mut self, addr: usize, data: &[u8]) {
        self.writes.push((addr as u8, data.to_vec()));
        for (i, b) in data.iter().enumerate() {
            match addr {
                FIFO => {
                    let ptr = self.regs[FIFO_ADDR_PTR];
                    self.fifo[ptr as usize] = *b;
                    self.regs[FIFO_ADDR_PTR] = ptr.wrapping_add(1);
                }
                OP_MODE if self.mode_stuck => {}
                OP_MODE if self.mode_lag > 0 => self.pending_mode = Some(*b),
                IRQ_FLAGS => self.regs[IRQ_FLAGS] &= !*b,
                IMAGE_CAL if self.regs[OP_MODE] & 0x80 == 0 && *b & 0x40 != 0 => {
                    self.image_cals += 1;
                    self.regs[IMAGE_CAL] = *b & !0x60;
                }
                _ => self.regs[(addr + i) & 0x7F] = *b,
            }
        }
    }

    fn read(&mut self, addr: usize, out: &mut [u8]) {
        for (i, b) in out.iter_mut().enumerate() {
            *b = match addr {
                FIFO => {
                    let ptr = self.regs[FIFO_ADDR_PTR];
                    self.regs[FIFO_ADDR_PTR] = ptr.wrapping_add(1);
                    self.fifo[ptr as usize]
                }
                OP_MODE => {
                    self.op_mode_reads += 1;
                    if self.mode_lag > 0 {
                        self.mode_lag -= 1;
                    } else if let Some(mode) = self.pending_mode.take() {
                        self.regs[OP_MODE] = mode;
                    }
                    self.regs[OP_MODE]
                }
                _ => self.regs[(addr + i) & 0x7F],
            };
        }
    }
}

#[derive(Clone, Default)]
pub struct Sim {
    state: Rc<RefCell<SimState>>,
}

impl Sim {
    pub fn state(&self) -> Ref<'_, SimState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, SimState> {
        self.state.borrow_mut()
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.state().regs[addr as usize]
    }

    /// Raises interrupt flags as the radio would.
    pub fn raise(&self, flags: u8) {
        self.state_mut().regs[IRQ_FLAGS] |= flags;
    }
}

pub struct FakeSpi(Rc<RefCell<SimState>>);

impl ErrorType for FakeSpi {
    type Error = Infallible;
}

impl SpiDevice for FakeSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let mut state = self.0.borrow_mut();
        let mut addr = None;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(buf) => match addr {
                    None => addr = buf.first().copied(),
                    Some(a) if a & 0x80 != 0 => state.write((a & 0x7F) as usize, buf),
                    Some(_) => {}
                },
                Operation::Read(buf) => {
                    if let Some(a) = addr {
                        state.read((a & 0x7F) as usize, buf);
                    }
                }
                Operation::Transfer(_, _)
                | Operation::TransferInPlace(_)
                | Operation::DelayNs(_) => {}
            }
        }
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

pub type SimDriver = SX127x<FakeSpi, FakeReset, NoDelay>;

pub fn driver(conf: Config) -> (SimDriver, Sim) {
    let sim = Sim::default();
    let sx = SX127x::new(FakeSpi(sim.state.clone()), FakeReset, NoDelay, conf);
    (sx, sim)
}
