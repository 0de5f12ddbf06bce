//! A simulated radio link for exercising senders and receivers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use lora_modem::{
    Chip, Clock, ConfigError, Error, IrqEvents, IrqSignal, Modem, ModemConfig, NoAntennaSwitch,
    PaOutput, RxPacket, RxRequest, Settings,
};

use crate::message::{Ack, Request};
use crate::ACK_DELAY_MS;

const TX_DONE: u16 = 1 << 0;
const RX_DONE: u16 = 1 << 1;
const TIMEOUT: u16 = 1 << 2;

/// How the far end answers one transmitted packet.
pub enum Reply {
    Silence,
    /// A correct ack of the transmitted request.
    Ack { rssi: i8 },
    Raw(Vec<u8>),
}

#[derive(Default)]
struct Air {
    irq_flags: u16,
    /// Completed transmissions as (tick at tx done, bytes).
    sent: Vec<(u32, Vec<u8>)>,
    /// Packets on the air as (arrival tick, bytes, rssi).
    incoming: Vec<(u32, Vec<u8>, i16)>,
    replies: VecDeque<Reply>,
    reply_id: u16,
    received: (Vec<u8>, i16),
    prepared: Vec<u8>,
    transmitting: bool,
    receiving: bool,
    rx_deadline: Option<u32>,
    calibrations: usize,
}

impl Air {
    /// Advances the link to `now`. Returns true if an interrupt fired.
    fn step(&mut self, now: u32) -> bool {
        if self.irq_flags != 0 {
            return false;
        }
        if self.transmitting {
            self.transmitting = false;
            let packet = core::mem::take(&mut self.prepared);
            if let Some(reply) = self.replies.pop_front() {
                if let Some(bytes) = self.reply_to(&packet, reply) {
                    self.incoming.push((now + ACK_DELAY_MS, bytes, -80));
                }
            }
            self.sent.push((now, packet));
            self.irq_flags = TX_DONE;
            return true;
        }
        if !self.receiving {
            // Nobody listening.
            self.incoming.retain(|(at, ..)| *at > now);
            return false;
        }
        if let Some(pos) = self.incoming.iter().position(|(at, ..)| *at <= now) {
            let (_, bytes, rssi) = self.incoming.remove(pos);
            self.received = (bytes, rssi);
            self.irq_flags = RX_DONE;
            return true;
        }
        if self.rx_deadline.is_some_and(|deadline| now >= deadline) {
            self.receiving = false;
            self.rx_deadline = None;
            self.irq_flags = TIMEOUT;
            return true;
        }
        false
    }

    fn reply_to(&self, packet: &[u8], reply: Reply) -> Option<Vec<u8>> {
        match reply {
            Reply::Silence => None,
            Reply::Raw(bytes) => Some(bytes),
            Reply::Ack { rssi } => {
                let (request, checksum) = Request::decode(packet)?;
                let ack = Ack {
                    receiver_id: self.reply_id,
                    sender_id: request.sender_id,
                    counter: request.counter,
                    checksum,
                    rssi,
                };
                Some(ack.encode().to_vec())
            }
        }
    }
}

/// Chip driver backed by the simulated link.
pub struct Radio {
    air: Rc<RefCell<Air>>,
    now: Rc<Cell<u32>>,
}

impl Chip for Radio {
    type BusError = ();
    type PaSetting = i8;

    fn init(&mut self) -> Result<(), Error<()>> {
        Ok(())
    }

    fn validate(&self, settings: &Settings) -> Result<(), Error<()>> {
        self.map_output_power(settings.output_power, settings.tx_ant)?;
        Ok(())
    }

    fn configure(&mut self, _prev: Option<&Settings>, _next: &Settings) -> Result<(), Error<()>> {
        Ok(())
    }

    fn standby(&mut self) -> Result<(), Error<()>> {
        let mut air = self.air.borrow_mut();
        air.receiving = false;
        air.transmitting = false;
        air.rx_deadline = None;
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), Error<()>> {
        Ok(())
    }

    fn calibrate(&mut self) -> Result<(), Error<()>> {
        self.air.borrow_mut().calibrations += 1;
        Ok(())
    }

    fn calibrate_image(&mut self, _settings: &Settings) -> Result<(), Error<()>> {
        Ok(())
    }

    fn start_rx(&mut self, _settings: &Settings, request: RxRequest) -> Result<(), Error<()>> {
        let mut air = self.air.borrow_mut();
        air.receiving = true;
        air.rx_deadline = request.timeout_ms.map(|ms| self.now.get() + ms);
        Ok(())
    }

    fn finish_rx(&mut self, _timed: bool) -> Result<(), Error<()>> {
        self.air.borrow_mut().receiving = false;
        Ok(())
    }

    fn prepare_tx(&mut self, _settings: &Settings, packet: &[u8]) -> Result<(), Error<()>> {
        self.air.borrow_mut().prepared = packet.to_vec();
        Ok(())
    }

    fn start_tx(&mut self, _settings: &Settings) -> Result<(), Error<()>> {
        self.air.borrow_mut().transmitting = true;
        Ok(())
    }

    fn read_irq(&mut self, clear: bool) -> Result<u16, Error<()>> {
        let mut air = self.air.borrow_mut();
        let flags = air.irq_flags;
        if clear {
            air.irq_flags = 0;
        }
        Ok(flags)
    }

    fn classify_irq(&self, flags: u16) -> IrqEvents {
        IrqEvents {
            tx_done: flags & TX_DONE != 0,
            rx_done: flags & RX_DONE != 0,
            rx_timeout: flags & TIMEOUT != 0,
            rx_ok: flags & RX_DONE != 0,
        }
    }

    fn read_packet(&mut self, _settings: &Settings, packet: &mut RxPacket) -> Result<(), Error<()>> {
        let air = self.air.borrow();
        let (bytes, rssi) = &air.received;
        packet.payload_buffer(bytes.len()).copy_from_slice(bytes);
        packet.rssi = *rssi;
        packet.snr = 24;
        Ok(())
    }

    fn map_output_power(&self, dbm: i8, _output: Option<PaOutput>) -> Result<i8, Error<()>> {
        if (-9..=22).contains(&dbm) {
            Ok(dbm)
        } else {
            Err(Error::Config(ConfigError::OutputPower(dbm)))
        }
    }
}

pub struct SimClock(Rc<Cell<u32>>);

impl Clock for SimClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

/// Advances the simulated time, letting the link raise interrupts.
pub struct SimDelay<'a> {
    air: Rc<RefCell<Air>>,
    now: Rc<Cell<u32>>,
    irq: &'a IrqSignal,
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        let now = self.now.get() + ns.div_ceil(1_000_000);
        self.now.set(now);
        if self.air.borrow_mut().step(now) {
            self.irq.on_irq(now);
        }
    }
}

pub struct Harness {
    air: Rc<RefCell<Air>>,
    now: Rc<Cell<u32>>,
}

impl Harness {
    /// A link whose far end acks as `reply_id`. Time starts at 1000 ms.
    pub fn new(reply_id: u16) -> Self {
        let air = Air {
            reply_id,
            ..Air::default()
        };
        Self {
            air: Rc::new(RefCell::new(air)),
            now: Rc::new(Cell::new(1_000)),
        }
    }

    pub fn modem<'a>(&self, irq: &'a IrqSignal) -> Modem<'a, Radio, SimClock, NoAntennaSwitch> {
        let radio = Radio {
            air: self.air.clone(),
            now: self.now.clone(),
        };
        Modem::new(
            radio,
            SimClock(self.now.clone()),
            NoAntennaSwitch,
            irq,
            &ModemConfig::default(),
        )
        .unwrap()
    }

    pub fn delay<'a>(&self, irq: &'a IrqSignal) -> SimDelay<'a> {
        SimDelay {
            air: self.air.clone(),
            now: self.now.clone(),
            irq,
        }
    }

    /// Queues the answer to the next transmitted packet.
    pub fn reply(&self, reply: Reply) {
        self.air.borrow_mut().replies.push_back(reply);
    }

    /// Puts a packet on the air at tick `at`.
    pub fn incoming(&self, at: u32, bytes: Vec<u8>, rssi: i16) {
        self.air.borrow_mut().incoming.push((at, bytes, rssi));
    }

    pub fn sent(&self) -> Vec<(u32, Vec<u8>)> {
        self.air.borrow().sent.clone()
    }

    pub fn calibrations(&self) -> usize {
        self.air.borrow().calibrations
    }

    pub fn receiving(&self) -> bool {
        self.air.borrow().receiving
    }
}
