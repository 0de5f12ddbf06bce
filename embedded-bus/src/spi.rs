//! A shared SPI bus guarded by a critical section.
//!
//! Several radios (or a radio and a display) may hang off one physical bus.
//! Each [`CriticalSectionDevice`] owns its chip select pin and holds the bus
//! for the whole transaction, so transactions of different devices never
//! interleave.

use core::cell::RefCell;
use core::fmt::Debug;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Error, ErrorKind, ErrorType, Operation, SpiBus, SpiDevice};

/// A critical-section based shared bus [`SpiDevice`] implementation.
pub struct CriticalSectionDevice<'a, BUS, CS, D> {
    bus: &'a Mutex<RefCell<BUS>>,
    cs: CS,
    delay: D,
}

impl<'a, BUS, CS, D> CriticalSectionDevice<'a, BUS, CS, D>
where
    CS: OutputPin,
{
    /// Creates a device on `bus` selected by `cs`. Deasserts `cs`.
    #[inline]
    pub fn new(
        bus: &'a Mutex<RefCell<BUS>>,
        mut cs: CS,
        delay: D,
    ) -> Result<Self, CS::Error> {
        cs.set_high()?;
        Ok(Self { bus, cs, delay })
    }
}

impl<BUS, CS, D> ErrorType for CriticalSectionDevice<'_, BUS, CS, D>
where
    BUS: ErrorType,
    CS: OutputPin,
{
    type Error = DeviceError<BUS::Error, CS::Error>;
}

impl<BUS, CS, D> SpiDevice<u8> for CriticalSectionDevice<'_, BUS, CS, D>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    /// Asserts CS, runs `operations` and deasserts CS, holding the bus
    /// throughout.
    #[inline]
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let result = critical_section::with(|cs| {
            let bus = &mut *self.bus.borrow_ref_mut(cs);
            transaction(operations, bus, &mut self.delay, &mut self.cs)
        });

        if let Err(err) = &result {
            log::warn!("Error communicating with the device: {err:?}");
        }

        result
    }
}

/// Runs `operations` on `bus` framed by `cs`.
///
/// CS is deasserted and the bus flushed even if an operation fails.
#[inline]
pub fn transaction<Word, BUS, CS, D>(
    operations: &mut [Operation<'_, Word>],
    bus: &mut BUS,
    delay: &mut D,
    cs: &mut CS,
) -> Result<(), DeviceError<BUS::Error, CS::Error>>
where
    BUS: SpiBus<Word> + ErrorType,
    CS: OutputPin,
    D: DelayNs,
    Word: Copy,
{
    cs.set_low().map_err(DeviceError::Cs)?;

    let op_res = operations
        .iter_mut()
        .try_for_each(|op| process_op(bus, delay, op));

    let flush_res = bus.flush();
    let cs_res = cs.set_high();

    op_res.map_err(DeviceError::Spi)?;
    flush_res.map_err(DeviceError::Spi)?;
    cs_res.map_err(DeviceError::Cs)?;

    Ok(())
}

/// Error of a [`CriticalSectionDevice`] transaction.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DeviceError<BUS, CS> {
    /// An inner SPI bus operation failed.
    Spi(BUS),
    /// Asserting or deasserting the CS pin failed.
    Cs(CS),
}

impl<BUS, CS> Error for DeviceError<BUS, CS>
where
    BUS: Error + Debug,
    CS: Debug,
{
    #[inline]
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Spi(e) => e.kind(),
            Self::Cs(_) => ErrorKind::ChipSelectFault,
        }
    }
}

fn process_op<BUS, D, Word>(
    bus: &mut BUS,
    delay: &mut D,
    op: &mut Operation<'_, Word>,
) -> Result<(), BUS::Error>
where
    BUS: SpiBus<Word> + ErrorType,
    D: DelayNs,
    Word: Copy,
{
    match op {
        Operation::Read(buf) => bus.read(buf),
        Operation::Write(buf) => bus.write(buf),
        Operation::Transfer(read, write) => bus.transfer(read, write),
        Operation::TransferInPlace(buf) => bus.transfer_in_place(buf),
        Operation::DelayNs(ns) => {
            bus.flush()?;
            delay.delay_ns(*ns);
            Ok(())
        }
    }
}
