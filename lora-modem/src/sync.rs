//! Blocking send/receive built on the polling interface.

use embedded_hal::delay::DelayNs;

use crate::antenna::AntennaSwitch;
use crate::chip::Chip;
use crate::clock::{ticks_add, ticks_diff, Clock};
use crate::err::Error;
use crate::modem::{Modem, RecvPoll, SendPoll, MAX_RX_TIMEOUT_MS};
use crate::packet::RxPacket;

/// Extra time allowed past the computed airtime before a send is abandoned.
const SEND_MARGIN_MS: u32 = 100;
/// Extra time allowed past a receive deadline if the chip never interrupts.
const RECV_MARGIN_MS: u32 = 1_000;
const POLL_INTERVAL_MS: u32 = 1;

impl<C, CLK, ANT> Modem<'_, C, CLK, ANT>
where
    C: Chip,
    CLK: Clock,
    ANT: AntennaSwitch,
{
    /// Transmits `packet` and waits for it to finish.
    ///
    /// With `tx_at_ms` the transmission starts no earlier than that tick
    /// count. Returns the tick count at which the transmission completed.
    pub fn send<D: DelayNs>(
        &mut self,
        packet: &[u8],
        tx_at_ms: Option<u32>,
        delay: &mut D,
    ) -> Result<u32, Error<C::BusError>> {
        self.prepare_send(packet)?;

        if let Some(tx_at) = tx_at_ms {
            let wait = ticks_diff(tx_at, self.now_ms());
            if wait > 0 {
                delay.delay_ms(wait as u32);
            }
        }

        self.start_send()?;
        let started = self.now_ms();
        let limit_ms = self.get_time_on_air_us(packet.len()) / 1_000 * 2 + SEND_MARGIN_MS;
        loop {
            match self.poll_send()? {
                SendPoll::Done(ticks_ms) => return Ok(ticks_ms),
                SendPoll::NotSending => return Ok(self.now_ms()),
                SendPoll::Sending => {}
            }
            if ticks_diff(self.now_ms(), started) > limit_ms as i32 {
                log::warn!("lora::send no tx done after {limit_ms} ms");
                self.standby()?;
                return Err(Error::HardwareTimeout);
            }
            delay.delay_ms(POLL_INTERVAL_MS);
        }
    }

    /// Receives a single packet, waiting at most `timeout_ms` (or forever).
    ///
    /// Returns `None` if the timeout expired. `rx_packet` is reused for the
    /// result if given.
    pub fn recv<D: DelayNs>(
        &mut self,
        timeout_ms: Option<u32>,
        rx_length: u8,
        rx_packet: Option<RxPacket>,
        delay: &mut D,
    ) -> Result<Option<RxPacket>, Error<C::BusError>> {
        self.start_recv(timeout_ms, false, rx_length)?;
        let give_up = timeout_ms.map(|ms| {
            let wait = ms.saturating_add(RECV_MARGIN_MS).min(MAX_RX_TIMEOUT_MS);
            ticks_add(self.now_ms(), wait)
        });
        let mut rx_packet = rx_packet;
        loop {
            let reuse = if self.irq_triggered() {
                rx_packet.take()
            } else {
                None
            };
            match self.poll_recv(reuse)? {
                RecvPoll::Packet(packet) => return Ok(Some(packet)),
                RecvPoll::NotReceiving => return Ok(None),
                RecvPoll::Receiving => {}
            }
            if let Some(give_up) = give_up {
                if ticks_diff(self.now_ms(), give_up) > 0 {
                    log::warn!("lora::recv radio never signalled the timeout");
                    self.standby()?;
                    return Ok(None);
                }
            }
            delay.delay_ms(POLL_INTERVAL_MS);
        }
    }
}
