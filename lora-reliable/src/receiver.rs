//! The receiving side: acknowledgement and duplicate filtering.

use embedded_hal::delay::DelayNs;
use heapless::{FnvIndexMap, Vec};
use lora_modem::{ticks_add, AntennaSwitch, Chip, Clock, Error, Modem, RecvPoll};

use crate::message::{Ack, Request, MAX_MESSAGE_PAYLOAD};
use crate::ACK_DELAY_MS;

/// A request delivered to the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub sender_id: u16,
    pub counter: u8,
    pub payload: Vec<u8, MAX_MESSAGE_PAYLOAD>,
    /// Signal strength of the request in dBm.
    pub rssi: i16,
    /// Signal to noise ratio in units of 0.25 dB.
    pub snr: i16,
}

/// Listens for requests, acks them and drops retransmissions.
///
/// Remembers the last counter of up to `N` senders (`N` a power of two).
pub struct Receiver<'a, C, CLK, ANT, const N: usize = 16> {
    modem: Modem<'a, C, CLK, ANT>,
    receiver_id: u16,
    last_counters: FnvIndexMap<u16, u8, N>,
    listening: bool,
}

impl<'a, C, CLK, ANT, const N: usize> Receiver<'a, C, CLK, ANT, N>
where
    C: Chip,
    CLK: Clock,
    ANT: AntennaSwitch,
{
    pub fn new(modem: Modem<'a, C, CLK, ANT>, receiver_id: u16) -> Self {
        Self {
            modem,
            receiver_id,
            last_counters: FnvIndexMap::new(),
            listening: false,
        }
    }

    pub fn modem(&mut self) -> &mut Modem<'a, C, CLK, ANT> {
        &mut self.modem
    }

    /// Starts continuous reception.
    pub fn listen(&mut self) -> Result<(), Error<C::BusError>> {
        self.modem.start_recv(None, true, 0xFF)?;
        self.listening = true;
        Ok(())
    }

    /// Polls for a request, acknowledging it if one arrived.
    ///
    /// Returns the request unless it repeats the last counter seen from its
    /// sender; repeats are acked again since the first ack was evidently lost.
    pub fn poll<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<Option<Delivery>, Error<C::BusError>> {
        if !self.listening {
            self.listen()?;
        }
        let RecvPoll::Packet(packet) = self.modem.poll_recv(None)? else {
            return Ok(None);
        };
        let Some((request, checksum)) = Request::decode(packet.payload()) else {
            log::debug!(
                "reliable::poll dropping malformed packet of {} bytes",
                packet.len()
            );
            return Ok(None);
        };

        let ack = Ack {
            receiver_id: self.receiver_id,
            sender_id: request.sender_id,
            counter: request.counter,
            checksum,
            rssi: packet.rssi.clamp(i8::MIN as i16, i8::MAX as i16) as i8,
        };
        let tx_at = ticks_add(packet.ticks_ms, ACK_DELAY_MS);
        self.modem.send(&ack.encode(), Some(tx_at), delay)?;

        if self.last_counters.get(&request.sender_id) == Some(&request.counter) {
            log::debug!(
                "reliable::poll duplicate {} from {:#06x}, acked again",
                request.counter,
                request.sender_id
            );
            return Ok(None);
        }
        self.remember(request.sender_id, request.counter);

        let mut payload = Vec::new();
        // Cannot fail: decode bounds the payload length.
        let _ = payload.extend_from_slice(request.payload);
        Ok(Some(Delivery {
            sender_id: request.sender_id,
            counter: request.counter,
            payload,
            rssi: packet.rssi,
            snr: packet.snr,
        }))
    }

    fn remember(&mut self, sender_id: u16, counter: u8) {
        if self.last_counters.len() == N && !self.last_counters.contains_key(&sender_id) {
            if let Some(evicted) = self.last_counters.keys().next().copied() {
                self.last_counters.remove(&evicted);
            }
        }
        let _ = self.last_counters.insert(sender_id, counter);
    }
}
