//! The sending side: retries, backoff and adaptive transmit power.

use embedded_hal::delay::DelayNs;
use lora_modem::{AntennaSwitch, Chip, Clock, Error, Modem, ModemConfig};
use rand_core::RngCore;

use crate::backoff::Backoff;
use crate::message::{Ack, Request, ACK_LENGTH};
use crate::ACK_DELAY_MS;

/// Sender parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SenderConfig {
    pub sender_id: u16,
    /// Receiver whose acks are accepted.
    pub receiver_id: u16,
    pub max_attempts: u8,
    pub backoff: Backoff,
    /// Lowest output power adaptation may choose, in dBm.
    pub min_power: i8,
    /// Highest output power adaptation may choose, in dBm. Levels above
    /// what the chip can produce are skipped and the power left unchanged.
    pub max_power: i8,
    /// Acks reporting more than this RSSI lower the power by 1 dBm.
    pub rssi_high: i8,
    /// Acks reporting less than this RSSI raise the power by 1 dBm.
    pub rssi_low: i8,
    /// Power increase after a delivery fails completely, in dB.
    pub fail_penalty: i8,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            sender_id: 0,
            receiver_id: 0,
            max_attempts: 5,
            backoff: Backoff::default(),
            min_power: 2,
            max_power: 20,
            rssi_high: -60,
            rssi_low: -100,
            fail_penalty: 3,
        }
    }
}

impl SenderConfig {
    /// Power to use after an ack reporting `rssi` at `power` dBm.
    pub fn adapt_power(&self, power: i8, rssi: i8) -> i8 {
        let next = if rssi > self.rssi_high {
            power.saturating_sub(1)
        } else if rssi < self.rssi_low {
            power.saturating_add(1)
        } else {
            power
        };
        self.clamp_power(next)
    }

    /// Power to use after a failed delivery at `power` dBm.
    pub fn penalize_power(&self, power: i8) -> i8 {
        self.clamp_power(power.saturating_add(self.fail_penalty))
    }

    fn clamp_power(&self, power: i8) -> i8 {
        power.clamp(self.min_power, self.max_power)
    }
}

/// Progress of the current (or last) delivery.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeliveryState {
    Idle,
    /// Transmitting attempt n.
    Sending(u8),
    /// Listening for the ack of attempt n.
    WaitingForAck(u8),
    /// Waiting to retry after attempt n went unanswered.
    Backoff(u8),
    Success,
    /// Every attempt went unanswered.
    Failed,
}

/// Checks a received packet against the ack `expected` for the request just
/// sent. `expected.rssi` is ignored.
///
/// Returns the RSSI the receiver reported if the packet has exactly the ack
/// length and every echoed field matches.
pub fn ack_is_valid(payload: &[u8], expected: &Ack) -> Option<i8> {
    let ack = Ack::decode(payload)?;
    let matches = ack.receiver_id == expected.receiver_id
        && ack.sender_id == expected.sender_id
        && ack.counter == expected.counter
        && ack.checksum == expected.checksum;
    matches.then_some(ack.rssi)
}

/// Sends requests and waits for their acks.
pub struct Sender<'a, C, CLK, ANT, R> {
    modem: Modem<'a, C, CLK, ANT>,
    rng: R,
    config: SenderConfig,
    counter: u8,
    state: DeliveryState,
    last_attempts: u8,
}

impl<'a, C, CLK, ANT, R> Sender<'a, C, CLK, ANT, R>
where
    C: Chip,
    CLK: Clock,
    ANT: AntennaSwitch,
    R: RngCore,
{
    pub fn new(modem: Modem<'a, C, CLK, ANT>, rng: R, config: SenderConfig) -> Self {
        Self {
            modem,
            rng,
            config,
            counter: 0,
            state: DeliveryState::Idle,
            last_attempts: 0,
        }
    }

    pub fn modem(&mut self) -> &mut Modem<'a, C, CLK, ANT> {
        &mut self.modem
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    /// Attempts used by the last delivery.
    pub fn last_attempts(&self) -> u8 {
        self.last_attempts
    }

    /// Counter of the last request sent.
    pub fn counter(&self) -> u8 {
        self.counter
    }

    /// Current output power in dBm.
    pub fn output_power(&self) -> i8 {
        self.modem.settings().output_power
    }

    /// Delivers `payload`, retrying until acknowledged or out of attempts.
    ///
    /// Returns whether an ack arrived. Radio errors abort the delivery and
    /// are returned unchanged.
    pub fn send<D: DelayNs>(
        &mut self,
        payload: &[u8],
        delay: &mut D,
    ) -> Result<bool, Error<C::BusError>> {
        let counter = self.counter.wrapping_add(1);
        let request = Request {
            sender_id: self.config.sender_id,
            counter,
            payload,
        };
        let Some(packet) = request.encode() else {
            return Err(Error::InvalidArgument("payload too long"));
        };
        self.counter = counter;
        let expected = Ack {
            receiver_id: self.config.receiver_id,
            sender_id: self.config.sender_id,
            counter,
            checksum: packet[packet.len() - 1],
            rssi: 0,
        };
        let ack_window_ms =
            self.modem.get_time_on_air_us(ACK_LENGTH) / 1_000 + 2 * ACK_DELAY_MS;

        for attempt in 1..=self.config.max_attempts {
            self.state = DeliveryState::Sending(attempt);
            self.last_attempts = attempt;
            self.modem.send(&packet, None, delay)?;

            self.state = DeliveryState::WaitingForAck(attempt);
            let reply = self
                .modem
                .recv(Some(ack_window_ms), ACK_LENGTH as u8, None, delay)?;
            let rssi = reply
                .filter(|packet| packet.valid_crc)
                .and_then(|packet| ack_is_valid(packet.payload(), &expected));
            if let Some(rssi) = rssi {
                log::debug!(
                    "reliable::send counter {counter} acked on attempt {attempt}, rssi {rssi}"
                );
                self.state = DeliveryState::Success;
                let power = self.config.adapt_power(self.output_power(), rssi);
                self.set_power(power)?;
                return Ok(true);
            }

            if attempt < self.config.max_attempts {
                self.state = DeliveryState::Backoff(attempt);
                let wait_ms = self.config.backoff.interval(attempt, &mut self.rng);
                log::trace!("reliable::send no ack, retrying in {wait_ms} ms");
                delay.delay_ms(wait_ms);
            }
        }

        log::warn!(
            "reliable::send counter {counter} failed after {} attempts",
            self.config.max_attempts
        );
        self.state = DeliveryState::Failed;
        let power = self.config.penalize_power(self.output_power());
        self.set_power(power)?;
        self.modem.calibrate()?;
        Ok(false)
    }

    fn set_power(&mut self, dbm: i8) -> Result<(), Error<C::BusError>> {
        if dbm == self.output_power() {
            return Ok(());
        }
        let tx_ant = self.modem.settings().tx_ant;
        if self.modem.chip().map_output_power(dbm, tx_ant).is_err() {
            log::debug!("reliable::send {dbm} dBm not supported, keeping power");
            return Ok(());
        }
        log::debug!("reliable::send output power {dbm} dBm");
        self.modem
            .configure(&ModemConfig::default().set_output_power(dbm))
    }
}
