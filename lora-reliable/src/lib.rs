//! Acknowledged delivery over a [`lora_modem::Modem`].
//!
//! A [`Sender`] transmits a sequenced request and waits for the matching
//! [`Ack`]; unanswered attempts are retried after a jittered, growing backoff
//! and the transmit power follows the signal strength the receiver reports.
//! A [`Receiver`] listens continuously, acknowledges every valid request a
//! fixed delay after it arrived and filters duplicates of retried requests.

#![cfg_attr(not(test), no_std)]

pub mod backoff;
pub mod message;
pub mod receiver;
pub mod sender;
#[cfg(test)]
mod testing;

pub use backoff::Backoff;
pub use message::{checksum, Ack, Request, ACK_LENGTH, MAX_MESSAGE_PAYLOAD};
pub use receiver::{Delivery, Receiver};
pub use sender::{ack_is_valid, DeliveryState, Sender, SenderConfig};

/// Time between a request arriving at the receiver and its ack going out.
pub const ACK_DELAY_MS: u32 = 100;
