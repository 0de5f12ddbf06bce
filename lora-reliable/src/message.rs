//! Wire format of requests and acknowledgements.
//!
//! All fields are little-endian.
//!
//! ```text
//! request: sender_id u16 | counter u8 | len u8 | payload [len] | checksum u8
//! ack:     receiver_id u16 | sender_id u16 | counter u8 | checksum u8 | rssi i8
//! ```
//!
//! A request's checksum is the low byte of the sum of every byte before it.
//! The ack echoes the checksum of the request it answers.

use heapless::Vec;
use lora_modem::MAX_PAYLOAD;

/// Bytes a request adds around its payload.
pub const REQUEST_OVERHEAD: usize = 5;
/// Longest payload that fits one packet.
pub const MAX_MESSAGE_PAYLOAD: usize = MAX_PAYLOAD - REQUEST_OVERHEAD;
/// Length of an encoded ack.
pub const ACK_LENGTH: usize = 7;

/// Low byte of the sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// A request as carried on the air.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request<'a> {
    pub sender_id: u16,
    pub counter: u8,
    pub payload: &'a [u8],
}

impl<'a> Request<'a> {
    /// Encodes the request, or `None` if the payload is too long.
    pub fn encode(&self) -> Option<Vec<u8, MAX_PAYLOAD>> {
        if self.payload.len() > MAX_MESSAGE_PAYLOAD {
            return None;
        }
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.sender_id.to_le_bytes()).ok()?;
        buf.push(self.counter).ok()?;
        buf.push(self.payload.len() as u8).ok()?;
        buf.extend_from_slice(self.payload).ok()?;
        let sum = checksum(&buf);
        buf.push(sum).ok()?;
        Some(buf)
    }

    /// Decodes `bytes`, returning the request and its checksum.
    ///
    /// Fails on a length mismatch or a bad checksum.
    pub fn decode(bytes: &'a [u8]) -> Option<(Self, u8)> {
        if bytes.len() < REQUEST_OVERHEAD {
            return None;
        }
        let len = bytes[3] as usize;
        if bytes.len() != REQUEST_OVERHEAD + len {
            return None;
        }
        let (body, sum) = bytes.split_at(bytes.len() - 1);
        if checksum(body) != sum[0] {
            return None;
        }
        let request = Request {
            sender_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            counter: bytes[2],
            payload: &bytes[4..4 + len],
        };
        Some((request, sum[0]))
    }
}

/// An acknowledgement of one request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub receiver_id: u16,
    pub sender_id: u16,
    pub counter: u8,
    /// Checksum of the acknowledged request.
    pub checksum: u8,
    /// Signal strength the receiver measured for the request, in dBm.
    pub rssi: i8,
}

impl Ack {
    pub fn encode(&self) -> [u8; ACK_LENGTH] {
        let r = self.receiver_id.to_le_bytes();
        let s = self.sender_id.to_le_bytes();
        [r[0], r[1], s[0], s[1], self.counter, self.checksum, self.rssi as u8]
    }

    /// Decodes an ack of exactly [`ACK_LENGTH`] bytes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; ACK_LENGTH] = bytes.try_into().ok()?;
        Some(Self {
            receiver_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            sender_id: u16::from_le_bytes([bytes[2], bytes[3]]),
            counter: bytes[4],
            checksum: bytes[5],
            rssi: bytes[6] as i8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_layout() {
        let request = Request {
            sender_id: 0x1234,
            counter: 7,
            payload: b"hi",
        };
        let bytes = request.encode().unwrap();
        let sum = (0x34u32 + 0x12 + 7 + 2 + b'h' as u32 + b'i' as u32) as u8;
        assert_eq!(&bytes[..], &[0x34, 0x12, 7, 2, b'h', b'i', sum]);

        let (decoded, checksum) = Request::decode(&bytes).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(checksum, sum);
    }

    #[test]
    fn test_any_mutation_breaks_checksum() {
        let bytes = Request {
            sender_id: 0xBEEF,
            counter: 200,
            payload: b"temperature=21.5",
        }
        .encode()
        .unwrap();
        // The length byte is covered by the length check instead.
        for i in (0..bytes.len() - 1).filter(|i| *i != 3) {
            let mut mutated = bytes.clone();
            mutated[i] ^= 0x01;
            assert!(Request::decode(&mutated).is_none(), "byte {i}");
        }
        let mut longer = bytes.clone();
        longer[3] += 1;
        assert!(Request::decode(&longer).is_none());
    }

    #[test]
    fn test_oversized_payload() {
        let payload = [0u8; MAX_MESSAGE_PAYLOAD + 1];
        let request = Request {
            sender_id: 1,
            counter: 0,
            payload: &payload,
        };
        assert!(request.encode().is_none());
        let request = Request {
            payload: &payload[..MAX_MESSAGE_PAYLOAD],
            ..request
        };
        assert_eq!(request.encode().unwrap().len(), MAX_PAYLOAD);
    }

    #[test]
    fn test_ack_layout() {
        let ack = Ack {
            receiver_id: 0x0102,
            sender_id: 0x0304,
            counter: 9,
            checksum: 0xAA,
            rssi: -87,
        };
        let bytes = ack.encode();
        assert_eq!(bytes, [0x02, 0x01, 0x04, 0x03, 9, 0xAA, (-87i8) as u8]);
        assert_eq!(Ack::decode(&bytes), Some(ack));
        assert_eq!(Ack::decode(&bytes[..6]), None);
    }
}
