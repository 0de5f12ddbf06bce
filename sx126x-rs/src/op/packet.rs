//! Packet type and LoRa packet parameters.

use lora_modem::Settings;

/// The packet type used by the modem.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PacketType {
    /// GFSK packet type.
    GFSK = 0x00,
    /// LoRa packet type.
    LoRa = 0x01,
}

/// A container for the nine `SetPacketParams` argument bytes.
pub struct PacketParams {
    inner: [u8; 9],
}

impl From<PacketParams> for [u8; 9] {
    fn from(val: PacketParams) -> Self {
        val.inner
    }
}

/// LoRa header type.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoRaHeaderType {
    /// Variable length packet (explicit header).
    VarLen = 0x00,
    /// Fixed length packet (implicit header).
    FixedLen = 0x01,
}

/// LoRa CRC type.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoRaCrcType {
    /// CRC disabled.
    CrcOff = 0x00,
    /// CRC enabled.
    CrcOn = 0x01,
}

/// LoRa IQ setup.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoRaInvertIq {
    /// Standard IQ setup.
    Standard = 0x00,
    /// Inverted IQ setup.
    Inverted = 0x01,
}

impl From<bool> for LoRaInvertIq {
    fn from(inverted: bool) -> Self {
        if inverted {
            Self::Inverted
        } else {
            Self::Standard
        }
    }
}

/// A builder for LoRa packet parameters.
#[derive(Copy, Clone, Debug)]
pub struct LoRaPacketParams {
    /// Preamble length in number of symbols.
    pub preamble_len: u16,
    /// Header type (variable or fixed length).
    pub header_type: LoRaHeaderType,
    /// Payload length; the maximum accepted length in explicit header RX.
    pub payload_len: u8,
    /// CRC type (on or off).
    pub crc_type: LoRaCrcType,
    /// Invert IQ setting.
    pub invert_iq: LoRaInvertIq,
}

impl From<LoRaPacketParams> for PacketParams {
    fn from(val: LoRaPacketParams) -> Self {
        let preamble_len = val.preamble_len.to_be_bytes();

        PacketParams {
            inner: [
                preamble_len[0],
                preamble_len[1],
                val.header_type as u8,
                val.payload_len,
                val.crc_type as u8,
                val.invert_iq as u8,
                0x00,
                0x00,
                0x00,
            ],
        }
    }
}

impl Default for LoRaPacketParams {
    fn default() -> Self {
        Self {
            preamble_len: 0x0008,
            header_type: LoRaHeaderType::VarLen,
            payload_len: 0xFF,
            crc_type: LoRaCrcType::CrcOff,
            invert_iq: LoRaInvertIq::Standard,
        }
    }
}

impl LoRaPacketParams {
    /// Packet parameters for `settings`, leaving payload length and IQ to the caller.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::default()
            .set_preamble_len(settings.preamble_len)
            .set_header_type(if settings.implicit_header {
                LoRaHeaderType::FixedLen
            } else {
                LoRaHeaderType::VarLen
            })
            .set_crc_type(if settings.crc_en {
                LoRaCrcType::CrcOn
            } else {
                LoRaCrcType::CrcOff
            })
    }

    /// Sets the preamble length.
    pub fn set_preamble_len(mut self, preamble_len: u16) -> Self {
        self.preamble_len = preamble_len;
        self
    }

    /// Sets the header type.
    pub fn set_header_type(mut self, header_type: LoRaHeaderType) -> Self {
        self.header_type = header_type;
        self
    }

    /// Sets the payload length.
    pub fn set_payload_len(mut self, payload_len: u8) -> Self {
        self.payload_len = payload_len;
        self
    }

    /// Sets the CRC type.
    pub fn set_crc_type(mut self, crc_type: LoRaCrcType) -> Self {
        self.crc_type = crc_type;
        self
    }

    /// Sets the IQ inversion mode.
    pub fn set_invert_iq(mut self, invert_iq: LoRaInvertIq) -> Self {
        self.invert_iq = invert_iq;
        self
    }
}
