//! Status byte and status-returning commands.

/// Chip mode reported in bits 6:4 of the status byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChipMode {
    /// Standby with the RC oscillator.
    StbyRc,
    /// Standby with the crystal oscillator.
    StbyXosc,
    /// Frequency synthesis.
    Fs,
    /// Receiving.
    Rx,
    /// Transmitting.
    Tx,
    /// A value the datasheet leaves unused.
    Unknown(u8),
}

/// Outcome of the previous command, bits 3:1 of the status byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    /// Data is available to the host.
    DataAvailable,
    /// The command timed out.
    CommandTimeout,
    /// The opcode or its arguments were invalid.
    CommandProcessingError,
    /// The command could not be executed.
    FailureToExecute,
    /// A transmission finished.
    TxDone,
    /// Any other value, including "reserved".
    Other(u8),
}

/// The status byte the chip returns on the first byte after an opcode.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Status {
    inner: u8,
}

impl From<u8> for Status {
    fn from(b: u8) -> Self {
        Self { inner: b }
    }
}

impl core::fmt::Debug for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Status")
            .field("chip_mode", &self.chip_mode())
            .field("command_status", &self.command_status())
            .finish()
    }
}

impl Status {
    /// The raw byte.
    pub fn raw(self) -> u8 {
        self.inner
    }

    /// Current chip mode.
    pub fn chip_mode(self) -> ChipMode {
        match (self.inner >> 4) & 0x07 {
            0x2 => ChipMode::StbyRc,
            0x3 => ChipMode::StbyXosc,
            0x4 => ChipMode::Fs,
            0x5 => ChipMode::Rx,
            0x6 => ChipMode::Tx,
            other => ChipMode::Unknown(other),
        }
    }

    /// Outcome of the previous command.
    pub fn command_status(self) -> CommandStatus {
        match (self.inner >> 1) & 0x07 {
            0x2 => CommandStatus::DataAvailable,
            0x3 => CommandStatus::CommandTimeout,
            0x4 => CommandStatus::CommandProcessingError,
            0x5 => CommandStatus::FailureToExecute,
            0x6 => CommandStatus::TxDone,
            other => CommandStatus::Other(other),
        }
    }

    /// True if the chip reports that the previous command failed.
    pub fn is_error(self) -> bool {
        matches!(
            self.command_status(),
            CommandStatus::CommandTimeout
                | CommandStatus::CommandProcessingError
                | CommandStatus::FailureToExecute
        )
    }
}

/// Packet counters kept by the chip since the last reset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Stats {
    /// Packets received.
    pub rx_pkt: u16,
    /// Packets received with a CRC error.
    pub crc_error: u16,
    /// Packets received with a header error.
    pub header_error: u16,
}

impl From<[u8; 6]> for Stats {
    fn from(b: [u8; 6]) -> Self {
        Self {
            rx_pkt: u16::from_be_bytes([b[0], b[1]]),
            crc_error: u16::from_be_bytes([b[2], b[3]]),
            header_error: u16::from_be_bytes([b[4], b[5]]),
        }
    }
}

/// Signal quality of the last received LoRa packet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PacketStatus {
    rssi_pkt: u8,
    snr_pkt: i8,
    signal_rssi_pkt: u8,
}

impl From<[u8; 3]> for PacketStatus {
    fn from(b: [u8; 3]) -> Self {
        Self {
            rssi_pkt: b[0],
            snr_pkt: b[1] as i8,
            signal_rssi_pkt: b[2],
        }
    }
}

impl PacketStatus {
    /// Average RSSI over the packet in dBm.
    pub fn rssi_pkt(self) -> i16 {
        -(self.rssi_pkt as i16) / 2
    }

    /// SNR of the packet in units of 0.25 dB.
    pub fn snr_pkt(self) -> i16 {
        self.snr_pkt as i16
    }

    /// RSSI of the despread LoRa signal in dBm.
    pub fn signal_rssi_pkt(self) -> i16 {
        -(self.signal_rssi_pkt as i16) / 2
    }
}
