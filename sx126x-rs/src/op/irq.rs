//! Interrupt configuration and status.

/// Individual interrupt flags.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IrqMaskBit {
    /// Transmit operation done.
    TxDone = 1 << 0,
    /// Receive operation done.
    RxDone = 1 << 1,
    /// Preamble detected.
    PreambleDetected = 1 << 2,
    /// Sync word valid.
    SyncwordValid = 1 << 3,
    /// Header valid.
    HeaderValid = 1 << 4,
    /// Header error.
    HeaderError = 1 << 5,
    /// CRC error.
    CrcErr = 1 << 6,
    /// Channel Activity Detection (CAD) done.
    CadDone = 1 << 7,
    /// Channel Activity Detected.
    CadDetected = 1 << 8,
    /// RX or TX timeout.
    Timeout = 1 << 9,
}

/// A set of interrupt flags, used both to route interrupts to DIO pins and
/// to clear them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IrqMask {
    inner: u16,
}

impl IrqMask {
    /// No interrupt.
    pub const fn none() -> Self {
        Self { inner: 0 }
    }

    /// Every interrupt.
    pub const fn all() -> Self {
        Self { inner: 0x03FF }
    }

    /// The interrupts the modem routes to DIO1.
    pub const fn modem_events() -> Self {
        Self::none()
            .combine(IrqMaskBit::TxDone)
            .combine(IrqMaskBit::RxDone)
            .combine(IrqMaskBit::Timeout)
            .combine(IrqMaskBit::CrcErr)
            .combine(IrqMaskBit::HeaderError)
    }

    /// Adds an interrupt flag to the mask.
    pub const fn combine(self, bit: IrqMaskBit) -> Self {
        Self {
            inner: self.inner | bit as u16,
        }
    }
}

impl From<IrqMask> for u16 {
    fn from(val: IrqMask) -> Self {
        val.inner
    }
}

impl From<u16> for IrqMask {
    fn from(mask: u16) -> Self {
        Self { inner: mask }
    }
}

/// Interrupt flags read with `GetIrqStatus`.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct IrqStatus {
    inner: u16,
}

impl From<u16> for IrqStatus {
    fn from(status: u16) -> Self {
        Self { inner: status }
    }
}

impl From<IrqStatus> for u16 {
    fn from(val: IrqStatus) -> Self {
        val.inner
    }
}

impl core::fmt::Debug for IrqStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IrqStatus")
            .field("tx_done", &self.tx_done())
            .field("rx_done", &self.rx_done())
            .field("header_error", &self.header_error())
            .field("crc_err", &self.crc_err())
            .field("timeout", &self.timeout())
            .field("raw", &self.inner)
            .finish()
    }
}

impl IrqStatus {
    fn is_set(self, bit: IrqMaskBit) -> bool {
        self.inner & bit as u16 != 0
    }

    /// Returns `true` if the `TxDone` interrupt is active.
    pub fn tx_done(self) -> bool {
        self.is_set(IrqMaskBit::TxDone)
    }

    /// Returns `true` if the `RxDone` interrupt is active.
    pub fn rx_done(self) -> bool {
        self.is_set(IrqMaskBit::RxDone)
    }

    /// Returns `true` if the `HeaderError` interrupt is active.
    pub fn header_error(self) -> bool {
        self.is_set(IrqMaskBit::HeaderError)
    }

    /// Returns `true` if the `CrcErr` interrupt is active.
    pub fn crc_err(self) -> bool {
        self.is_set(IrqMaskBit::CrcErr)
    }

    /// Returns `true` if the `Timeout` interrupt is active.
    pub fn timeout(self) -> bool {
        self.is_set(IrqMaskBit::Timeout)
    }

    /// A packet was received and passed the header and payload checks.
    pub fn rx_ok(self) -> bool {
        self.rx_done() && !self.crc_err() && !self.header_error()
    }
}
