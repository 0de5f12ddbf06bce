//! Error types shared by the modem core and the chip drivers.

use core::fmt::{self, Debug, Display};

/// An error related to SPI communication.
pub enum SpiError<TSPIERR> {
    /// An error occurred during a `write` operation.
    Write(TSPIERR),
    /// An error occurred during a `transfer` operation.
    Transfer(TSPIERR),
}

impl<TSPIERR: Debug> Debug for SpiError<TSPIERR> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write(err) => write!(f, "Write({err:?})"),
            Self::Transfer(err) => write!(f, "Transfer({err:?})"),
        }
    }
}

/// An error related to GPIO pin operations.
pub enum PinError<TPINERR> {
    /// An error occurred on an output pin.
    Output(TPINERR),
    /// An error occurred on an input pin.
    Input(TPINERR),
}

impl<TPINERR: Debug> Debug for PinError<TPINERR> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output(err) => write!(f, "Output({err:?})"),
            Self::Input(err) => write!(f, "Input({err:?})"),
        }
    }
}

/// Transport failure of a chip driver: either the bus or one of its pins.
pub enum BusError<TSPIERR, TPINERR> {
    /// An SPI-related error.
    Spi(SpiError<TSPIERR>),
    /// A pin-related error.
    Pin(PinError<TPINERR>),
}

impl<TSPIERR: Debug, TPINERR: Debug> Debug for BusError<TSPIERR, TPINERR> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(err) => write!(f, "Spi({err:?})"),
            Self::Pin(err) => write!(f, "Pin({err:?})"),
        }
    }
}

impl<TSPIERR, TPINERR> From<SpiError<TSPIERR>> for BusError<TSPIERR, TPINERR> {
    fn from(spi_err: SpiError<TSPIERR>) -> Self {
        BusError::Spi(spi_err)
    }
}

impl<TSPIERR, TPINERR> From<PinError<TPINERR>> for BusError<TSPIERR, TPINERR> {
    fn from(pin_err: PinError<TPINERR>) -> Self {
        BusError::Pin(pin_err)
    }
}

/// A configuration value that was rejected before touching the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Spreading factor outside the range the chip supports.
    SpreadingFactor(u8),
    /// Coding rate denominator outside 5..=8.
    CodingRate(u8),
    /// Bandwidth string or value not recognised.
    Bandwidth,
    /// Carrier frequency (kHz) outside the chip's synthesizer range.
    Frequency(u32),
    /// Output power (dBm) not reachable on the selected amplifier path.
    OutputPower(i8),
    /// Preamble length of zero.
    PreambleLength(u16),
    /// PA ramp time the chip cannot produce.
    PaRamp(u32),
    /// Combination of settings the chip family forbids.
    Unsupported(&'static str),
    /// A recognised key carried a value that could not be parsed.
    Value(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpreadingFactor(sf) => write!(f, "unsupported spreading factor {sf}"),
            Self::CodingRate(cr) => write!(f, "unsupported coding rate 4/{cr}"),
            Self::Bandwidth => write!(f, "unsupported bandwidth"),
            Self::Frequency(khz) => write!(f, "frequency {khz} kHz out of range"),
            Self::OutputPower(dbm) => write!(f, "output power {dbm} dBm out of range"),
            Self::PreambleLength(len) => write!(f, "invalid preamble length {len}"),
            Self::PaRamp(us) => write!(f, "unsupported PA ramp time {us} us"),
            Self::Unsupported(msg) => write!(f, "unsupported configuration: {msg}"),
            Self::Value(key) => write!(f, "invalid value for key {key}"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// The error type of every modem operation.
///
/// `E` is the transport error of the chip driver, usually a [`BusError`].
pub enum Error<E> {
    /// The bus or one of the control pins failed.
    Bus(E),
    /// The chip never reported ready (busy line, mode change or calibration).
    HardwareTimeout,
    /// The chip reported a failed command in its status byte.
    Command {
        /// Raw status byte returned by the chip.
        status: u8,
    },
    /// Caller misuse, detected before any bus traffic.
    InvalidArgument(&'static str),
    /// A configuration value was rejected.
    Config(ConfigError),
}

impl<E: Debug> Debug for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(err) => write!(f, "Bus({err:?})"),
            Self::HardwareTimeout => write!(f, "HardwareTimeout"),
            Self::Command { status } => write!(f, "Command {{ status: {status:#04x} }}"),
            Self::InvalidArgument(msg) => write!(f, "InvalidArgument({msg:?})"),
            Self::Config(err) => write!(f, "Config({err:?})"),
        }
    }
}

impl<E: Debug> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(err) => write!(f, "bus error: {err:?}"),
            Self::HardwareTimeout => write!(f, "radio did not become ready in time"),
            Self::Command { status } => write!(f, "radio rejected command, status {status:#04x}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl<E: Debug> core::error::Error for Error<E> {}

impl<E> From<ConfigError> for Error<E> {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl<TSPIERR, TPINERR> From<SpiError<TSPIERR>> for Error<BusError<TSPIERR, TPINERR>> {
    fn from(err: SpiError<TSPIERR>) -> Self {
        Error::Bus(err.into())
    }
}

impl<TSPIERR, TPINERR> From<PinError<TPINERR>> for Error<BusError<TSPIERR, TPINERR>> {
    fn from(err: PinError<TPINERR>) -> Self {
        Error::Bus(err.into())
    }
}

impl<TSPIERR, TPINERR> From<BusError<TSPIERR, TPINERR>> for Error<BusError<TSPIERR, TPINERR>> {
    fn from(err: BusError<TSPIERR, TPINERR>) -> Self {
        Error::Bus(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    #[test]
    fn test_bus_error_conversion_keeps_kind() {
        let err: Error<BusError<u8, u8>> = SpiError::Write(3).into();
        assert!(matches!(err, Error::Bus(BusError::Spi(SpiError::Write(3)))));

        let err: Error<BusError<u8, u8>> = PinError::Input(1).into();
        assert!(matches!(err, Error::Bus(BusError::Pin(PinError::Input(1)))));
    }

    #[test]
    fn test_display_messages() {
        let err: Error<()> = Error::Config(ConfigError::SpreadingFactor(4));
        assert_eq!(format!("{err}"), "unsupported spreading factor 4");

        let err: Error<()> = Error::Command { status: 0x2A };
        assert_eq!(format!("{err:?}"), "Command { status: 0x2a }");
    }
}
