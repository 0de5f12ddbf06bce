//! Power mode related parameters.

/// Standby mode configuration.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StandbyConfig {
    /// Standby with RC 13MHz oscillator.
    StbyRc = 0x00,
    /// Standby with XOSC (crystal oscillator).
    StbyXOSC = 0x01,
}

/// Sleep mode configuration.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SleepConfig {
    /// Configuration is lost, the chip restarts from scratch on wake.
    ColdStart = 0x00,
    /// Configuration is retained in the retention registers.
    WarmStart = 0x04,
}

/// Regulator used to power the chip.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegulatorMode {
    /// LDO only.
    Ldo = 0x00,
    /// DC-DC plus LDO, lower consumption on modules that fit the inductor.
    DcDc = 0x01,
}
