//! Device error flags.

/// One latched error condition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceError {
    Rc64kCalib = 1 << 0,
    Rc13mCalib = 1 << 1,
    PllCalib = 1 << 2,
    AdcCalib = 1 << 3,
    ImgCalib = 1 << 4,
    /// Expected after waking with a TCXO; cleared on wake.
    XoscStart = 1 << 5,
    PllLock = 1 << 6,
    PaRamp = 1 << 8,
}

const ALL: [DeviceError; 8] = [
    DeviceError::Rc64kCalib,
    DeviceError::Rc13mCalib,
    DeviceError::PllCalib,
    DeviceError::AdcCalib,
    DeviceError::ImgCalib,
    DeviceError::XoscStart,
    DeviceError::PllLock,
    DeviceError::PaRamp,
];

/// Error flags as read with `GetDeviceErrors`.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct DeviceErrors(u16);

impl From<u16> for DeviceErrors {
    fn from(val: u16) -> Self {
        Self(val)
    }
}

impl core::fmt::Debug for DeviceErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl DeviceErrors {
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, error: DeviceError) -> bool {
        self.0 & error as u16 != 0
    }

    /// The set flags, lowest bit first.
    pub fn iter(self) -> impl Iterator<Item = DeviceError> {
        ALL.into_iter().filter(move |e| self.contains(*e))
    }
}
