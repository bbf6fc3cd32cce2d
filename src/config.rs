use std::time::Duration;

use crate::shdlc::DEFAULT_ADDRESS;

/// Bit rate the serial port has to be configured for before the driver is created.
pub const BIT_RATE: u32 = 115_200;

/// Response timeout used when none is configured.
///
/// The sensor answers most commands within 20 ms, a device reset may take up to 100 ms.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// SHDLC slave address, always 0 for the SPS30.
    pub address: u8,
    /// Maximum time to wait for a complete response frame.
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
