use scroll::{Pread, BE};

use crate::error::{Error, Result};

/// Sub-command selecting the auto cleaning interval for command 0x80.
pub(crate) const AUTOCLEAN_INTERVAL_SUBCOMMAND: u8 = 0x00;

pub(crate) const MEASUREMENT_SIZE: usize = 10;
pub(crate) const AUTOCLEAN_INTERVAL_SIZE: usize = 4;
pub(crate) const VERSION_SIZE: usize = 7;

/// Sent before the wake-up frame to wake the sensor's UART.
pub(crate) const WAKEUP_PULSE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    ReadMeasurement,
    Sleep,
    Wakeup,
    CleanFan,
    ReadAutocleanInterval,
    WriteAutocleanInterval,
    DeviceInfo,
    ReadVersion,
    Reset,
}

impl Command {
    pub fn code(self) -> u8 {
        match self {
            Command::Start => 0x00,
            Command::Stop => 0x01,
            Command::ReadMeasurement => 0x03,
            Command::Sleep => 0x10,
            Command::Wakeup => 0x11,
            Command::CleanFan => 0x56,
            Command::ReadAutocleanInterval | Command::WriteAutocleanInterval => 0x80,
            Command::DeviceInfo => 0xD0,
            Command::ReadVersion => 0xD1,
            Command::Reset => 0xD3,
        }
    }
}

/// Measured values in the sensor's unsigned 16-bit output format.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Mass concentration PM1.0 [µg/m³]
    pub pm1_0: u16,
    /// Mass concentration PM2.5 [µg/m³]
    pub pm2_5: u16,
    /// Mass concentration PM4.0 [µg/m³]
    pub pm4_0: u16,
    /// Mass concentration PM10 [µg/m³]
    pub pm10: u16,
    /// Typical particle size [nm]
    pub typical_particle_size: u16,
}

impl Measurement {
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() != MEASUREMENT_SIZE {
            return Err(Error::Protocol("measurement payload must be 10 bytes"));
        }

        let mut offset = 0usize;
        let mut next = || read_u16(payload, &mut offset);

        Ok(Measurement {
            pm1_0: next()?,
            pm2_5: next()?,
            pm4_0: next()?,
            pm10: next()?,
            typical_particle_size: next()?,
        })
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// Major version in the high byte, minor in the low byte.
    pub firmware: u16,
    pub hardware: u16,
    /// Major version in the high byte, minor in the low byte.
    pub shdlc: u16,
}

impl VersionInfo {
    // fw major, fw minor, reserved, hw revision, reserved, shdlc major, shdlc minor
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() != VERSION_SIZE {
            return Err(Error::Protocol("version payload must be 7 bytes"));
        }

        Ok(VersionInfo {
            firmware: read_u16(payload, &mut 0)?,
            hardware: u16::from(payload[3]),
            shdlc: read_u16(payload, &mut 5)?,
        })
    }
}

/// String selected by the device information command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceInfoKind {
    ProductType,
    SerialNumber,
}

impl DeviceInfoKind {
    pub fn selector(self) -> u8 {
        match self {
            DeviceInfoKind::ProductType => 0x00,
            DeviceInfoKind::SerialNumber => 0x03,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub product_type: String,
    pub serial_number: String,
}

pub(crate) fn autoclean_interval_from_payload(payload: &[u8]) -> Result<u32> {
    payload
        .pread_with::<u32>(0, BE)
        .map_err(|_| Error::Protocol("auto cleaning interval must be 4 bytes"))
}

///
/// Copies a NUL-terminated ASCII string, terminator included, from `payload` into `out`
///
pub(crate) fn copy_c_string<'b>(payload: &[u8], out: &'b mut [u8]) -> Result<&'b str> {
    let len = payload
        .iter()
        .position(|b| *b == 0)
        .ok_or(Error::Protocol("string is not NUL-terminated"))?;

    let text = &payload[..len];
    if !text.is_ascii() {
        return Err(Error::Protocol("string is not ASCII"));
    }
    if out.len() < len + 1 {
        return Err(Error::BufferTooSmall { needed: len + 1 });
    }

    out[..=len].copy_from_slice(&payload[..=len]);
    core::str::from_utf8(&out[..len]).map_err(|_| Error::Protocol("string is not ASCII"))
}

fn read_u16(payload: &[u8], offset: &mut usize) -> Result<u16> {
    payload
        .gread_with::<u16>(offset, BE)
        .map_err(|_| Error::Protocol("payload too short"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes() {
        assert_eq!(0x00, Command::Start.code());
        assert_eq!(0x03, Command::ReadMeasurement.code());
        assert_eq!(0x56, Command::CleanFan.code());
        assert_eq!(
            Command::ReadAutocleanInterval.code(),
            Command::WriteAutocleanInterval.code()
        );
        assert_eq!(0xD3, Command::Reset.code());
    }

    #[test]
    fn measurement_fields_are_big_endian_in_order() {
        let payload = [0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00, 0x05];

        assert_eq!(
            Measurement {
                pm1_0: 1,
                pm2_5: 2,
                pm4_0: 3,
                pm10: 4,
                typical_particle_size: 5,
            },
            Measurement::from_payload(&payload).unwrap()
        );
    }

    #[test]
    fn measurement_with_wrong_length_is_protocol_error() {
        assert!(matches!(
            Measurement::from_payload(&[0x00; 9]),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            Measurement::from_payload(&[0x00; 20]),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn version_fields() {
        let payload = [0x02, 0x03, 0x00, 0x07, 0x00, 0x02, 0x00];

        assert_eq!(
            VersionInfo {
                firmware: 0x0203,
                hardware: 0x0007,
                shdlc: 0x0200,
            },
            VersionInfo::from_payload(&payload).unwrap()
        );
    }

    #[test]
    fn autoclean_interval_is_big_endian() {
        assert_eq!(
            Ok(345_600),
            autoclean_interval_from_payload(&[0x00, 0x05, 0x46, 0x00])
        );
        assert!(autoclean_interval_from_payload(&[0x00, 0x05]).is_err());
    }

    #[test]
    fn c_string_is_copied_with_terminator() {
        let mut out = [0xAAu8; 8];

        let text = copy_c_string(b"ABC\0", &mut out).unwrap();

        assert_eq!("ABC", text);
        assert_eq!(b"ABC\0", &out[..4]);
    }

    #[test]
    fn c_string_stops_at_first_terminator() {
        let mut out = [0u8; 8];
        assert_eq!(Ok("00080000"), copy_c_string(b"00080000\0\0\0", &mut [0u8; 9]));
        assert_eq!(Ok("AB"), copy_c_string(b"AB\0CD\0", &mut out));
    }

    #[test]
    fn c_string_without_terminator_is_protocol_error() {
        let mut out = [0u8; 8];
        assert!(matches!(
            copy_c_string(b"ABC", &mut out),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn c_string_needs_room_for_terminator() {
        let mut out = [0u8; 3];
        assert_eq!(
            Err(Error::BufferTooSmall { needed: 4 }),
            copy_c_string(b"ABC\0", &mut out)
        );
    }
}
