//! SHDLC framing used by the SPS30 UART interface.
//!
//! Host to sensor (MOSI):
//!
//! ```text
//! 7E | ADR | CMD | L | DATA... | CHK | 7E
//! ```
//!
//! Sensor to host (MISO) carries an extra state byte:
//!
//! ```text
//! 7E | ADR | CMD | STATE | L | DATA... | CHK | 7E
//! ```
//!
//! `CHK` is the inverted low byte of the sum of every byte between the markers.
//! Reserved values between the markers are sent as `7D, byte ^ 0x20`.

use scroll::Pwrite;

use crate::error::{Error, Result};

pub const START_STOP: u8 = 0x7E;
pub const ESCAPE: u8 = 0x7D;
pub const ESCAPE_XOR: u8 = 0x20;
pub const XON: u8 = 0x11;
pub const XOFF: u8 = 0x13;

pub const DEFAULT_ADDRESS: u8 = 0x00;

/// Largest payload the length byte can describe.
pub const MAX_PAYLOAD: usize = 255;

// address, command, length, checksum
const REQUEST_OVERHEAD: usize = 4;
// address, command, state, length, checksum
const RESPONSE_OVERHEAD: usize = 5;

/// Size of the largest unstuffed frame body, markers excluded.
pub const MAX_BODY_SIZE: usize = RESPONSE_OVERHEAD + MAX_PAYLOAD;

/// Size of the largest frame on the wire, every body byte stuffed.
pub const MAX_WIRE_FRAME_SIZE: usize = 2 + 2 * MAX_BODY_SIZE;

pub fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

fn is_reserved(byte: u8) -> bool {
    matches!(byte, START_STOP | ESCAPE | XON | XOFF)
}

/// Frame sent by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub address: u8,
    pub command: u8,
    pub data: &'a [u8],
}

/// Frame sent back by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    pub address: u8,
    pub command: u8,
    pub state: u8,
    pub data: &'a [u8],
}

impl<'a> Request<'a> {
    pub fn new(command: u8, data: &'a [u8]) -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            command,
            data,
        }
    }

    ///
    /// Writes the stuffed frame, markers included, into `out`. Returns the number of bytes written.
    ///
    pub fn encode(&self, out: &mut [u8]) -> Result<usize> {
        encode_frame(&[self.address, self.command], self.data, out)
    }

    ///
    /// Parses a complete wire frame. `scratch` receives the unstuffed body and backs `data`.
    ///
    /// The driver never receives requests; this is the sensor side, for simulators and test
    /// doubles that need to check what the host sent.
    ///
    pub fn decode(wire: &[u8], scratch: &'a mut [u8]) -> Result<Self> {
        let body = unstuff(wire, scratch)?;
        let (header, data) = split_body(body, REQUEST_OVERHEAD - 1)?;

        Ok(Self {
            address: header[0],
            command: header[1],
            data,
        })
    }
}

impl<'a> Response<'a> {
    pub fn new(command: u8, state: u8, data: &'a [u8]) -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            command,
            state,
            data,
        }
    }

    /// Sensor side encoder, for simulators and test doubles.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize> {
        encode_frame(&[self.address, self.command, self.state], self.data, out)
    }

    pub fn decode(wire: &[u8], scratch: &'a mut [u8]) -> Result<Self> {
        let body = unstuff(wire, scratch)?;
        let (header, data) = split_body(body, RESPONSE_OVERHEAD - 1)?;

        Ok(Self {
            address: header[0],
            command: header[1],
            state: header[2],
            data,
        })
    }
}

/// Worst case wire size for a frame whose body is `body_len` bytes.
pub fn wire_size(body_len: usize) -> usize {
    2 + 2 * body_len
}

fn encode_frame(header: &[u8], data: &[u8], out: &mut [u8]) -> Result<usize> {
    if data.len() > MAX_PAYLOAD {
        return Err(Error::Encoding(data.len()));
    }

    let mut writer = FrameWriter::new(out, wire_size(header.len() + data.len() + 2))?;
    for byte in header.iter().chain(&[data.len() as u8]).chain(data) {
        writer.push(*byte)?;
    }
    writer.finish()
}

struct FrameWriter<'a> {
    out: &'a mut [u8],
    offset: usize,
    sum: u8,
    needed: usize,
}

impl<'a> FrameWriter<'a> {
    fn new(out: &'a mut [u8], needed: usize) -> Result<Self> {
        let mut writer = Self {
            out,
            offset: 0,
            sum: 0,
            needed,
        };
        writer.raw(START_STOP)?;
        Ok(writer)
    }

    fn raw(&mut self, byte: u8) -> Result<()> {
        let needed = self.needed;
        self.out
            .gwrite::<u8>(byte, &mut self.offset)
            .map_err(|_| Error::BufferTooSmall { needed })?;
        Ok(())
    }

    fn stuffed(&mut self, byte: u8) -> Result<()> {
        if is_reserved(byte) {
            self.raw(ESCAPE)?;
            self.raw(byte ^ ESCAPE_XOR)
        } else {
            self.raw(byte)
        }
    }

    fn push(&mut self, byte: u8) -> Result<()> {
        self.sum = self.sum.wrapping_add(byte);
        self.stuffed(byte)
    }

    fn finish(mut self) -> Result<usize> {
        let check = !self.sum;
        self.stuffed(check)?;
        self.raw(START_STOP)?;
        Ok(self.offset)
    }
}

fn unstuff<'s>(wire: &[u8], scratch: &'s mut [u8]) -> Result<&'s [u8]> {
    if wire.len() < 2 || wire[0] != START_STOP || wire[wire.len() - 1] != START_STOP {
        return Err(Error::Framing);
    }

    let mut len = 0;
    let mut bytes = wire[1..wire.len() - 1].iter();
    while let Some(&byte) = bytes.next() {
        let value = match byte {
            START_STOP => return Err(Error::Framing),
            ESCAPE => {
                let original = bytes.next().ok_or(Error::Framing)? ^ ESCAPE_XOR;
                if !is_reserved(original) {
                    return Err(Error::Framing);
                }
                original
            }
            other => other,
        };
        *scratch.get_mut(len).ok_or(Error::Framing)? = value;
        len += 1;
    }

    Ok(&scratch[..len])
}

// `header_len` counts every byte before the data, the length byte being the last of them.
fn split_body(body: &[u8], header_len: usize) -> Result<(&[u8], &[u8])> {
    if body.len() < header_len + 1 {
        return Err(Error::TruncatedFrame);
    }

    let (content, check) = body.split_at(body.len() - 1);
    let expected = checksum(content);
    if expected != check[0] {
        return Err(Error::Checksum {
            expected,
            actual: check[0],
        });
    }

    let (header, data) = content.split_at(header_len);
    let declared = header[header_len - 1] as usize;
    if data.len() < declared {
        return Err(Error::TruncatedFrame);
    }
    if data.len() > declared {
        return Err(Error::Framing);
    }

    Ok((header, data))
}
