use std::time::Instant;

use embedded_hal::serial::{Read, Write};
use log::{debug, trace, warn};
use nb::block;
use scroll::{Pwrite, BE};

mod commands;
mod config;
mod error;
mod read_fsm;
pub mod shdlc;

pub use commands::{Command, DeviceInfo, DeviceInfoKind, Measurement, VersionInfo};
pub use config::{Config, BIT_RATE, DEFAULT_TIMEOUT};
pub use error::{Error, Result, TransportOp};

use commands::{
    autoclean_interval_from_payload, copy_c_string, AUTOCLEAN_INTERVAL_SIZE,
    AUTOCLEAN_INTERVAL_SUBCOMMAND, MEASUREMENT_SIZE, VERSION_SIZE, WAKEUP_PULSE,
};
use read_fsm::{ReadStateMachine, ReadStatus};
use shdlc::{Request, Response, MAX_BODY_SIZE, MAX_PAYLOAD, MAX_WIRE_FRAME_SIZE};

// Bit 7 of the state byte: the device status register holds an error.
const DEVICE_ERROR_FLAG: u8 = 0x80;
const EXECUTION_ERROR_MASK: u8 = 0x7F;

pub struct Sps30Sensor<Serial>
where
    Serial: Read<u8> + Write<u8>,
{
    serial: Serial,
    config: Config,
    tx: [u8; MAX_WIRE_FRAME_SIZE],
    rx: [u8; MAX_WIRE_FRAME_SIZE],
    body: [u8; MAX_BODY_SIZE],
}

impl<Serial> Sps30Sensor<Serial>
where
    Serial: Read<u8> + Write<u8>,
{
    ///
    /// Creates a new sensor instance using a single object implementing embedded hal serial traits.
    /// The port has to be configured for `BIT_RATE` already.
    ///
    pub fn new(serial: Serial) -> Self {
        Self::with_config(serial, Config::default())
    }

    pub fn with_config(serial: Serial, config: Config) -> Self {
        Self {
            serial,
            config,
            tx: [0; MAX_WIRE_FRAME_SIZE],
            rx: [0; MAX_WIRE_FRAME_SIZE],
            body: [0; MAX_BODY_SIZE],
        }
    }

    /// Settings the driver was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gives the serial port back.
    pub fn release(self) -> Serial {
        self.serial
    }

    ///
    /// Starts measurement mode, the fan spins up and new values are available every second
    ///
    pub fn start(&mut self) -> Result<()> {
        self.acknowledged(Command::Start, &[])
    }

    pub fn stop(&mut self) -> Result<()> {
        self.acknowledged(Command::Stop, &[])
    }

    ///
    /// Reads the latest measured values. Requires measurement mode.
    ///
    pub fn read_measurement(&mut self) -> Result<Measurement> {
        let payload = self.exchange(Command::ReadMeasurement, &[], Some(MEASUREMENT_SIZE))?;
        let measurement = Measurement::from_payload(payload)?;
        debug!("{:?}", measurement);
        Ok(measurement)
    }

    pub fn sleep(&mut self) -> Result<()> {
        self.acknowledged(Command::Sleep, &[])
    }

    ///
    /// Leaves sleep mode. The UART is powered down while sleeping, so a wake-up pulse goes out first.
    ///
    pub fn wakeup(&mut self) -> Result<()> {
        block!(self.serial.write(WAKEUP_PULSE))
            .map_err(|_| Error::Transport(TransportOp::Write))?;
        self.acknowledged(Command::Wakeup, &[])
    }

    ///
    /// Runs the fan at maximum speed for 10 seconds. Requires measurement mode.
    ///
    pub fn clean_fan(&mut self) -> Result<()> {
        self.acknowledged(Command::CleanFan, &[])
    }

    /// Auto cleaning interval in seconds.
    pub fn read_autoclean_interval(&mut self) -> Result<u32> {
        let payload = self.exchange(
            Command::ReadAutocleanInterval,
            &[AUTOCLEAN_INTERVAL_SUBCOMMAND],
            Some(AUTOCLEAN_INTERVAL_SIZE),
        )?;
        autoclean_interval_from_payload(payload)
    }

    ///
    /// Sets the auto cleaning interval in seconds, 0 disables it
    ///
    pub fn write_autoclean_interval(&mut self, interval: u32) -> Result<()> {
        let mut payload = [0u8; 1 + AUTOCLEAN_INTERVAL_SIZE];
        payload[0] = AUTOCLEAN_INTERVAL_SUBCOMMAND;
        payload
            .pwrite_with::<u32>(interval, 1, BE)
            .map_err(|_| Error::Encoding(AUTOCLEAN_INTERVAL_SIZE))?;

        self.acknowledged(Command::WriteAutocleanInterval, &payload)
    }

    ///
    /// Reads one of the device information strings into `out`, NUL terminator included.
    /// Returns the string without the terminator.
    ///
    pub fn device_info<'b>(&mut self, kind: DeviceInfoKind, out: &'b mut [u8]) -> Result<&'b str> {
        let payload = self.exchange(Command::DeviceInfo, &[kind.selector()], None)?;
        copy_c_string(payload, out)
    }

    pub fn read_device_info(&mut self) -> Result<DeviceInfo> {
        let mut buffer = [0u8; MAX_PAYLOAD + 1];

        let product_type = self
            .device_info(DeviceInfoKind::ProductType, &mut buffer)?
            .to_owned();
        let serial_number = self
            .device_info(DeviceInfoKind::SerialNumber, &mut buffer)?
            .to_owned();

        Ok(DeviceInfo {
            product_type,
            serial_number,
        })
    }

    pub fn read_version(&mut self) -> Result<VersionInfo> {
        let payload = self.exchange(Command::ReadVersion, &[], Some(VERSION_SIZE))?;
        VersionInfo::from_payload(payload)
    }

    ///
    /// Soft reset, the sensor comes back in idle mode
    ///
    pub fn reset(&mut self) -> Result<()> {
        self.acknowledged(Command::Reset, &[])
    }

    ///
    /// Sends one command frame and waits for the matching response frame.
    ///
    /// Frames answering another command are dropped while the timeout runs; if only such
    /// frames arrive the call fails with `Error::Protocol`. Also fails if the sensor reports a non-zero
    /// execution state, or if `expected_len` is given and the payload length differs.
    /// Returns the response payload.
    ///
    pub fn exchange(
        &mut self,
        command: Command,
        payload: &[u8],
        expected_len: Option<usize>,
    ) -> Result<&[u8]> {
        let code = command.code();
        debug!("{:?} ({:#04x})", command, code);

        let request = Request {
            address: self.config.address,
            command: code,
            data: payload,
        };
        let len = request.encode(&mut self.tx)?;
        self.send(len)?;

        // A late reply to an earlier command may still be queued, skip it within the same deadline.
        let started = Instant::now();
        let mut skipped = false;
        let frame_len = loop {
            let frame_len = match self.receive(started) {
                Err(Error::Timeout(_)) if skipped => {
                    return Err(Error::Protocol("response does not match the request"));
                }
                received => received?,
            };
            trace!("RX: {:02x?}", &self.rx[..frame_len]);

            let response = Response::decode(&self.rx[..frame_len], &mut self.body)?;
            if response.address == self.config.address && response.command == code {
                break frame_len;
            }
            debug!(
                "Skipping response to command {:#04x} from address {:#04x}",
                response.command, response.address
            );
            skipped = true;
        };

        let response = Response::decode(&self.rx[..frame_len], &mut self.body)?;
        if response.state & DEVICE_ERROR_FLAG != 0 {
            warn!("Sensor reports an error in its device status register");
        }
        let execution_error = response.state & EXECUTION_ERROR_MASK;
        if execution_error != 0 {
            return Err(Error::Device(execution_error));
        }
        if let Some(expected) = expected_len {
            if response.data.len() != expected {
                return Err(Error::Protocol("unexpected payload length"));
            }
        }

        Ok(response.data)
    }

    fn acknowledged(&mut self, command: Command, payload: &[u8]) -> Result<()> {
        self.exchange(command, payload, Some(0)).map(|_| ())
    }

    fn send(&mut self, len: usize) -> Result<()> {
        trace!("TX: {:02x?}", &self.tx[..len]);
        for byte in &self.tx[..len] {
            block!(self.serial.write(*byte)).map_err(|_| Error::Transport(TransportOp::Write))?;
        }
        block!(self.serial.flush()).map_err(|_| Error::Transport(TransportOp::Write))
    }

    fn receive(&mut self, started: Instant) -> Result<usize> {
        let timeout = self.config.timeout;
        let mut fsm = ReadStateMachine::new(&mut self.rx);

        loop {
            match self.serial.read() {
                Ok(byte) => match fsm.update(byte) {
                    ReadStatus::Finished(len) => return Ok(len),
                    ReadStatus::Failed => return Err(Error::Framing),
                    ReadStatus::InProgress => {}
                },
                // embedded-hal 0.2 serial reads never block, so poll until the deadline.
                Err(nb::Error::WouldBlock) => core::hint::spin_loop(),
                Err(nb::Error::Other(_)) => return Err(Error::Transport(TransportOp::Read)),
            }

            if started.elapsed() >= timeout {
                return Err(if fsm.started() {
                    Error::TruncatedFrame
                } else {
                    Error::Timeout(timeout)
                });
            }
        }
    }
}

impl<TX, RX> Sps30Sensor<Wrapper<TX, RX>>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    ///
    /// Creates a new sensor instance using separate Read and Write embedded hal trait objects
    ///
    pub fn new_tx_rx(tx: TX, rx: RX) -> Self {
        Self::new(Wrapper(tx, rx))
    }
}

///
/// Combines two serial traits objects into one
///
pub struct Wrapper<TX, RX>(TX, RX)
where
    TX: Write<u8>,
    RX: Read<u8>;

impl<TX, RX> Read<u8> for Wrapper<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    type Error = RX::Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.1.read()
    }
}

impl<TX, RX> Write<u8> for Wrapper<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    type Error = TX::Error;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        self.0.write(word)
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.0.flush()
    }
}
