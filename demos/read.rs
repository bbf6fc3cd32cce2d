use linux_embedded_hal;

use sps30_shdlc::*;
use std::time::Duration;

// The port has to be set to 115200 baud beforehand, e.g. `stty -F /dev/ttyUSB0 115200 raw`.
fn main() {
    env_logger::init();

    let path = std::env::args()
        .skip(1)
        .next()
        .expect("Missing path to device");

    println!("Connecting to: {}", path);

    let device = linux_embedded_hal::Serial::open(std::path::Path::new(&path)).unwrap();
    let mut sensor = Sps30Sensor::new(device);

    println!("{:?}", sensor.read_device_info().unwrap());
    println!("{:?}", sensor.read_version().unwrap());

    sensor.start().unwrap();

    loop {
        std::thread::sleep(Duration::from_secs(1));
        match sensor.read_measurement() {
            Ok(measurement) => println!("{:?}", measurement),
            Err(e) => println!("{}", e),
        }
    }
}
