use linux_embedded_hal;

use sps30_shdlc::*;
use std::time::Duration;

fn main() {
    env_logger::init();

    let path = std::env::args()
        .skip(1)
        .next()
        .expect("Missing path to device");

    println!("Connecting to: {}", path);

    let device = linux_embedded_hal::Serial::open(std::path::Path::new(&path)).unwrap();
    let mut sensor = Sps30Sensor::new(device);

    sensor.stop().unwrap();
    sensor.sleep().unwrap();
    std::thread::sleep(Duration::from_secs(3));
    sensor.wakeup().unwrap();

    println!(
        "Auto cleaning interval: {} s",
        sensor.read_autoclean_interval().unwrap()
    );

    sensor.start().unwrap();
    sensor.clean_fan().unwrap();

    loop {
        std::thread::sleep(Duration::from_secs(1));
        match sensor.read_measurement() {
            Ok(measurement) => println!("{:?}", measurement),
            Err(e) => println!("{}", e),
        }
    }
}
