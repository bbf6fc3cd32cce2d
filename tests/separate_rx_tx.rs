use sps30_shdlc::Sps30Sensor;

// Acknowledgement of the sleep command (0x10).
const SLEEP_RESPONSE: [u8; 7] = [0x7E, 0x00, 0x10, 0x00, 0x00, 0xEF, 0x7E];

struct RxMock {
    index: usize,
}
struct TxMock {}

impl embedded_hal::serial::Read<u8> for RxMock {
    type Error = ();

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let byte = SLEEP_RESPONSE
            .get(self.index)
            .copied()
            .ok_or(nb::Error::WouldBlock)?;
        self.index += 1;
        Ok(byte)
    }
}

impl embedded_hal::serial::Write<u8> for TxMock {
    type Error = ();

    fn write(&mut self, _: u8) -> nb::Result<(), Self::Error> {
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

#[test]
fn crate_instance_using_separate_rx_tx() {
    let tx = TxMock {};
    let rx = RxMock { index: 0 };

    let mut sps = Sps30Sensor::new_tx_rx(tx, rx);
    sps.sleep().unwrap();
}
