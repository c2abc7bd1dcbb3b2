use crate::{OneWireUart, RESET_PULSE, SLOT_HIGH, SLOT_LOW, UartStatus, UartTransport};
use onewire_bus::{BusMutex, OneWire, OneWireError, OneWireResult, OneWireStatus};

impl<T: UartTransport, M: BusMutex> OneWireUart<T, M> {
    /// One time slot on the line: one duplex byte at the data baud rate.
    fn slot(&mut self, tx: u8) -> Result<u8, T::Error> {
        let mut rx = [0u8; 1];
        self.uart.transmit_receive(&[tx], &mut rx)?;
        Ok(rx[0])
    }
}

impl<T: UartTransport, M: BusMutex> OneWire for OneWireUart<T, M> {
    type Status = UartStatus;

    type BusError = T::Error;

    fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError> {
        self.uart.set_baudrate(self.reset_baudrate)?;
        let mut rx = [0u8; 1];
        let res = self.uart.transmit_receive(&[RESET_PULSE], &mut rx);
        // The working rate must come back even when the transaction failed,
        // otherwise the next bit slot goes out with reset timing.
        let restored = self.uart.set_baudrate(self.data_baudrate);
        res?;
        restored?;
        let status = UartStatus { echo: rx[0] };
        if status.line_fault() {
            Err(OneWireError::LineFault)
        } else if !status.presence() {
            Err(OneWireError::NoDevicePresent)
        } else {
            Ok(status)
        }
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?; // Least-significant bit first
        }
        Ok(())
    }

    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        let mut byte = 0;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i; // Least-significant bit first
            }
        }
        Ok(byte)
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
        // A write-1 slot is all ones (short low pulse from the start bit), a
        // write-0 slot all zeros (low for the full byte frame). The echo carries
        // no information on writes.
        self.slot(if bit { SLOT_HIGH } else { SLOT_LOW })?;
        Ok(())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
        // A read slot is a write-1 slot; a device pulling the line low flattens
        // the first data bit of the echoed frame.
        let echo = self.slot(SLOT_HIGH)?;
        Ok(echo & 0x1 != 0)
    }

    fn protect(&mut self) {
        self.mutex.protect()
    }

    fn unprotect(&mut self) {
        self.mutex.unprotect()
    }
}
