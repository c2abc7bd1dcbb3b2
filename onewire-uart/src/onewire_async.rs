use crate::{OneWireUart, RESET_PULSE, SLOT_HIGH, SLOT_LOW, UartStatus, UartTransportAsync};
use onewire_bus::{BusMutex, OneWireAsync, OneWireError, OneWireResult, OneWireStatus};

impl<T: UartTransportAsync, M: BusMutex> OneWireUart<T, M> {
    /// Initializes the transport and pins the working (data) baud rate.
    ///
    /// Must be called once before the first bus operation.
    pub async fn init_async(&mut self) -> Result<(), T::Error> {
        self.uart.init().await?;
        self.uart.set_baudrate(self.data_baudrate).await
    }

    /// Deinitializes the transport. The handle must not be used afterwards
    /// until [init_async](OneWireUart::init_async) is called again.
    pub async fn deinit_async(&mut self) -> Result<(), T::Error> {
        self.uart.deinit().await
    }

    /// One time slot on the line: one duplex byte at the data baud rate.
    async fn slot_async(&mut self, tx: u8) -> Result<u8, T::Error> {
        let mut rx = [0u8; 1];
        self.uart.transmit_receive(&[tx], &mut rx).await?;
        Ok(rx[0])
    }
}

impl<T: UartTransportAsync, M: BusMutex> OneWireAsync for OneWireUart<T, M> {
    type Status = UartStatus;

    type BusError = T::Error;

    async fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError> {
        self.uart.set_baudrate(self.reset_baudrate).await?;
        let mut rx = [0u8; 1];
        let res = self.uart.transmit_receive(&[RESET_PULSE], &mut rx).await;
        // The working rate must come back even when the transaction failed,
        // otherwise the next bit slot goes out with reset timing.
        let restored = self.uart.set_baudrate(self.data_baudrate).await;
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

    async fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0).await?; // Least-significant bit first
        }
        Ok(())
    }

    async fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        let mut byte = 0;
        for i in 0..8 {
            if self.read_bit().await? {
                byte |= 1 << i; // Least-significant bit first
            }
        }
        Ok(byte)
    }

    async fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
        // A write-1 slot is all ones (short low pulse from the start bit), a
        // write-0 slot all zeros (low for the full byte frame). The echo carries
        // no information on writes.
        self.slot_async(if bit { SLOT_HIGH } else { SLOT_LOW }).await?;
        Ok(())
    }

    async fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
        // A read slot is a write-1 slot; a device pulling the line low flattens
        // the first data bit of the echoed frame.
        let echo = self.slot_async(SLOT_HIGH).await?;
        Ok(echo & 0x1 != 0)
    }

    fn protect(&mut self) {
        self.mutex.protect()
    }

    fn unprotect(&mut self) {
        self.mutex.unprotect()
    }
}
