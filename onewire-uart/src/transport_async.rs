#![allow(async_fn_in_trait)]

/// Asynchronous capability contract a platform serial driver must provide to carry a 1-Wire bus.
///
/// The asynchronous mirror of [UartTransport](crate::UartTransport); the same baud-ownership and
/// timeout rules apply.
pub trait UartTransportAsync {
    /// The error type returned by the transport operations, surfaced through
    /// [OneWireError::Other](onewire_bus::OneWireError::Other).
    type Error;

    /// Brings the serial peripheral up (8 data bits, no parity, 1 stop bit).
    ///
    /// Called once before the first bus operation.
    async fn init(&mut self) -> Result<(), Self::Error>;

    /// Tears the serial peripheral down. No transaction may follow until
    /// [init](UartTransportAsync::init) runs again.
    async fn deinit(&mut self) -> Result<(), Self::Error>;

    /// Reconfigures the line speed. Called by the engine around every reset transaction.
    async fn set_baudrate(&mut self, baudrate: u32) -> Result<(), Self::Error>;

    /// One duplex transaction: transmit `tx` while capturing the same number of bytes off the
    /// line into `rx`. Reception must start no later than transmission, otherwise the looped-back
    /// response is lost.
    ///
    /// The transaction must be bounded by an internal timeout (on the order of 100 ms); a
    /// timed-out or failed transaction reports `Err`, and the caller has to assume the bus is
    /// electrically indeterminate until the next reset.
    async fn transmit_receive(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error>;
}
