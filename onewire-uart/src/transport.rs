/// Capability contract a platform serial driver must provide to carry a 1-Wire bus.
///
/// The transport is a plain full-duplex byte pipe whose baud rate can be changed between
/// transactions. The bus engine owns the baud-rate state: no other component may change it
/// while a [OneWireUart](crate::OneWireUart) handle is driving the transport.
pub trait UartTransport {
    /// The error type returned by the transport operations, surfaced through
    /// [OneWireError::Other](onewire_bus::OneWireError::Other).
    type Error;

    /// Brings the serial peripheral up (8 data bits, no parity, 1 stop bit).
    ///
    /// Called once before the first bus operation.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Tears the serial peripheral down. No transaction may follow until
    /// [init](UartTransport::init) runs again.
    fn deinit(&mut self) -> Result<(), Self::Error>;

    /// Reconfigures the line speed. Called by the engine around every reset transaction.
    fn set_baudrate(&mut self, baudrate: u32) -> Result<(), Self::Error>;

    /// One duplex transaction: transmit `tx` while capturing the same number of bytes off the
    /// line into `rx`. Reception must start no later than transmission, otherwise the looped-back
    /// response is lost.
    ///
    /// The transaction must be bounded by an internal timeout (on the order of 100 ms); a
    /// timed-out or failed transaction reports `Err`, and the caller has to assume the bus is
    /// electrically indeterminate until the next reset.
    fn transmit_receive(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error>;
}
