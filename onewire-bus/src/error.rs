/// One wire communication error type.
#[derive(Debug)]
pub enum OneWireError<E> {
    /// Encapsulates the error type from the underlying transport,
    /// including transaction timeouts.
    Other(E),
    /// Indicates that no device answered a reset, addressing or search sequence.
    /// During a scan this may mean a device was removed from the bus mid-search.
    NoDevicePresent,
    /// The presence window came back garbled. The line is stuck, disconnected or
    /// the transport did not loop the reset pulse back.
    LineFault,
    /// Computed CRC of a received ROM or scratchpad is invalid.
    InvalidCrc,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Other(other)
    }
}
