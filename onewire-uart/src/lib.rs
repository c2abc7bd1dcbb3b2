#![no_std]
#![deny(missing_docs)]

/*! # onewire-uart
 *
 * A 1-Wire bus master implemented on top of a plain byte-oriented serial transport.
 *
 * The engine exploits the fact that a UART produces predictable line timing per bit at a given
 * baud rate: at 9600 baud one transmitted byte spans the 1-Wire reset pulse plus the
 * presence-detect window, and at 115200 baud one transmitted byte frames exactly one 1-Wire time
 * slot. With the UART TX and RX tied to the bus through an open-drain stage, transmitting a byte
 * and reading back what the line actually carried implements every bus primitive without any
 * dedicated 1-Wire silicon.
 *
 * Platforms plug in by implementing the four-operation [UartTransport] contract (or
 * [UartTransportAsync]); the [OneWireUart] handle then implements the
 * [OneWire]/[OneWireAsync] bus traits from `onewire-bus`, including the ROM search.
 */

pub use onewire_bus::{
    BusMutex, NoopMutex, OneWire, OneWireAsync, OneWireError, OneWireResult, OneWireStatus,
};

mod onewire;
mod onewire_async;
mod transport;
mod transport_async;

pub use transport::UartTransport;
pub use transport_async::UartTransportAsync;

/// Baud rate of the reset/presence transaction: one byte at this rate covers the
/// reset pulse and the presence-detect window.
pub const ONEWIRE_RESET_BAUDRATE: u32 = 9_600;

/// Baud rate at which one transmitted byte frames a single 1-Wire time slot.
pub const ONEWIRE_DATA_BAUDRATE: u32 = 115_200;

/// Byte whose UART framing at the reset baud rate produces the 1-Wire reset pulse.
pub(crate) const RESET_PULSE: u8 = 0xf0;

/// Slot byte for writing a `1` and for sampling the line during reads.
pub(crate) const SLOT_HIGH: u8 = 0xff;

/// Slot byte for writing a `0`.
pub(crate) const SLOT_LOW: u8 = 0x00;

/// Status of the bus after a reset, carrying the byte the line reflected back.
///
/// With devices present the presence pulse stretches some low bits into the echo, so the echo
/// differs from the transmitted reset byte; an idle line echoes the reset byte unchanged, and a
/// line that cannot even reproduce the pulse reads back all ones.
#[derive(Debug, Clone, Copy)]
pub struct UartStatus {
    echo: u8,
}

impl UartStatus {
    /// The raw byte the transport received while the reset byte went out.
    pub fn echo(&self) -> u8 {
        self.echo
    }
}

impl OneWireStatus for UartStatus {
    fn presence(&self) -> bool {
        self.echo != RESET_PULSE && self.echo != SLOT_HIGH
    }

    fn line_fault(&self) -> bool {
        self.echo == SLOT_HIGH
    }
}

/// A 1-Wire bus master over a byte-oriented serial transport.
///
/// Owns the transport and, when configured, the [BusMutex] serializing multi-step transactions
/// between logical callers sharing the physical line. The default `NoopMutex` compiles the
/// guard away for unshared buses.
pub struct OneWireUart<T, M = NoopMutex> {
    pub(crate) uart: T,
    pub(crate) mutex: M,
    pub(crate) reset_baudrate: u32,
    pub(crate) data_baudrate: u32,
}

impl<T> OneWireUart<T> {
    /// Creates a new [`OneWireUart`] over the given transport, with the standard
    /// 9600/115200 baud pair and no bus guard.
    pub fn new(uart: T) -> Self {
        OneWireUart {
            uart,
            mutex: NoopMutex,
            reset_baudrate: ONEWIRE_RESET_BAUDRATE,
            data_baudrate: ONEWIRE_DATA_BAUDRATE,
        }
    }
}

impl<T, M> OneWireUart<T, M> {
    /// Overrides the reset-slot and data-slot baud rates.
    ///
    /// Useful for transports whose clocking cannot hit the standard pair exactly; both rates
    /// must keep the byte framing inside the 1-Wire slot tolerances.
    pub fn with_baudrates(mut self, reset_baudrate: u32, data_baudrate: u32) -> Self {
        self.reset_baudrate = reset_baudrate;
        self.data_baudrate = data_baudrate;
        self
    }

    /// Installs a bus guard serializing multi-step transactions across callers
    /// sharing this physical bus.
    pub fn with_mutex<N: BusMutex>(self, mutex: N) -> OneWireUart<T, N> {
        OneWireUart {
            uart: self.uart,
            mutex,
            reset_baudrate: self.reset_baudrate,
            data_baudrate: self.data_baudrate,
        }
    }

    /// Returns the transport, consuming the handle.
    pub fn release(self) -> T {
        self.uart
    }
}

impl<T: UartTransport, M> OneWireUart<T, M> {
    /// Initializes the transport and pins the working (data) baud rate.
    ///
    /// Must be called once before the first bus operation.
    pub fn init(&mut self) -> Result<(), T::Error> {
        self.uart.init()?;
        self.uart.set_baudrate(self.data_baudrate)
    }

    /// Deinitializes the transport. The handle must not be used afterwards
    /// until [init](OneWireUart::init) is called again.
    pub fn deinit(&mut self) -> Result<(), T::Error> {
        self.uart.deinit()
    }
}
