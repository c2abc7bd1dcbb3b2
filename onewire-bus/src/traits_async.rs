#![allow(async_fn_in_trait)]
use crate::{
    OneWireError, OneWireResult, OneWireStatus,
    consts::{ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_ROM_CMD, ONEWIRE_SKIP_ROM_CMD},
    utils::OneWireCrc,
};

/// Trait for asynchronous 1-Wire communication.
/// This trait defines the basic operations required for 1-Wire communication, such as resetting
/// the bus, writing and reading bytes, and writing and reading bits, plus the composite ROM
/// addressing sequences built on top of them.
pub trait OneWireAsync {
    /// The status type returned by the reset operation.
    /// This type must implement the [OneWireStatus] trait.
    type Status: OneWireStatus;
    /// The error type returned by the operations of this trait.
    /// This type is used to indicate errors in the underlying transport or communication.
    type BusError;

    /// Resets the 1-Wire bus and returns the status of the bus.
    ///
    /// A reset against a bus without devices never succeeds: implementations must return
    /// [OneWireError::NoDevicePresent] when nothing answers the presence window, and
    /// [OneWireError::LineFault] when the window is garbled.
    ///
    /// # Returns
    /// A result containing the status of the bus after the reset operation.
    ///
    /// # Errors
    /// This method returns an error if the reset operation fails.
    async fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError>;

    /// Writes a byte to the 1-Wire bus, least-significant bit first.
    /// # Arguments
    /// * `byte` - The byte to write to the bus.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    async fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError>;

    /// Reads a byte from the 1-Wire bus, least-significant bit first.
    /// # Returns
    /// Byte read from the bus.
    ///
    /// # Errors
    /// This method returns an error if the read operation fails.
    async fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError>;

    /// Writes a single bit to the 1-Wire bus.
    /// # Arguments
    /// * `bit` - The bit to write.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    async fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError>;

    /// Reads a single bit from the 1-Wire bus.
    /// # Returns
    /// The bit read from the bus.
    /// # Errors
    /// This method returns an error if the read operation fails.
    async fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Acquire exclusive access to the bus for a multi-step transaction.
    ///
    /// A no-op unless the implementation is configured with a bus mutex
    /// (see [BusMutex](crate::BusMutex)). The acquire blocks the calling thread; executors
    /// that cannot tolerate that should serialize access upstream instead. Must be paired
    /// with [unprotect](OneWireAsync::unprotect) on every exit path.
    fn protect(&mut self) {}

    /// Release exclusive access to the bus.
    ///
    /// A no-op unless the implementation is configured with a bus mutex.
    fn unprotect(&mut self) {}

    /// Addresses devices on the 1-Wire bus.
    /// Resets the bus, then issues a match-ROM or skip-ROM sequence. The next
    /// [read](OneWireAsync::read_byte)/[write](OneWireAsync::write_byte) operations talk to the
    /// selected device(s). Note: a read after `address(None)` returns wired-AND garbage on a bus
    /// with more than one device.
    ///
    /// Does not take the bus guard by itself: the addressing run is usually followed by a
    /// device command, and the whole sequence belongs in one
    /// [protect](OneWireAsync::protect)/[unprotect](OneWireAsync::unprotect) span.
    ///
    /// # Arguments
    /// * `rom` - The ROM address of the device to address. Pass [`None`] to skip ROM addressing
    ///   and address all devices on the bus.
    ///
    /// # Returns
    /// A result indicating the success or failure of the operation.
    async fn address(&mut self, rom: Option<u64>) -> OneWireResult<(), Self::BusError> {
        let status = self.reset().await?; // Reset the bus before addressing
        if !status.presence() {
            return Err(OneWireError::NoDevicePresent);
        }
        let cmd = if rom.is_some() {
            ONEWIRE_MATCH_ROM_CMD
        } else {
            ONEWIRE_SKIP_ROM_CMD
        };
        self.write_byte(cmd).await?;
        if let Some(rom) = rom {
            for &b in rom.to_le_bytes().iter() {
                self.write_byte(b).await?; // Write each byte of the ROM address
            }
        }
        Ok(())
    }

    /// Reads the ROM address of the only device on a single-drop bus.
    ///
    /// Runs the whole reset + read-ROM sequence under the bus guard and validates the
    /// trailing CRC byte before surfacing the address.
    ///
    /// # Errors
    /// [OneWireError::InvalidCrc] if the received ROM fails validation,
    /// [OneWireError::NoDevicePresent] if nothing answers the reset.
    async fn read_rom(&mut self) -> OneWireResult<u64, Self::BusError> {
        self.protect();
        let res = async {
            let status = self.reset().await?;
            if !status.presence() {
                return Err(OneWireError::NoDevicePresent);
            }
            self.write_byte(ONEWIRE_READ_ROM_CMD).await?;
            let mut rom = [0u8; 8];
            for b in rom.iter_mut() {
                *b = self.read_byte().await?;
            }
            if !OneWireCrc::validate(&rom) {
                return Err(OneWireError::InvalidCrc);
            }
            Ok(u64::from_le_bytes(rom))
        }
        .await;
        self.unprotect();
        res
    }
}
