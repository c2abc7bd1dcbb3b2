use crate::{
    OneWireAsync, OneWireSearchKind, OneWireStatus, error::OneWireError, utils::OneWireCrc,
};

/// A structure for asynchronous searching of devices on a 1-Wire bus.
/// This structure implements the search algorithm for discovering devices on the 1-Wire bus.
/// It maintains the state of the search: the ROM buffer of the last found device and the
/// discrepancy cursor deciding which branch of the address tree the next pass follows.
pub struct OneWireSearchAsync<'a, T> {
    onewire: &'a mut T,
    cmd: u8,
    last_device: bool,
    last_discrepancy: u8,
    last_family_discrepancy: u8,
    family: u8,
    rom: [u8; 8],
}

impl<T> core::fmt::Debug for OneWireSearchAsync<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OneWireSearchAsync")
            .field("cmd", &self.cmd)
            .field("last_device", &self.last_device)
            .field("last_discrepancy", &self.last_discrepancy)
            .field("last_family_discrepancy", &self.last_family_discrepancy)
            .field("family", &self.family)
            .field("rom", &self.rom)
            .finish()
    }
}

impl<'a, T> OneWireSearchAsync<'a, T> {
    /// Creates a new [OneWireSearchAsync] instance.
    ///
    /// Constructing the search is the "search reset": the discrepancy cursor starts at 0 and the
    /// first [next](OneWireSearchAsync::next) call begins a fresh enumeration.
    ///
    /// # Arguments
    /// * `onewire` - A mutable reference to a type that implements the `OneWireAsync` trait.
    /// * `cmd` - The command to use for the search operation (e.g., `0xf0` for normal search, `0xec` for search in alarm state).
    pub fn new(onewire: &'a mut T, cmd: OneWireSearchKind) -> Self {
        Self {
            onewire,
            cmd: cmd as _,
            last_device: false,
            last_discrepancy: 0,
            last_family_discrepancy: 0,
            family: 0, // Initialize family code to 0
            rom: [0; 8],
        }
    }

    /// Creates a new [`OneWireSearchAsync`] instance targeting a specific family code.
    ///
    /// Seeds the ROM buffer with the family code and pins the discrepancy cursor past the last
    /// bit, so the first pass steers towards the requested family and enumeration stops at the
    /// first device outside it.
    ///
    /// # Arguments
    /// * `onewire` - A mutable reference to a type that implements the `OneWireAsync` trait.
    /// * `cmd` - The command to use for the search operation (e.g., `0xf0` for normal search, `0xec` for search in alarm state).
    /// * `family` - The family code of the devices to search for.
    pub fn with_family(onewire: &'a mut T, cmd: OneWireSearchKind, family: u8) -> Self {
        let rom = [family, 0, 0, 0, 0, 0, 0, 0]; // Initialize the ROM with the family code
        Self {
            onewire,
            cmd: cmd as _,
            last_device: false,
            last_discrepancy: 64,
            last_family_discrepancy: 0,
            family,
            rom,
        }
    }

    /// Resets the search state, so the next [next](OneWireSearchAsync::next) call starts a new
    /// enumeration from the beginning.
    pub fn restart(&mut self) {
        self.last_device = false; // Reset the last device flag
        // A family-targeted search re-pins the cursor so the replayed ROM steers the first pass.
        self.last_discrepancy = if self.family != 0 { 64 } else { 0 };
        self.last_family_discrepancy = 0; // Reset the last family discrepancy
        self.rom = [self.family, 0, 0, 0, 0, 0, 0, 0]; // Reset the ROM array
    }

    /// Skips the rest of the family currently being enumerated.
    ///
    /// Rewinds the discrepancy cursor to the last branch point inside the family-code byte, so
    /// the next [next](OneWireSearchAsync::next) call continues with the next family on the bus.
    pub fn skip_family(&mut self) {
        self.last_discrepancy = self.last_family_discrepancy;
        self.last_family_discrepancy = 0;
        if self.last_discrepancy == 0 {
            self.last_device = true; // No other family branch left on the bus
        }
    }
}

impl<T: OneWireAsync> OneWireSearchAsync<'_, T> {
    /// Searches for devices on the 1-Wire bus.
    /// This method implements the [1-Wire search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html) to discover devices connected to the bus.
    /// The [next](OneWireSearchAsync::next) method can be called repeatedly to find all devices on the bus.
    /// At the end of the search, calling this method will return `None` to indicate that no more
    /// devices are present, and keeps returning `None` until the state is
    /// [restarted](OneWireSearchAsync::restart).
    ///
    /// The whole pass runs under the bus guard ([protect](OneWireAsync::protect)/
    /// [unprotect](OneWireAsync::unprotect)), released on every exit path.
    ///
    /// # Returns
    /// A result containing the ROM code of the found device as a `u64` value.
    ///
    /// | Bit | Description |
    /// |-----|-------------|
    /// | 0-7 | Family code (e.g., 0x28 for DS18B20) |
    /// | 8-15 | Serial number (first byte) |
    /// | 16-23 | Serial number (second byte) |
    /// | 24-31 | Serial number (third byte) |
    /// | 32-39 | Serial number (fourth byte) |
    /// | 40-47 | Serial number (fifth byte) |
    /// | 48-55 | Serial number (sixth byte) |
    /// | 56-63 | CRC-8 (`0b1_0001_1001` poly) |
    ///
    /// # Errors
    /// [OneWireError::NoDevicePresent] if nothing answers the reset, or if every remaining
    /// candidate withdrew mid-pass (e.g. a device was unplugged during the scan).
    /// [OneWireError::InvalidCrc] if the assembled ROM fails validation; the pass is aborted
    /// and no address is surfaced.
    #[allow(clippy::should_implement_trait)]
    pub async fn next(&mut self) -> Result<Option<u64>, OneWireError<T::BusError>> {
        if self.last_device {
            return Ok(None); // If the last device was found, return None
        }
        self.onewire.protect();
        let res = self.advance().await;
        self.onewire.unprotect();
        res
    }

    /// One guarded search pass: reset, search command, 64 bit triplets, CRC check.
    async fn advance(&mut self) -> Result<Option<u64>, OneWireError<T::BusError>> {
        let status = self.onewire.reset().await?;
        if status.line_fault() {
            return Err(OneWireError::LineFault);
        }
        if !status.presence() {
            return Err(OneWireError::NoDevicePresent);
        }
        let mut id_bit_num: u8 = 1;
        let mut last_zero: u8 = 0;
        let mut idx: usize = 0; // Index in the ROM array
        let mut rom_mask: u8 = 1; // Mask for the current bit in the ROM byte
        self.onewire.write_byte(self.cmd).await?; // Search ROM command
        let completed = loop {
            // Every device still in the pass drives its address bit and then its complement.
            let id_bit = self.onewire.read_bit().await?;
            let complement_bit = self.onewire.read_bit().await?;
            if id_bit && complement_bit {
                // Both bits are 1: nobody drove the slot, the pass lost all candidates
                break false;
            }
            let set = if id_bit != complement_bit {
                // The bits are different, use the id_bit
                id_bit
            } else {
                // Both bits are 0: discrepancy, pick the branch to follow
                let dir = if id_bit_num < self.last_discrepancy {
                    self.rom[idx] & rom_mask > 0
                } else {
                    id_bit_num == self.last_discrepancy
                };
                if !dir {
                    last_zero = id_bit_num;
                    if last_zero < 9 {
                        self.last_family_discrepancy = last_zero;
                    }
                }
                dir
            };
            if set {
                self.rom[idx] |= rom_mask; // Set the bit in the ROM
            } else {
                self.rom[idx] &= !rom_mask; // Clear the bit in the ROM
            }

            // Committing the bit drops every disagreeing device from the pass.
            self.onewire.write_bit(set).await?;

            id_bit_num += 1;
            rom_mask <<= 1; // Move to the next bit in the ROM byte

            if rom_mask == 0 {
                idx += 1; // Move to the next byte in the ROM
                rom_mask = 1; // Reset the mask for the next byte
            }
            if id_bit_num > 64 {
                self.last_discrepancy = last_zero;
                self.last_device = self.last_discrepancy == 0;
                break true;
            }
        };

        if !completed || self.rom[0] == 0 {
            // The pass died mid-tree, or assembled a ghost address nobody can own.
            return Err(OneWireError::NoDevicePresent);
        }
        if !OneWireCrc::validate(&self.rom) {
            // Bus noise during the pass; the assembled address must not be trusted.
            return Err(OneWireError::InvalidCrc);
        }
        if self.family != 0 && self.rom[0] != self.family {
            // Walked past the targeted family; the family-first branch order
            // guarantees no further matches exist.
            self.last_device = true;
            return Ok(None);
        }
        Ok(Some(u64::from_le_bytes(self.rom)))
    }

    /// Verifies if the device with the given ROM code is present on the 1-Wire bus.
    ///
    /// Replays a search pass with the discrepancy cursor pinned past the last bit, so the pass
    /// can only retrace the given address. Resets the search state, so a subsequent
    /// [next](OneWireSearchAsync::next) starts a new enumeration.
    pub async fn verify(&mut self, rom: u64) -> Result<bool, OneWireError<T::BusError>> {
        self.restart();
        self.rom = rom.to_le_bytes(); // Set the ROM to verify
        self.last_discrepancy = 64; // Replay every discrepancy from the given ROM
        let res = self.next().await?;
        self.restart();
        Ok(res == Some(rom))
    }
}
