use crate::{
    ONEWIRE_CONDITIONAL_SEARCH_CMD, ONEWIRE_SEARCH_CMD, OneWire, OneWireStatus,
    error::OneWireError, utils::OneWireCrc,
};

/// A structure for searching devices on a 1-Wire bus.
/// This structure implements the search algorithm for discovering devices on the 1-Wire bus.
/// It maintains the state of the search: the ROM buffer of the last found device and the
/// discrepancy cursor deciding which branch of the address tree the next pass follows.
pub struct OneWireSearch<'a, T> {
    onewire: &'a mut T,
    cmd: u8,
    last_device: bool,
    last_discrepancy: u8,
    last_family_discrepancy: u8,
    family: u8,
    rom: [u8; 8],
}

#[repr(u8)]
/// Type of search performed using [`OneWireSearch`] or [`OneWireSearchAsync`](crate::OneWireSearchAsync).
pub enum OneWireSearchKind {
    /// Normal search
    Normal = ONEWIRE_SEARCH_CMD,
    /// Search only for devices with alarm
    Alarmed = ONEWIRE_CONDITIONAL_SEARCH_CMD,
}

impl<T> core::fmt::Debug for OneWireSearch<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OneWireSearch")
            .field("cmd", &self.cmd)
            .field("last_device", &self.last_device)
            .field("last_discrepancy", &self.last_discrepancy)
            .field("last_family_discrepancy", &self.last_family_discrepancy)
            .field("family", &self.family)
            .field("rom", &self.rom)
            .finish()
    }
}

impl<'a, T> OneWireSearch<'a, T> {
    /// Creates a new [`OneWireSearch`] instance.
    ///
    /// Constructing the search is the "search reset": the discrepancy cursor starts at 0 and the
    /// first [next](OneWireSearch::next) call begins a fresh enumeration.
    ///
    /// # Arguments
    /// * `onewire` - A mutable reference to a type that implements the `OneWire` trait.
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

    /// Creates a new [`OneWireSearch`] instance targeting a specific family code.
    ///
    /// Seeds the ROM buffer with the family code and pins the discrepancy cursor past the last
    /// bit, so the first pass steers towards the requested family and enumeration stops at the
    /// first device outside it.
    ///
    /// # Arguments
    /// * `onewire` - A mutable reference to a type that implements the `OneWire` trait.
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

    /// Resets the search state, so the next [next](OneWireSearch::next) call starts a new
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
    /// the next [next](OneWireSearch::next) call continues with the next family on the bus.
    pub fn skip_family(&mut self) {
        self.last_discrepancy = self.last_family_discrepancy;
        self.last_family_discrepancy = 0;
        if self.last_discrepancy == 0 {
            self.last_device = true; // No other family branch left on the bus
        }
    }
}

impl<T: OneWire> OneWireSearch<'_, T> {
    /// Searches for devices on the 1-Wire bus.
    /// This method implements the [1-Wire search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html) to discover devices connected to the bus.
    /// The [next](OneWireSearch::next) method can be called repeatedly to find all devices on the bus.
    /// At the end of the search, calling this method will return `None` to indicate that no more
    /// devices are present, and keeps returning `None` until the state is
    /// [restarted](OneWireSearch::restart).
    ///
    /// The whole pass runs under the bus guard ([protect](OneWire::protect)/
    /// [unprotect](OneWire::unprotect)), released on every exit path.
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
    pub fn next(&mut self) -> Result<Option<u64>, OneWireError<T::BusError>> {
        if self.last_device {
            return Ok(None); // If the last device was found, return None
        }
        self.onewire.protect();
        let res = self.advance();
        self.onewire.unprotect();
        res
    }

    /// One guarded search pass: reset, search command, 64 bit triplets, CRC check.
    fn advance(&mut self) -> Result<Option<u64>, OneWireError<T::BusError>> {
        let status = self.onewire.reset()?;
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
        self.onewire.write_byte(self.cmd)?; // Search ROM command
        let completed = loop {
            // Every device still in the pass drives its address bit and then its complement.
            let id_bit = self.onewire.read_bit()?;
            let complement_bit = self.onewire.read_bit()?;
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
            self.onewire.write_bit(set)?;

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
    /// [next](OneWireSearch::next) starts a new enumeration.
    pub fn verify(&mut self, rom: u64) -> Result<bool, OneWireError<T::BusError>> {
        self.restart();
        self.rom = rom.to_le_bytes(); // Set the ROM to verify
        self.last_discrepancy = 64; // Replay every discrepancy from the given ROM
        let res = self.next()?;
        self.restart();
        Ok(res == Some(rom))
    }
}

#[cfg(test)]
mod tests {
    use super::{OneWireSearch, OneWireSearchKind};
    use crate::{
        ONEWIRE_CONDITIONAL_SEARCH_CMD, ONEWIRE_SEARCH_CMD, OneWire, OneWireError, OneWireResult,
        OneWireStatus, utils::OneWireCrc,
    };
    use rand::Rng;
    use std::vec;
    use std::vec::Vec;

    struct MockStatus(bool);

    impl OneWireStatus for MockStatus {
        fn presence(&self) -> bool {
            self.0
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Slot {
        IdBit,
        CmpBit,
        Direction,
    }

    /// A bus of simulated devices with wired-AND collision behavior during search.
    struct MockBus {
        roms: Vec<[u8; 8]>,
        alarmed: Vec<bool>,
        alive: Vec<bool>,
        pos: u8,
        slot: Slot,
        searching: bool,
    }

    impl MockBus {
        fn new(roms: &[[u8; 8]]) -> Self {
            Self {
                roms: roms.to_vec(),
                alarmed: vec![false; roms.len()],
                alive: vec![false; roms.len()],
                pos: 0,
                slot: Slot::IdBit,
                searching: false,
            }
        }

        fn rom_bit(rom: &[u8; 8], pos: u8) -> bool {
            rom[(pos / 8) as usize] >> (pos % 8) & 1 != 0
        }

        /// Wired-AND of the (optionally complemented) address bit over all candidates.
        fn line(&self, complement: bool) -> bool {
            let mut line = true;
            for (i, rom) in self.roms.iter().enumerate() {
                if self.alive[i] {
                    line &= Self::rom_bit(rom, self.pos) ^ complement;
                }
            }
            line
        }
    }

    impl OneWire for MockBus {
        type Status = MockStatus;
        type BusError = core::convert::Infallible;

        fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError> {
            self.searching = false;
            if self.roms.is_empty() {
                return Err(OneWireError::NoDevicePresent);
            }
            Ok(MockStatus(true))
        }

        fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
            if byte == ONEWIRE_SEARCH_CMD || byte == ONEWIRE_CONDITIONAL_SEARCH_CMD {
                self.searching = true;
                self.pos = 0;
                self.slot = Slot::IdBit;
                self.alive = if byte == ONEWIRE_CONDITIONAL_SEARCH_CMD {
                    self.alarmed.clone()
                } else {
                    vec![true; self.roms.len()]
                };
            }
            Ok(())
        }

        fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
            Ok(0xff)
        }

        fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
            assert!(self.searching, "write slot outside a search pass");
            assert!(self.slot == Slot::Direction, "write slot out of order");
            for (i, rom) in self.roms.iter().enumerate() {
                if self.alive[i] && Self::rom_bit(rom, self.pos) != bit {
                    self.alive[i] = false; // Disagreeing devices withdraw from the pass
                }
            }
            self.pos += 1;
            self.slot = Slot::IdBit;
            Ok(())
        }

        fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
            assert!(self.searching, "read slot outside a search pass");
            let bit = match self.slot {
                Slot::IdBit => {
                    self.slot = Slot::CmpBit;
                    self.line(false)
                }
                Slot::CmpBit => {
                    self.slot = Slot::Direction;
                    self.line(true)
                }
                Slot::Direction => panic!("read slot where a write slot was due"),
            };
            Ok(bit)
        }
    }

    fn rom(family: u8, serial: u64) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0] = family;
        bytes[1..7].copy_from_slice(&serial.to_le_bytes()[..6]);
        bytes[7] = OneWireCrc::compute(&bytes[..7]);
        bytes
    }

    fn collect<T: OneWire>(search: &mut OneWireSearch<'_, T>) -> Vec<u64>
    where
        T::BusError: core::fmt::Debug,
    {
        let mut found = Vec::new();
        while let Some(id) = search.next().unwrap() {
            found.push(id);
        }
        found
    }

    #[test]
    fn enumerates_every_device_once() {
        let mut rng = rand::rng();
        let mut roms: Vec<[u8; 8]> = (0..5)
            .map(|_| rom(0x28, rng.random_range(0..(1u64 << 48))))
            .collect();
        roms.sort_unstable();
        roms.dedup();
        let mut bus = MockBus::new(&roms);
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        let found = collect(&mut search);
        assert_eq!(found.len(), roms.len());
        let mut expected: Vec<u64> = roms.iter().map(|r| u64::from_le_bytes(*r)).collect();
        expected.sort_unstable();
        let mut got = found.clone();
        got.sort_unstable();
        assert_eq!(got, expected);
        // Exhaustion is stable, not an error.
        assert!(search.next().unwrap().is_none());
        assert!(search.next().unwrap().is_none());
    }

    #[test]
    fn order_is_deterministic_low_branch_first() {
        let roms = [rom(0x28, 2), rom(0x28, 1), rom(0x28, 3)];
        let mut bus = MockBus::new(&roms);
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        let found = collect(&mut search);
        // At every discrepancy the 0-branch is taken first: serial 2 (bit 0 clear)
        // precedes serials 1 and 3, which split one bit later.
        let expected: Vec<u64> = [roms[0], roms[1], roms[2]]
            .iter()
            .map(|r| u64::from_le_bytes(*r))
            .collect();
        assert_eq!(found, expected);

        search.restart();
        assert_eq!(collect(&mut search), expected);
    }

    #[test]
    fn single_device_then_exhausted() {
        let roms = [rom(0x10, 0xbeef)];
        let mut bus = MockBus::new(&roms);
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        assert_eq!(search.next().unwrap(), Some(u64::from_le_bytes(roms[0])));
        // No discrepancy was recorded, so the cursor stayed 0 and the search is over.
        assert_eq!(search.next().unwrap(), None);
        assert_eq!(search.next().unwrap(), None);
    }

    #[test]
    fn empty_bus_reports_no_device() {
        let mut bus = MockBus::new(&[]);
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        assert!(matches!(
            search.next(),
            Err(OneWireError::NoDevicePresent)
        ));
    }

    #[test]
    fn corrupted_rom_aborts_the_pass() {
        let mut bad = rom(0x28, 0x1234);
        bad[7] ^= 0xff;
        let mut bus = MockBus::new(&[bad]);
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        assert!(matches!(search.next(), Err(OneWireError::InvalidCrc)));
    }

    #[test]
    fn ghost_all_zero_rom_is_rejected() {
        let mut bus = MockBus::new(&[[0u8; 8]]);
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        assert!(matches!(
            search.next(),
            Err(OneWireError::NoDevicePresent)
        ));
    }

    #[test]
    fn alarm_search_sees_only_alarmed_devices() {
        let roms = [rom(0x28, 10), rom(0x28, 11), rom(0x28, 12)];
        let mut bus = MockBus::new(&roms);
        bus.alarmed[1] = true;
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Alarmed);
        let found = collect(&mut search);
        assert_eq!(found, vec![u64::from_le_bytes(roms[1])]);
    }

    #[test]
    fn family_targeted_search() {
        let roms = [rom(0x10, 77), rom(0x28, 99)];
        let mut bus = MockBus::new(&roms);
        let mut search = OneWireSearch::with_family(&mut bus, OneWireSearchKind::Normal, 0x28);
        assert_eq!(search.next().unwrap(), Some(u64::from_le_bytes(roms[1])));
        assert_eq!(search.next().unwrap(), None);

        let mut bus = MockBus::new(&roms);
        let mut search = OneWireSearch::with_family(&mut bus, OneWireSearchKind::Normal, 0x05);
        assert_eq!(search.next().unwrap(), None);
    }

    #[test]
    fn skip_family_moves_to_next_family() {
        let roms = [rom(0x10, 1), rom(0x10, 2), rom(0x28, 3)];
        let mut bus = MockBus::new(&roms);
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        let first = search.next().unwrap().unwrap();
        assert_eq!(first & 0xff, 0x10);
        search.skip_family();
        let second = search.next().unwrap().unwrap();
        assert_eq!(second & 0xff, 0x28);
        assert_eq!(search.next().unwrap(), None);
    }

    #[test]
    fn verify_known_and_unknown_rom() {
        let roms = [rom(0x28, 500), rom(0x28, 501)];
        let mut bus = MockBus::new(&roms);
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        assert!(search.verify(u64::from_le_bytes(roms[1])).unwrap());
        assert!(!search.verify(u64::from_le_bytes(rom(0x28, 502))).unwrap());
        // Verification resets the state; a fresh enumeration starts over.
        let found = collect(&mut search);
        assert_eq!(found.len(), 2);
    }

    /// Bus that counts guard calls and fails every read slot, for exit-path checks.
    struct GuardBus {
        protects: usize,
        unprotects: usize,
        fail_reads: bool,
    }

    impl OneWire for GuardBus {
        type Status = MockStatus;
        type BusError = ();

        fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError> {
            Ok(MockStatus(true))
        }

        fn write_byte(&mut self, _byte: u8) -> OneWireResult<(), Self::BusError> {
            Ok(())
        }

        fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
            Ok(0xff)
        }

        fn write_bit(&mut self, _bit: bool) -> OneWireResult<(), Self::BusError> {
            Ok(())
        }

        fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
            if self.fail_reads {
                Err(OneWireError::Other(()))
            } else {
                Ok(true) // Both slots read 1: every candidate withdrew
            }
        }

        fn protect(&mut self) {
            self.protects += 1;
        }

        fn unprotect(&mut self) {
            self.unprotects += 1;
        }
    }

    #[test]
    fn guard_released_on_transport_error() {
        let mut bus = GuardBus {
            protects: 0,
            unprotects: 0,
            fail_reads: true,
        };
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        assert!(matches!(search.next(), Err(OneWireError::Other(()))));
        assert_eq!(bus.protects, 1);
        assert_eq!(bus.unprotects, 1);
    }

    #[test]
    fn guard_released_on_lost_candidates() {
        let mut bus = GuardBus {
            protects: 0,
            unprotects: 0,
            fail_reads: false,
        };
        let mut search = OneWireSearch::new(&mut bus, OneWireSearchKind::Normal);
        assert!(matches!(
            search.next(),
            Err(OneWireError::NoDevicePresent)
        ));
        assert_eq!(bus.protects, 1);
        assert_eq!(bus.unprotects, 1);
    }
}
