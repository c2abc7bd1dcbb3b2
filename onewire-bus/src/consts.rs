//! ROM and memory command constants fixed by the 1-Wire standard.

/// Command to read the scratchpad of the addressed device.
pub const ONEWIRE_READ_SCRATCHPAD_CMD: u8 = 0xbe;

/// Command to write to the scratchpad of the addressed device.
pub const ONEWIRE_WRITE_SCRATCHPAD_CMD: u8 = 0x4e;

/// Command to copy the scratchpad of the addressed device into its EEPROM.
pub const ONEWIRE_COPY_SCRATCHPAD_CMD: u8 = 0x48;

/// Command to recall EEPROM contents into the scratchpad.
pub const ONEWIRE_RECALL_EEPROM_CMD: u8 = 0xb8;

/// Command to query whether the addressed device is parasite powered.
pub const ONEWIRE_READ_POWER_SUPPLY_CMD: u8 = 0xb4;

/// Command to search for devices on the 1-Wire bus.
pub const ONEWIRE_SEARCH_CMD: u8 = 0xf0;

/// Command to search for devices in alarm state on the 1-Wire bus.
pub const ONEWIRE_CONDITIONAL_SEARCH_CMD: u8 = 0xec;

/// Command to read the ROM address of the only device on a single-drop bus.
pub const ONEWIRE_READ_ROM_CMD: u8 = 0x33;

/// Command to match a specific ROM address in 1-Wire communication.
pub const ONEWIRE_MATCH_ROM_CMD: u8 = 0x55;

/// Command to skip ROM addressing and select every device on the bus.
pub const ONEWIRE_SKIP_ROM_CMD: u8 = 0xcc;
