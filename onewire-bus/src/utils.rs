#[derive(Debug, Default)]
/// Calculate CRC-8 used in 1-Wire communications.
///
/// The polynomial is the Dallas/Maxim x⁸+x⁵+x⁴+1 in reflected form (`0x8c`),
/// matching the CRC embedded in the last byte of every ROM address.
pub struct OneWireCrc(u8);

/// Lookup table for the reflected `0x8c` polynomial, one entry per input byte.
#[cfg(feature = "crc-table")]
const CRC_TABLE: [u8; 256] = crc_table();

#[cfg(feature = "crc-table")]
const fn crc_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut byte = 0usize;
    while byte < 256 {
        let mut crc = byte as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x1 == 0x1 {
                (crc >> 1) ^ 0x8c
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[byte] = crc;
        byte += 1;
    }
    table
}

impl OneWireCrc {
    /// Get the current CRC value.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Update the CRC with the incoming byte.
    #[cfg(not(feature = "crc-table"))]
    pub fn update(&mut self, byte: u8) {
        let mut crc = self.0 ^ byte; // XOR the byte with the current CRC value
        for _ in 0..8 {
            if crc & 0x1 == 0x1 {
                crc = (crc >> 1) ^ 0x8c; // Polynomial for CRC-8
            } else {
                crc >>= 1;
            }
        }
        self.0 = crc;
    }

    /// Update the CRC with the incoming byte.
    #[cfg(feature = "crc-table")]
    pub fn update(&mut self, byte: u8) {
        self.0 = CRC_TABLE[(self.0 ^ byte) as usize];
    }

    /// Compute the CRC of a byte sequence in one call.
    pub fn compute(data: &[u8]) -> u8 {
        let mut crc = OneWireCrc::default();
        for &byte in data.iter() {
            crc.update(byte);
        }
        crc.0
    }

    /// Validate a sequence of bytes where the last byte is the 1-Wire CRC of
    /// the previous bytes.
    pub fn validate(sequence: &[u8]) -> bool {
        Self::compute(sequence) == 0x0 // A trailing CRC byte folds the whole sequence to 0
    }
}

#[cfg(test)]
mod tests {
    use super::OneWireCrc;
    use rand::Rng;
    use std::vec::Vec;

    #[test]
    fn known_vector() {
        // ROM example from the Maxim CRC application note (family 0x02).
        let rom = [0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(OneWireCrc::compute(&rom), 0xa2);
        let full = [0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00, 0xa2];
        assert!(OneWireCrc::validate(&full));
    }

    #[test]
    fn empty_and_zero() {
        assert_eq!(OneWireCrc::compute(&[]), 0x00);
        assert!(OneWireCrc::validate(&[0x00]));
    }

    #[test]
    fn appended_crc_folds_to_zero() {
        let mut rng = rand::rng();
        for len in 1..32usize {
            let data: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            let mut extended = data.clone();
            extended.push(OneWireCrc::compute(&data));
            assert!(OneWireCrc::validate(&extended));
        }
    }

    #[test]
    fn corruption_is_detected() {
        let mut rng = rand::rng();
        let mut data: Vec<u8> = (0..8).map(|_| rng.random()).collect();
        let crc = OneWireCrc::compute(&data[..7]);
        data[7] = crc;
        assert!(OneWireCrc::validate(&data));
        data[3] ^= 0x10; // single flipped bit
        assert!(!OneWireCrc::validate(&data));
    }

    #[test]
    fn incremental_matches_oneshot() {
        let mut rng = rand::rng();
        let data: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        let mut crc = OneWireCrc::default();
        for &byte in data.iter() {
            crc.update(byte);
        }
        assert_eq!(crc.value(), OneWireCrc::compute(&data));
    }
}
