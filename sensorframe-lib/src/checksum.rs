use crc::{Crc, CRC_8_MAXIM_DOW};

/// Maxim/Dallas 1-Wire CRC-8: reflected poly 0x31, init 0x00, no final xor.
const CRC8_MAXIM: Crc<u8> = Crc::<u8>::new(&CRC_8_MAXIM_DOW);

/// Compute the Maxim/Dallas CRC-8 of `dat`.
///
/// An empty slice produces the initial value, 0.
///
/// # Example
/// ```
/// assert_eq!(sensorframe::checksum(b"123456789"), 0xa1);
/// ```
#[must_use]
pub fn checksum(dat: &[u8]) -> u8 {
    CRC8_MAXIM.checksum(dat)
}

/// Checksum algorithm used to validate a frame.
///
/// Implementations are given the frame bytes from the sync marker through the last
/// payload byte and return the value expected in the trailing checksum byte.
pub trait IntegrityAlgorithm: Send + Sync {
    fn compute(&self, dat: &[u8]) -> u8;

    /// Validate a complete frame whose last byte is the checksum.
    fn verify(&self, frame: &[u8]) -> bool {
        match frame.split_last() {
            Some((expected, dat)) => self.compute(dat) == *expected,
            None => false,
        }
    }
}

/// The Maxim/Dallas CRC-8 used by the sensor firmware.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultChecksum;

impl IntegrityAlgorithm for DefaultChecksum {
    fn compute(&self, dat: &[u8]) -> u8 {
        checksum(dat)
    }
}
