//! The 32-byte ID record.
//!
//! Layout, all multi-byte fields big-endian:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 24 | serial |
//! | 24 | 2 | device id |
//! | 26 | 2 | bank size |
//! | 28 | 2 | checksum 1 |
//! | 30 | 2 | checksum 2 |

use byteorder::{BigEndian, ByteOrder};

pub const ID_RECORD_SIZE: usize = 32;
/// Offsets of the four copies inside page 0 (blocks 1, 3, 4 and 6, pattern `0x5A`).
pub const ID_RECORD_OFFSETS: [usize; 4] = [0x20, 0x60, 0x80, 0xC0];
pub const SERIAL_LEN: usize = 24;
pub const DEFAULT_SERIAL: &[u8] = b"N64MENUVPAK";

const CHECKSUM_WORDS: usize = 14;
const CHECKSUM_BASE: u16 = 0xFFF2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRecord {
    pub serial: [u8; SERIAL_LEN],
    pub device_id: u16,
    pub bank_size: u16,
    pub checksum1: u16,
    pub checksum2: u16,
}

impl IdRecord {
    /// Builds a record with correct checksums. `serial` is truncated to 24 bytes.
    pub fn new(serial: &[u8], device_id: u16, bank_size: u16) -> Self {
        let mut padded = [0u8; SERIAL_LEN];
        let len = serial.len().min(SERIAL_LEN);
        padded[..len].copy_from_slice(&serial[..len]);

        let mut record = Self {
            serial: padded,
            device_id,
            bank_size,
            checksum1: 0,
            checksum2: 0,
        };
        record.update_checksums();
        record
    }

    /// The record written into freshly formatted single-bank images.
    pub fn for_empty_pak() -> Self {
        Self::new(DEFAULT_SERIAL, 0x0001, 0x0100)
    }

    pub fn update_checksums(&mut self) {
        let (checksum1, checksum2) = checksums(&self.to_bytes());
        self.checksum1 = checksum1;
        self.checksum2 = checksum2;
    }

    pub fn is_valid(&self) -> bool {
        verify(&self.to_bytes())
    }

    pub fn to_bytes(&self) -> [u8; ID_RECORD_SIZE] {
        let mut buf = [0u8; ID_RECORD_SIZE];
        buf[..SERIAL_LEN].copy_from_slice(&self.serial);
        BigEndian::write_u16(&mut buf[24..26], self.device_id);
        BigEndian::write_u16(&mut buf[26..28], self.bank_size);
        BigEndian::write_u16(&mut buf[28..30], self.checksum1);
        BigEndian::write_u16(&mut buf[30..32], self.checksum2);
        buf
    }

    pub fn from_bytes(bytes: &[u8; ID_RECORD_SIZE]) -> Self {
        let mut serial = [0u8; SERIAL_LEN];
        serial.copy_from_slice(&bytes[..SERIAL_LEN]);
        Self {
            serial,
            device_id: BigEndian::read_u16(&bytes[24..26]),
            bank_size: BigEndian::read_u16(&bytes[26..28]),
            checksum1: BigEndian::read_u16(&bytes[28..30]),
            checksum2: BigEndian::read_u16(&bytes[30..32]),
        }
    }
}

/// Computes both checksums over the first 14 big-endian words of `record`.
///
/// Checksum 1 is the low 16 bits of the word sum, checksum 2 is
/// `0xFFF2 - checksum1` modulo 2^16.
pub fn checksums(record: &[u8; ID_RECORD_SIZE]) -> (u16, u16) {
    let sum = record[..CHECKSUM_WORDS * 2]
        .chunks_exact(2)
        .fold(0u32, |acc, word| acc + u32::from(BigEndian::read_u16(word)));
    let checksum1 = (sum & 0xFFFF) as u16;
    (checksum1, CHECKSUM_BASE.wrapping_sub(checksum1))
}

/// Consumer-side check of one stored record.
pub fn verify(record: &[u8; ID_RECORD_SIZE]) -> bool {
    let (checksum1, checksum2) = checksums(record);
    BigEndian::read_u16(&record[28..30]) == checksum1
        && BigEndian::read_u16(&record[30..32]) == checksum2
}
