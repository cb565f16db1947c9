use crate::PAGE_SIZE;

pub const NOTE_COUNT: usize = 16;
pub const NOTE_SIZE: usize = 32;
pub const NOTE_TABLE_SIZE: usize = NOTE_COUNT * NOTE_SIZE;

const _: () = assert!(NOTE_TABLE_SIZE == 2 * PAGE_SIZE);

/// The sixteen note records. Records are not interpreted beyond telling an
/// all-zero (unused) slot from an occupied one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteTable {
    bytes: [u8; NOTE_TABLE_SIZE],
}

impl Default for NoteTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl NoteTable {
    pub fn empty() -> Self {
        Self {
            bytes: [0u8; NOTE_TABLE_SIZE],
        }
    }

    /// Panics if `bytes` is shorter than [`NOTE_TABLE_SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut table = [0u8; NOTE_TABLE_SIZE];
        table.copy_from_slice(&bytes[..NOTE_TABLE_SIZE]);
        Self { bytes: table }
    }

    pub fn as_bytes(&self) -> &[u8; NOTE_TABLE_SIZE] {
        &self.bytes
    }

    pub fn note(&self, index: usize) -> &[u8] {
        &self.bytes[index * NOTE_SIZE..(index + 1) * NOTE_SIZE]
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.note(index).iter().any(|b| *b != 0)
    }

    pub fn used_count(&self) -> usize {
        (0..NOTE_COUNT).filter(|i| self.is_used(*i)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.used_count() == 0
    }
}
