//! Allocation table: one two-byte `(bank, page)` entry per page of bank 0.

use crate::{PAGES_PER_BANK, PAGE_SIZE, RESERVED_PAGES};

pub const FAT_ENTRIES: usize = PAGE_SIZE / 2;
/// First entry covered by the checksum, i.e. the first non-reserved page.
pub const CHECKSUM_START: usize = RESERVED_PAGES;
/// Byte of entry 0 holding the running checksum.
pub const CHECKSUM_OFFSET: usize = 1;

const _: () = assert!(FAT_ENTRIES == PAGES_PER_BANK);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    /// System page (ID area, allocation table or note table).
    Reserved,
    /// Last page of a note's chain.
    Terminator,
    /// Unused page.
    Free,
    /// Next page of a note's chain.
    Next { bank: u8, page: u8 },
}

impl FatEntry {
    pub fn from_bytes(bank: u8, page: u8) -> Self {
        match (bank, page) {
            (0, 0) => FatEntry::Reserved,
            (0, 1) => FatEntry::Terminator,
            (0, 3) => FatEntry::Free,
            (bank, page) => FatEntry::Next { bank, page },
        }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        match self {
            FatEntry::Reserved => [0, 0],
            FatEntry::Terminator => [0, 1],
            FatEntry::Free => [0, 3],
            FatEntry::Next { bank, page } => [bank, page],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationTable {
    page: [u8; PAGE_SIZE],
}

impl AllocationTable {
    /// Table of an empty single-bank pak: reserved system pages, every other
    /// page free, checksum filled in.
    pub fn empty() -> Self {
        let mut table = Self {
            page: [0u8; PAGE_SIZE],
        };
        for index in CHECKSUM_START..FAT_ENTRIES {
            table.set_entry(index, FatEntry::Free);
        }
        table.update_checksum();
        table
    }

    /// Reads a table from the first [`PAGE_SIZE`] bytes of `bytes`.
    ///
    /// Panics if `bytes` is shorter than a page.
    pub fn from_page(bytes: &[u8]) -> Self {
        let mut page = [0u8; PAGE_SIZE];
        page.copy_from_slice(&bytes[..PAGE_SIZE]);
        Self { page }
    }

    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.page
    }

    /// Entry 0 shares its bytes with the checksum and always reads as reserved.
    pub fn entry(&self, index: usize) -> FatEntry {
        if index == 0 {
            return FatEntry::Reserved;
        }
        FatEntry::from_bytes(self.page[index * 2], self.page[index * 2 + 1])
    }

    pub fn set_entry(&mut self, index: usize, entry: FatEntry) {
        assert!(index > 0 && index < FAT_ENTRIES, "entry {index} is not addressable");
        self.page[index * 2..index * 2 + 2].copy_from_slice(&entry.to_bytes());
    }

    pub fn entries(&self) -> impl Iterator<Item = FatEntry> + '_ {
        (0..FAT_ENTRIES).map(|index| self.entry(index))
    }

    pub fn free_pages(&self) -> usize {
        self.entries().filter(|e| *e == FatEntry::Free).count()
    }

    pub fn stored_checksum(&self) -> u8 {
        self.page[CHECKSUM_OFFSET]
    }

    pub fn computed_checksum(&self) -> u8 {
        checksum(&self.page, CHECKSUM_START)
    }

    pub fn update_checksum(&mut self) {
        self.page[CHECKSUM_OFFSET] = self.computed_checksum();
    }

    pub fn is_valid(&self) -> bool {
        self.stored_checksum() == self.computed_checksum()
    }
}

/// Byte sum, modulo 256, of every entry from `start` to the end of the table.
pub fn checksum(page: &[u8], start: usize) -> u8 {
    page[start * 2..FAT_ENTRIES * 2]
        .iter()
        .fold(0u8, |acc, byte| acc.wrapping_add(*byte))
}
