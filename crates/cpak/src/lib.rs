//! Controller Pak image format.
//!
//! A pak image is a whole number of 32 KiB banks. Bank 0 carries the structures
//! the console-side filesystem checks before it agrees to mount a pak: the ID
//! record (replicated four times in page 0), the allocation table and its backup
//! (pages 1-2) and the note table and its backup (pages 3-4). Every page after
//! those belongs to the games that write to the pak.
//!
//! The crate only knows enough of the format to build a structurally valid empty
//! image and to run the same checksum validation the consumer runs. Save data is
//! treated as opaque bytes.

pub mod error;
pub mod fat;
pub mod id;
pub mod image;
pub mod notes;

pub use error::{FormatError, Result};
pub use fat::{AllocationTable, FatEntry};
pub use id::IdRecord;
pub use image::{build_empty_image, format_bank, inspect_image, validate_image, ImageSummary};
pub use notes::NoteTable;

/// Size of one bank, the unit of transfer to and from the physical device.
pub const BANK_SIZE: usize = 32 * 1024;
/// Size of one page, the unit the allocation table addresses.
pub const PAGE_SIZE: usize = 256;
pub const PAGES_PER_BANK: usize = BANK_SIZE / PAGE_SIZE;
/// Largest bank count a physical pak reports.
pub const MAX_BANKS: usize = 62;

pub const ID_PAGE: usize = 0;
pub const FAT_PAGE: usize = 1;
pub const FAT_BACKUP_PAGE: usize = 2;
pub const NOTE_PAGE: usize = 3;
pub const NOTE_BACKUP_PAGE: usize = 4;
/// ID page, both allocation table pages and both note table pages.
pub const RESERVED_PAGES: usize = 5;

/// Number of banks needed to hold `len` bytes, rounding a partial bank up.
pub fn banks_for_len(len: u64) -> u64 {
    len.div_ceil(BANK_SIZE as u64)
}

pub(crate) fn page(bank: &[u8], index: usize) -> &[u8] {
    &bank[index * PAGE_SIZE..(index + 1) * PAGE_SIZE]
}

pub(crate) fn page_mut(bank: &mut [u8], index: usize) -> &mut [u8] {
    &mut bank[index * PAGE_SIZE..(index + 1) * PAGE_SIZE]
}
