use crate::error::{FormatError, Result};
use crate::fat::AllocationTable;
use crate::id::{self, IdRecord, ID_RECORD_OFFSETS, ID_RECORD_SIZE};
use crate::notes::{NoteTable, NOTE_TABLE_SIZE};
use crate::{page, page_mut, BANK_SIZE, FAT_BACKUP_PAGE, FAT_PAGE, NOTE_PAGE, PAGE_SIZE};

/// Builds a formatted, empty single-bank image.
pub fn build_empty_image() -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(BANK_SIZE)
        .map_err(|_| FormatError::AllocationFailed(BANK_SIZE))?;
    data.resize(BANK_SIZE, 0);
    format_bank(&mut data)?;
    Ok(data)
}

/// Writes the empty filesystem structures into `bank`, zeroing everything else.
pub fn format_bank(bank: &mut [u8]) -> Result<()> {
    if bank.len() < BANK_SIZE {
        return Err(FormatError::BadLength { len: bank.len() });
    }
    let bank = &mut bank[..BANK_SIZE];
    bank.fill(0);

    let id_record = IdRecord::for_empty_pak().to_bytes();
    for offset in ID_RECORD_OFFSETS {
        bank[offset..offset + ID_RECORD_SIZE].copy_from_slice(&id_record);
    }

    let fat = AllocationTable::empty();
    page_mut(bank, FAT_PAGE).copy_from_slice(fat.as_bytes());
    page_mut(bank, FAT_BACKUP_PAGE).copy_from_slice(fat.as_bytes());

    let notes = NoteTable::empty();
    bank[NOTE_PAGE * PAGE_SIZE..NOTE_PAGE * PAGE_SIZE + NOTE_TABLE_SIZE]
        .copy_from_slice(notes.as_bytes());

    Ok(())
}

/// What the consumer-side checks found in an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub banks: usize,
    pub id_copies_valid: [bool; ID_RECORD_OFFSETS.len()],
    pub fat_stored_checksum: u8,
    pub fat_computed_checksum: u8,
    pub fat_backup_matches: bool,
    pub notes_used: usize,
    pub free_pages: usize,
}

impl ImageSummary {
    pub fn fat_checksum_valid(&self) -> bool {
        self.fat_stored_checksum == self.fat_computed_checksum
    }

    pub fn is_valid(&self) -> bool {
        self.id_copies_valid.iter().all(|valid| *valid) && self.fat_checksum_valid()
    }
}

/// Runs every check and reports the results without failing on the first one.
pub fn inspect_image(bytes: &[u8]) -> Result<ImageSummary> {
    if bytes.is_empty() || bytes.len() % BANK_SIZE != 0 {
        return Err(FormatError::BadLength { len: bytes.len() });
    }
    let bank = &bytes[..BANK_SIZE];

    let mut id_copies_valid = [false; ID_RECORD_OFFSETS.len()];
    for (valid, offset) in id_copies_valid.iter_mut().zip(ID_RECORD_OFFSETS) {
        let mut record = [0u8; ID_RECORD_SIZE];
        record.copy_from_slice(&bank[offset..offset + ID_RECORD_SIZE]);
        *valid = id::verify(&record);
    }

    let fat = AllocationTable::from_page(page(bank, FAT_PAGE));
    let notes = NoteTable::from_bytes(&bank[NOTE_PAGE * PAGE_SIZE..]);

    Ok(ImageSummary {
        banks: bytes.len() / BANK_SIZE,
        id_copies_valid,
        fat_stored_checksum: fat.stored_checksum(),
        fat_computed_checksum: fat.computed_checksum(),
        fat_backup_matches: page(bank, FAT_PAGE) == page(bank, FAT_BACKUP_PAGE),
        notes_used: notes.used_count(),
        free_pages: fat.free_pages(),
    })
}

/// Fails with the first check the consumer would reject the image on.
pub fn validate_image(bytes: &[u8]) -> Result<ImageSummary> {
    let summary = inspect_image(bytes)?;

    if let Some(index) = summary.id_copies_valid.iter().position(|valid| !valid) {
        return Err(FormatError::IdChecksum {
            offset: ID_RECORD_OFFSETS[index],
        });
    }
    if !summary.fat_checksum_valid() {
        return Err(FormatError::FatChecksum {
            stored: summary.fat_stored_checksum,
            computed: summary.fat_computed_checksum,
        });
    }

    Ok(summary)
}
