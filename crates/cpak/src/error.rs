use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("could not allocate a {0} byte image buffer")]
    AllocationFailed(usize),
    #[error("image length {len} is not a whole, non-zero number of banks")]
    BadLength { len: usize },
    #[error("ID record copy at offset {offset:#04x} fails its checksum")]
    IdChecksum { offset: usize },
    #[error("allocation table checksum mismatch: stored {stored:#04x}, computed {computed:#04x}")]
    FatChecksum { stored: u8, computed: u8 },
}

pub type Result<T> = std::result::Result<T, FormatError>;
