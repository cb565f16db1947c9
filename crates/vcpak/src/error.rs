use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no Controller Pak detected")]
    NoDevice,
    #[error("could not probe Controller Pak banks: {0}")]
    DeviceProbeFailed(#[source] io::Error),
    #[error("pak image not found: {}", .0.display())]
    ImageNotFound(PathBuf),
    #[error("pak image needs {image_banks} banks but the Controller Pak has {device_banks}")]
    ImageTooLarge {
        image_banks: usize,
        device_banks: usize,
    },
    #[error("transfer failed at bank {bank}: {actual} of {expected} bytes")]
    BankIo {
        bank: usize,
        expected: usize,
        actual: usize,
    },
    #[error("could not allocate a bank buffer")]
    AllocationFailed,
    #[error("could not create directory {}: {source}", .path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session record is corrupted (magic {magic:#010x})")]
    Corrupted { magic: u32 },
    #[error("no session record")]
    NotFound,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<cpak::FormatError> for Error {
    fn from(err: cpak::FormatError) -> Self {
        match err {
            cpak::FormatError::AllocationFailed(_) => Error::AllocationFailed,
            other => Error::Io(io::Error::new(io::ErrorKind::InvalidData, other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
