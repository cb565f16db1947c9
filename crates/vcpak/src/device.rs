use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use cpak::{BANK_SIZE, MAX_BANKS};
use tracing::debug;

use crate::transfer::PakDevice;

/// A physical pak represented by its raw dump file, as emulators and dumping
/// tools store it. The pak is "inserted" while the file exists.
#[derive(Debug, Clone)]
pub struct DumpDevice {
    path: PathBuf,
    port: u8,
}

impl DumpDevice {
    pub fn new(path: impl Into<PathBuf>, port: u8) -> Self {
        Self {
            path: path.into(),
            port,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    fn bank_offset(&mut self, bank: usize) -> io::Result<u64> {
        let banks = self.probe_banks()?;
        if bank >= banks {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bank {bank} is past the end of a {banks} bank pak"),
            ));
        }
        Ok((bank * BANK_SIZE) as u64)
    }
}

impl PakDevice for DumpDevice {
    fn is_present(&mut self) -> bool {
        self.path.is_file()
    }

    fn probe_banks(&mut self) -> io::Result<usize> {
        let len = self.path.metadata()?.len();
        if len == 0 || len % BANK_SIZE as u64 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} bytes is not a whole number of banks", len),
            ));
        }
        Ok(((len / BANK_SIZE as u64) as usize).min(MAX_BANKS))
    }

    fn read_bank(&mut self, bank: usize, buf: &mut [u8]) -> io::Result<usize> {
        let offset = self.bank_offset(bank)?;
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;

        let want = buf.len().min(BANK_SIZE);
        let mut filled = 0;
        while filled < want {
            match file.read(&mut buf[filled..want])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    fn write_bank(&mut self, bank: usize, data: &[u8]) -> io::Result<usize> {
        let offset = self.bank_offset(bank)?;
        let data = &data[..data.len().min(BANK_SIZE)];

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.sync_data()?;
        Ok(data.len())
    }

    fn invalidate_cached_view(&mut self) {
        debug!(port = self.port, path = %self.path.display(), "dump device keeps no cached view");
    }
}
