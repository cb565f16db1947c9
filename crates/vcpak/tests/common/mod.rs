#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};

use cpak::BANK_SIZE;
use vcpak::{GameId, PakDevice};

/// In-memory pak with injectable faults.
#[derive(Debug, Default)]
pub struct MockDevice {
    pub present: bool,
    pub data: Vec<u8>,
    pub probe_error: bool,
    pub reported_banks: Option<usize>,
    pub short_write_at: Option<usize>,
    pub short_read_at: Option<usize>,
    pub writes: Vec<usize>,
    pub reads: Vec<usize>,
    pub invalidated: usize,
}

impl MockDevice {
    pub fn with_banks(banks: usize) -> Self {
        Self {
            present: true,
            data: vec![0u8; banks * BANK_SIZE],
            ..Self::default()
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn banks(&self) -> usize {
        self.data.len() / BANK_SIZE
    }

    pub fn fill_pattern(&mut self) {
        for (i, byte) in self.data.iter_mut().enumerate() {
            *byte = (i / BANK_SIZE) as u8 ^ (i as u8);
        }
    }
}

impl PakDevice for MockDevice {
    fn is_present(&mut self) -> bool {
        self.present
    }

    fn probe_banks(&mut self) -> io::Result<usize> {
        if self.probe_error {
            return Err(io::Error::new(io::ErrorKind::Other, "probe failed"));
        }
        Ok(self.reported_banks.unwrap_or_else(|| self.banks()))
    }

    fn read_bank(&mut self, bank: usize, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.push(bank);
        let start = bank * BANK_SIZE;
        let len = buf.len().min(BANK_SIZE);
        let len = if self.short_read_at == Some(bank) {
            len / 2
        } else {
            len
        };
        let Some(src) = self.data.get(start..start + len) else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "bank out of range"));
        };
        buf[..len].copy_from_slice(src);
        Ok(len)
    }

    fn write_bank(&mut self, bank: usize, data: &[u8]) -> io::Result<usize> {
        self.writes.push(bank);
        let len = if self.short_write_at == Some(bank) {
            data.len() / 2
        } else {
            data.len().min(BANK_SIZE)
        };
        let start = bank * BANK_SIZE;
        let Some(dst) = self.data.get_mut(start..start + len) else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "bank out of range"));
        };
        dst.copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn invalidate_cached_view(&mut self) {
        self.invalidated += 1;
    }
}

pub fn game() -> GameId {
    GameId::from("NSME")
}

/// Writes an image of `banks` banks whose bytes differ per bank.
pub fn write_image(path: &Path, banks: usize) -> PathBuf {
    let bytes = (0..banks * BANK_SIZE)
        .map(|i| (i / BANK_SIZE) as u8 ^ 0x5A ^ (i as u8))
        .collect::<Vec<_>>();
    std::fs::write(path, bytes).expect("write image");
    path.to_path_buf()
}
