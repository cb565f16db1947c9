//! Bank-by-bank copies between a pak image file and the physical pak.
//!
//! Only one bank is buffered at a time, and every failure names the bank it
//! happened on. Neither direction keeps state between calls.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use cpak::{banks_for_len, BANK_SIZE};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// The device-access layer for one physical pak in one controller port.
pub trait PakDevice {
    fn is_present(&mut self) -> bool;

    /// Number of banks the inserted pak holds.
    fn probe_banks(&mut self) -> io::Result<usize>;

    /// Reads bank `bank` into `buf`, returning the number of bytes read.
    fn read_bank(&mut self, bank: usize, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes `data` at the start of bank `bank`, returning the number of bytes written.
    fn write_bank(&mut self, bank: usize, data: &[u8]) -> io::Result<usize>;

    /// Drops any mounted filesystem view so it cannot write stale cached data back.
    fn invalidate_cached_view(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankProgress {
    pub bank: usize,
    pub total_banks: usize,
    pub bytes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub banks: usize,
    pub bytes: u64,
}

/// Restores `image` onto the physical pak.
pub fn push<D: PakDevice + ?Sized>(image: &Path, device: &mut D) -> Result<TransferReport> {
    push_with_progress(image, device, |_| {})
}

pub fn push_with_progress<D, F>(
    image: &Path,
    device: &mut D,
    mut on_bank: F,
) -> Result<TransferReport>
where
    D: PakDevice + ?Sized,
    F: FnMut(BankProgress),
{
    debug!(path = %image.display(), "push: starting");

    if !device.is_present() {
        return Err(Error::NoDevice);
    }
    device.invalidate_cached_view();

    let mut file = match File::open(image) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(Error::ImageNotFound(image.to_path_buf()))
        }
        Err(err) => return Err(err.into()),
    };

    let len = file.metadata()?.len();
    if len == 0 {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("pak image {} is empty", image.display()),
        )));
    }
    let total_banks = banks_for_len(len) as usize;

    let device_banks = device.probe_banks().map_err(Error::DeviceProbeFailed)?;
    debug!(len, total_banks, device_banks, "push: sized image");
    if total_banks > device_banks {
        return Err(Error::ImageTooLarge {
            image_banks: total_banks,
            device_banks,
        });
    }

    let mut buf = bank_buffer()?;
    let mut report = TransferReport::default();

    for bank in 0..total_banks {
        let expected = (len - report.bytes).min(BANK_SIZE as u64) as usize;

        let filled = read_fully(&mut file, &mut buf[..expected]).map_err(|(actual, err)| {
            error!(bank, %err, "push: reading image failed");
            Error::BankIo {
                bank,
                expected,
                actual,
            }
        })?;
        if filled != expected {
            error!(bank, expected, filled, "push: image ended early");
            return Err(Error::BankIo {
                bank,
                expected,
                actual: filled,
            });
        }

        let written = device.write_bank(bank, &buf[..filled]).map_err(|err| {
            error!(bank, %err, "push: bank write failed");
            Error::BankIo {
                bank,
                expected: filled,
                actual: 0,
            }
        })?;
        if written != filled {
            error!(bank, expected = filled, written, "push: short bank write");
            return Err(Error::BankIo {
                bank,
                expected: filled,
                actual: written,
            });
        }

        report.banks += 1;
        report.bytes += filled as u64;
        on_bank(BankProgress {
            bank,
            total_banks,
            bytes: filled,
        });
    }

    info!(path = %image.display(), banks = report.banks, "push: complete");
    Ok(report)
}

/// Backs the physical pak up into `image`, replacing its previous contents.
///
/// The data is staged next to `image` and renamed over it only once every bank
/// has been copied, so a failed pull leaves the previous image untouched.
pub fn pull<D: PakDevice + ?Sized>(image: &Path, device: &mut D) -> Result<TransferReport> {
    pull_with_progress(image, device, |_| {})
}

pub fn pull_with_progress<D, F>(
    image: &Path,
    device: &mut D,
    mut on_bank: F,
) -> Result<TransferReport>
where
    D: PakDevice + ?Sized,
    F: FnMut(BankProgress),
{
    debug!(path = %image.display(), "pull: starting");

    if !device.is_present() {
        return Err(Error::NoDevice);
    }

    let total_banks = match device.probe_banks() {
        Ok(banks) if banks > 0 => banks,
        Ok(_) => {
            warn!("pull: device reported no banks, backing up one bank");
            1
        }
        Err(err) => {
            warn!(%err, "pull: bank probe failed, backing up one bank");
            1
        }
    };

    let mut buf = bank_buffer()?;
    let staging = staging_path(image);
    let mut file = File::create(&staging)?;

    let copied = copy_banks(device, &mut file, &mut buf, total_banks, &mut on_bank)
        .and_then(|report| {
            file.sync_all()?;
            Ok(report)
        });
    drop(file);

    let report = match copied {
        Ok(report) => report,
        Err(err) => {
            if let Err(remove_err) = fs::remove_file(&staging) {
                warn!(path = %staging.display(), %remove_err, "pull: could not remove staging file");
            }
            return Err(err);
        }
    };
    fs::rename(&staging, image)?;

    info!(path = %image.display(), banks = report.banks, "pull: complete");
    Ok(report)
}

fn copy_banks<D, W, F>(
    device: &mut D,
    out: &mut W,
    buf: &mut [u8],
    total_banks: usize,
    on_bank: &mut F,
) -> Result<TransferReport>
where
    D: PakDevice + ?Sized,
    W: Write,
    F: FnMut(BankProgress),
{
    let mut report = TransferReport::default();

    for bank in 0..total_banks {
        let read = device.read_bank(bank, buf).map_err(|err| {
            error!(bank, %err, "pull: bank read failed");
            Error::BankIo {
                bank,
                expected: BANK_SIZE,
                actual: 0,
            }
        })?;
        if read != BANK_SIZE {
            error!(bank, expected = BANK_SIZE, read, "pull: short bank read");
            return Err(Error::BankIo {
                bank,
                expected: BANK_SIZE,
                actual: read,
            });
        }

        write_fully(out, buf).map_err(|(actual, err)| {
            error!(bank, %err, "pull: writing image failed");
            Error::BankIo {
                bank,
                expected: BANK_SIZE,
                actual,
            }
        })?;

        report.banks += 1;
        report.bytes += BANK_SIZE as u64;
        on_bank(BankProgress {
            bank,
            total_banks,
            bytes: BANK_SIZE,
        });
    }

    Ok(report)
}

fn bank_buffer() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(BANK_SIZE)
        .map_err(|_| Error::AllocationFailed)?;
    buf.resize(BANK_SIZE, 0);
    Ok(buf)
}

fn staging_path(image: &Path) -> PathBuf {
    let mut name = image.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    image.with_file_name(name)
}

/// Fills `buf` until it is full or the reader reaches end of file. On error
/// the bytes already read are returned alongside it.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::result::Result<usize, (usize, io::Error)> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err((filled, err)),
        }
    }
    Ok(filled)
}

fn write_fully<W: Write>(writer: &mut W, data: &[u8]) -> std::result::Result<(), (usize, io::Error)> {
    let mut written = 0;
    while written < data.len() {
        match writer.write(&data[written..]) {
            Ok(0) => {
                return Err((
                    written,
                    io::Error::new(io::ErrorKind::WriteZero, "image file accepted no bytes"),
                ))
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err((written, err)),
        }
    }
    Ok(())
}
