//! The single "session in progress" record.
//!
//! The record is written just before a game boots and removed once the pak has
//! been backed up again. Finding it at startup means the last session never
//! returned cleanly.
//!
//! On-disk layout, 577 bytes, integers big-endian, strings NUL-terminated
//! within their field:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 4 | magic `"VCPS"` |
//! | 4 | 5 | game code |
//! | 9 | 21 | game title |
//! | 30 | 256 | ROM path |
//! | 286 | 256 | pak path |
//! | 542 | 4 | launch time, unix seconds |
//! | 546 | 1 | dirty flag |
//! | 547 | 30 | reserved |

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::game_id::{title_bytes, until_nul, GameId, GAME_ID_LEN};

pub const STATE_MAGIC: u32 = 0x5643_5053;
pub const RECORD_SIZE: usize = 577;

const MAGIC_OFFSET: usize = 0;
const GAME_CODE_OFFSET: usize = 4;
const GAME_CODE_FIELD: usize = 5;
const TITLE_OFFSET: usize = 9;
const TITLE_FIELD: usize = 21;
const ROM_PATH_OFFSET: usize = 30;
const PAK_PATH_OFFSET: usize = 286;
const PATH_FIELD: usize = 256;
const TIMESTAMP_OFFSET: usize = 542;
const DIRTY_OFFSET: usize = 546;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub game_id: GameId,
    /// Raw header bytes, at most twenty, without the terminating NUL.
    pub game_title: Vec<u8>,
    pub rom_path: PathBuf,
    pub pak_path: PathBuf,
    pub timestamp: u32,
    pub is_dirty: bool,
}

impl SessionRecord {
    /// A dirty record stamped with the current time. The title is cut to the
    /// twenty bytes of a ROM header field.
    pub fn new(
        game_id: GameId,
        game_title: impl AsRef<[u8]>,
        rom_path: impl Into<PathBuf>,
        pak_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            game_id,
            game_title: title_bytes(game_title.as_ref()).to_vec(),
            rom_path: rom_path.into(),
            pak_path: pak_path.into(),
            timestamp: Utc::now().timestamp().clamp(0, i64::from(u32::MAX)) as u32,
            is_dirty: true,
        }
    }

    /// The title for display. Bytes that are not UTF-8 show as U+FFFD.
    pub fn title_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.game_title)
    }

    pub fn launched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0)
    }

    pub fn encode(&self) -> Result<[u8; RECORD_SIZE]> {
        let mut buf = [0u8; RECORD_SIZE];
        buf[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&STATE_MAGIC.to_be_bytes());
        buf[GAME_CODE_OFFSET..GAME_CODE_OFFSET + GAME_ID_LEN]
            .copy_from_slice(self.game_id.as_bytes());
        put_str(&mut buf, TITLE_OFFSET, TITLE_FIELD, "game title", &self.game_title)?;
        put_str(&mut buf, ROM_PATH_OFFSET, PATH_FIELD, "ROM path", path_bytes(&self.rom_path)?)?;
        put_str(&mut buf, PAK_PATH_OFFSET, PATH_FIELD, "pak path", path_bytes(&self.pak_path)?)?;
        buf[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[DIRTY_OFFSET] = u8::from(self.is_dirty);
        Ok(buf)
    }

    /// Decodes a record. A short buffer or a wrong magic value is `Corrupted`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let magic = bytes
            .get(MAGIC_OFFSET..MAGIC_OFFSET + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .unwrap_or(0);
        if magic != STATE_MAGIC || bytes.len() < RECORD_SIZE {
            return Err(Error::Corrupted { magic });
        }

        let code = &bytes[GAME_CODE_OFFSET..GAME_CODE_OFFSET + GAME_CODE_FIELD];
        Ok(Self {
            game_id: GameId::from_bytes(&code[..GAME_ID_LEN]),
            game_title: title_bytes(&bytes[TITLE_OFFSET..TITLE_OFFSET + TITLE_FIELD]).to_vec(),
            rom_path: PathBuf::from(get_str(bytes, ROM_PATH_OFFSET, PATH_FIELD)),
            pak_path: PathBuf::from(get_str(bytes, PAK_PATH_OFFSET, PATH_FIELD)),
            timestamp: u32::from_be_bytes([
                bytes[TIMESTAMP_OFFSET],
                bytes[TIMESTAMP_OFFSET + 1],
                bytes[TIMESTAMP_OFFSET + 2],
                bytes[TIMESTAMP_OFFSET + 3],
            ]),
            is_dirty: bytes[DIRTY_OFFSET] != 0,
        })
    }
}

fn path_bytes(path: &Path) -> Result<&[u8]> {
    path.to_str().map(str::as_bytes).ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not valid UTF-8", path.display()),
        ))
    })
}

/// Copies `value` into a field, leaving room for the terminating NUL.
fn put_str(buf: &mut [u8], offset: usize, field: usize, what: &str, value: &[u8]) -> Result<()> {
    if value.len() >= field || value.contains(&0) {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} does not fit a {} byte record field", field - 1),
        )));
    }
    buf[offset..offset + value.len()].copy_from_slice(value);
    Ok(())
}

fn get_str(buf: &[u8], offset: usize, field: usize) -> String {
    String::from_utf8_lossy(until_nul(&buf[offset..offset + field])).into_owned()
}

/// Handle on the journal file of one storage root.
#[derive(Debug, Clone)]
pub struct SessionJournal {
    path: PathBuf,
}

impl SessionJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_root(root: &Path, config: &Config) -> Self {
        Self::new(config.state_path(root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists `record` as dirty, replacing any earlier record.
    pub fn begin_session(&self, record: &SessionRecord) -> Result<()> {
        let mut record = record.clone();
        record.is_dirty = true;
        let bytes = record.encode()?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("tmp");
        {
            let mut file = File::create(&staging)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;

        info!(
            path = %self.path.display(),
            game = %record.game_id,
            pak = %record.pak_path.display(),
            "session started"
        );
        Ok(())
    }

    /// Removes the record. Having no record is not an error.
    pub fn end_session(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "session record cleared");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn load(&self) -> Result<SessionRecord> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no session record");
                return Err(Error::NotFound);
            }
            Err(err) => return Err(err.into()),
        };

        let record = SessionRecord::decode(&bytes).map_err(|err| {
            warn!(path = %self.path.display(), %err, "session record rejected");
            err
        })?;
        debug!(game = %record.game_id, dirty = record.is_dirty, "loaded session record");
        Ok(record)
    }

    /// True only for a record that loads, validates and is marked dirty.
    pub fn is_dirty(&self) -> bool {
        matches!(self.load(), Ok(record) if record.is_dirty)
    }
}
