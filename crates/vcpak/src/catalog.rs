//! Per-game catalog of virtual pak images.
//!
//! Images live at `<saves_dir>/<game id>/<name>.pak`. Nothing is indexed: every
//! [`list`] call rebuilds the catalog from the directory contents.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::game_id::{title_bytes, GameId};

pub const PAK_EXTENSION: &str = "pak";
/// Highest numbered suffix tried before falling back to a timestamp suffix.
pub const MAX_PAK_NUMBER: u32 = 999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub display_name: String,
    pub storage_path: PathBuf,
    pub is_last_used: bool,
}

/// Cursor position in a picker showing "Create new" above the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    CreateNew,
    Entry(usize),
}

#[derive(Debug, Clone)]
pub struct Catalog {
    game_id: GameId,
    saves_dir: PathBuf,
    directory: PathBuf,
    last_used: Option<String>,
    entries: Vec<CatalogEntry>,
    selection: Selection,
}

impl Catalog {
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected_index(&self) -> Option<usize> {
        match self.selection {
            Selection::CreateNew => None,
            Selection::Entry(index) => Some(index),
        }
    }

    pub fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.selected_index().and_then(|index| self.entries.get(index))
    }

    /// Moves the cursor to `selection`. Out-of-range entries are ignored.
    pub fn select(&mut self, selection: Selection) -> bool {
        match selection {
            Selection::Entry(index) if index >= self.entries.len() => false,
            selection => {
                self.selection = selection;
                true
            }
        }
    }

    /// Moves the cursor by `delta` rows, wrapping between "Create new" and the
    /// last entry.
    pub fn move_selection(&mut self, delta: isize) {
        let rows = self.entries.len() as isize + 1;
        let current = match self.selection {
            Selection::CreateNew => 0,
            Selection::Entry(index) => index as isize + 1,
        };
        self.selection = match (current + delta).rem_euclid(rows) {
            0 => Selection::CreateNew,
            row => Selection::Entry(row as usize - 1),
        };
    }

    /// Removes the backing file of entry `index` and returns a fresh listing.
    pub fn delete(self, index: usize) -> Result<Catalog> {
        let entry = self.entries.get(index).ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no catalog entry at index {index}"),
            ))
        })?;
        delete(entry)?;
        list(&self.saves_dir, &self.game_id, self.last_used.as_deref())
    }
}

pub fn game_directory(saves_dir: &Path, game_id: &GameId) -> PathBuf {
    saves_dir.join(game_id.path_component())
}

/// Creates the catalog base directory and the game's directory if missing.
pub fn ensure_storage_layout(saves_dir: &Path, game_id: &GameId) -> Result<PathBuf> {
    let game_dir = game_directory(saves_dir, game_id);
    for dir in [saves_dir, game_dir.as_path()] {
        if dir.is_dir() {
            continue;
        }
        match fs::create_dir(dir) {
            Ok(()) => debug!(path = %dir.display(), "created catalog directory"),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
            Err(source) => {
                return Err(Error::DirectoryCreateFailed {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        }
    }
    Ok(game_dir)
}

/// Lists the game's pak images in directory order.
///
/// The entry named `last_used` is marked and selected; otherwise the first
/// entry is selected, or "Create new" when there are none.
pub fn list(saves_dir: &Path, game_id: &GameId, last_used: Option<&str>) -> Result<Catalog> {
    let directory = game_directory(saves_dir, game_id);
    let last_used = last_used.filter(|name| !name.is_empty());
    let mut entries = Vec::new();
    let mut selection = Selection::CreateNew;

    if directory.is_dir() {
        for dir_entry in fs::read_dir(&directory)? {
            let path = dir_entry?.path();
            if !is_pak_file(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            let is_last_used = last_used == Some(name);
            if is_last_used {
                selection = Selection::Entry(entries.len());
            }
            entries.push(CatalogEntry {
                display_name: name.to_owned(),
                storage_path: path.clone(),
                is_last_used,
            });
        }
    }

    if selection == Selection::CreateNew && !entries.is_empty() {
        selection = Selection::Entry(0);
    }

    debug!(
        game = %game_id,
        count = entries.len(),
        "listed pak catalog"
    );

    Ok(Catalog {
        game_id: *game_id,
        saves_dir: saves_dir.to_path_buf(),
        directory,
        last_used: last_used.map(str::to_owned),
        entries,
        selection,
    })
}

fn is_pak_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(PAK_EXTENSION))
            .unwrap_or(false)
}

/// Title reduced to ASCII letters and digits, or the game code when nothing is left.
pub fn sanitize_title(game_id: &GameId, title: &[u8]) -> String {
    let clean = title_bytes(title)
        .iter()
        .filter(|b| b.is_ascii_alphanumeric())
        .map(|b| *b as char)
        .collect::<String>();

    if clean.is_empty() {
        game_id.to_string()
    } else {
        clean
    }
}

/// Picks `<title>_<NNN>.pak` with the smallest free `NNN` in `1..=999`.
///
/// When all 999 are taken the name falls back to `<title>_<unix time>.pak`,
/// which can collide with a name generated in the same second.
pub fn generate_name(saves_dir: &Path, game_id: &GameId, title: impl AsRef<[u8]>) -> String {
    let clean = sanitize_title(game_id, title.as_ref());
    let directory = game_directory(saves_dir, game_id);

    for number in 1..=MAX_PAK_NUMBER {
        let name = format!("{clean}_{number:03}.{PAK_EXTENSION}");
        if !directory.join(&name).exists() {
            return name;
        }
    }

    let name = format!("{clean}_{}.{PAK_EXTENSION}", Utc::now().timestamp());
    warn!(
        game = %game_id,
        %name,
        "numbered pak names exhausted, using timestamp name"
    );
    name
}

/// Removes an entry's backing file. Re-list afterwards.
pub fn delete(entry: &CatalogEntry) -> Result<()> {
    fs::remove_file(&entry.storage_path)?;
    info!(path = %entry.storage_path.display(), "deleted pak image");
    Ok(())
}

/// Creates a new formatted pak image for the game and returns its entry.
///
/// Never overwrites: an existing file with the generated name is an error.
pub fn create_new_pak(
    saves_dir: &Path,
    game_id: &GameId,
    title: impl AsRef<[u8]>,
) -> Result<CatalogEntry> {
    let game_dir = ensure_storage_layout(saves_dir, game_id)?;
    let name = generate_name(saves_dir, game_id, title);
    let path = game_dir.join(&name);

    let image = cpak::build_empty_image()?;
    let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    file.write_all(&image)?;
    file.sync_all()?;

    info!(path = %path.display(), "created empty pak image");
    Ok(CatalogEntry {
        display_name: name,
        storage_path: path,
        is_last_used: false,
    })
}
