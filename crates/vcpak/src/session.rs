//! Launch and return of a game session.

use std::path::PathBuf;

use tracing::{error, info};

use crate::error::Result;
use crate::game_id::GameId;
use crate::journal::{SessionJournal, SessionRecord};
use crate::transfer::{self, PakDevice, TransferReport};

#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub game_id: GameId,
    pub game_title: Vec<u8>,
    pub rom_path: PathBuf,
    pub pak_path: PathBuf,
}

/// Restores the selected image onto the physical pak and records the session.
///
/// The game may only boot on `Ok`. Any restore failure, including an image
/// that is missing or too large for the pak, blocks the launch and leaves no
/// session record behind.
///
/// The record is written after the restore rather than before it, so a dirty
/// record never points at a half-restored pak. Keep this order.
pub fn start_session<D: PakDevice + ?Sized>(
    journal: &SessionJournal,
    device: &mut D,
    request: &LaunchRequest,
) -> Result<SessionRecord> {
    let record = SessionRecord::new(
        request.game_id,
        &request.game_title,
        request.rom_path.clone(),
        request.pak_path.clone(),
    );
    // Encode first so an unrepresentable record fails before the pak is touched.
    record.encode()?;

    let report = transfer::push(&record.pak_path, device).map_err(|err| {
        error!(%err, pak = %record.pak_path.display(), "restore failed, launch blocked");
        err
    })?;
    journal.begin_session(&record)?;

    info!(
        game = %record.game_id,
        banks = report.banks,
        "pak restored, session in progress"
    );
    Ok(record)
}

/// Backs the physical pak up into the session's image and clears the record.
/// On failure the record stays so recovery can retry.
pub fn finish_session<D: PakDevice + ?Sized>(
    journal: &SessionJournal,
    device: &mut D,
) -> Result<(SessionRecord, TransferReport)> {
    let record = journal.load()?;
    let report = transfer::pull(&record.pak_path, device)?;
    journal.end_session()?;

    info!(game = %record.game_id, banks = report.banks, "session finished");
    Ok((record, report))
}
