//! Startup recovery after a session that never returned.

use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::journal::{SessionJournal, SessionRecord};
use crate::transfer::{self, PakDevice, TransferReport};

#[derive(Debug)]
pub enum RecoveryOutcome {
    /// No dirty record; nothing to do.
    Clean,
    /// The physical pak was backed up into the record's image and the record cleared.
    Recovered {
        record: SessionRecord,
        report: TransferReport,
    },
    /// No physical pak is inserted. Someone has to choose between retrying and
    /// discarding; the record stays until they do.
    AwaitingDecision(PendingRecovery),
    /// A record exists but does not validate. It is left in place.
    Corrupted { magic: u32 },
}

/// A dirty session that could not be recovered because no pak was inserted.
#[derive(Debug)]
#[must_use = "the session record stays in place until retried or discarded"]
pub struct PendingRecovery {
    record: SessionRecord,
}

impl PendingRecovery {
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Runs recovery again, typically after the pak has been inserted.
    pub fn retry<D: PakDevice + ?Sized>(
        self,
        journal: &SessionJournal,
        device: &mut D,
    ) -> Result<RecoveryOutcome> {
        recover(journal, device)
    }

    /// Clears the record without backing anything up. Whatever the game wrote
    /// to the pak during the interrupted session is not copied back.
    pub fn discard(self, journal: &SessionJournal) -> Result<SessionRecord> {
        warn!(
            game = %self.record.game_id,
            pak = %self.record.pak_path.display(),
            "discarding unrecovered session"
        );
        journal.end_session()?;
        Ok(self.record)
    }
}

/// Inspects the journal and, for a validated dirty record, backs the physical
/// pak up into the record's image.
///
/// A failed backup is returned as an error with the record left in place so
/// the next startup tries again.
pub fn recover<D: PakDevice + ?Sized>(
    journal: &SessionJournal,
    device: &mut D,
) -> Result<RecoveryOutcome> {
    let record = match journal.load() {
        Ok(record) => record,
        Err(Error::NotFound) => return Ok(RecoveryOutcome::Clean),
        Err(Error::Corrupted { magic }) => {
            warn!(path = %journal.path().display(), magic, "session record is corrupted");
            return Ok(RecoveryOutcome::Corrupted { magic });
        }
        Err(err) => return Err(err),
    };

    if !record.is_dirty {
        return Ok(RecoveryOutcome::Clean);
    }

    info!(
        game = %record.game_id,
        pak = %record.pak_path.display(),
        "previous session did not end cleanly"
    );

    if !device.is_present() {
        warn!("no Controller Pak inserted, recovery needs a decision");
        return Ok(RecoveryOutcome::AwaitingDecision(PendingRecovery { record }));
    }

    match transfer::pull(&record.pak_path, device) {
        Ok(report) => {
            journal.end_session()?;
            info!(banks = report.banks, "recovered previous session");
            Ok(RecoveryOutcome::Recovered { record, report })
        }
        Err(Error::NoDevice) => {
            warn!("Controller Pak removed during recovery, recovery needs a decision");
            Ok(RecoveryOutcome::AwaitingDecision(PendingRecovery { record }))
        }
        Err(err) => {
            error!(%err, "recovery backup failed, keeping session record");
            Err(err)
        }
    }
}
