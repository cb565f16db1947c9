//! Virtual Controller Pak manager.
//!
//! Keeps any number of pak images per game on disk and swaps them onto the one
//! physical pak around a game session. Before a game boots the chosen image is
//! restored onto the pak ([`start_session`]); when the session ends the pak is
//! backed up into the same image ([`finish_session`]). A journal record written
//! just before boot lets [`recover`] finish the backup at the next startup if
//! the session never returned.

pub mod catalog;
pub mod config;
pub mod device;
pub mod error;
pub mod game_id;
pub mod journal;
pub mod recovery;
pub mod session;
pub mod transfer;

pub use catalog::{Catalog, CatalogEntry, Selection};
pub use config::{load_config, Config};
pub use device::DumpDevice;
pub use error::{Error, Result};
pub use game_id::GameId;
pub use journal::{SessionJournal, SessionRecord};
pub use recovery::{recover, PendingRecovery, RecoveryOutcome};
pub use session::{finish_session, start_session, LaunchRequest};
pub use transfer::{pull, push, BankProgress, PakDevice, TransferReport};
