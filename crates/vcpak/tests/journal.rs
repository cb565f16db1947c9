mod common;

use std::fs;
use std::path::PathBuf;

use common::game;
use tempfile::tempdir;
use vcpak::journal::RECORD_SIZE;
use vcpak::{Config, Error, SessionJournal, SessionRecord};

fn record(pak: &str) -> SessionRecord {
    SessionRecord::new(game(), "SUPER MARIO 64", "sd:/roms/mario.z64", pak)
}

#[test]
fn begun_session_loads_back_dirty() {
    let tempdir = tempdir().expect("temp dir");
    let journal = SessionJournal::for_root(tempdir.path(), &Config::default());
    let mut written = record("sd:/cpak_saves/NSME/SUPERMARIO64_001.pak");
    written.is_dirty = false;

    journal.begin_session(&written).expect("begin session");

    assert_eq!(journal.path(), tempdir.path().join("menu/vcpak_state.dat"));
    assert_eq!(
        fs::metadata(journal.path()).expect("record").len(),
        RECORD_SIZE as u64
    );
    let loaded = journal.load().expect("load");
    assert!(loaded.is_dirty);
    assert_eq!(loaded.game_id, game());
    assert_eq!(loaded.game_title, b"SUPER MARIO 64");
    assert_eq!(loaded.rom_path, PathBuf::from("sd:/roms/mario.z64"));
    assert_eq!(loaded.pak_path, written.pak_path);
    assert_eq!(loaded.timestamp, written.timestamp);
    assert!(journal.is_dirty());
}

#[test]
fn ended_session_is_not_found() {
    let tempdir = tempdir().expect("temp dir");
    let journal = SessionJournal::new(tempdir.path().join("state.dat"));

    journal.begin_session(&record("a.pak")).expect("begin session");
    journal.end_session().expect("end session");

    assert!(matches!(journal.load(), Err(Error::NotFound)));
    assert!(!journal.is_dirty());
    journal.end_session().expect("ending twice is fine");
}

#[test]
fn foreign_magic_is_corrupted_and_not_dirty() {
    let tempdir = tempdir().expect("temp dir");
    let journal = SessionJournal::new(tempdir.path().join("state.dat"));
    journal.begin_session(&record("a.pak")).expect("begin session");

    let mut bytes = fs::read(journal.path()).expect("read record");
    bytes[..4].copy_from_slice(b"JUNK");
    fs::write(journal.path(), &bytes).expect("write record");

    assert!(matches!(
        journal.load(),
        Err(Error::Corrupted { magic }) if magic == u32::from_be_bytes(*b"JUNK")
    ));
    assert!(!journal.is_dirty());
    assert!(journal.path().exists());
}

#[test]
fn truncated_record_is_corrupted() {
    let tempdir = tempdir().expect("temp dir");
    let journal = SessionJournal::new(tempdir.path().join("state.dat"));
    journal.begin_session(&record("a.pak")).expect("begin session");

    let bytes = fs::read(journal.path()).expect("read record");
    fs::write(journal.path(), &bytes[..RECORD_SIZE - 1]).expect("write record");

    assert!(matches!(journal.load(), Err(Error::Corrupted { .. })));
}

#[test]
fn new_session_replaces_previous_record() {
    let tempdir = tempdir().expect("temp dir");
    let journal = SessionJournal::new(tempdir.path().join("state.dat"));

    journal.begin_session(&record("first.pak")).expect("first session");
    journal.begin_session(&record("second.pak")).expect("second session");

    assert_eq!(
        journal.load().expect("load").pak_path,
        PathBuf::from("second.pak")
    );
    assert!(!tempdir.path().join("state.tmp").exists());
}

#[test]
fn unrepresentable_record_is_not_written() {
    let tempdir = tempdir().expect("temp dir");
    let journal = SessionJournal::new(tempdir.path().join("state.dat"));

    let err = journal
        .begin_session(&record(&"x".repeat(300)))
        .unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert!(matches!(journal.load(), Err(Error::NotFound)));
}
