mod common;

use std::fs;

use common::game;
use tempfile::tempdir;
use vcpak::catalog::{
    create_new_pak, ensure_storage_layout, game_directory, generate_name, list, sanitize_title,
};
use vcpak::{Error, GameId, Selection};

fn touch_paks(dir: &std::path::Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), b"pak").expect("write pak");
    }
}

#[test]
fn storage_layout_is_created_once() {
    let tempdir = tempdir().expect("temp dir");
    let saves = tempdir.path().join("cpak_saves");

    let first = ensure_storage_layout(&saves, &game()).expect("first layout");
    let second = ensure_storage_layout(&saves, &game()).expect("second layout");

    assert_eq!(first, second);
    assert_eq!(first, saves.join("NSME"));
    assert!(first.is_dir());
}

#[test]
fn storage_layout_reports_blocked_directory() {
    let tempdir = tempdir().expect("temp dir");
    let saves = tempdir.path().join("cpak_saves");
    fs::write(&saves, b"not a directory").expect("write blocker");

    let err = ensure_storage_layout(&saves, &game()).unwrap_err();
    assert!(matches!(err, Error::DirectoryCreateFailed { path, .. } if path == saves));
}

#[test]
fn missing_directory_lists_empty() {
    let tempdir = tempdir().expect("temp dir");
    let catalog = list(tempdir.path(), &game(), None).expect("list");

    assert!(catalog.is_empty());
    assert_eq!(catalog.selection(), Selection::CreateNew);
    assert_eq!(catalog.selected_entry(), None);
}

#[test]
fn last_used_entry_is_marked_and_selected() {
    let tempdir = tempdir().expect("temp dir");
    let dir = ensure_storage_layout(tempdir.path(), &game()).expect("layout");
    touch_paks(&dir, &["Foo_001.pak", "Foo_003.pak", "Foo_009.pak"]);

    let catalog = list(tempdir.path(), &game(), Some("Foo_003.pak")).expect("list");

    assert_eq!(catalog.len(), 3);
    let Selection::Entry(index) = catalog.selection() else {
        panic!("an entry should be selected");
    };
    assert_eq!(catalog.entries()[index].display_name, "Foo_003.pak");
    let selected = catalog.selected_entry().expect("selected entry");
    assert_eq!(selected.display_name, "Foo_003.pak");
    assert!(selected.is_last_used);
    assert_eq!(
        catalog.entries().iter().filter(|entry| entry.is_last_used).count(),
        1
    );
}

#[test]
fn unknown_last_used_selects_first_entry() {
    let tempdir = tempdir().expect("temp dir");
    let dir = ensure_storage_layout(tempdir.path(), &game()).expect("layout");
    touch_paks(&dir, &["Foo_001.pak", "Foo_003.pak", "Foo_009.pak"]);

    let catalog = list(tempdir.path(), &game(), Some("Gone_001.pak")).expect("list");

    assert_eq!(catalog.selection(), Selection::Entry(0));
    assert!(catalog.entries().iter().all(|entry| !entry.is_last_used));
}

#[test]
fn extension_match_ignores_case_and_skips_other_files() {
    let tempdir = tempdir().expect("temp dir");
    let dir = ensure_storage_layout(tempdir.path(), &game()).expect("layout");
    touch_paks(&dir, &["Upper.PAK", "lower.pak", "notes.txt", "pak"]);
    fs::create_dir(dir.join("folder.pak")).expect("create dir");

    let catalog = list(tempdir.path(), &game(), None).expect("list");
    let mut names = catalog
        .entries()
        .iter()
        .map(|entry| entry.display_name.as_str())
        .collect::<Vec<_>>();
    names.sort_unstable();

    assert_eq!(names, ["Upper.PAK", "lower.pak"]);
    for entry in catalog.entries() {
        assert_eq!(entry.storage_path, dir.join(&entry.display_name));
    }
}

#[test]
fn generated_name_takes_next_free_number() {
    let tempdir = tempdir().expect("temp dir");
    let dir = ensure_storage_layout(tempdir.path(), &game()).expect("layout");
    let names = (1..=50).map(|n| format!("Foo_{n:03}.pak")).collect::<Vec<_>>();
    for name in &names {
        fs::write(dir.join(name), b"pak").expect("write pak");
    }

    assert_eq!(generate_name(tempdir.path(), &game(), "Foo"), "Foo_051.pak");

    fs::remove_file(dir.join("Foo_007.pak")).expect("remove pak");
    assert_eq!(generate_name(tempdir.path(), &game(), "Foo"), "Foo_007.pak");
}

#[test]
fn exhausted_numbers_fall_back_to_timestamp() {
    let tempdir = tempdir().expect("temp dir");
    let dir = ensure_storage_layout(tempdir.path(), &game()).expect("layout");
    for n in 1..=999 {
        fs::write(dir.join(format!("Foo_{n:03}.pak")), b"").expect("write pak");
    }

    let before = chrono::Utc::now().timestamp();
    let name = generate_name(tempdir.path(), &game(), "Foo");
    let after = chrono::Utc::now().timestamp();

    let stamp = name
        .strip_prefix("Foo_")
        .and_then(|rest| rest.strip_suffix(".pak"))
        .and_then(|stamp| stamp.parse::<i64>().ok())
        .expect("timestamp suffix");
    assert!((before..=after).contains(&stamp));
}

#[test]
fn title_is_sanitized_or_replaced_by_game_code() {
    assert_eq!(sanitize_title(&game(), b"SUPER MARIO 64"), "SUPERMARIO64");
    assert_eq!(sanitize_title(&game(), b"Zelda: OoT!"), "ZeldaOoT");
    assert_eq!(sanitize_title(&game(), b"  -- !! "), "NSME");
    assert_eq!(sanitize_title(&game(), b""), "NSME");
    // Only the 20-byte header field counts.
    assert_eq!(
        sanitize_title(&game(), b"ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        "ABCDEFGHIJKLMNOPQRST"
    );
    assert_eq!(sanitize_title(&game(), b"AB\0CD"), "AB");
}

#[test]
fn created_pak_is_a_valid_empty_image() {
    let tempdir = tempdir().expect("temp dir");
    let saves = tempdir.path().join("cpak_saves");

    let entry = create_new_pak(&saves, &game(), "SUPER MARIO 64").expect("create pak");

    assert_eq!(entry.display_name, "SUPERMARIO64_001.pak");
    assert_eq!(
        entry.storage_path,
        game_directory(&saves, &game()).join("SUPERMARIO64_001.pak")
    );
    let bytes = fs::read(&entry.storage_path).expect("read pak");
    assert_eq!(bytes.len(), cpak::BANK_SIZE);
    cpak::validate_image(&bytes).expect("valid image");

    let second = create_new_pak(&saves, &game(), "SUPER MARIO 64").expect("second pak");
    assert_eq!(second.display_name, "SUPERMARIO64_002.pak");
    assert_eq!(list(&saves, &game(), None).expect("list").len(), 2);
}

#[test]
fn delete_removes_file_and_relists() {
    let tempdir = tempdir().expect("temp dir");
    let dir = ensure_storage_layout(tempdir.path(), &game()).expect("layout");
    touch_paks(&dir, &["Only.pak"]);

    let catalog = list(tempdir.path(), &game(), Some("Only.pak")).expect("list");
    let catalog = catalog.delete(0).expect("delete");

    assert!(catalog.is_empty());
    assert_eq!(catalog.selection(), Selection::CreateNew);
    assert!(!dir.join("Only.pak").exists());
}

#[test]
fn delete_of_missing_index_fails() {
    let tempdir = tempdir().expect("temp dir");
    let catalog = list(tempdir.path(), &game(), None).expect("list");
    assert!(matches!(catalog.delete(0), Err(Error::Io(_))));
}

#[test]
fn selection_wraps_through_create_new() {
    let tempdir = tempdir().expect("temp dir");
    let dir = ensure_storage_layout(tempdir.path(), &game()).expect("layout");
    touch_paks(&dir, &["A.pak", "B.pak"]);

    let mut catalog = list(tempdir.path(), &game(), None).expect("list");
    assert_eq!(catalog.selection(), Selection::Entry(0));

    catalog.move_selection(-1);
    assert_eq!(catalog.selection(), Selection::CreateNew);
    catalog.move_selection(-1);
    assert_eq!(catalog.selection(), Selection::Entry(1));
    catalog.move_selection(1);
    assert_eq!(catalog.selection(), Selection::CreateNew);
    catalog.move_selection(4);
    assert_eq!(catalog.selection(), Selection::Entry(0));

    assert!(!catalog.select(Selection::Entry(2)));
    assert_eq!(catalog.selection(), Selection::Entry(0));
    assert!(catalog.select(Selection::CreateNew));
    assert_eq!(catalog.selected_index(), None);
}

#[test]
fn game_codes_are_separate_directories() {
    let tempdir = tempdir().expect("temp dir");
    create_new_pak(tempdir.path(), &game(), "Mario").expect("create pak");

    let other = GameId::from("CZLE");
    assert!(list(tempdir.path(), &other, None).expect("list").is_empty());
    assert_eq!(list(tempdir.path(), &game(), None).expect("list").len(), 1);
}

#[test]
fn non_ascii_title_bytes_are_dropped_from_names() {
    let tempdir = tempdir().expect("temp dir");
    // Half-width katakana followed by an ASCII suffix.
    let title = [0xBC, 0xDE, 0xDB, 0xB3, 0xC0, b' ', b'6', b'4'];

    assert_eq!(sanitize_title(&game(), &title), "64");
    assert_eq!(sanitize_title(&game(), &title[..5]), "NSME");
    assert_eq!(generate_name(tempdir.path(), &game(), &title[..5]), "NSME_001.pak");

    let entry = create_new_pak(tempdir.path(), &game(), title).expect("create pak");
    assert_eq!(entry.display_name, "64_001.pak");
}

#[test]
fn codes_differing_in_a_high_byte_use_separate_directories() {
    let tempdir = tempdir().expect("temp dir");
    let first = GameId::from_bytes(&[b'N', 0xFE, b'M', b'E']);
    let second = GameId::from_bytes(&[b'N', 0xFF, b'M', b'E']);

    assert_ne!(
        game_directory(tempdir.path(), &first),
        game_directory(tempdir.path(), &second)
    );

    // APFS refuses file names that are not UTF-8.
    #[cfg(not(target_os = "macos"))]
    {
        create_new_pak(tempdir.path(), &first, "Mario").expect("create pak");
        assert_eq!(list(tempdir.path(), &first, None).expect("list").len(), 1);
        assert!(list(tempdir.path(), &second, None).expect("list").is_empty());
    }
}
