use std::path::{Path, PathBuf};
use std::process::ExitCode;

use argh::FromArgs;
use colored::Colorize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vcpak::catalog::{self, Catalog};
use vcpak::transfer::{pull_with_progress, push_with_progress};
use vcpak::{
    finish_session, load_config, recover, start_session, BankProgress, Config, DumpDevice,
    GameId, LaunchRequest, RecoveryOutcome, SessionJournal, SessionRecord, TransferReport,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(FromArgs, Debug)]
/// Manage virtual Controller Pak images
struct Args {
    /// storage root holding vcpak.toml, the catalog and the session record
    #[argh(option, default = "PathBuf::from(\".\")")]
    root: PathBuf,

    /// print machine-readable JSON instead of text
    #[argh(switch)]
    json: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Create(CreateArgs),
    List(ListArgs),
    Delete(DeleteArgs),
    Inspect(InspectArgs),
    Push(PushArgs),
    Pull(PullArgs),
    Launch(LaunchArgs),
    Finish(FinishArgs),
    Status(StatusArgs),
    Recover(RecoverArgs),
    Config(ConfigArgs),
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "create")]
/// Create a new empty pak image for a game
struct CreateArgs {
    /// four character game code
    #[argh(option)]
    game: String,

    /// game title used to name the image
    #[argh(option, default = "String::new()")]
    title: String,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "list")]
/// List the pak images of a game
struct ListArgs {
    /// four character game code
    #[argh(option)]
    game: String,

    /// name of the image used last, marked in the listing
    #[argh(option)]
    last_used: Option<String>,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "delete")]
/// Delete a pak image from a game's catalog
struct DeleteArgs {
    /// four character game code
    #[argh(option)]
    game: String,

    /// file name of the image to delete
    #[argh(positional)]
    name: String,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "inspect")]
/// Check a pak image the way the console does before mounting it
struct InspectArgs {
    /// path to the pak image
    #[argh(positional)]
    image: PathBuf,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "push")]
/// Restore a pak image onto the physical pak
struct PushArgs {
    /// raw dump file standing in for the physical pak
    #[argh(option)]
    device: PathBuf,

    /// path to the pak image
    #[argh(positional)]
    image: PathBuf,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "pull")]
/// Back the physical pak up into a pak image
struct PullArgs {
    /// raw dump file standing in for the physical pak
    #[argh(option)]
    device: PathBuf,

    /// path to the pak image
    #[argh(positional)]
    image: PathBuf,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "launch")]
/// Restore an image and record a session in progress
struct LaunchArgs {
    /// raw dump file standing in for the physical pak
    #[argh(option)]
    device: PathBuf,

    /// four character game code
    #[argh(option)]
    game: String,

    /// game title as found in the ROM header
    #[argh(option, default = "String::new()")]
    title: String,

    /// path of the ROM being launched
    #[argh(option)]
    rom: PathBuf,

    /// file name of the image in the game's catalog
    #[argh(positional)]
    name: String,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "finish")]
/// Back up the pak of the session in progress and clear the record
struct FinishArgs {
    /// raw dump file standing in for the physical pak
    #[argh(option)]
    device: PathBuf,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "status")]
/// Show the session record, if any
struct StatusArgs {}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "recover")]
/// Finish the backup of a session that never returned
struct RecoverArgs {
    /// raw dump file standing in for the physical pak
    #[argh(option)]
    device: PathBuf,

    /// clear the record without a backup when no pak is inserted
    #[argh(switch)]
    discard: bool,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "config")]
/// Print the effective configuration
struct ConfigArgs {}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "vcpak=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let args: Args = argh::from_env();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> vcpak::Result<ExitCode> {
    let Args {
        root,
        json,
        command,
    } = args;
    let config = load_config(&root)?;
    let saves_dir = config.saves_path(&root);
    let journal = SessionJournal::for_root(&root, &config);

    match command {
        Command::Create(CreateArgs { game, title }) => {
            let game_id = GameId::from(game.as_str());
            let entry = catalog::create_new_pak(&saves_dir, &game_id, title.as_bytes())?;
            if json {
                print_json(&entry);
            } else {
                println!("+ {} {}", "Created".green(), entry.storage_path.display());
            }
        }
        Command::List(ListArgs { game, last_used }) => {
            let game_id = GameId::from(game.as_str());
            let catalog = catalog::list(&saves_dir, &game_id, last_used.as_deref())?;
            print_catalog(&catalog, json);
        }
        Command::Delete(DeleteArgs { game, name }) => {
            let game_id = GameId::from(game.as_str());
            let catalog = catalog::list(&saves_dir, &game_id, None)?;
            let Some(index) = catalog
                .entries()
                .iter()
                .position(|entry| entry.display_name == name)
            else {
                eprintln!("{} {}", name.dimmed(), "is not in the catalog".dimmed());
                return Ok(ExitCode::FAILURE);
            };
            let catalog = catalog.delete(index)?;
            if !json {
                println!("- {} {}", "Deleted".yellow(), name);
            }
            print_catalog(&catalog, json);
        }
        Command::Inspect(InspectArgs { image }) => {
            return inspect(&image, json);
        }
        Command::Push(PushArgs { device, image }) => {
            let mut device = DumpDevice::new(device, config.port);
            let report = push_with_progress(&image, &mut device, progress_printer(json))?;
            print_report("Restored", &image, report, json);
        }
        Command::Pull(PullArgs { device, image }) => {
            let mut device = DumpDevice::new(device, config.port);
            let report = pull_with_progress(&image, &mut device, progress_printer(json))?;
            print_report("Backed up", &image, report, json);
        }
        Command::Launch(LaunchArgs {
            device,
            game,
            title,
            rom,
            name,
        }) => {
            let game_id = GameId::from(game.as_str());
            let request = LaunchRequest {
                game_id,
                game_title: title.into_bytes(),
                rom_path: rom,
                pak_path: catalog::game_directory(&saves_dir, &game_id).join(name),
            };
            let mut device = DumpDevice::new(device, config.port);
            let record = start_session(&journal, &mut device, &request)?;
            if json {
                print_json(&record_json(&record));
            } else {
                println!(
                    "{} {} {}",
                    "Ready to boot".green(),
                    record.game_id,
                    record.pak_path.display()
                );
            }
        }
        Command::Finish(FinishArgs { device }) => {
            let mut device = DumpDevice::new(device, config.port);
            let (record, report) = finish_session(&journal, &mut device)?;
            print_report("Backed up", &record.pak_path, report, json);
        }
        Command::Status(StatusArgs {}) => {
            return status(&journal, json);
        }
        Command::Recover(RecoverArgs { device, discard }) => {
            let mut device = DumpDevice::new(device, config.port);
            let outcome = recover(&journal, &mut device)?;
            return report_recovery(outcome, &journal, discard, json);
        }
        Command::Config(ConfigArgs {}) => {
            print_config(&config, json)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn progress_printer(json: bool) -> impl FnMut(BankProgress) {
    move |progress| {
        if !json {
            println!(
                "  {} {}/{}",
                "bank".dimmed(),
                progress.bank + 1,
                progress.total_banks
            );
        }
    }
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("{} {}", "Error:".red().bold(), err),
    }
}

fn print_catalog(catalog: &Catalog, json: bool) {
    if json {
        print_json(&json!({
            "game_id": catalog.game_id().to_string(),
            "directory": catalog.directory(),
            "selected": catalog.selected_index(),
            "entries": catalog.entries(),
        }));
        return;
    }

    let marker = |selected: bool| if selected { ">" } else { " " };
    println!(
        "{} {}",
        marker(catalog.selected_index().is_none()),
        "Create new".cyan()
    );
    for (index, entry) in catalog.entries().iter().enumerate() {
        let name = if entry.is_last_used {
            format!("{} {}", entry.display_name, "(last used)".dimmed())
        } else {
            entry.display_name.clone()
        };
        println!("{} {}", marker(catalog.selected_index() == Some(index)), name);
    }
}

fn print_report(action: &str, image: &Path, report: TransferReport, json: bool) {
    if json {
        print_json(&json!({
            "image": image,
            "banks": report.banks,
            "bytes": report.bytes,
        }));
    } else {
        println!(
            "{} {} {}",
            action.green(),
            image.display(),
            format!("({} banks, {} bytes)", report.banks, report.bytes).dimmed()
        );
    }
}

fn record_json(record: &SessionRecord) -> serde_json::Value {
    json!({
        "game_id": record.game_id.to_string(),
        "game_title": record.title_lossy(),
        "rom_path": record.rom_path,
        "pak_path": record.pak_path,
        "launched_at": record
            .launched_at()
            .map(|time| time.format(TIME_FORMAT).to_string()),
        "dirty": record.is_dirty,
    })
}

fn print_record(record: &SessionRecord) {
    println!("{:>10} {}", "Game".bold(), record.game_id);
    if !record.game_title.is_empty() {
        println!("{:>10} {}", "Title".bold(), record.title_lossy());
    }
    println!("{:>10} {}", "ROM".bold(), record.rom_path.display());
    println!("{:>10} {}", "Pak".bold(), record.pak_path.display());
    if let Some(time) = record.launched_at() {
        println!("{:>10} {}", "Launched".bold(), time.format(TIME_FORMAT));
    }
}

fn inspect(image: &Path, json: bool) -> vcpak::Result<ExitCode> {
    let bytes = std::fs::read(image)?;
    let summary = cpak::inspect_image(&bytes)?;

    if json {
        print_json(&json!({
            "image": image,
            "banks": summary.banks,
            "id_copies_valid": summary.id_copies_valid,
            "fat_stored_checksum": summary.fat_stored_checksum,
            "fat_computed_checksum": summary.fat_computed_checksum,
            "fat_backup_matches": summary.fat_backup_matches,
            "notes_used": summary.notes_used,
            "free_pages": summary.free_pages,
            "valid": summary.is_valid(),
        }));
    } else {
        let status = |ok: bool| if ok { "ok".green() } else { "BAD".red() };
        println!("{}", image.display().to_string().bold());
        println!("  {} {}", "banks".dimmed(), summary.banks);
        for (offset, valid) in cpak::id::ID_RECORD_OFFSETS
            .iter()
            .zip(summary.id_copies_valid)
        {
            println!("  {} {:#04x} {}", "id record".dimmed(), offset, status(valid));
        }
        println!(
            "  {} {:#04x}/{:#04x} {}",
            "fat checksum".dimmed(),
            summary.fat_stored_checksum,
            summary.fat_computed_checksum,
            status(summary.fat_checksum_valid())
        );
        println!(
            "  {} {}",
            "fat backup".dimmed(),
            status(summary.fat_backup_matches)
        );
        println!("  {} {}", "notes used".dimmed(), summary.notes_used);
        println!("  {} {}", "free pages".dimmed(), summary.free_pages);
    }

    Ok(if summary.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn status(journal: &SessionJournal, json: bool) -> vcpak::Result<ExitCode> {
    match journal.load() {
        Ok(record) => {
            if json {
                print_json(&record_json(&record));
            } else {
                let state = if record.is_dirty {
                    "Session in progress".yellow()
                } else {
                    "Session ended".green()
                };
                println!("{state}");
                print_record(&record);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(vcpak::Error::NotFound) => {
            if json {
                print_json(&serde_json::Value::Null);
            } else {
                println!("{}", "No session in progress".green());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(vcpak::Error::Corrupted { magic }) => {
            if json {
                print_json(&json!({ "corrupted": true, "magic": magic }));
            } else {
                println!(
                    "{} {}",
                    "Session record is corrupted".red(),
                    journal.path().display()
                );
            }
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err),
    }
}

fn report_recovery(
    outcome: RecoveryOutcome,
    journal: &SessionJournal,
    discard: bool,
    json: bool,
) -> vcpak::Result<ExitCode> {
    match outcome {
        RecoveryOutcome::Clean => {
            if json {
                print_json(&json!({ "outcome": "clean" }));
            } else {
                println!("{}", "Nothing to recover".green());
            }
            Ok(ExitCode::SUCCESS)
        }
        RecoveryOutcome::Recovered { record, report } => {
            if json {
                print_json(&json!({
                    "outcome": "recovered",
                    "record": record_json(&record),
                    "banks": report.banks,
                }));
            } else {
                println!("{}", "Recovered previous session".green());
                print_record(&record);
            }
            Ok(ExitCode::SUCCESS)
        }
        RecoveryOutcome::AwaitingDecision(pending) if discard => {
            let record = pending.discard(journal)?;
            if json {
                print_json(&json!({
                    "outcome": "discarded",
                    "record": record_json(&record),
                }));
            } else {
                println!("{}", "Discarded unrecovered session".yellow());
                print_record(&record);
            }
            Ok(ExitCode::SUCCESS)
        }
        RecoveryOutcome::AwaitingDecision(pending) => {
            if json {
                print_json(&json!({
                    "outcome": "awaiting_decision",
                    "record": record_json(pending.record()),
                }));
            } else {
                println!("{}", "No Controller Pak inserted".yellow());
                print_record(pending.record());
                println!(
                    "{}",
                    "Insert the pak and run recover again, or pass --discard".dimmed()
                );
            }
            Ok(ExitCode::FAILURE)
        }
        RecoveryOutcome::Corrupted { magic } => {
            if json {
                print_json(&json!({ "outcome": "corrupted", "magic": magic }));
            } else {
                println!(
                    "{} {}",
                    "Session record is corrupted".red(),
                    journal.path().display()
                );
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_config(config: &Config, json: bool) -> vcpak::Result<()> {
    if json {
        print_json(&json!({
            "saves_dir": config.saves_dir,
            "state_file": config.state_file,
            "port": config.port,
        }));
        return Ok(());
    }

    let text = config
        .to_toml_string()
        .map_err(|err| vcpak::Error::Config(err.to_string()))?;
    print!("{text}");
    Ok(())
}
