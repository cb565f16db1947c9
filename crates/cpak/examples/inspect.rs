use colored::Colorize;

use cpak::id::ID_RECORD_OFFSETS;
use cpak::{inspect_image, ImageSummary};

fn status(ok: bool) -> colored::ColoredString {
    if ok {
        "ok".green()
    } else {
        "BAD".red()
    }
}

fn print_summary(summary: &ImageSummary) {
    println!("{:>14} {}", "banks".dimmed(), summary.banks);
    for (offset, valid) in ID_RECORD_OFFSETS.iter().zip(summary.id_copies_valid) {
        println!("{:>14} {}", format!("id @ {offset:#04x}").dimmed(), status(valid));
    }
    println!(
        "{:>14} {} (stored {:#04x}, computed {:#04x})",
        "fat checksum".dimmed(),
        status(summary.fat_checksum_valid()),
        summary.fat_stored_checksum,
        summary.fat_computed_checksum
    );
    println!("{:>14} {}", "fat backup".dimmed(), status(summary.fat_backup_matches));
    println!("{:>14} {}", "notes used".dimmed(), summary.notes_used);
    println!("{:>14} {}", "free pages".dimmed(), summary.free_pages);
}

fn main() -> std::io::Result<()> {
    let paths = std::env::args().skip(1).collect::<Vec<_>>();
    if paths.is_empty() {
        eprintln!("Usage: cargo run --example inspect -- <pak> [<pak>...]");
        std::process::exit(2);
    }

    let mut all_valid = true;
    for path in &paths {
        let bytes = std::fs::read(path)?;
        match inspect_image(&bytes) {
            Ok(summary) => {
                let verdict = if summary.is_valid() {
                    "mountable".green()
                } else {
                    "rejected".red().bold()
                };
                println!("{} {}", path.bold(), verdict);
                print_summary(&summary);
                all_valid &= summary.is_valid();
            }
            Err(err) => {
                println!("{} {}", path.bold(), err.to_string().red());
                all_valid = false;
            }
        }
    }

    if !all_valid {
        std::process::exit(1);
    }
    Ok(())
}
