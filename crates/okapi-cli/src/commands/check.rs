use std::path::{Path, PathBuf};

use colored::Colorize;

pub fn run(files: &[PathBuf], speakers: Option<&Path>) -> Result<(), String> {
    let speakers = super::load_speakers(speakers)?;
    let mut failed = 0;

    for file in files {
        match super::load_clean_script(file, &speakers) {
            Ok(data) => println!(
                "  {} {} ({} dialogues)",
                "ok".green().bold(),
                file.display(),
                data.len()
            ),
            Err(e) => {
                eprintln!("  {} {e}", "failed".red().bold());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} scripts failed", files.len()));
    }
    println!("  All checks passed.");
    Ok(())
}
