pub mod check;
pub mod dump;
pub mod keys;
pub mod play;

use std::path::Path;

use okapi_dialogue::{DialogueData, Severity, SpeakerRegistry, render_diagnostics};

/// Load a speaker file, or accept any speaker name when none is given.
fn load_speakers(path: Option<&Path>) -> Result<SpeakerRegistry, String> {
    match path {
        Some(path) => SpeakerRegistry::load(path).map_err(|e| e.to_string()),
        None => Ok(SpeakerRegistry::implicit()),
    }
}

/// Import a script file and print its diagnostics to stderr.
fn load_script(path: &Path, speakers: &SpeakerRegistry) -> Result<DialogueData, String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let data = DialogueData::import(name, &source, speakers).map_err(|e| format!("{}: {e}", path.display()))?;
    print_diagnostics(&source, path, &data);
    Ok(data)
}

/// Like [`load_script`], but fail when any construct was dropped.
fn load_clean_script(path: &Path, speakers: &SpeakerRegistry) -> Result<DialogueData, String> {
    let data = load_script(path, speakers)?;
    if data.diagnostics().iter().any(|d| d.is_error()) {
        return Err(format!("{} has errors", path.display()));
    }
    Ok(data)
}

/// Print diagnostics to stderr using ariadne.
fn print_diagnostics(source: &str, path: &Path, data: &DialogueData) {
    let diagnostics = data.diagnostics();
    if diagnostics.is_empty() {
        return;
    }

    let filename = path.display().to_string();
    eprint!("{}", render_diagnostics(source, &filename, diagnostics));

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics.len() - errors;

    eprintln!(
        "  {} error{}, {} warning{}",
        errors,
        if errors == 1 { "" } else { "s" },
        warnings,
        if warnings == 1 { "" } else { "s" },
    );
}
