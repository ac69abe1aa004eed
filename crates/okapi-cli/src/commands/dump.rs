use std::path::Path;

use okapi_dialogue::write_script;

pub fn run(file: &Path, json: bool, speakers: Option<&Path>) -> Result<(), String> {
    let speakers = super::load_speakers(speakers)?;
    let data = super::load_script(file, &speakers)?;

    if json {
        let out = serde_json::to_string_pretty(data.dialogues()).map_err(|e| format!("JSON serialization failed: {e}"))?;
        println!("{out}");
    } else {
        print!("{}", write_script(data.dialogues()));
    }

    Ok(())
}
