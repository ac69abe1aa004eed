use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use okapi_dialogue::NextStep;

pub fn run(file: &Path, speakers: Option<&Path>) -> Result<(), String> {
    let speakers = super::load_speakers(speakers)?;
    let data = super::load_script(file, &speakers)?;

    if data.is_empty() {
        println!("  No dialogues found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Key", "Flags", "Elements", "Options", "Exits"]);

    for dialogue in data.dialogues() {
        let flags = dialogue.flags.script_names().join(", ");
        let options: usize = dialogue.elements.iter().map(|e| e.options.len()).sum();
        let exits = dialogue
            .conditional_next
            .iter()
            .map(|next| {
                let target = match &next.next {
                    NextStep::Key(key) => key.clone(),
                    NextStep::Code(code) => format!("code ({} statements)", code.len()),
                };
                if next.is_unconditional() {
                    target
                } else {
                    format!("{{{}}} {target}", next.condition)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        table.add_row(vec![
            dialogue.name.clone(),
            if flags.is_empty() { "—".to_string() } else { flags },
            dialogue.elements.len().to_string(),
            options.to_string(),
            if exits.is_empty() { "—".to_string() } else { exits },
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} dialogues", data.len());

    Ok(())
}
