//! Interactive terminal playback of a dialogue.

use std::io::{self, BufRead, Write};
use std::path::Path;

use colored::{ColoredString, Colorize};
use okapi_dialogue::{
    ArgValue, CommandTable, DialogueElement, DialogueRuntime, DisplaySurface, InputAxis, Param, RuntimeConfig, Speaker,
};
use okapi_expr::{Value, VariableSink};

/// Prints elements to stdout. Option choice is set by the play loop.
#[derive(Debug, Default)]
struct TerminalDisplay {
    options: usize,
    selected: usize,
}

impl DisplaySurface for TerminalDisplay {
    fn display(&mut self, element: &DialogueElement) {
        self.options = element.options.len();
        self.selected = 0;

        println!();
        if let Some(speaker) = &element.speaker {
            println!("  {}", paint(speaker));
        }
        for line in element.text.lines() {
            println!("  {line}");
        }
        for (i, option) in element.options.iter().enumerate() {
            println!("    {} {}", format!("{})", i + 1).yellow(), option.text);
        }
    }

    fn clear(&mut self) {
        self.options = 0;
        self.selected = 0;
    }

    fn skip(&mut self) {}

    fn is_displaying(&self) -> bool {
        false
    }

    fn set_input(&mut self, input: InputAxis) {
        if self.options == 0 {
            return;
        }
        if input.y > 0.0 {
            self.selected = self.selected.saturating_sub(1);
        } else if input.y < 0.0 {
            self.selected = (self.selected + 1).min(self.options - 1);
        }
    }

    fn selected_option(&self) -> usize {
        self.selected
    }
}

/// Speaker name in its colour hint (`#rrggbb` or a colour name), cyan otherwise.
fn paint(speaker: &Speaker) -> ColoredString {
    let name = speaker.name.bold();
    match speaker.color.as_deref() {
        Some(hex) if hex.len() == 7 && hex.starts_with('#') => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            match (channel(1), channel(3), channel(5)) {
                (Some(r), Some(g), Some(b)) => name.truecolor(r, g, b),
                _ => name.cyan(),
            }
        }
        Some(color) => name.color(color),
        None => name.cyan(),
    }
}

fn register_builtins(commands: &mut CommandTable) {
    commands
        .register("print", vec![Param::string("text")], |_, args| {
            let text = args.first().and_then(ArgValue::as_str).unwrap_or_default();
            println!("  {} {text}", ">".dimmed());
            Ok(())
        })
        .register("start", vec![Param::string("key")], |scope, args| {
            if let Some(key) = args.first().and_then(ArgValue::as_str) {
                scope.start_conversation(key);
            }
            Ok(())
        })
        .register("end", Vec::new(), |scope, _| {
            scope.end_conversation();
            Ok(())
        });
}

fn parse_assignment(text: &str) -> Result<(&str, Value), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got \"{text}\""))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in \"{text}\""));
    }
    Ok((name, Value::parse_literal(value)))
}

pub fn run(
    file: &Path,
    key: &str,
    vars: &[String],
    speakers: Option<&Path>,
    seed: Option<u64>,
) -> Result<(), String> {
    let speakers = super::load_speakers(speakers)?;
    let data = super::load_script(file, &speakers)?;

    let config = match seed {
        Some(seed) => RuntimeConfig::new().with_seed(seed),
        None => RuntimeConfig::new(),
    };
    let mut runtime = DialogueRuntime::new(TerminalDisplay::default(), config);
    runtime.add_data(data);
    register_builtins(runtime.commands_mut());

    for assignment in vars {
        let (name, value) = parse_assignment(assignment)?;
        runtime.variables_mut().set_variable(name, value);
    }

    let started = runtime.start_conversation(key).map_err(|e| e.to_string())?;
    if !started && runtime.events().is_empty() {
        return Err(format!("no dialogue \"{key}\" in {}", file.display()));
    }

    let stdin = io::stdin();
    let mut input = stdin.lock().lines();

    while runtime.is_talking() {
        let options = runtime.current_element().map_or(0, |e| e.options.len());
        if options > 0 {
            print!("  choose 1-{options}: ");
            io::stdout().flush().map_err(|e| e.to_string())?;
            let Some(line) = input.next() else {
                break;
            };
            let line = line.map_err(|e| e.to_string())?;
            match line.trim().parse::<usize>() {
                Ok(n) if (1..=options).contains(&n) => runtime.display_mut().selected = n - 1,
                _ => {
                    println!("  please enter a number between 1 and {options}");
                    continue;
                }
            }
        } else {
            let hint = if runtime.has_more_text() { "[enter] continue" } else { "[enter] close" };
            println!("  {}", hint.dimmed());
            match input.next() {
                Some(line) => {
                    line.map_err(|e| e.to_string())?;
                }
                None => break,
            }
        }
        runtime.continue_dialogue().map_err(|e| e.to_string())?;
    }
    runtime.end_conversation();

    println!();
    println!("  {}", "(end of conversation)".dimmed());

    let variables = runtime.variables().sorted();
    if !variables.is_empty() {
        println!();
        for (name, value) in variables {
            println!("  {name} = {value}");
        }
    }

    Ok(())
}
