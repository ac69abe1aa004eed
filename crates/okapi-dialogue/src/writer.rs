//! Render dialogues back to script source.

use crate::model::{CodeElem, CodeKind, Dialogue, DialogueCondition, NextStep};

/// Render dialogues as a script that parses back to the same graph.
///
/// Speakerless elements are written with an empty `[]:` tag when a plain
/// line would either inherit the previous speaker or read as a blank line.
pub fn write_script(dialogues: &[Dialogue]) -> String {
    let mut out = String::new();
    for (i, dialogue) in dialogues.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_dialogue(&mut out, dialogue);
    }
    out
}

fn write_dialogue(out: &mut String, dialogue: &Dialogue) {
    out.push_str(&format!("# {}\n", dialogue.name));

    let flags = dialogue.flags.script_names();
    if !flags.is_empty() {
        out.push_str(&format!("{{{}}}\n", flags.join(",")));
    }

    let mut speaking = false;
    for element in &dialogue.elements {
        let mut lines = element.text.split('\n');
        let first = lines.next().unwrap_or_default();
        match element.speaker_name() {
            Some(name) => {
                out.push_str(&format!("[{name}]: {first}\n"));
                speaking = true;
            }
            None if speaking || first.trim().is_empty() => {
                out.push_str(&format!("[]: {first}\n"));
                speaking = false;
            }
            None => out.push_str(&format!("{first}\n")),
        }
        for line in lines {
            out.push_str(&format!("{line}\n"));
        }
        for option in &element.options {
            out.push_str(&format!("* {} -> {}\n", option.text, option.key));
        }
        out.push('\n');
    }

    for next in &dialogue.conditional_next {
        write_condition(out, next);
    }
}

fn write_condition(out: &mut String, next: &DialogueCondition) {
    let condition = next.condition.trim();
    if !condition.is_empty() {
        out.push_str(&format!("{{{condition}}}"));
    }
    match &next.next {
        NextStep::Key(key) => out.push_str(&format!("=>{key}\n")),
        NextStep::Code(code) => {
            out.push_str("=>{\n");
            for elem in code {
                out.push_str(&format!("    {};\n", statement(elem)));
            }
            out.push_str("}\n");
        }
    }
}

fn statement(elem: &CodeElem) -> String {
    match elem.kind {
        CodeKind::Attribution => match elem.args.first() {
            Some(expr) => format!("{} = {expr}", elem.name),
            None => format!("{} =", elem.name),
        },
        CodeKind::FunctionCall => format!("{}({})", elem.name, elem.args.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DialogueElement, DialogueFlags};
    use crate::parser::parse_script;
    use crate::speaker::{Speaker, SpeakerRegistry};
    use proptest::prelude::*;

    fn bob() -> Option<Speaker> {
        Some(Speaker::new("Bob"))
    }

    #[test]
    fn write_full_dialogue() {
        let dialogue = Dialogue::new("shop")
            .with_flags(DialogueFlags::ONE_SHOT)
            .with_element(DialogueElement::new(bob(), "Welcome!\nBuy something?").with_option("Yes", "buy"))
            .with_next(DialogueCondition::redirect("gold > 3", "rich"))
            .with_next(DialogueCondition::code(
                "",
                vec![
                    CodeElem::assign("visits", "visits + 1"),
                    CodeElem::call("give", vec!["\"coin\"".to_string(), "2".to_string()]),
                ],
            ));

        assert_eq!(
            write_script(&[dialogue]),
            "# shop\n\
             {OneShot}\n\
             [Bob]: Welcome!\n\
             Buy something?\n\
             * Yes -> buy\n\
             \n\
             {gold > 3}=>rich\n\
             =>{\n    visits = visits + 1;\n    give(\"coin\", 2);\n}\n"
        );
    }

    #[test]
    fn written_script_parses_back() {
        let dialogues = vec![
            Dialogue::new("a")
                .with_flags(DialogueFlags::RANDOM | DialogueFlags::ONE_SHOT)
                .with_element(DialogueElement::new(bob(), "one"))
                .with_element(DialogueElement::new(bob(), "two").with_option("Go", "b")),
            Dialogue::new("b").with_next(DialogueCondition::code(
                "x == 1",
                vec![CodeElem::call("end", Vec::new())],
            )),
        ];
        let parsed = parse_script(&write_script(&dialogues), &SpeakerRegistry::implicit()).unwrap();
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.dialogues, dialogues);
    }

    #[test]
    fn speakerless_elements_keep_their_shape() {
        let dialogues = vec![Dialogue::new("a")
            .with_element(DialogueElement::new(None, "narration"))
            .with_element(DialogueElement::new(bob(), "Hi"))
            .with_element(DialogueElement::new(None, "").with_option("Go", "b"))
            .with_element(DialogueElement::new(None, "after"))];

        let source = write_script(&dialogues);
        assert_eq!(source, "# a\nnarration\n\n[Bob]: Hi\n\n[]: \n* Go -> b\n\nafter\n\n");

        let mut speakers = SpeakerRegistry::new();
        speakers.register(Speaker::new("Bob"));
        let parsed = parse_script(&source, &speakers).unwrap();
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.dialogues, dialogues);
    }

    fn word() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,7}"
    }

    // Prefixed so generated names never collide with `and`, `or`, `not` or booleans.
    fn variable() -> impl Strategy<Value = String> {
        "v[a-z0-9]{0,7}"
    }

    fn text() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z][a-z ,.!?]{0,20}[a-z.!?]", 1..3).prop_map(|lines| lines.join("\n"))
    }

    fn element() -> impl Strategy<Value = DialogueElement> {
        (
            "[A-Z][a-z]{1,6}",
            text(),
            prop::collection::vec((word(), word()), 0..3),
        )
            .prop_map(|(speaker, text, options)| {
                options.into_iter().fold(
                    DialogueElement::new(Some(Speaker::new(speaker)), text),
                    |element, (text, key)| element.with_option(text, key),
                )
            })
    }

    fn condition() -> impl Strategy<Value = DialogueCondition> {
        prop_oneof![
            (variable(), word()).prop_map(|(var, key)| DialogueCondition::redirect(format!("{var} > 1"), key)),
            word().prop_map(|key| DialogueCondition::redirect("", key)),
            (variable(), word()).prop_map(|(var, call)| DialogueCondition::code(
                "",
                vec![
                    CodeElem::assign(var.clone(), format!("{var} + 1")),
                    CodeElem::call(call, vec![var]),
                ],
            )),
        ]
    }

    fn dialogues() -> impl Strategy<Value = Vec<Dialogue>> {
        prop::collection::vec(
            (
                0u8..4,
                prop::collection::vec(element(), 0..4),
                prop::collection::vec(condition(), 0..3),
            ),
            1..5,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (flags, elements, next))| Dialogue {
                    name: format!("d{i}"),
                    flags: DialogueFlags::from_bits_truncate(flags),
                    elements,
                    conditional_next: next,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn write_then_parse_preserves_graph(dialogues in dialogues()) {
            let source = write_script(&dialogues);
            let parsed = parse_script(&source, &SpeakerRegistry::implicit()).unwrap();
            prop_assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
            prop_assert_eq!(parsed.dialogues, dialogues);
        }
    }
}
