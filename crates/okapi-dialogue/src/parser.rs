//! Line-oriented parser for dialogue scripts.
//!
//! ```text
//! # key                      start a dialogue
//! {OneShot,Random}           dialogue flags
//! [Speaker]: text            start an element
//! more text                  continue the element
//! * option -> key            add an option to the element
//!                            (blank line) finish the element
//! {condition}=>key           conditional exit
//! =>key                      unconditional exit
//! {condition}=>{ ... }       conditional code block
//! // comment, /* block comment */
//! ```
//!
//! Malformed lines become [`Diagnostic`]s and are skipped. Only content outside
//! any dialogue and duplicate keys abort the parse.

use std::collections::HashSet;

use okapi_expr::Expression;

use crate::code::{self, CodeLine};
use crate::diagnostics::Diagnostic;
use crate::error::{DialogueError, DialogueResult};
use crate::model::{Dialogue, DialogueCondition, DialogueElement, DialogueFlags, DialogueOption};
use crate::speaker::{Speaker, SpeakerRegistry};

type Span = std::ops::Range<usize>;

/// Output of a successful parse.
#[derive(Debug, Clone, Default)]
pub struct ParsedScript {
    /// Dialogues in declaration order.
    pub dialogues: Vec<Dialogue>,
    /// Recoverable problems, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedScript {
    /// Whether any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Parse a dialogue script.
pub fn parse_script(source: &str, speakers: &SpeakerRegistry) -> DialogueResult<ParsedScript> {
    let mut parser = ScriptParser::new(speakers);
    let mut offset = 0;
    let mut last_line = 0;

    for (index, raw) in source.split('\n').enumerate() {
        let span = offset..offset + raw.len();
        offset += raw.len() + 1;
        last_line = index + 1;
        parser.line(raw, span, last_line)?;
    }

    parser.finish(source.len(), last_line)
}

/// A code block waiting for its closing `}`.
struct PendingCode {
    condition: String,
    lines: Vec<CodeLine>,
    span: Span,
    line: usize,
}

struct ScriptParser<'a> {
    speakers: &'a SpeakerRegistry,
    dialogues: Vec<Dialogue>,
    keys: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
    element: Option<DialogueElement>,
    element_line: usize,
    speaker: Option<Speaker>,
    buffer: Vec<String>,
    in_block_comment: bool,
    pending_code: Option<PendingCode>,
}

impl<'a> ScriptParser<'a> {
    fn new(speakers: &'a SpeakerRegistry) -> Self {
        Self {
            speakers,
            dialogues: Vec::new(),
            keys: HashSet::new(),
            diagnostics: Vec::new(),
            element: None,
            element_line: 0,
            speaker: None,
            buffer: Vec::new(),
            in_block_comment: false,
            pending_code: None,
        }
    }

    fn line(&mut self, raw: &str, span: Span, line: usize) -> DialogueResult<()> {
        let Some(text) = self.strip_comments(raw.trim()) else {
            return Ok(());
        };
        if text.starts_with("//") {
            return Ok(());
        }

        if let Some(pending) = self.pending_code.as_mut() {
            if text == "}" {
                return self.close_code();
            }
            pending.lines.push(CodeLine {
                text,
                span,
                line,
            });
            return Ok(());
        }

        if text.is_empty() {
            return self.flush_element();
        }

        if let Some(name) = text.strip_prefix('#') {
            return self.header(name.trim(), span, line);
        }

        if text.starts_with('[')
            && let Some(close) = text.find("]:")
        {
            self.flush_element()?;
            self.speaker_line(&text[1..close], &text[close + 2..], span, line);
            return Ok(());
        }

        if text.starts_with('{') {
            return self.brace_line(&text, span, line);
        }

        if let Some(rest) = text.strip_prefix("=>{") {
            return self.open_code(String::new(), rest, span, line);
        }

        if let Some(key) = text.strip_prefix("=>") {
            return self.redirect(String::new(), key.trim(), span, line);
        }

        if let Some(rest) = text.strip_prefix('*') {
            self.option(rest, span, line);
            return Ok(());
        }

        if self.element.is_none() && self.buffer.is_empty() {
            self.element_line = line;
        }
        self.buffer.push(text);
        Ok(())
    }

    /// Remove `/* */` comments, tracking comments that span lines.
    ///
    /// Returns `None` when the line held nothing but comment, so it is not
    /// mistaken for a blank line.
    fn strip_comments(&mut self, line: &str) -> Option<String> {
        let mut rest = line;
        let mut out = String::new();
        let mut had_comment = false;

        loop {
            if self.in_block_comment {
                had_comment = true;
                let Some(end) = rest.find("*/") else {
                    break;
                };
                self.in_block_comment = false;
                rest = &rest[end + 2..];
            } else if let Some(start) = rest.find("/*") {
                out.push_str(&rest[..start]);
                self.in_block_comment = true;
                rest = &rest[start + 2..];
            } else {
                out.push_str(rest);
                break;
            }
        }

        let text = out.trim();
        if had_comment && text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    fn header(&mut self, name: &str, span: Span, line: usize) -> DialogueResult<()> {
        self.flush_element()?;
        if name.is_empty() {
            self.diagnostics.push(
                Diagnostic::warning(span, line, "dialogue header without a key")
                    .with_label("header ignored"),
            );
            return Ok(());
        }
        if !self.keys.insert(name.to_string()) {
            return Err(DialogueError::DuplicateKey {
                key: name.to_string(),
                line,
            });
        }
        self.dialogues.push(Dialogue::new(name));
        self.speaker = None;
        Ok(())
    }

    fn speaker_line(&mut self, name: &str, rest: &str, span: Span, line: usize) {
        let speaker = self.speakers.resolve(name);
        if speaker.is_none() && !name.trim().is_empty() {
            self.diagnostics.push(Diagnostic::warning(
                span,
                line,
                format!("unknown speaker \"{}\"", name.trim()),
            ));
        }
        self.speaker = speaker.clone();
        self.element = Some(DialogueElement::new(speaker, ""));
        self.element_line = line;

        let rest = rest.trim();
        if !rest.is_empty() {
            self.buffer.push(rest.to_string());
        }
    }

    fn brace_line(&mut self, text: &str, span: Span, line: usize) -> DialogueResult<()> {
        let condition = || {
            let close = text.find('}').unwrap_or(text.len());
            text[1..close].trim().to_string()
        };

        if let Some(pos) = text.find("}=>{") {
            return self.open_code(condition(), &text[pos + 4..], span, line);
        }
        if let Some(pos) = text.find("}=>") {
            return self.redirect(condition(), text[pos + 3..].trim(), span, line);
        }
        self.flags(text, span, line)
    }

    fn flags(&mut self, text: &str, span: Span, line: usize) -> DialogueResult<()> {
        let inner = match text[1..].strip_suffix('}') {
            Some(inner) => inner,
            None => {
                self.diagnostics.push(Diagnostic::warning(
                    span.clone(),
                    line,
                    "flag list is missing '}'",
                ));
                &text[1..]
            }
        };

        let mut flags = DialogueFlags::empty();
        for name in inner.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match DialogueFlags::from_script_name(name) {
                Some(flag) => flags |= flag,
                None => self.diagnostics.push(
                    Diagnostic::warning(span.clone(), line, format!("unknown dialogue flag \"{name}\""))
                        .with_label("flag ignored"),
                ),
            }
        }

        self.current_dialogue(line, "flags")?.flags |= flags;
        Ok(())
    }

    fn redirect(&mut self, condition: String, key: &str, span: Span, line: usize) -> DialogueResult<()> {
        self.current_dialogue(line, "transition")?;
        if key.is_empty() {
            self.diagnostics.push(
                Diagnostic::error(span, line, "transition has no destination key")
                    .with_label("transition skipped"),
            );
            return Ok(());
        }
        self.check_condition(&condition, &span, line);
        self.current_dialogue(line, "transition")?
            .conditional_next
            .push(DialogueCondition::redirect(condition, key));
        Ok(())
    }

    fn open_code(&mut self, condition: String, rest: &str, span: Span, line: usize) -> DialogueResult<()> {
        self.current_dialogue(line, "code block")?;
        self.check_condition(&condition, &span, line);

        let rest = rest.trim();
        if let Some(body) = rest.strip_suffix('}') {
            let lines = [CodeLine {
                text: body.to_string(),
                span,
                line,
            }];
            let code = code::parse_block(&lines, &mut self.diagnostics);
            self.current_dialogue(line, "code block")?
                .conditional_next
                .push(DialogueCondition::code(condition, code));
            return Ok(());
        }

        let mut lines = Vec::new();
        if !rest.is_empty() {
            lines.push(CodeLine {
                text: rest.to_string(),
                span: span.clone(),
                line,
            });
        }
        self.pending_code = Some(PendingCode {
            condition,
            lines,
            span,
            line,
        });
        Ok(())
    }

    fn close_code(&mut self) -> DialogueResult<()> {
        let Some(pending) = self.pending_code.take() else {
            return Ok(());
        };
        let code = code::parse_block(&pending.lines, &mut self.diagnostics);
        self.current_dialogue(pending.line, "code block")?
            .conditional_next
            .push(DialogueCondition::code(pending.condition, code));
        Ok(())
    }

    fn option(&mut self, rest: &str, span: Span, line: usize) {
        let Some(arrow) = rest.find("->") else {
            self.diagnostics.push(
                Diagnostic::warning(span, line, "option is missing '->'").with_label("option dropped"),
            );
            return;
        };
        let text = rest[..arrow].trim();
        let key = rest[arrow + 2..].trim();
        if text.is_empty() || key.is_empty() {
            self.diagnostics.push(
                Diagnostic::warning(span, line, "option needs both text and a destination key")
                    .with_label("option dropped"),
            );
            return;
        }

        if self.element.is_none() && !self.buffer.is_empty() {
            self.element = Some(DialogueElement::new(self.speaker.clone(), ""));
        }
        match self.element.as_mut() {
            Some(element) => element.options.push(DialogueOption {
                text: text.to_string(),
                key: key.to_string(),
            }),
            None => self.diagnostics.push(
                Diagnostic::warning(span, line, "option without a dialogue element")
                    .with_label("option dropped"),
            ),
        }
    }

    /// Move buffered text into the current element and append it to the dialogue.
    fn flush_element(&mut self) -> DialogueResult<()> {
        if self.element.is_none() && self.buffer.is_empty() {
            return Ok(());
        }
        let mut element = self
            .element
            .take()
            .unwrap_or_else(|| DialogueElement::new(self.speaker.clone(), ""));
        element.text = self.buffer.join("\n");
        self.buffer.clear();

        let line = self.element_line;
        self.current_dialogue(line, "dialogue text")?.elements.push(element);
        Ok(())
    }

    fn current_dialogue(&mut self, line: usize, what: &str) -> DialogueResult<&mut Dialogue> {
        self.dialogues
            .last_mut()
            .ok_or_else(|| DialogueError::OrphanContent {
                what: what.to_string(),
                line,
            })
    }

    fn check_condition(&mut self, condition: &str, span: &Span, line: usize) {
        if condition.is_empty() {
            return;
        }
        if let Err(err) = Expression::parse(condition) {
            self.diagnostics.push(Diagnostic::warning(
                span.clone(),
                line,
                format!("unparseable condition \"{condition}\": {err}"),
            ));
        }
    }

    fn finish(mut self, len: usize, last_line: usize) -> DialogueResult<ParsedScript> {
        if let Some(pending) = self.pending_code.take() {
            self.diagnostics.push(
                Diagnostic::error(
                    pending.span,
                    pending.line,
                    "code block is never closed with '}'",
                )
                .with_label("code block dropped"),
            );
        }
        self.flush_element()?;

        if self.in_block_comment {
            self.diagnostics
                .push(Diagnostic::warning(len..len, last_line, "block comment is never closed"));
        }

        Ok(ParsedScript {
            dialogues: self.dialogues,
            diagnostics: self.diagnostics,
        })
    }
}
