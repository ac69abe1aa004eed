//! Parsing of inline code blocks (`=>{ ... }`) into statements.

use okapi_expr::Expression;

use crate::diagnostics::Diagnostic;
use crate::model::{CodeElem, CodeKind};

/// One source line of a code block, with its location.
#[derive(Debug, Clone)]
pub(crate) struct CodeLine {
    pub text: String,
    pub span: std::ops::Range<usize>,
    pub line: usize,
}

/// Parse the body of a code block.
///
/// Every statement must end with `;`. Malformed statements are reported and
/// skipped; the rest of the block is still parsed.
pub(crate) fn parse_block(lines: &[CodeLine], diagnostics: &mut Vec<Diagnostic>) -> Vec<CodeElem> {
    let mut code = Vec::new();

    for line in lines {
        let (statements, unterminated) = split_statements(&line.text);

        for statement in statements {
            match parse_statement(&statement) {
                Ok(elem) => {
                    check_expressions(&elem, line, diagnostics);
                    code.push(elem);
                }
                Err(message) => diagnostics.push(
                    Diagnostic::error(line.span.clone(), line.line, message)
                        .with_label("statement skipped"),
                ),
            }
        }

        if let Some(rest) = unterminated {
            diagnostics.push(
                Diagnostic::error(
                    line.span.clone(),
                    line.line,
                    format!("statement \"{rest}\" must end with ';'"),
                )
                .with_label("statement skipped"),
            );
        }
    }

    code
}

/// Parse a single statement, without its trailing `;`.
///
/// The statement is an assignment if it contains `=` anywhere; the text is
/// split on the first `=`, so `a == b` reads as assigning `= b` to `a`.
pub fn parse_statement(statement: &str) -> Result<CodeElem, String> {
    let statement = statement.trim();

    if let Some(eq) = statement.find('=') {
        let name = statement[..eq].trim();
        let expr = statement[eq + 1..].trim();
        if !is_identifier(name) {
            return Err(format!("invalid assignment target \"{name}\""));
        }
        let args = if expr.is_empty() {
            Vec::new()
        } else {
            vec![expr.to_string()]
        };
        return Ok(CodeElem {
            kind: CodeKind::Attribution,
            name: name.to_string(),
            args,
        });
    }

    let Some(open) = statement.find('(') else {
        return Err(format!("expected '(' in function call \"{statement}\""));
    };
    let Some(inner) = statement[open + 1..].strip_suffix(')') else {
        return Err(format!("expected ')' at the end of \"{statement}\""));
    };
    let name = statement[..open].trim();
    if !is_identifier(name) {
        return Err(format!("invalid function name \"{name}\""));
    }
    if !balanced(inner) {
        return Err(format!("mismatched parentheses in \"{statement}\""));
    }

    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        let args: Vec<String> = split_top_level(inner, ',')
            .into_iter()
            .map(|a| a.trim().to_string())
            .collect();
        if args.iter().any(String::is_empty) {
            return Err(format!("empty argument in call to \"{name}\""));
        }
        args
    };

    Ok(CodeElem::call(name, args))
}

/// Split a line into `;`-terminated statements. Returns the complete statements
/// and any trailing text that was not terminated.
fn split_statements(line: &str) -> (Vec<String>, Option<String>) {
    let mut parts = split_top_level(line, ';');
    let rest = parts.pop().map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    let statements = parts
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (statements, rest)
}

/// Split on `separator` outside quotes and parentheses. Always returns at least
/// one part (the text after the last separator).
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, _) if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && quote.is_none()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Report argument expressions that will not parse at runtime.
fn check_expressions(elem: &CodeElem, line: &CodeLine, diagnostics: &mut Vec<Diagnostic>) {
    if elem.kind == CodeKind::Attribution && elem.args.is_empty() {
        diagnostics.push(Diagnostic::warning(
            line.span.clone(),
            line.line,
            format!("assignment to \"{}\" has no expression", elem.name),
        ));
        return;
    }
    for arg in &elem.args {
        if let Err(err) = Expression::parse(arg) {
            diagnostics.push(Diagnostic::warning(
                line.span.clone(),
                line.line,
                format!("unparseable expression \"{arg}\": {err}"),
            ));
        }
    }
}
