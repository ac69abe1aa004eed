//! Dialogue scripts and the conversation runtime.
//!
//! A script is plain text:
//!
//! ```text
//! # greeting
//! [Bob]: Hello there.
//! * Who are you? -> who
//! * Bye -> bye
//!
//! # who
//! {OneShot}
//! [Bob]: Just a merchant.
//!
//! {gold > 10}=>offer
//! =>{ gold = gold - 1; }
//! ```
//!
//! [`DialogueData::import`] parses a script into a keyed store of [`Dialogue`]s.
//! A [`DialogueRuntime`] plays them through a host-provided [`DisplaySurface`],
//! evaluating conditions with `okapi-expr` and running inline code through a
//! [`CommandTable`].

mod code;

/// Parser diagnostics and their rendering.
pub mod diagnostics;
/// Error types.
pub mod error;
/// Dialogue graph types.
pub mod model;
/// Script parser.
pub mod parser;
/// Conversation runtime.
pub mod runtime;
/// Speakers and speaker lookup.
pub mod speaker;
/// Keyed dialogue storage.
pub mod store;
/// Script writer.
pub mod writer;

pub use code::parse_statement;
pub use diagnostics::{Diagnostic, Severity, render_diagnostics};
pub use error::{DialogueError, DialogueResult};
pub use model::{
    CodeElem, CodeKind, Dialogue, DialogueCondition, DialogueElement, DialogueFlags, DialogueOption,
    NextStep,
};
pub use parser::{ParsedScript, parse_script};
pub use runtime::{
    ArgValue, CommandError, CommandResult, CommandScope, CommandTable, DialogueEvent, DialogueRuntime,
    DisplaySurface, InputAxis, Param, ParamKind, RuntimeConfig, SeenDialogues,
};
pub use speaker::{Speaker, SpeakerRegistry};
pub use store::DialogueData;
pub use writer::write_script;
