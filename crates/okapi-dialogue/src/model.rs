//! The dialogue graph: dialogues, elements, options and exit transitions.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::speaker::Speaker;

bitflags! {
    /// Dialogue-level behaviour switches, declared with `{OneShot,Random}`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct DialogueFlags: u8 {
        /// The dialogue can start at most once per session.
        const ONE_SHOT = 0b01;
        /// Each activation shows one randomly chosen element.
        const RANDOM = 0b10;
    }
}

impl DialogueFlags {
    /// Resolve a flag name as written in scripts (`OneShot`, `Random`, `None`).
    ///
    /// Matching ignores case.
    pub fn from_script_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::empty()),
            "oneshot" => Some(Self::ONE_SHOT),
            "random" => Some(Self::RANDOM),
            _ => None,
        }
    }

    /// Script spelling of each set flag.
    pub fn script_names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::ONE_SHOT) {
            names.push("OneShot");
        }
        if self.contains(Self::RANDOM) {
            names.push("Random");
        }
        names
    }
}

/// A named unit of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialogue {
    /// Unique key within a data store.
    pub name: String,
    /// Behaviour flags.
    pub flags: DialogueFlags,
    /// Elements shown in order (or one at random).
    pub elements: Vec<DialogueElement>,
    /// Exit transitions, evaluated in order once the elements are exhausted.
    pub conditional_next: Vec<DialogueCondition>,
}

impl Dialogue {
    /// An empty dialogue with the given key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: DialogueFlags::empty(),
            elements: Vec::new(),
            conditional_next: Vec::new(),
        }
    }

    /// Set flags.
    pub fn with_flags(mut self, flags: DialogueFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Add an element.
    pub fn with_element(mut self, element: DialogueElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Add an exit transition.
    pub fn with_next(mut self, next: DialogueCondition) -> Self {
        self.conditional_next.push(next);
        self
    }

    /// A dialogue without elements only routes through its transitions.
    pub fn is_redirect(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the `OneShot` flag is set.
    pub fn is_one_shot(&self) -> bool {
        self.flags.contains(DialogueFlags::ONE_SHOT)
    }

    /// Whether the `Random` flag is set.
    pub fn is_random(&self) -> bool {
        self.flags.contains(DialogueFlags::RANDOM)
    }
}

/// One displayed unit: who speaks, what they say, and what the player may answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueElement {
    /// Resolved speaker, if any.
    pub speaker: Option<Speaker>,
    /// Text lines joined with `\n`.
    pub text: String,
    /// Player choices.
    pub options: Vec<DialogueOption>,
}

impl DialogueElement {
    /// An element with text and no options.
    pub fn new(speaker: Option<Speaker>, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            options: Vec::new(),
        }
    }

    /// Add an option.
    pub fn with_option(mut self, text: impl Into<String>, key: impl Into<String>) -> Self {
        self.options.push(DialogueOption {
            text: text.into(),
            key: key.into(),
        });
        self
    }

    /// Whether the player has to choose before continuing.
    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }

    /// Speaker name, if a speaker is attached.
    pub fn speaker_name(&self) -> Option<&str> {
        self.speaker.as_ref().map(|s| s.name.as_str())
    }
}

/// A player choice and the dialogue it leads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueOption {
    /// Text shown to the player.
    pub text: String,
    /// Key of the dialogue started when chosen.
    pub key: String,
}

/// An exit transition: when `condition` holds, go to a key or run code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueCondition {
    /// Expression source. Empty means always true.
    pub condition: String,
    /// What happens when the condition holds.
    pub next: NextStep,
}

impl DialogueCondition {
    /// A transition to another dialogue.
    pub fn redirect(condition: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            next: NextStep::Key(key.into()),
        }
    }

    /// A transition that runs inline code.
    pub fn code(condition: impl Into<String>, code: Vec<CodeElem>) -> Self {
        Self {
            condition: condition.into(),
            next: NextStep::Code(code),
        }
    }

    /// Whether the condition is empty.
    pub fn is_unconditional(&self) -> bool {
        self.condition.trim().is_empty()
    }

    /// Whether this transition runs code instead of redirecting.
    pub fn is_code(&self) -> bool {
        matches!(self.next, NextStep::Code(_))
    }
}

/// Target of a transition: exactly one of a key or a code block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NextStep {
    /// Start the dialogue with this key.
    Key(String),
    /// Run these statements.
    Code(Vec<CodeElem>),
}

/// Kind of inline statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeKind {
    /// `name(arg, ...);`
    FunctionCall,
    /// `name = expr;`
    Attribution,
}

/// A single inline statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeElem {
    /// Statement kind.
    pub kind: CodeKind,
    /// Called command or assigned variable.
    pub name: String,
    /// Argument expressions, or the single right-hand side of an assignment.
    pub args: Vec<String>,
}

impl CodeElem {
    /// A function call statement.
    pub fn call(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: CodeKind::FunctionCall,
            name: name.into(),
            args,
        }
    }

    /// An assignment statement.
    pub fn assign(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            kind: CodeKind::Attribution,
            name: name.into(),
            args: vec![expr.into()],
        }
    }
}
