//! Error types for dialogue loading and execution.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for dialogue operations.
pub type DialogueResult<T> = Result<T, DialogueError>;

/// Errors that abort an import or a conversation.
///
/// Malformed options, statements and expressions are not errors at this level;
/// they surface as [`crate::Diagnostic`]s and log lines.
#[derive(Debug, Error)]
pub enum DialogueError {
    /// Two dialogues share a key.
    #[error("line {line}: duplicate dialogue key \"{key}\"")]
    DuplicateKey {
        /// The repeated key.
        key: String,
        /// Line of the second declaration.
        line: usize,
    },

    /// Content that belongs to a dialogue appeared before any `# key` header.
    #[error("line {line}: {what} outside of any dialogue")]
    OrphanContent {
        /// What was found (text, option, flags, transition).
        what: String,
        /// Line where it was found.
        line: usize,
    },

    /// A script-authoring bug found while running inline code.
    #[error("script error in dialogue \"{dialogue}\": {message}")]
    Script {
        /// Key of the dialogue whose code failed.
        dialogue: String,
        /// What went wrong.
        message: String,
    },

    /// A dialogue or speaker file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A speaker file is not valid TOML or has the wrong shape.
    #[error("invalid speaker file: {0}")]
    SpeakerFile(#[from] toml::de::Error),
}
