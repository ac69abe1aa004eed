//! Keyed storage for parsed dialogues.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, error, warn};

use crate::diagnostics::{Diagnostic, Severity};
use crate::error::{DialogueError, DialogueResult};
use crate::model::Dialogue;
use crate::parser::parse_script;
use crate::speaker::SpeakerRegistry;

/// A named collection of dialogues, usually one script file.
#[derive(Debug, Clone, Default)]
pub struct DialogueData {
    name: String,
    dialogues: Vec<Dialogue>,
    index: HashMap<String, usize>,
    diagnostics: Vec<Diagnostic>,
}

impl DialogueData {
    /// Parse `source` into a new store.
    ///
    /// Recoverable problems are logged and kept in [`diagnostics`](Self::diagnostics).
    pub fn import(name: impl Into<String>, source: &str, speakers: &SpeakerRegistry) -> DialogueResult<Self> {
        let name = name.into();
        let parsed = match parse_script(source, speakers) {
            Ok(parsed) => parsed,
            Err(err) => {
                error!(store = %name, "failed to parse dialogue script: {err}");
                return Err(err);
            }
        };

        for diag in &parsed.diagnostics {
            match diag.severity {
                Severity::Error => error!(store = %name, line = diag.line, "{}", diag.message),
                Severity::Warning => warn!(store = %name, line = diag.line, "{}", diag.message),
            }
        }

        let mut data = Self::from_dialogues(name, parsed.dialogues)?;
        data.diagnostics = parsed.diagnostics;
        debug!(store = %data.name, dialogues = data.len(), "imported dialogue script");
        Ok(data)
    }

    /// Read and import a script file. The store is named after the file stem.
    pub fn load(path: &Path, speakers: &SpeakerRegistry) -> DialogueResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| DialogueError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::import(name, &source, speakers)
    }

    /// Build a store from already constructed dialogues.
    pub fn from_dialogues(name: impl Into<String>, dialogues: Vec<Dialogue>) -> DialogueResult<Self> {
        let mut index = HashMap::with_capacity(dialogues.len());
        for (slot, dialogue) in dialogues.iter().enumerate() {
            if index.insert(dialogue.name.clone(), slot).is_some() {
                return Err(DialogueError::DuplicateKey {
                    key: dialogue.name.clone(),
                    line: 0,
                });
            }
        }
        Ok(Self {
            name: name.into(),
            dialogues,
            index,
            diagnostics: Vec::new(),
        })
    }

    /// Store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a dialogue, logging a warning when the key is unknown.
    pub fn dialogue(&self, key: &str) -> Option<&Dialogue> {
        let found = self.find(key);
        if found.is_none() {
            warn!(store = %self.name, key, "dialogue not found");
        }
        found
    }

    /// Look up a dialogue without logging.
    pub fn find(&self, key: &str) -> Option<&Dialogue> {
        self.index.get(key).map(|&slot| &self.dialogues[slot])
    }

    pub(crate) fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Whether a dialogue with this key exists.
    pub fn has_dialogue(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.dialogues.iter().map(|d| d.name.as_str())
    }

    /// Dialogues in declaration order.
    pub fn dialogues(&self) -> &[Dialogue] {
        &self.dialogues
    }

    /// Diagnostics from the import.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of dialogues.
    pub fn len(&self) -> usize {
        self.dialogues.len()
    }

    /// Whether the store holds no dialogues.
    pub fn is_empty(&self) -> bool {
        self.dialogues.is_empty()
    }
}
