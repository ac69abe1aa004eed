//! Speakers and the registry that resolves `[Name]:` references.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DialogueError, DialogueResult};

/// Someone who can say a line of dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaker {
    /// Display name.
    pub name: String,
    /// Other names scripts may use for this speaker.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Optional text colour hint for display surfaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Speaker {
    /// A speaker with no aliases.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            color: None,
        }
    }

    /// Add an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the colour hint.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Whether `name` is this speaker's name or one of its aliases, ignoring case.
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

#[derive(Deserialize)]
struct SpeakerFile {
    #[serde(default, rename = "speaker")]
    speakers: Vec<Speaker>,
}

/// Speakers known to the parser, indexed by lowercased name and alias.
#[derive(Debug, Clone, Default)]
pub struct SpeakerRegistry {
    speakers: Vec<Speaker>,
    index: HashMap<String, usize>,
    implicit: bool,
}

impl SpeakerRegistry {
    /// An empty registry. Unknown names resolve to nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry that invents a speaker for every unknown name.
    pub fn implicit() -> Self {
        Self {
            implicit: true,
            ..Self::default()
        }
    }

    /// Whether unknown names create speakers on demand.
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// Parse a TOML speaker list:
    ///
    /// ```toml
    /// [[speaker]]
    /// name = "Bob"
    /// aliases = ["Robert"]
    /// ```
    pub fn from_toml(source: &str) -> DialogueResult<Self> {
        let file: SpeakerFile = toml::from_str(source)?;
        let mut registry = Self::new();
        for speaker in file.speakers {
            registry.register(speaker);
        }
        Ok(registry)
    }

    /// Read a TOML speaker list from disk.
    pub fn load(path: &Path) -> DialogueResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| DialogueError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source)
    }

    /// Add a speaker. A name or alias already claimed by another speaker keeps
    /// pointing at the first one.
    pub fn register(&mut self, speaker: Speaker) -> &mut Self {
        let slot = self.speakers.len();
        for name in std::iter::once(&speaker.name).chain(speaker.aliases.iter()) {
            let key = name.trim().to_lowercase();
            if let Some(&existing) = self.index.get(&key) {
                if existing != slot {
                    warn!(
                        name = %name,
                        owner = %self.speakers[existing].name,
                        "speaker name already registered, ignoring"
                    );
                }
                continue;
            }
            self.index.insert(key, slot);
        }
        self.speakers.push(speaker);
        self
    }

    /// Find a speaker by name or alias.
    pub fn resolve(&self, name: &str) -> Option<Speaker> {
        let key = name.trim().to_lowercase();
        if let Some(&slot) = self.index.get(&key) {
            return Some(self.speakers[slot].clone());
        }
        if self.implicit && !key.is_empty() {
            return Some(Speaker::new(name.trim()));
        }
        None
    }

    /// Registered speakers in registration order.
    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    /// Number of registered speakers.
    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    /// Whether no speaker is registered.
    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}
