//! Per-session tracking of started dialogues.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How many times each dialogue has been started.
///
/// Serialisable so a host can persist it with its save games.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenDialogues {
    counts: HashMap<String, u32>,
}

impl SeenDialogues {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a start, returning the new count.
    pub fn mark_seen(&mut self, key: impl Into<String>) -> u32 {
        let count = self.counts.entry(key.into()).or_default();
        *count = count.saturating_add(1);
        *count
    }

    /// Number of times a dialogue was started.
    pub fn times_seen(&self, key: &str) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Whether a dialogue was ever started.
    pub fn has_seen(&self, key: &str) -> bool {
        self.times_seen(key) > 0
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_seen_dialogues() {
        let mut seen = SeenDialogues::new();
        assert!(!seen.has_seen("greeting"));

        assert_eq!(seen.mark_seen("greeting"), 1);
        assert_eq!(seen.mark_seen("greeting"), 2);
        assert!(seen.has_seen("greeting"));
        assert_eq!(seen.times_seen("greeting"), 2);
        assert_eq!(seen.times_seen("farewell"), 0);
    }

    #[test]
    fn reset_clears_counts() {
        let mut seen = SeenDialogues::new();
        seen.mark_seen("a");
        seen.reset();
        assert!(!seen.has_seen("a"));
    }

    #[test]
    fn serializes_as_json() {
        let mut seen = SeenDialogues::new();
        seen.mark_seen("intro");
        let json = serde_json::to_string(&seen).unwrap();
        let back: SeenDialogues = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seen);
    }
}
