use serde::{Deserialize, Serialize};

/// Conversation lifecycle notifications, drained with
/// [`DialogueRuntime::take_events`](super::DialogueRuntime::take_events).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueEvent {
    /// A dialogue became the active one.
    Started {
        /// Key of the started dialogue.
        key: String,
    },
    /// The conversation ended.
    Ended,
}
