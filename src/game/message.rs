use super::phase::Phase;
use crate::Day;
use serde::Deserialize;
use serde::Serialize;

/// Category of a logged game message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    System,
    Public,
    Whisper,
    Vote,
    #[serde(rename = "death_announcement")]
    Death,
}

/// Immutable record in the append-only game log. Never mutated after
/// creation; `recipients == None` means public.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: Kind,
    pub sender: String,
    pub content: String,
    pub recipients: Option<Vec<String>>,
    pub phase: Phase,
    pub day: Day,
}

impl Message {
    /// A viewer sees public messages plus private ones they sent or received.
    pub fn visible_to(&self, viewer: &str) -> bool {
        match &self.recipients {
            None => true,
            Some(names) => names.iter().any(|n| n == viewer) || self.sender == viewer,
        }
    }

    /// Render for one viewer. Whispers carry directional tags so the viewer
    /// knows which side of the exchange they were on.
    pub fn render_for(&self, viewer: &str) -> String {
        if self.kind == Kind::Whisper {
            if let Some(names) = &self.recipients {
                if self.sender == viewer {
                    if let Some(first) = names.first() {
                        return format!("(Whisper to {}) {}", first, self.content);
                    }
                } else if names.iter().any(|n| n == viewer) {
                    return format!("(Whisper from {}) {}", self.sender, self.content);
                }
            }
        }
        format!("{}: {}", self.sender, self.content)
    }
}
