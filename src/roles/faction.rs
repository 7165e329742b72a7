use serde::Deserialize;
use serde::Serialize;

/// A player's team, determining win-condition membership.
/// Mafia members see each other's faction; nobody else gets that courtesy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Town,
    Mafia,
    Neutral,
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Town => write!(f, "town"),
            Self::Mafia => write!(f, "mafia"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}
