use serde::Deserialize;
use serde::Serialize;

/// Exactly one phase is active at a time; transitions are driven exclusively
/// by the moderator. Initial phase is Night, terminal phase is GameOver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Night,
    DayDiscussion,
    Voting,
    Defense,
    FinalVote,
    GameOver,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Night => write!(f, "NIGHT"),
            Self::DayDiscussion => write!(f, "DAY_DISCUSSION"),
            Self::Voting => write!(f, "VOTING"),
            Self::Defense => write!(f, "DEFENSE"),
            Self::FinalVote => write!(f, "FINAL_VOTE"),
            Self::GameOver => write!(f, "GAME_OVER"),
        }
    }
}
