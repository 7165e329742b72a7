use super::faction::Faction;
use crate::game::player::Player;
use crate::game::state::GameState;
use serde::Deserialize;
use serde::Serialize;

/// The closed role set. One variant per archetype rather than open-ended
/// inheritance: every variant supplies its faction, night capability, night
/// action, and description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Villager,
    Cop,
    Doctor,
    Goon,
    Godfather,
    RoleBlocker,
    Consigliere,
}

/// What a night-capable role intends to do, before central resolution.
/// Investigation results are filled in at resolution time, not submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NightIntent {
    Kill(String),
    Protect(String),
    Investigate(String),
    Peek(String),
    Block(String),
    Blackmail(String),
}

impl NightIntent {
    pub fn target(&self) -> &str {
        match self {
            Self::Kill(t)
            | Self::Protect(t)
            | Self::Investigate(t)
            | Self::Peek(t)
            | Self::Block(t)
            | Self::Blackmail(t) => t,
        }
    }
}

impl std::fmt::Display for NightIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Kill(t) => write!(f, "kill {}", t),
            Self::Protect(t) => write!(f, "protect {}", t),
            Self::Investigate(t) => write!(f, "investigate {}", t),
            Self::Peek(t) => write!(f, "peek {}", t),
            Self::Block(t) => write!(f, "block {}", t),
            Self::Blackmail(t) => write!(f, "blackmail {}", t),
        }
    }
}

impl Role {
    /// Case-insensitive registry lookup. Unknown names are a setup error,
    /// surfaced before a game starts.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "villager" => Some(Self::Villager),
            "cop" => Some(Self::Cop),
            "doctor" => Some(Self::Doctor),
            "goon" => Some(Self::Goon),
            "godfather" => Some(Self::Godfather),
            "roleblocker" => Some(Self::RoleBlocker),
            "consigliere" => Some(Self::Consigliere),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Villager => "Villager",
            Self::Cop => "Cop",
            Self::Doctor => "Doctor",
            Self::Goon => "Goon",
            Self::Godfather => "Godfather",
            Self::RoleBlocker => "RoleBlocker",
            Self::Consigliere => "Consigliere",
        }
    }

    pub fn faction(&self) -> Faction {
        match self {
            Self::Villager | Self::Cop | Self::Doctor => Faction::Town,
            Self::Goon | Self::Godfather | Self::RoleBlocker | Self::Consigliere => Faction::Mafia,
        }
    }

    /// Whether the role has a meaningful night action.
    pub fn can_act_at_night(&self) -> bool {
        !matches!(self, Self::Villager | Self::Goon)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Villager => {
                "You are a Villager. You have no special abilities. \
                 Find and lynch the Mafia."
            }
            Self::Cop => {
                "You are the Cop. Each night, you can investigate one player \
                 to determine their faction (Town or Mafia)."
            }
            Self::Doctor => {
                "You are the Doctor. Each night, you can choose one player \
                 to protect from death."
            }
            Self::Goon => {
                "You are a Mafia Goon. Work with your team to kill Town \
                 members at night and avoid getting lynched during the day."
            }
            Self::Godfather => {
                "You are the Godfather. You appear as Town to the Cop. \
                 Each night, choose a target for the Mafia to kill. \
                 If you die, a Goon will be promoted."
            }
            Self::RoleBlocker => {
                "You are the RoleBlocker. Each night, you can block another \
                 player's action."
            }
            Self::Consigliere => {
                "You are the Consigliere. Each night, you may learn the \
                 exact role of one player."
            }
        }
    }

    /// Validate target legality and produce the structured intent for this
    /// role's night action. Failures are reasons, not panics: the moderator
    /// writes them to the hidden log and the actor simply has no effect.
    pub fn night_intent(
        &self,
        actor: &Player,
        state: &GameState,
        target: Option<&str>,
    ) -> Result<NightIntent, String> {
        let target = target.ok_or("no target specified for night action")?;
        let found = state
            .get_player(target)
            .filter(|p| p.alive)
            .ok_or_else(|| format!("target {} not found or dead", target))?;
        match self {
            Self::Villager | Self::Goon => Err("role has no night action".into()),
            Self::Cop => {
                if target == actor.name {
                    Err("cannot investigate yourself".into())
                } else {
                    Ok(NightIntent::Investigate(target.into()))
                }
            }
            Self::Doctor => {
                if target == actor.name && !state.config.doctor_can_self_heal {
                    Err("cannot protect yourself tonight".into())
                } else {
                    Ok(NightIntent::Protect(target.into()))
                }
            }
            Self::Godfather => {
                if target == actor.name {
                    Err("cannot target yourself".into())
                } else if found.faction == Faction::Mafia {
                    Err("cannot order a kill on a fellow Mafia member".into())
                } else {
                    Ok(NightIntent::Kill(target.into()))
                }
            }
            Self::RoleBlocker => {
                if target == actor.name {
                    Err("cannot roleblock yourself".into())
                } else {
                    Ok(NightIntent::Block(target.into()))
                }
            }
            Self::Consigliere => Ok(NightIntent::Peek(target.into())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
