use crate::game::player::Player;
use crate::roles::role::Role;
use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;

/// One seat in the roster: a unique player name and a role name resolved
/// against the registry at setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub name: String,
    pub role: String,
}

/// Rule toggles and roster, consumed once at setup. Unknown role names are
/// the one hard failure mode: they abort before a game starts instead of
/// surfacing mid-game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub roles: Vec<Seat>,
    pub lynch_defense_enabled: bool,
    pub cop_speaks_first: bool,
    pub godfather_detectable: bool,
    pub doctor_can_self_heal: bool,
    pub min_discussion_turns: usize,
    /// When set, an accusation opens a trial only once this many accusation
    /// votes land; unset, a bare accusation opens one immediately.
    pub accusation_threshold: Option<usize>,
    pub max_steps: usize,
}

impl Default for Config {
    fn default() -> Self {
        let roles = [
            ("Player1", "Cop"),
            ("Player2", "Doctor"),
            ("Player3", "Villager"),
            ("Player4", "Godfather"),
            ("Player5", "Goon"),
        ];
        Self {
            roles: roles
                .iter()
                .map(|(name, role)| Seat {
                    name: name.to_string(),
                    role: role.to_string(),
                })
                .collect(),
            lynch_defense_enabled: true,
            cop_speaks_first: false,
            godfather_detectable: false,
            doctor_can_self_heal: true,
            min_discussion_turns: crate::MIN_DISCUSSION_TURNS,
            accusation_threshold: None,
            max_steps: crate::MAX_STEPS,
        }
    }
}

impl Config {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    /// Build the players from the roster. Fails fast on unknown role names.
    pub fn players(&self) -> anyhow::Result<Vec<Player>> {
        self.roles
            .iter()
            .map(|seat| {
                let role = Role::parse(&seat.role)
                    .with_context(|| format!("unknown role name '{}'", seat.role))?;
                Ok(Player::new(seat.name.clone(), role))
            })
            .collect()
    }
}
