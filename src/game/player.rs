use super::action::Ballot;
use crate::Day;
use crate::roles::faction::Faction;
use crate::roles::role::Role;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// A private fact a player learned at night.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryEntry {
    InvestigationResult {
        day: Day,
        target: String,
        result: Faction,
    },
    RolePeek {
        day: Day,
        target: String,
        role: String,
    },
}

/// Per-participant mutable state. The name is the player's stable identity;
/// the role is a replaceable component (Goon succession swaps it in place).
#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    pub role: Role,
    /// Mirrors `role.faction()`; re-synced on succession.
    pub faction: Faction,
    pub alive: bool,

    // Night transients, cleared by reset_night_state.
    pub night_target: Option<String>,
    pub is_roleblocked: bool,
    pub protected_by: Option<String>,

    // Day transients, cleared by reset_day_state.
    pub vote: Option<String>,
    pub trial_vote: Option<Ballot>,
    pub has_accused_today: bool,
    pub can_speak_today: bool,
    pub questions_asked_today: BTreeMap<String, usize>,
    pub whispers_sent_today: BTreeMap<String, String>,

    // Accumulators, kept for the whole game.
    pub memory: Vec<MemoryEntry>,
    pub predictions: BTreeMap<String, String>,
}

impl Player {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
            faction: role.faction(),
            alive: true,
            night_target: None,
            is_roleblocked: false,
            protected_by: None,
            vote: None,
            trial_vote: None,
            has_accused_today: false,
            can_speak_today: true,
            questions_asked_today: BTreeMap::new(),
            whispers_sent_today: BTreeMap::new(),
            memory: Vec::new(),
            predictions: BTreeMap::new(),
        }
    }

    pub fn reset_for_new_game(&mut self) {
        self.alive = true;
        self.reset_night_state();
        self.reset_day_state();
        self.memory.clear();
        self.predictions.clear();
    }

    /// Clears night transients. Called at night start.
    pub fn reset_night_state(&mut self) {
        self.night_target = None;
        self.is_roleblocked = false;
        self.protected_by = None;
    }

    /// Clears day transients. Called at day start; this is the only point
    /// where effects like blackmail are lifted.
    pub fn reset_day_state(&mut self) {
        self.vote = None;
        self.trial_vote = None;
        self.has_accused_today = false;
        self.can_speak_today = true;
        self.questions_asked_today.clear();
        self.whispers_sent_today.clear();
    }

    pub fn can_act_at_night(&self) -> bool {
        self.alive && self.role.can_act_at_night()
    }

    pub fn can_speak(&self) -> bool {
        self.alive && self.can_speak_today
    }

    /// Replace the role component in place, keeping identity stable.
    /// Used for Goon-to-Godfather succession.
    pub fn promote(&mut self, role: Role) {
        self.role = role;
        self.faction = role.faction();
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.name,
            self.role,
            self.faction,
            if self.alive { "alive" } else { "dead" }
        )
    }
}
