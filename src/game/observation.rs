use super::phase::Phase;
use super::player::MemoryEntry;
use super::state::GameState;
use crate::Day;
use crate::Turn;
use crate::game::action::Ballot;
use crate::roles::faction::Faction;
use serde::Serialize;
use std::collections::BTreeMap;

/// What one player is allowed to see. Dead players get a terminal stub;
/// everyone else gets a filtered view of the state.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Observation {
    Eliminated {
        game_id: String,
        player_name: String,
        alive: bool,
        message: String,
    },
    Seated(Box<View>),
}

/// The filtered view handed to a living player. Never leaks another
/// player's role, private memory, or whispers they were not party to.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub game_id: String,
    pub player_name: String,
    pub role: String,
    pub role_description: String,
    pub faction: Faction,
    pub phase: Phase,
    pub day: Day,
    pub turn: Turn,
    pub is_current_turn: bool,
    pub current_player_turn: Option<String>,
    /// Set when this turn answers a question; names the asker.
    pub answering_question_from: Option<String>,
    pub alive_players: Vec<String>,
    pub dead_players: Vec<String>,
    /// One line per seat with status tags; Mafia teammates are tagged for
    /// Mafia viewers only.
    pub player_list: Vec<String>,
    /// The last few messages visible to this player, rendered.
    pub messages: Vec<String>,
    pub can_speak: bool,
    pub can_act_tonight: bool,
    pub player_on_trial: Option<String>,
    pub votes_for_accusation: BTreeMap<String, String>,
    pub accusation_counts: BTreeMap<String, usize>,
    pub memory: Vec<MemoryEntry>,
    pub is_roleblocked: bool,
    pub protected_by: Option<String>,
    pub lynch_votes: BTreeMap<String, Ballot>,
    /// Present for Mafia viewers only.
    pub mafia_members: Option<Vec<String>>,
}

impl GameState {
    /// Build the observation for one player. Unknown names observe nothing
    /// useful and get the eliminated stub.
    pub fn observe(&self, name: &str) -> Observation {
        let Some(player) = self.get_player(name) else {
            return Observation::Eliminated {
                game_id: self.game_id.clone(),
                player_name: name.to_string(),
                alive: false,
                message: "You are not part of this game.".to_string(),
            };
        };
        if !player.alive {
            return Observation::Eliminated {
                game_id: self.game_id.clone(),
                player_name: name.to_string(),
                alive: false,
                message: "You are no longer in the game.".to_string(),
            };
        }

        let viewer_is_mafia = player.faction == Faction::Mafia;
        let mafia_members: Vec<String> = self
            .players
            .iter()
            .filter(|p| p.alive && p.faction == Faction::Mafia)
            .map(|p| p.name.clone())
            .collect();

        let player_list = self
            .players
            .iter()
            .map(|p| {
                let mut tags = Vec::new();
                if !p.alive {
                    tags.push("DEAD".to_string());
                }
                if self.player_on_trial.as_deref() == Some(p.name.as_str()) {
                    tags.push("On Trial".to_string());
                }
                if viewer_is_mafia && p.faction == Faction::Mafia {
                    tags.push("Mafia".to_string());
                }
                if tags.is_empty() {
                    p.name.clone()
                } else {
                    format!("{} [{}]", p.name, tags.join(", "))
                }
            })
            .collect();

        let visible: Vec<String> = self
            .messages
            .iter()
            .filter(|m| m.visible_to(name))
            .map(|m| m.render_for(name))
            .collect();
        let window = visible.len().saturating_sub(crate::MESSAGE_WINDOW);
        let messages = visible[window..].to_vec();

        let is_current_turn = self.current_player_turn.as_deref() == Some(name);

        Observation::Seated(Box::new(View {
            game_id: self.game_id.clone(),
            player_name: name.to_string(),
            role: player.role.name().to_string(),
            role_description: player.role.description().to_string(),
            faction: player.faction,
            phase: self.phase,
            day: self.day_count,
            turn: self.turn_number_in_phase,
            is_current_turn,
            current_player_turn: self.current_player_turn.clone(),
            answering_question_from: if is_current_turn {
                self.turn_context.clone()
            } else {
                None
            },
            alive_players: self.alive_players.iter().cloned().collect(),
            dead_players: self.dead_players.iter().cloned().collect(),
            player_list,
            messages,
            can_speak: player.can_speak(),
            can_act_tonight: player.can_act_at_night() && !player.is_roleblocked,
            player_on_trial: self.player_on_trial.clone(),
            votes_for_accusation: self.votes_for_accusation.clone(),
            accusation_counts: self.accusation_counts.clone(),
            memory: player.memory.clone(),
            is_roleblocked: player.is_roleblocked,
            protected_by: player.protected_by.clone(),
            lynch_votes: self.votes_for_lynch.clone(),
            mafia_members: viewer_is_mafia.then_some(mafia_members),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::Config;
    use crate::game::player::Player;
    use crate::roles::role::Role;

    fn state() -> GameState {
        let players = vec![
            Player::new("Alice", Role::Cop),
            Player::new("Bob", Role::Doctor),
            Player::new("Carol", Role::Villager),
            Player::new("Dave", Role::Godfather),
            Player::new("Eve", Role::Goon),
        ];
        let mut state = GameState::new(players, Config::default());
        state.initialize();
        state
    }

    fn view(obs: Observation) -> View {
        match obs {
            Observation::Seated(view) => *view,
            Observation::Eliminated { .. } => panic!("expected a seated view"),
        }
    }

    #[test]
    fn town_viewer_never_sees_mafia_roster() {
        let state = state();
        let alice = view(state.observe("Alice"));
        assert!(alice.mafia_members.is_none());
        assert!(alice.player_list.iter().all(|line| !line.contains("Mafia")));
    }

    #[test]
    fn mafia_viewer_sees_teammates() {
        let state = state();
        let dave = view(state.observe("Dave"));
        assert_eq!(
            dave.mafia_members,
            Some(vec!["Dave".to_string(), "Eve".to_string()])
        );
        assert!(dave.player_list.iter().any(|line| line == "Eve [Mafia]"));
    }

    #[test]
    fn mafia_roster_omits_dead_teammates() {
        let mut state = state();
        state.kill_player("Eve", "test");
        let dave = view(state.observe("Dave"));
        assert_eq!(dave.mafia_members, Some(vec!["Dave".to_string()]));
    }

    #[test]
    fn dead_viewer_gets_the_stub() {
        let mut state = state();
        state.kill_player("Carol", "test");
        match state.observe("Carol") {
            Observation::Eliminated { alive, .. } => assert!(!alive),
            Observation::Seated(_) => panic!("dead players must not observe the game"),
        }
        let alice = view(state.observe("Alice"));
        assert!(alice.player_list.iter().any(|line| line == "Carol [DEAD]"));
    }

    #[test]
    fn whisper_content_hidden_from_third_parties() {
        let mut state = state();
        state.whisper("Alice", "Bob", "I checked Dave");
        let bob = view(state.observe("Bob"));
        assert!(bob.messages.iter().any(|m| m.contains("I checked Dave")));
        let carol = view(state.observe("Carol"));
        assert!(carol.messages.iter().all(|m| !m.contains("I checked Dave")));
        assert!(
            carol
                .messages
                .iter()
                .any(|m| m.contains("[WHISPER] Alice to Bob"))
        );
    }

    #[test]
    fn message_window_is_bounded() {
        let mut state = state();
        for i in 0..50 {
            state.log_message("Alice", format!("line {}", i));
        }
        let bob = view(state.observe("Bob"));
        assert_eq!(bob.messages.len(), crate::MESSAGE_WINDOW);
        assert!(bob.messages.last().unwrap().contains("line 49"));
    }
}
