use super::action::Ballot;
use super::message::Kind;
use super::message::Message;
use super::phase::Phase;
use super::player::Player;
use crate::Day;
use crate::Turn;
use crate::engine::config::Config;
use crate::roles::faction::Faction;
use crate::roles::role::NightIntent;
use crate::roles::role::Role;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Hidden (debug) log entry. Never shown to agents; invaluable for audits.
#[derive(Debug, Clone, Serialize)]
pub struct HiddenEntry {
    pub actor: String,
    pub info: String,
    pub phase: Phase,
    pub day: Day,
    pub turn: Turn,
}

/// Start/end turn markers for one phase, for replay and analysis.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseRecord {
    pub phase: Phase,
    pub day: Day,
    pub turn_start: Turn,
    pub turn_end: Option<Turn>,
}

/// Post-game export consumed by drivers and batch harnesses.
/// Token usage is a consumer concern; the core leaves it empty.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub game_id: String,
    pub winner: Option<Faction>,
    pub day_count: Day,
    pub final_roles: BTreeMap<String, String>,
    pub alive_at_end: Vec<String>,
    pub dead_at_end: Vec<String>,
    pub token_usage: BTreeMap<String, u64>,
}

/// The authoritative data store for one game. Mutated only through the
/// moderator's methods and its own operations; created once per game and
/// discarded by the driver afterwards.
#[derive(Debug, Clone)]
pub struct GameState {
    pub players: Vec<Player>,
    pub config: Config,

    pub phase: Phase,
    pub day_count: Day,
    pub turn_number_in_phase: Turn,
    pub current_player_turn: Option<String>,
    /// Name of the asker when the current turn answers a question.
    pub turn_context: Option<String>,

    /// Derived caches; invariant: together they partition all player names.
    pub alive_players: BTreeSet<String>,
    pub dead_players: BTreeSet<String>,

    pub messages: Vec<Message>,
    pub hidden_log: Vec<HiddenEntry>,

    /// voter -> current accusation vote target.
    pub votes_for_accusation: BTreeMap<String, String>,
    /// target -> number of voters currently pointing at it.
    pub accusation_counts: BTreeMap<String, usize>,
    pub player_on_trial: Option<String>,
    pub votes_for_lynch: BTreeMap<String, Ballot>,

    /// Night buffers, cleared every night.
    pub night_actions_submitted: BTreeMap<String, NightIntent>,
    pub night_action_results: BTreeMap<String, String>,

    pub game_id: String,
    pub game_over: bool,
    pub winner: Option<Faction>,
    /// Populated exactly once, at game end.
    pub final_player_roles: BTreeMap<String, String>,
    pub phase_history: Vec<PhaseRecord>,
}

impl GameState {
    pub fn new(players: Vec<Player>, config: Config) -> Self {
        Self {
            players,
            config,
            phase: Phase::Night,
            day_count: 0,
            turn_number_in_phase: 0,
            current_player_turn: None,
            turn_context: None,
            alive_players: BTreeSet::new(),
            dead_players: BTreeSet::new(),
            messages: Vec::new(),
            hidden_log: Vec::new(),
            votes_for_accusation: BTreeMap::new(),
            accusation_counts: BTreeMap::new(),
            player_on_trial: None,
            votes_for_lynch: BTreeMap::new(),
            night_actions_submitted: BTreeMap::new(),
            night_action_results: BTreeMap::new(),
            game_id: uuid::Uuid::new_v4().to_string(),
            game_over: false,
            winner: None,
            final_player_roles: BTreeMap::new(),
            phase_history: Vec::new(),
        }
    }

    /// Seed the alive set, clear logs, and reset every player.
    /// Called exactly once at game start.
    pub fn initialize(&mut self) {
        self.alive_players = self.players.iter().map(|p| p.name.clone()).collect();
        self.dead_players.clear();
        self.day_count = 0;
        self.phase = Phase::Night;
        self.game_over = false;
        self.winner = None;
        self.messages.clear();
        self.hidden_log.clear();
        self.final_player_roles.clear();
        self.votes_for_accusation.clear();
        self.accusation_counts.clear();
        self.player_on_trial = None;
        self.votes_for_lynch.clear();
        self.night_actions_submitted.clear();
        self.night_action_results.clear();
        for player in self.players.iter_mut() {
            player.reset_for_new_game();
        }
        self.record_phase_start();
        self.log_system("Game started.");
        let roster = self
            .players
            .iter()
            .map(|p| format!("{}: {}", p.name, p.role))
            .collect::<Vec<_>>()
            .join(", ");
        self.log_hidden("system", format!("game id: {}", self.game_id));
        self.log_hidden("system", format!("initial roles: {}", roster));
    }

    // ------------------------------------------------------------------
    // Players & survival
    // ------------------------------------------------------------------

    pub fn get_player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn get_player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn is_alive(&self, name: &str) -> bool {
        self.alive_players.contains(name)
    }

    /// Officially kill a player. Idempotent: already-dead names are no-ops.
    /// Logs the death announcement, runs Godfather succession, and checks
    /// the win condition.
    pub fn kill_player(&mut self, name: &str, reason: &str) {
        if !self.alive_players.contains(name) {
            return;
        }
        let Some(idx) = self.players.iter().position(|p| p.name == name) else {
            return;
        };
        let role = self.players[idx].role;
        self.players[idx].alive = false;
        self.alive_players.remove(name);
        self.dead_players.insert(name.to_string());
        self.log(
            Kind::Death,
            "system",
            format!("{} ({}) has died ({}).", name, role, reason),
            None,
        );
        self.log_hidden("system", format!("{} died. reason: {}", name, reason));
        if role == Role::Godfather {
            self.promote_goon(name);
        }
        self.check_game_end();
    }

    /// Succession: the first alive Goon, in registration order, inherits the
    /// Godfather role in place. Identity stays; only the role component and
    /// derived faction change.
    fn promote_goon(&mut self, dead_godfather: &str) {
        match self
            .players
            .iter()
            .position(|p| p.alive && p.role == Role::Goon)
        {
            Some(idx) => {
                self.players[idx].promote(Role::Godfather);
                let name = self.players[idx].name.clone();
                self.log(
                    Kind::System,
                    "system",
                    "You have been promoted to Godfather!",
                    Some(vec![name.clone()]),
                );
                self.log_hidden(
                    &name,
                    format!("promoted to Godfather after {}'s death", dead_godfather),
                );
            }
            None => self.log_hidden(
                "system",
                format!("no Goon available to promote after {} died", dead_godfather),
            ),
        }
    }

    // ------------------------------------------------------------------
    // Endgame
    // ------------------------------------------------------------------

    /// Town wins iff no Mafia remain; Mafia wins iff it matches or outnumbers
    /// Town (ties favor Mafia). On a win: set flags, snapshot final roles.
    pub fn check_game_end(&mut self) -> bool {
        if self.game_over {
            return true;
        }
        let mafia = self
            .players
            .iter()
            .filter(|p| p.alive && p.faction == Faction::Mafia)
            .count();
        let town = self
            .players
            .iter()
            .filter(|p| p.alive && p.faction == Faction::Town)
            .count();
        let winner = if mafia == 0 {
            Some(Faction::Town)
        } else if mafia >= town {
            Some(Faction::Mafia)
        } else {
            None
        };
        let Some(winner) = winner else {
            return false;
        };
        self.game_over = true;
        self.winner = Some(winner);
        self.phase = Phase::GameOver;
        self.final_player_roles = self
            .players
            .iter()
            .map(|p| (p.name.clone(), p.role.name().to_string()))
            .collect();
        self.log_system(format!(
            "Game Over! Winner: {}",
            winner.to_string().to_uppercase()
        ));
        self.log_hidden("system", format!("final roles: {:?}", self.final_player_roles));
        true
    }

    // ------------------------------------------------------------------
    // Accusation tallies
    // ------------------------------------------------------------------

    /// Maintains the invariant that `accusation_counts[t]` equals the number
    /// of voters whose current vote is `t`: decrement the old target
    /// (dropping the key at zero) before incrementing the new one.
    pub fn update_vote_counts(&mut self, voter: &str, old_target: Option<&str>, new_target: &str) {
        if let Some(old) = old_target {
            if let Some(count) = self.accusation_counts.get_mut(old) {
                if *count <= 1 {
                    self.accusation_counts.remove(old);
                } else {
                    *count -= 1;
                }
            }
        }
        *self
            .accusation_counts
            .entry(new_target.to_string())
            .or_insert(0) += 1;
        self.votes_for_accusation
            .insert(voter.to_string(), new_target.to_string());
    }

    /// Votes needed to put someone on trial: config override or majority.
    pub fn accusation_threshold(&self) -> usize {
        self.config
            .accusation_threshold
            .unwrap_or(self.alive_players.len() / 2 + 1)
    }

    // ------------------------------------------------------------------
    // Phase bookkeeping
    // ------------------------------------------------------------------

    /// Clears leftover buffers from the previous night and resets every
    /// alive player's night transients.
    pub fn reset_night_phase_state(&mut self) {
        self.night_actions_submitted.clear();
        self.night_action_results.clear();
        self.turn_number_in_phase = 0;
        self.current_player_turn = None;
        for player in self.players.iter_mut().filter(|p| p.alive) {
            player.reset_night_state();
        }
    }

    /// Clears accusations, lynch votes, and every alive player's day
    /// transients. The only point where blackmail-style muting is lifted.
    pub fn reset_day_phase_state(&mut self) {
        self.votes_for_accusation.clear();
        self.accusation_counts.clear();
        self.player_on_trial = None;
        self.votes_for_lynch.clear();
        self.turn_number_in_phase = 0;
        self.current_player_turn = None;
        self.turn_context = None;
        for player in self.players.iter_mut().filter(|p| p.alive) {
            player.reset_day_state();
        }
    }

    /// Stores an intended night action for central resolution.
    pub fn register_night_action(&mut self, actor: &str, intent: NightIntent) {
        if !self.is_alive(actor) {
            return;
        }
        self.log_hidden(actor, format!("submitted night action: {}", intent));
        self.night_actions_submitted.insert(actor.to_string(), intent);
    }

    // ------------------------------------------------------------------
    // Logging
    // ------------------------------------------------------------------

    pub fn log(
        &mut self,
        kind: Kind,
        sender: &str,
        content: impl Into<String>,
        recipients: Option<Vec<String>>,
    ) {
        self.messages.push(Message {
            kind,
            sender: sender.to_string(),
            content: content.into(),
            recipients,
            phase: self.phase,
            day: self.day_count,
        });
    }

    pub fn log_message(&mut self, sender: &str, content: impl Into<String>) {
        self.log(Kind::Public, sender, content, None);
    }

    pub fn log_system(&mut self, content: impl Into<String>) {
        self.log(Kind::System, "system", content, None);
    }

    pub fn log_hidden(&mut self, actor: &str, info: impl Into<String>) {
        let info = info.into();
        log::debug!("[hidden] {}: {}", actor, info);
        self.hidden_log.push(HiddenEntry {
            actor: actor.to_string(),
            info,
            phase: self.phase,
            day: self.day_count,
            turn: self.turn_number_in_phase,
        });
    }

    // ------------------------------------------------------------------
    // Soft player operations
    // All validate liveness of actor and target, log the outcome, and
    // return success; ordinary invalid actions never panic or error.
    // ------------------------------------------------------------------

    /// Publicly accuse a target. Whether the accusation opens a trial is the
    /// moderator's call; this only validates and logs it.
    pub fn accuse(&mut self, voter: &str, target: &str) -> bool {
        let can_speak = self.get_player(voter).map(|p| p.can_speak()).unwrap_or(false);
        if !can_speak {
            self.log_hidden(voter, format!("attempted to accuse {} but cannot speak", target));
            return false;
        }
        if !self.is_alive(target) {
            self.log_hidden(
                voter,
                format!("attempted to accuse {} but they are dead or invalid", target),
            );
            return false;
        }
        let repeat = self
            .get_player(voter)
            .map(|p| p.has_accused_today)
            .unwrap_or(false);
        if repeat {
            self.log_hidden(voter, format!("re-accusing: now accusing {}", target));
        }
        if let Some(player) = self.get_player_mut(voter) {
            player.has_accused_today = true;
        }
        self.log(Kind::Vote, voter, format!("{} accuses {}!", voter, target), None);
        true
    }

    /// Cast or change an accusation vote, keeping the tallies consistent.
    pub fn vote_for(&mut self, voter: &str, target: &str) -> bool {
        if !self.is_alive(voter) {
            self.log_hidden(voter, "dead players cannot vote");
            return false;
        }
        if !self.is_alive(target) {
            self.log_hidden(
                voter,
                format!("attempted to vote for {} but they are dead or invalid", target),
            );
            return false;
        }
        let old = self.get_player(voter).and_then(|p| p.vote.clone());
        if old.as_deref() == Some(target) {
            return true;
        }
        if let Some(player) = self.get_player_mut(voter) {
            player.vote = Some(target.to_string());
        }
        match &old {
            Some(prev) => {
                self.log_hidden(voter, format!("changed vote from {} to {}", prev, target));
                self.log(
                    Kind::Vote,
                    voter,
                    format!("{} changed vote to {}.", voter, target),
                    None,
                );
            }
            None => {
                self.log_hidden(voter, format!("voted for {}", target));
                self.log(
                    Kind::Vote,
                    voter,
                    format!("{} voted for {}.", voter, target),
                    None,
                );
            }
        }
        self.update_vote_counts(voter, old.as_deref(), target);
        true
    }

    /// Ask another player a question. Queue scheduling is the moderator's.
    pub fn question(&mut self, asker: &str, target: &str, content: &str) -> bool {
        let can_speak = self.get_player(asker).map(|p| p.can_speak()).unwrap_or(false);
        if !can_speak {
            self.log_hidden(asker, format!("attempted to question {} but cannot speak", target));
            return false;
        }
        if !self.is_alive(target) {
            self.log_hidden(
                asker,
                format!("attempted to question {} but they are dead or invalid", target),
            );
            return false;
        }
        if let Some(player) = self.get_player_mut(asker) {
            *player
                .questions_asked_today
                .entry(target.to_string())
                .or_insert(0) += 1;
        }
        self.log_hidden(asker, format!("asked {}: {}", target, content));
        self.log_message(asker, format!("{} asks {}: \"{}\"", asker, target, content));
        true
    }

    /// Send a private message. Everyone sees that a whisper happened; only
    /// the participants see its content.
    pub fn whisper(&mut self, sender: &str, target: &str, content: &str) -> bool {
        if !self.is_alive(sender) {
            self.log_hidden(sender, "dead players cannot whisper");
            return false;
        }
        if !self.is_alive(target) {
            self.log_hidden(
                sender,
                format!("attempted to whisper {} but they are dead or invalid", target),
            );
            return false;
        }
        if let Some(player) = self.get_player_mut(sender) {
            player
                .whispers_sent_today
                .insert(target.to_string(), content.to_string());
        }
        self.log_hidden(sender, format!("whispered to {}: {}", target, content));
        self.log(
            Kind::Whisper,
            sender,
            content,
            Some(vec![target.to_string()]),
        );
        self.log_message(sender, format!("[WHISPER] {} to {}", sender, target));
        true
    }

    /// Record a role prediction for later analysis. Dead targets are fair
    /// game; unknown names are not.
    pub fn predict_role(&mut self, who: &str, target: &str, predicted: &str) -> bool {
        if !self.is_alive(who) {
            return false;
        }
        if self.get_player(target).is_none() {
            self.log_hidden(who, format!("attempted to predict unknown player {}", target));
            return false;
        }
        if let Some(player) = self.get_player_mut(who) {
            player
                .predictions
                .insert(target.to_string(), predicted.to_string());
        }
        self.log_hidden(who, format!("predicted {} as {}", target, predicted));
        true
    }

    /// Record a final-trial ballot. Abstentions are logged but stay out of
    /// the lynch tally's denominator.
    pub fn cast_trial_vote(&mut self, voter: &str, ballot: Ballot) -> bool {
        if !self.is_alive(voter) {
            self.log_hidden(voter, "dead players cannot vote");
            return false;
        }
        if let Some(player) = self.get_player_mut(voter) {
            player.trial_vote = Some(ballot);
        }
        self.votes_for_lynch.insert(voter.to_string(), ballot);
        let on_trial = self.player_on_trial.clone().unwrap_or_default();
        match ballot {
            Ballot::Abstain => self.log(Kind::Vote, voter, "abstains from voting.", None),
            _ => self.log(
                Kind::Vote,
                voter,
                format!("votes {} on {}.", ballot, on_trial),
                None,
            ),
        }
        self.log_hidden(voter, format!("cast final vote: {}", ballot));
        true
    }

    // ------------------------------------------------------------------
    // Phase history & export
    // ------------------------------------------------------------------

    pub fn record_phase_start(&mut self) {
        self.phase_history.push(PhaseRecord {
            phase: self.phase,
            day: self.day_count,
            turn_start: self.turn_number_in_phase,
            turn_end: None,
        });
    }

    pub fn record_phase_end(&mut self) {
        if let Some(record) = self.phase_history.last_mut() {
            record.turn_end = Some(self.turn_number_in_phase);
        }
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            game_id: self.game_id.clone(),
            winner: self.winner,
            day_count: self.day_count,
            final_roles: self.final_player_roles.clone(),
            alive_at_end: self.alive_players.iter().cloned().collect(),
            dead_at_end: self.dead_players.iter().cloned().collect(),
            token_usage: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(roles: &[(&str, Role)]) -> GameState {
        let players = roles
            .iter()
            .map(|(name, role)| Player::new(*name, *role))
            .collect();
        let mut state = GameState::new(players, Config::default());
        state.initialize();
        state
    }

    fn five() -> GameState {
        fixture(&[
            ("Alice", Role::Cop),
            ("Bob", Role::Doctor),
            ("Carol", Role::Villager),
            ("Dave", Role::Godfather),
            ("Eve", Role::Goon),
        ])
    }

    fn partitioned(state: &GameState) -> bool {
        let all: BTreeSet<String> = state.players.iter().map(|p| p.name.clone()).collect();
        let union: BTreeSet<String> = state
            .alive_players
            .union(&state.dead_players)
            .cloned()
            .collect();
        union == all && state.alive_players.is_disjoint(&state.dead_players)
    }

    #[test]
    fn alive_and_dead_partition_the_roster() {
        let mut state = five();
        assert!(partitioned(&state));
        state.kill_player("Carol", "test");
        assert!(partitioned(&state));
        state.kill_player("Dave", "test");
        assert!(partitioned(&state));
    }

    #[test]
    fn kill_is_idempotent() {
        let mut state = five();
        state.kill_player("Carol", "first");
        let deaths = state.messages.iter().filter(|m| m.kind == Kind::Death).count();
        state.kill_player("Carol", "second");
        let again = state.messages.iter().filter(|m| m.kind == Kind::Death).count();
        assert_eq!(deaths, again);
        assert!(!state.is_alive("Carol"));
    }

    #[test]
    fn vote_counts_match_voters() {
        let mut state = five();
        state.vote_for("Alice", "Dave");
        state.vote_for("Bob", "Dave");
        state.vote_for("Carol", "Eve");
        assert_eq!(state.accusation_counts.get("Dave"), Some(&2));
        assert_eq!(state.accusation_counts.get("Eve"), Some(&1));
        // changing a vote moves the count and drops empty keys
        state.vote_for("Carol", "Dave");
        assert_eq!(state.accusation_counts.get("Dave"), Some(&3));
        assert_eq!(state.accusation_counts.get("Eve"), None);
        for (target, count) in state.accusation_counts.iter() {
            let voters = state
                .votes_for_accusation
                .values()
                .filter(|t| *t == target)
                .count();
            assert_eq!(voters, *count);
        }
    }

    #[test]
    fn godfather_succession_promotes_first_goon() {
        let mut state = five();
        state.kill_player("Dave", "lynched");
        let eve = state.get_player("Eve").unwrap();
        assert_eq!(eve.role, Role::Godfather);
        assert_eq!(eve.faction, Faction::Mafia);
        let promoted = state
            .players
            .iter()
            .filter(|p| p.role == Role::Godfather)
            .count();
        assert_eq!(promoted, 2); // dead Dave keeps his role, Eve inherits it
    }

    #[test]
    fn no_promotion_without_goons() {
        let mut state = fixture(&[
            ("Alice", Role::Cop),
            ("Bob", Role::Doctor),
            ("Carol", Role::Villager),
            ("Dave", Role::Godfather),
        ]);
        state.kill_player("Dave", "lynched");
        assert!(state.players.iter().all(|p| p.alive == (p.name != "Dave")));
        assert_eq!(state.winner, Some(Faction::Town));
    }

    #[test]
    fn town_wins_when_mafia_gone() {
        let mut state = five();
        state.kill_player("Dave", "test");
        state.kill_player("Eve", "test");
        assert!(state.game_over);
        assert_eq!(state.winner, Some(Faction::Town));
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.final_player_roles.len(), 5);
    }

    #[test]
    fn mafia_wins_on_parity() {
        let mut state = five();
        // 2 mafia vs 3 town; kill one townie -> 2v2 parity favors mafia
        state.kill_player("Carol", "test");
        assert!(!state.game_over);
        state.kill_player("Alice", "test");
        assert!(state.game_over);
        assert_eq!(state.winner, Some(Faction::Mafia));
    }

    #[test]
    fn dead_players_cannot_act() {
        let mut state = five();
        state.kill_player("Carol", "test");
        assert!(!state.accuse("Carol", "Dave"));
        assert!(!state.vote_for("Carol", "Dave"));
        assert!(!state.whisper("Carol", "Alice", "boo"));
        assert!(!state.accuse("Alice", "Carol")); // dead target
    }

    #[test]
    fn final_roles_snapshot_only_at_end() {
        let mut state = five();
        assert!(state.final_player_roles.is_empty());
        state.kill_player("Dave", "test");
        state.kill_player("Eve", "test");
        assert_eq!(
            state.final_player_roles.get("Eve").map(String::as_str),
            Some("Godfather") // promoted before dying
        );
    }
}
