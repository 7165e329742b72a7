use super::config::Config;
use super::tags;
use super::tags::SpeechTags;
use crate::game::action::Action;
use crate::game::action::Ballot;
use crate::game::message::Kind;
use crate::game::observation::Observation;
use crate::game::phase::Phase;
use crate::game::player::MemoryEntry;
use crate::game::state::GameState;
use crate::game::state::GameSummary;
use crate::roles::faction::Faction;
use crate::roles::role::NightIntent;
use crate::roles::role::Role;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

/// The game master. Owns the state, schedules turns, applies actions, and
/// advances phases. Drivers talk to the game exclusively through this type:
/// collect `pending_actors`, feed each an observation, apply the reply, and
/// call `step_phase` once nobody is pending.
pub struct Moderator {
    state: GameState,
    /// Discussion order for the current day round.
    speaker_queue: VecDeque<String>,
    /// Interjections jump the speaker queue: (speaker, asker context).
    question_queue: VecDeque<(String, Option<String>)>,
    /// Turns consumed per player this discussion.
    discussion_turns: BTreeMap<String, usize>,
    consecutive_passes: usize,
    /// Question rounds initiated per asker today.
    question_rounds: BTreeMap<String, usize>,
    /// Everyone who has resolved their night obligation, even invalidly.
    night_done: BTreeSet<String>,
    /// Results of the last night, applied at dawn.
    overnight_deaths: BTreeSet<String>,
    blackmailed_overnight: BTreeSet<String>,
    defense_heard: bool,
}

impl Moderator {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let players = config.players()?;
        let mut state = GameState::new(players, config);
        state.initialize();
        log::info!("[moderator] game {} started", state.game_id);
        Ok(Self {
            state,
            speaker_queue: VecDeque::new(),
            question_queue: VecDeque::new(),
            discussion_turns: BTreeMap::new(),
            consecutive_passes: 0,
            question_rounds: BTreeMap::new(),
            night_done: BTreeSet::new(),
            overnight_deaths: BTreeSet::new(),
            blackmailed_overnight: BTreeSet::new(),
            defense_heard: false,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn game_over(&self) -> bool {
        self.state.game_over
    }

    pub fn summary(&self) -> GameSummary {
        self.state.summary()
    }

    pub fn observe(&self, name: &str) -> Observation {
        self.state.observe(name)
    }

    /// Who owes the moderator an action right now. Empty means the phase has
    /// run its course and `step_phase` should advance it.
    pub fn pending_actors(&self) -> Vec<String> {
        match self.state.phase {
            Phase::Night => self
                .state
                .players
                .iter()
                .filter(|p| p.can_act_at_night() && !self.night_done.contains(&p.name))
                .map(|p| p.name.clone())
                .collect(),
            Phase::DayDiscussion => self
                .state
                .current_player_turn
                .clone()
                .into_iter()
                .collect(),
            Phase::Defense => match (&self.state.player_on_trial, self.defense_heard) {
                (Some(accused), false) if self.state.is_alive(accused) => vec![accused.clone()],
                _ => Vec::new(),
            },
            Phase::FinalVote => {
                let accused = self.state.player_on_trial.clone();
                self.state
                    .players
                    .iter()
                    .filter(|p| p.alive)
                    .filter(|p| accused.as_deref() != Some(p.name.as_str()))
                    .filter(|p| !self.state.votes_for_lynch.contains_key(&p.name))
                    .map(|p| p.name.clone())
                    .collect()
            }
            Phase::Voting | Phase::GameOver => Vec::new(),
        }
    }

    /// Apply one player's action. Ordinary invalid actions are absorbed into
    /// the hidden log and never panic; a current-turn actor always consumes
    /// their turn so a misbehaving agent cannot stall the game.
    pub fn apply(&mut self, actor: &str, action: Action) {
        if self.state.game_over || !self.state.is_alive(actor) {
            return;
        }
        match self.state.phase {
            Phase::Night => self.apply_night(actor, action),
            Phase::DayDiscussion => self.apply_discussion(actor, action),
            Phase::Defense => self.apply_defense(actor, action),
            Phase::FinalVote => self.apply_final_vote(actor, action),
            // Legacy voting path for drivers that route through it; only a
            // vote naming the accused counts.
            Phase::Voting => match action {
                Action::Vote {
                    target: Some(target),
                    ..
                } => {
                    if self.state.player_on_trial.as_deref() == Some(target.as_str()) {
                        self.state.vote_for(actor, &target);
                    } else {
                        self.state.log_hidden(
                            actor,
                            format!("vote must name the accused, rejected: {}", target),
                        );
                    }
                }
                Action::Pass | Action::Skip => {}
                other => {
                    self.state
                        .log_hidden(actor, format!("invalid voting action: {:?}", other));
                }
            },
            Phase::GameOver => {
                self.state
                    .log_hidden(actor, format!("action ignored after game over: {:?}", action));
            }
        }
    }

    /// Advance the phase machine once no actors are pending.
    pub fn step_phase(&mut self) {
        if self.state.game_over {
            return;
        }
        match self.state.phase {
            Phase::Night => {
                self.resolve_night();
                self.transition_to_day();
            }
            Phase::DayDiscussion | Phase::Voting => {
                if self.state.player_on_trial.is_some() {
                    if self.state.config.lynch_defense_enabled {
                        self.transition_to_defense();
                    } else {
                        self.transition_to_final_vote();
                    }
                } else {
                    self.transition_to_night();
                }
            }
            Phase::Defense => self.transition_to_final_vote(),
            Phase::FinalVote => {
                self.resolve_lynch();
                if !self.state.game_over {
                    self.transition_to_night();
                }
            }
            Phase::GameOver => {}
        }
    }

    // ------------------------------------------------------------------
    // Night
    // ------------------------------------------------------------------

    fn apply_night(&mut self, actor: &str, action: Action) {
        // Predictions are a side channel and do not spend the night action.
        if let Action::Predict {
            target,
            predicted_role,
        } = &action
        {
            self.state.predict_role(actor, target, predicted_role);
            return;
        }
        // Whatever happens below, the actor has had their chance tonight.
        self.night_done.insert(actor.to_string());
        let target = match action {
            Action::Night { target } => target,
            Action::Pass | Action::Skip => {
                self.state.log_hidden(actor, "takes no night action");
                return;
            }
            other => {
                self.state
                    .log_hidden(actor, format!("invalid night action: {:?}", other));
                return;
            }
        };
        let Some(player) = self.state.get_player(actor) else {
            return;
        };
        let intent = player
            .role
            .night_intent(player, &self.state, target.as_deref());
        match intent {
            Ok(intent) => {
                if let Some(player) = self.state.get_player_mut(actor) {
                    player.night_target = Some(intent.target().to_string());
                }
                self.state.register_night_action(actor, intent);
            }
            Err(reason) => {
                self.state
                    .log_hidden(actor, format!("night action rejected: {}", reason));
            }
        }
    }

    /// Central night resolution, in fixed order: roleblocks, blackmail,
    /// protections, kills, investigations. Deaths are staged here and
    /// applied at dawn so the announcement reads as one event.
    fn resolve_night(&mut self) {
        let intents = self.state.night_actions_submitted.clone();
        let order: Vec<String> = self.state.players.iter().map(|p| p.name.clone()).collect();

        // Roleblocks land simultaneously; a blocked blocker still blocks.
        for actor in &order {
            if let Some(NightIntent::Block(target)) = intents.get(actor) {
                let target = target.clone();
                if let Some(player) = self.state.get_player_mut(&target) {
                    player.is_roleblocked = true;
                }
                self.state.log_hidden(actor, format!("blocked {}", target));
                self.state.log(
                    Kind::System,
                    "system",
                    "You were roleblocked last night!",
                    Some(vec![target]),
                );
            }
        }
        let blocked = |state: &GameState, name: &str| {
            state
                .get_player(name)
                .map(|p| p.is_roleblocked)
                .unwrap_or(true)
        };

        for actor in &order {
            if let Some(NightIntent::Blackmail(target)) = intents.get(actor) {
                if blocked(&self.state, actor) {
                    continue;
                }
                self.blackmailed_overnight.insert(target.clone());
                self.state.log_hidden(actor, format!("blackmailed {}", target));
            }
        }

        // First protection on a target wins; later ones are redundant.
        for actor in &order {
            if let Some(NightIntent::Protect(target)) = intents.get(actor) {
                if blocked(&self.state, actor) {
                    continue;
                }
                let target = target.clone();
                if let Some(player) = self.state.get_player_mut(&target) {
                    if player.protected_by.is_none() {
                        player.protected_by = Some(actor.clone());
                        self.state.log_hidden(actor, format!("protected {}", target));
                    } else {
                        self.state.log_hidden(
                            actor,
                            format!("{} is already under protection", target),
                        );
                    }
                }
            }
        }

        // Kills are independent of each other; protection foils all of them.
        for actor in &order {
            if let Some(NightIntent::Kill(target)) = intents.get(actor) {
                if blocked(&self.state, actor) {
                    continue;
                }
                let protector = self
                    .state
                    .get_player(target)
                    .and_then(|p| p.protected_by.clone());
                match protector {
                    Some(protector) => {
                        self.state.log_hidden(
                            actor,
                            format!("kill on {} foiled by {}", target, protector),
                        );
                        self.state.log(
                            Kind::System,
                            "system",
                            format!("Your patient {} was attacked last night!", target),
                            Some(vec![protector]),
                        );
                    }
                    None => {
                        self.state
                            .log_hidden(actor, format!("kill on {} succeeds", target));
                        self.overnight_deaths.insert(target.clone());
                    }
                }
            }
        }

        // Information gathering resolves last; results are private.
        for actor in &order {
            match intents.get(actor) {
                Some(NightIntent::Investigate(target)) if !blocked(&self.state, actor) => {
                    let faction = self
                        .state
                        .get_player(target)
                        .map(|p| {
                            if p.role == Role::Godfather && !self.state.config.godfather_detectable
                            {
                                Faction::Town
                            } else {
                                p.faction
                            }
                        })
                        .unwrap_or(Faction::Town);
                    let day = self.state.day_count;
                    let target = target.clone();
                    if let Some(player) = self.state.get_player_mut(actor) {
                        player.memory.push(MemoryEntry::InvestigationResult {
                            day,
                            target: target.clone(),
                            result: faction,
                        });
                    }
                    self.state
                        .log_hidden(actor, format!("investigated {}: {}", target, faction));
                    self.state.night_action_results.insert(
                        actor.clone(),
                        format!("{} is aligned with {}", target, faction),
                    );
                    self.state.log(
                        Kind::System,
                        "system",
                        format!("Investigation result: {} is aligned with {}.", target, faction),
                        Some(vec![actor.clone()]),
                    );
                }
                Some(NightIntent::Peek(target)) if !blocked(&self.state, actor) => {
                    let Some(role) = self.state.get_player(target).map(|p| p.role) else {
                        continue;
                    };
                    let day = self.state.day_count;
                    let target = target.clone();
                    if let Some(player) = self.state.get_player_mut(actor) {
                        player.memory.push(MemoryEntry::RolePeek {
                            day,
                            target: target.clone(),
                            role: role.name().to_string(),
                        });
                    }
                    self.state
                        .log_hidden(actor, format!("peeked at {}: {}", target, role));
                    self.state
                        .night_action_results
                        .insert(actor.clone(), format!("{} is the {}", target, role));
                    self.state.log(
                        Kind::System,
                        "system",
                        format!("You learned {}'s exact role: {}.", target, role),
                        Some(vec![actor.clone()]),
                    );
                }
                Some(_) | None => {}
            }
        }
    }

    fn transition_to_day(&mut self) {
        self.state.record_phase_end();
        self.state.day_count += 1;
        self.state.phase = Phase::DayDiscussion;
        let deaths = std::mem::take(&mut self.overnight_deaths);
        if deaths.is_empty() {
            self.state
                .log_system("The sun rises. Miraculously, nobody died last night!");
        } else {
            let names = deaths.iter().cloned().collect::<Vec<_>>().join(", ");
            self.state.log_system(format!(
                "The sun rises. The following were found dead: {}.",
                names
            ));
        }
        for name in &deaths {
            self.state.kill_player(name, "killed during the night");
        }
        if self.state.game_over {
            return;
        }
        self.state.reset_day_phase_state();
        for name in std::mem::take(&mut self.blackmailed_overnight) {
            if let Some(player) = self.state.get_player_mut(&name) {
                player.can_speak_today = false;
            }
            self.state
                .log_hidden(&name, "cannot speak today (blackmailed)");
            self.state.log(
                Kind::System,
                "system",
                "You were blackmailed last night and cannot speak today.",
                Some(vec![name]),
            );
        }
        self.state.log_system(format!(
            "Day {} begins. Discuss and vote!",
            self.state.day_count
        ));
        self.state.record_phase_start();
        self.start_discussion_round();
    }

    // ------------------------------------------------------------------
    // Day discussion
    // ------------------------------------------------------------------

    fn start_discussion_round(&mut self) {
        self.speaker_queue.clear();
        self.question_queue.clear();
        self.discussion_turns.clear();
        self.question_rounds.clear();
        self.consecutive_passes = 0;
        self.defense_heard = false;
        self.refill_speakers();
        self.advance_turn();
    }

    fn refill_speakers(&mut self) {
        let mut names: Vec<String> = self
            .state
            .players
            .iter()
            .filter(|p| p.alive)
            .map(|p| p.name.clone())
            .collect();
        if self.state.config.cop_speaks_first {
            names.sort_by_key(|name| {
                self.state
                    .get_player(name)
                    .map(|p| p.role != Role::Cop)
                    .unwrap_or(true)
            });
        }
        self.speaker_queue = names.into();
    }

    fn discussion_over(&self) -> bool {
        if self.state.player_on_trial.is_some() {
            return true;
        }
        let alive = self.state.alive_players.len();
        let everyone_spoke = self.state.alive_players.iter().all(|name| {
            self.discussion_turns.get(name).copied().unwrap_or(0)
                >= self.state.config.min_discussion_turns
        });
        everyone_spoke || self.consecutive_passes >= alive
    }

    fn advance_turn(&mut self) {
        if self.state.game_over || self.discussion_over() {
            self.state.current_player_turn = None;
            self.state.turn_context = None;
            return;
        }
        while let Some((speaker, context)) = self.question_queue.pop_front() {
            if self.state.is_alive(&speaker) {
                self.state.turn_number_in_phase += 1;
                self.state.current_player_turn = Some(speaker);
                self.state.turn_context = context;
                return;
            }
        }
        // The queue is seeded only at round start; when it runs dry without
        // a discussion-end, the floor clears and the phase advances.
        while let Some(next) = self.speaker_queue.pop_front() {
            if self.state.is_alive(&next) {
                self.state.turn_number_in_phase += 1;
                self.state.current_player_turn = Some(next);
                self.state.turn_context = None;
                return;
            }
        }
        self.state.current_player_turn = None;
    }

    fn apply_discussion(&mut self, actor: &str, action: Action) {
        if self.state.current_player_turn.as_deref() != Some(actor) {
            self.state
                .log_hidden(actor, format!("acted out of turn: {:?}", action));
            return;
        }
        *self.discussion_turns.entry(actor.to_string()).or_insert(0) += 1;
        match action {
            Action::Speak { content } => self.handle_speech(actor, &content),
            Action::Accuse { target } => {
                self.consecutive_passes = 0;
                self.handle_accusation(actor, &target);
            }
            Action::Vote {
                target: Some(target),
                ..
            } => {
                self.consecutive_passes = 0;
                self.state.vote_for(actor, &target);
                self.check_accusation_threshold(&target);
            }
            Action::Vote { target: None, .. } => {
                self.state
                    .log_hidden(actor, "vote without a target during discussion");
            }
            Action::Question { target, content } => {
                self.consecutive_passes = 0;
                self.handle_question(actor, &target, &content);
            }
            Action::Whisper { target, content } => {
                self.consecutive_passes = 0;
                let already = self
                    .state
                    .get_player(actor)
                    .map(|p| p.whispers_sent_today.contains_key(&target))
                    .unwrap_or(false);
                if already {
                    self.state.log_hidden(
                        actor,
                        format!("already whispered to {} today", target),
                    );
                } else {
                    self.state.whisper(actor, &target, &content);
                }
            }
            Action::Predict {
                target,
                predicted_role,
            } => {
                self.state.predict_role(actor, &target, &predicted_role);
            }
            Action::Night { .. } => {
                self.state.log_hidden(actor, "night action submitted during the day");
            }
            Action::Pass | Action::Skip => {
                self.consecutive_passes += 1;
                self.state.log_system(format!("{} passes.", actor));
            }
        }
        self.advance_turn();
    }

    fn handle_speech(&mut self, actor: &str, content: &str) {
        let can_speak = self
            .state
            .get_player(actor)
            .map(|p| p.can_speak())
            .unwrap_or(false);
        if !can_speak {
            self.state.log_hidden(actor, "attempted to speak while muted");
            self.consecutive_passes += 1;
            return;
        }
        let parsed = SpeechTags::parse(content);
        let prose = tags::strip(content);
        if prose.is_empty() && parsed.is_empty() {
            self.consecutive_passes += 1;
            self.state.log_system(format!("{} passes.", actor));
            return;
        }
        self.consecutive_passes = 0;
        if !prose.is_empty() {
            self.state.log_message(actor, prose);
        }
        for claim in &parsed.claim {
            self.state.log_hidden(actor, format!("claimed role {}", claim));
        }
        for body in &parsed.predict {
            if let Some((target, role)) = tags::parse_prediction(body) {
                self.state.predict_role(actor, &target, &role);
            }
        }
        // Every question tag inside one speech shares a single round.
        if !parsed.question.is_empty() && self.question_round_available(actor) {
            let mut answerers = Vec::new();
            for body in &parsed.question {
                let Some(target) = self.find_named_player(actor, body) else {
                    self.state
                        .log_hidden(actor, format!("question names nobody alive: {}", body));
                    continue;
                };
                if self.ask(actor, &target, body) {
                    answerers.push(target);
                }
            }
            if !answerers.is_empty() {
                *self.question_rounds.entry(actor.to_string()).or_insert(0) += 1;
                self.enqueue_question_round(actor, &answerers);
            }
        }
        for target in &parsed.accuse {
            let target = target.trim();
            if self.state.day_count == 0 {
                self.state
                    .log_hidden(actor, "accusations are not allowed before day one");
                continue;
            }
            self.handle_accusation(actor, target);
        }
    }

    /// Find the first alive player other than the speaker whose name appears
    /// in the text, by registration order.
    fn find_named_player(&self, speaker: &str, text: &str) -> Option<String> {
        self.state
            .players
            .iter()
            .filter(|p| p.alive && p.name != speaker)
            .find(|p| text.contains(&p.name))
            .map(|p| p.name.clone())
    }

    fn handle_question(&mut self, asker: &str, target: &str, content: &str) {
        if !self.question_round_available(asker) {
            return;
        }
        if !self.ask(asker, target, content) {
            return;
        }
        *self.question_rounds.entry(asker.to_string()).or_insert(0) += 1;
        self.enqueue_question_round(asker, &[target.to_string()]);
    }

    fn question_round_available(&mut self, asker: &str) -> bool {
        let rounds = self.question_rounds.get(asker).copied().unwrap_or(0);
        if rounds >= crate::QUESTION_ROUNDS_PER_DAY {
            self.state
                .log_hidden(asker, "question round limit reached, question dropped");
            return false;
        }
        true
    }

    /// Per-target validity, without round bookkeeping.
    fn ask(&mut self, asker: &str, target: &str, content: &str) -> bool {
        let asked_before = self
            .state
            .get_player(asker)
            .map(|p| p.questions_asked_today.contains_key(target))
            .unwrap_or(false);
        if asked_before {
            self.state
                .log_hidden(asker, format!("already questioned {} today", target));
            return false;
        }
        self.state.question(asker, target, content)
    }

    /// Targets answer immediately in order, then the floor returns to the
    /// asker.
    fn enqueue_question_round(&mut self, asker: &str, targets: &[String]) {
        self.question_queue.push_front((asker.to_string(), None));
        for target in targets.iter().rev() {
            self.question_queue
                .push_front((target.clone(), Some(asker.to_string())));
        }
    }

    fn handle_accusation(&mut self, actor: &str, target: &str) {
        if self.state.player_on_trial.is_some() {
            self.state
                .log_hidden(actor, "a trial is already pending, accusation rejected");
            return;
        }
        if !self.state.accuse(actor, target) {
            return;
        }
        self.state.vote_for(actor, target);
        // A bare accusation opens the trial; the config threshold gates it
        // behind the accusation-vote tally instead when set.
        match self.state.config.accusation_threshold {
            Some(_) => self.check_accusation_threshold(target),
            None => self.open_trial(target),
        }
    }

    fn check_accusation_threshold(&mut self, target: &str) {
        if self.state.player_on_trial.is_some() {
            return;
        }
        let count = self
            .state
            .accusation_counts
            .get(target)
            .copied()
            .unwrap_or(0);
        if count >= self.state.accusation_threshold() {
            self.open_trial(target);
        }
    }

    fn open_trial(&mut self, target: &str) {
        self.state.player_on_trial = Some(target.to_string());
        self.state.log_system(format!("{} is on trial!", target));
    }

    // ------------------------------------------------------------------
    // Trial
    // ------------------------------------------------------------------

    fn transition_to_defense(&mut self) {
        self.state.record_phase_end();
        self.state.phase = Phase::Defense;
        self.state.turn_number_in_phase = 0;
        self.state.current_player_turn = self.state.player_on_trial.clone();
        self.defense_heard = false;
        if let Some(accused) = self.state.player_on_trial.clone() {
            self.state.log_system(format!(
                "{}, you are on trial. Present your defense.",
                accused
            ));
        }
        self.state.record_phase_start();
    }

    fn apply_defense(&mut self, actor: &str, action: Action) {
        if self.state.player_on_trial.as_deref() != Some(actor) {
            self.state
                .log_hidden(actor, format!("acted out of turn: {:?}", action));
            return;
        }
        self.defense_heard = true;
        self.state.current_player_turn = None;
        match action {
            Action::Speak { content } => {
                let prose = tags::strip(&content);
                if prose.is_empty() {
                    self.state.log_message(actor, "(Defense) [No statement]");
                } else {
                    self.state
                        .log_message(actor, format!("(Defense) {}", prose));
                }
            }
            _ => {
                self.state.log_message(actor, "(Defense) [No statement]");
            }
        }
    }

    fn transition_to_final_vote(&mut self) {
        self.state.record_phase_end();
        self.state.phase = Phase::FinalVote;
        self.state.turn_number_in_phase = 0;
        self.state.current_player_turn = None;
        self.state.votes_for_lynch.clear();
        if let Some(accused) = self.state.player_on_trial.clone() {
            self.state.log_system(format!(
                "Final voting begins for {}. Vote GUILTY or INNOCENT.",
                accused
            ));
        }
        self.state.record_phase_start();
    }

    fn apply_final_vote(&mut self, actor: &str, action: Action) {
        if self.state.player_on_trial.as_deref() == Some(actor) {
            self.state.log_hidden(actor, "the accused does not vote");
            return;
        }
        let ballot = match action {
            Action::Vote {
                vote_type: Some(ballot),
                ..
            } => ballot,
            Action::Pass | Action::Skip => Ballot::Abstain,
            other => {
                self.state
                    .log_hidden(actor, format!("invalid final vote, recorded as abstain: {:?}", other));
                Ballot::Abstain
            }
        };
        self.state.cast_trial_vote(actor, ballot);
    }

    fn resolve_lynch(&mut self) {
        let Some(accused) = self.state.player_on_trial.clone() else {
            return;
        };
        let guilty = self
            .state
            .votes_for_lynch
            .values()
            .filter(|b| **b == Ballot::Guilty)
            .count();
        let innocent = self
            .state
            .votes_for_lynch
            .values()
            .filter(|b| **b == Ballot::Innocent)
            .count();
        let needed = self.state.alive_players.len() / 2 + 1;
        self.state.log_system(format!(
            "Vote Results for {}: Guilty={}, Innocent={}. Need {} to lynch.",
            accused, guilty, innocent, needed
        ));
        if guilty >= needed {
            self.state
                .log_system(format!("The town has decided to lynch {}!", accused));
            self.state.kill_player(&accused, "lynched by the town");
        } else {
            self.state
                .log_system(format!("The vote is inconclusive, sparing {}.", accused));
        }
        self.state.player_on_trial = None;
    }

    // ------------------------------------------------------------------
    // Night transition
    // ------------------------------------------------------------------

    fn transition_to_night(&mut self) {
        self.state.record_phase_end();
        self.state.phase = Phase::Night;
        self.state.reset_night_phase_state();
        self.night_done.clear();
        self.overnight_deaths.clear();
        self.blackmailed_overnight.clear();
        self.state
            .log_system("Night falls. Mafia members, choose your targets...");
        self.state.record_phase_start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::Seat;

    fn config(roles: &[(&str, &str)]) -> Config {
        Config {
            roles: roles
                .iter()
                .map(|(name, role)| Seat {
                    name: name.to_string(),
                    role: role.to_string(),
                })
                .collect(),
            ..Config::default()
        }
    }

    fn night_action(moderator: &mut Moderator, actor: &str, target: &str) {
        moderator.apply(
            actor,
            Action::Night {
                target: Some(target.to_string()),
            },
        );
    }

    fn finish_night(moderator: &mut Moderator) {
        for actor in moderator.pending_actors() {
            moderator.apply(&actor, Action::Pass);
        }
        moderator.step_phase();
    }

    #[test]
    fn protection_foils_the_kill() {
        let mut m = Moderator::new(config(&[
            ("Alice", "Cop"),
            ("Bob", "Doctor"),
            ("Carol", "Villager"),
            ("Dave", "Godfather"),
            ("Eve", "Goon"),
        ]))
        .unwrap();
        night_action(&mut m, "Dave", "Carol");
        night_action(&mut m, "Bob", "Carol");
        finish_night(&mut m);
        assert!(m.state().is_alive("Carol"));
        assert!(
            m.state()
                .messages
                .iter()
                .any(|msg| msg.content.contains("nobody died"))
        );
    }

    #[test]
    fn protection_foils_every_killer_on_the_target() {
        let mut m = Moderator::new(config(&[
            ("Alice", "Doctor"),
            ("Bob", "Villager"),
            ("Carol", "Villager"),
            ("Dave", "Godfather"),
            ("Eve", "Godfather"),
        ]))
        .unwrap();
        night_action(&mut m, "Dave", "Bob");
        night_action(&mut m, "Eve", "Bob");
        night_action(&mut m, "Alice", "Bob");
        finish_night(&mut m);
        assert!(m.state().is_alive("Bob"));
        let foiled = m
            .state()
            .hidden_log
            .iter()
            .filter(|e| e.info.contains("foiled"))
            .count();
        assert_eq!(foiled, 2);
    }

    #[test]
    fn roleblocked_doctor_cannot_save() {
        let mut m = Moderator::new(config(&[
            ("Alice", "Cop"),
            ("Bob", "Doctor"),
            ("Carol", "Villager"),
            ("Dave", "Godfather"),
            ("Eve", "RoleBlocker"),
        ]))
        .unwrap();
        night_action(&mut m, "Eve", "Bob");
        night_action(&mut m, "Bob", "Carol");
        night_action(&mut m, "Dave", "Carol");
        finish_night(&mut m);
        assert!(!m.state().is_alive("Carol"));
        assert!(
            m.state()
                .messages
                .iter()
                .any(|msg| msg.content.contains("found dead: Carol"))
        );
    }

    #[test]
    fn cop_sees_godfather_as_town() {
        let mut m = Moderator::new(config(&[
            ("Alice", "Cop"),
            ("Bob", "Doctor"),
            ("Carol", "Villager"),
            ("Dave", "Godfather"),
            ("Eve", "Goon"),
        ]))
        .unwrap();
        night_action(&mut m, "Alice", "Dave");
        finish_night(&mut m);
        let alice = m.state().get_player("Alice").unwrap();
        assert_eq!(
            alice.memory.last(),
            Some(&MemoryEntry::InvestigationResult {
                day: 0,
                target: "Dave".into(),
                result: Faction::Town,
            })
        );
    }

    #[test]
    fn detectable_godfather_reads_as_mafia() {
        let mut cfg = config(&[
            ("Alice", "Cop"),
            ("Bob", "Doctor"),
            ("Carol", "Villager"),
            ("Dave", "Godfather"),
            ("Eve", "Goon"),
        ]);
        cfg.godfather_detectable = true;
        let mut m = Moderator::new(cfg).unwrap();
        night_action(&mut m, "Alice", "Dave");
        finish_night(&mut m);
        let alice = m.state().get_player("Alice").unwrap();
        assert_eq!(
            alice.memory.last(),
            Some(&MemoryEntry::InvestigationResult {
                day: 0,
                target: "Dave".into(),
                result: Faction::Mafia,
            })
        );
    }

    fn seven() -> Moderator {
        let cfg = config(&[
            ("P1", "Cop"),
            ("P2", "Doctor"),
            ("P3", "Villager"),
            ("P4", "Villager"),
            ("P5", "Villager"),
            ("P6", "Godfather"),
            ("P7", "Goon"),
        ]);
        Moderator::new(cfg).unwrap()
    }

    fn into_trial(m: &mut Moderator) {
        finish_night(m);
        let accuser = m.state().current_player_turn.clone().unwrap();
        m.apply(
            &accuser,
            Action::Accuse {
                target: "P6".into(),
            },
        );
        assert_eq!(m.state().player_on_trial.as_deref(), Some("P6"));
        m.step_phase(); // into defense
        m.apply(
            "P6",
            Action::Speak {
                content: "I am just a villager.".into(),
            },
        );
        m.step_phase(); // into final vote
        assert_eq!(m.state().phase, Phase::FinalVote);
    }

    #[test]
    fn majority_guilty_lynches() {
        let mut m = seven();
        into_trial(&mut m);
        // 7 alive, need 4 guilty
        for voter in ["P1", "P2", "P3", "P4"] {
            m.apply(
                voter,
                Action::Vote {
                    target: None,
                    vote_type: Some(Ballot::Guilty),
                },
            );
        }
        for voter in ["P5", "P7"] {
            m.apply(
                voter,
                Action::Vote {
                    target: None,
                    vote_type: Some(Ballot::Innocent),
                },
            );
        }
        m.step_phase();
        assert!(!m.state().is_alive("P6"));
        // Goon inherits the role once the Godfather dies
        assert_eq!(m.state().get_player("P7").unwrap().role, Role::Godfather);
    }

    #[test]
    fn short_guilty_tally_spares_the_accused() {
        let mut m = seven();
        into_trial(&mut m);
        for voter in ["P1", "P2", "P3"] {
            m.apply(
                voter,
                Action::Vote {
                    target: None,
                    vote_type: Some(Ballot::Guilty),
                },
            );
        }
        for voter in ["P4", "P5", "P7"] {
            m.apply(
                voter,
                Action::Vote {
                    target: None,
                    vote_type: Some(Ballot::Abstain),
                },
            );
        }
        m.step_phase();
        assert!(m.state().is_alive("P6"));
        assert_eq!(m.state().phase, Phase::Night);
        assert!(m.state().player_on_trial.is_none());
    }

    fn five() -> Moderator {
        Moderator::new(config(&[
            ("Alice", "Cop"),
            ("Bob", "Doctor"),
            ("Carol", "Villager"),
            ("Dave", "Godfather"),
            ("Eve", "Goon"),
        ]))
        .unwrap()
    }

    #[test]
    fn question_rounds_are_capped_per_day() {
        let mut m = five();
        finish_night(&mut m);
        assert_eq!(m.state().current_player_turn.as_deref(), Some("Alice"));
        for target in ["Bob", "Carol", "Dave"] {
            m.apply(
                "Alice",
                Action::Question {
                    target: target.into(),
                    content: format!("{}? explain yourself", target),
                },
            );
            // the target answers, then the floor returns to the asker
            assert_eq!(m.state().current_player_turn.as_deref(), Some(target));
            m.apply(
                target,
                Action::Speak {
                    content: "nothing to hide".into(),
                },
            );
            assert_eq!(m.state().current_player_turn.as_deref(), Some("Alice"));
        }
        // the fourth round is dropped by the cap
        m.apply(
            "Alice",
            Action::Question {
                target: "Eve".into(),
                content: "Eve? anything to add".into(),
            },
        );
        let asked = m.state().get_player("Alice").unwrap();
        assert_eq!(asked.questions_asked_today.len(), crate::QUESTION_ROUNDS_PER_DAY);
        assert!(!asked.questions_asked_today.contains_key("Eve"));
    }

    #[test]
    fn embedded_questions_share_one_round() {
        let mut m = five();
        finish_night(&mut m);
        m.apply(
            "Alice",
            Action::Speak {
                content: "Time for answers. \
                          <question>Bob, where were you?</question> \
                          <question>Carol, and you?</question>"
                    .into(),
            },
        );
        for answerer in ["Bob", "Carol"] {
            assert_eq!(m.state().current_player_turn.as_deref(), Some(answerer));
            m.apply(answerer, Action::Pass);
        }
        assert_eq!(m.state().current_player_turn.as_deref(), Some("Alice"));
        // one round spent on the whole speech; two explicit rounds remain
        for target in ["Dave", "Eve"] {
            m.apply(
                "Alice",
                Action::Question {
                    target: target.into(),
                    content: format!("{}? speak up", target),
                },
            );
            m.apply(target, Action::Pass);
        }
        let asked = m.state().get_player("Alice").unwrap();
        assert_eq!(asked.questions_asked_today.len(), 4);
    }

    #[test]
    fn single_accusation_opens_a_trial() {
        let mut m = seven();
        finish_night(&mut m);
        let accuser = m.state().current_player_turn.clone().unwrap();
        m.apply(&accuser, Action::Accuse { target: "P6".into() });
        assert_eq!(m.state().player_on_trial.as_deref(), Some("P6"));
        assert!(
            m.state()
                .messages
                .iter()
                .any(|msg| msg.content.contains("P6 is on trial!"))
        );
    }

    #[test]
    fn vote_gated_trials_wait_for_the_threshold() {
        let mut cfg = config(&[
            ("P1", "Cop"),
            ("P2", "Doctor"),
            ("P3", "Villager"),
            ("P4", "Villager"),
            ("P5", "Villager"),
            ("P6", "Godfather"),
            ("P7", "Goon"),
        ]);
        cfg.accusation_threshold = Some(2);
        let mut m = Moderator::new(cfg).unwrap();
        finish_night(&mut m);
        m.apply("P1", Action::Accuse { target: "P6".into() });
        assert!(m.state().player_on_trial.is_none());
        m.apply("P2", Action::Accuse { target: "P6".into() });
        assert_eq!(m.state().player_on_trial.as_deref(), Some("P6"));
    }

    #[test]
    fn discussion_ends_when_every_speaker_has_had_the_floor() {
        let mut m = seven();
        finish_night(&mut m);
        for _ in 0..7 {
            let speaker = m.state().current_player_turn.clone().unwrap();
            m.apply(
                &speaker,
                Action::Speak {
                    content: "nothing to report".into(),
                },
            );
        }
        // the speaker queue is not reseeded mid-round
        assert!(m.state().current_player_turn.is_none());
        assert!(m.pending_actors().is_empty());
        m.step_phase();
        assert_eq!(m.state().phase, Phase::Night);
    }

    #[test]
    fn legacy_voting_only_counts_votes_for_the_accused() {
        let mut m = seven();
        finish_night(&mut m);
        m.state.player_on_trial = Some("P6".into());
        m.state.phase = Phase::Voting;
        m.apply(
            "P1",
            Action::Vote {
                target: Some("P2".into()),
                vote_type: None,
            },
        );
        assert!(m.state().votes_for_accusation.is_empty());
        m.apply(
            "P1",
            Action::Vote {
                target: Some("P6".into()),
                vote_type: None,
            },
        );
        assert_eq!(
            m.state().votes_for_accusation.get("P1").map(String::as_str),
            Some("P6")
        );
    }

    #[test]
    fn accusations_rejected_while_trial_pending() {
        let mut m = seven();
        finish_night(&mut m);
        let first = m.state().current_player_turn.clone().unwrap();
        m.apply(&first, Action::Accuse { target: "P6".into() });
        assert_eq!(m.state().player_on_trial.as_deref(), Some("P6"));
        // discussion is over once a trial opens
        assert!(m.pending_actors().is_empty());
    }

    #[test]
    fn speech_tags_open_trials() {
        let mut m = seven();
        finish_night(&mut m);
        let first = m.state().current_player_turn.clone().unwrap();
        m.apply(
            &first,
            Action::Speak {
                content: "Something is off about P6. <accuse>P6</accuse>".into(),
            },
        );
        assert_eq!(m.state().player_on_trial.as_deref(), Some("P6"));
        // the tag block never reaches the public log
        assert!(
            m.state()
                .messages
                .iter()
                .all(|msg| !msg.content.contains("<accuse>"))
        );
    }

    #[test]
    fn out_of_turn_speech_is_ignored() {
        let mut m = seven();
        finish_night(&mut m);
        let current = m.state().current_player_turn.clone().unwrap();
        let other = m
            .state()
            .alive_players
            .iter()
            .find(|n| **n != current)
            .cloned()
            .unwrap();
        m.apply(
            &other,
            Action::Speak {
                content: "let me jump in".into(),
            },
        );
        assert!(
            m.state()
                .messages
                .iter()
                .all(|msg| !msg.content.contains("let me jump in"))
        );
        assert_eq!(m.state().current_player_turn.as_deref(), Some(current.as_str()));
    }
}
