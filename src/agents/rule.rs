use super::Agent;
use crate::game::action::Action;
use crate::game::action::Ballot;
use crate::game::observation::Observation;
use crate::game::observation::View;
use crate::game::phase::Phase;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

/// Knobs for deterministic test scenarios. All off means "play naturally".
#[derive(Debug, Clone, Copy, Default)]
pub struct Strategy {
    pub always_accuse: bool,
    pub always_vote_guilty: bool,
    pub always_vote_innocent: bool,
}

const SMALL_TALK: &[&str] = &[
    "I don't have much to go on yet.",
    "Someone is being awfully quiet.",
    "Let's hear from everyone before we vote.",
    "I was home all night, for what it's worth.",
    "The Mafia is among us. Watch who deflects.",
];

/// A heuristic baseline player. Seeded for reproducible simulations; no
/// reasoning, just role-appropriate random play.
pub struct RuleAgent {
    rng: SmallRng,
    strategy: Strategy,
    view: Option<View>,
    speaks_today: usize,
    last_day: Option<usize>,
}

impl RuleAgent {
    pub fn new(seed: u64) -> Self {
        Self::with_strategy(seed, Strategy::default())
    }

    pub fn with_strategy(seed: u64, strategy: Strategy) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            strategy,
            view: None,
            speaks_today: 0,
            last_day: None,
        }
    }

    fn others<'a>(&self, view: &'a View) -> Vec<&'a String> {
        view.alive_players
            .iter()
            .filter(|name| **name != view.player_name)
            .collect()
    }

    /// Alive players outside the agent's own team; targets for kills and
    /// accusations when playing Mafia.
    fn non_teammates<'a>(&self, view: &'a View) -> Vec<&'a String> {
        let team = view.mafia_members.clone().unwrap_or_default();
        view.alive_players
            .iter()
            .filter(|name| **name != view.player_name && !team.contains(*name))
            .collect()
    }

    fn night_action(&mut self, view: &View) -> Action {
        if !view.can_act_tonight {
            return Action::Pass;
        }
        let candidates = match view.role.as_str() {
            "Doctor" => view
                .alive_players
                .iter()
                .collect::<Vec<_>>(),
            "Godfather" => self.non_teammates(view),
            _ => self.others(view),
        };
        match candidates.choose(&mut self.rng) {
            Some(target) => Action::Night {
                target: Some((*target).clone()),
            },
            None => Action::Pass,
        }
    }

    fn discussion_action(&mut self, view: &View) -> Action {
        if !view.can_speak {
            return Action::Pass;
        }
        if view.answering_question_from.is_some() {
            return Action::Speak {
                content: "I have nothing to hide.".to_string(),
            };
        }
        if self.strategy.always_accuse && view.player_on_trial.is_none() {
            if let Some(target) = self.non_teammates(view).choose(&mut self.rng) {
                return Action::Accuse {
                    target: (*target).clone(),
                };
            }
        }
        // Speak a couple of times, then yield so discussion can end.
        if self.speaks_today >= 2 {
            return Action::Pass;
        }
        self.speaks_today += 1;
        let line = SMALL_TALK.choose(&mut self.rng).copied().unwrap_or("Hm.");
        Action::Speak {
            content: line.to_string(),
        }
    }

    fn final_vote(&mut self, view: &View) -> Action {
        let ballot = if self.strategy.always_vote_guilty {
            Ballot::Guilty
        } else if self.strategy.always_vote_innocent {
            Ballot::Innocent
        } else if let (Some(team), Some(accused)) = (&view.mafia_members, &view.player_on_trial) {
            // protect the team, condemn everyone else
            if team.contains(accused) {
                Ballot::Innocent
            } else {
                Ballot::Guilty
            }
        } else if self.rng.random_bool(0.5) {
            Ballot::Guilty
        } else {
            Ballot::Innocent
        };
        Action::Vote {
            target: None,
            vote_type: Some(ballot),
        }
    }
}

impl Agent for RuleAgent {
    fn observe(&mut self, observation: &Observation) {
        if let Observation::Seated(view) = observation {
            if self.last_day != Some(view.day) {
                self.last_day = Some(view.day);
                self.speaks_today = 0;
            }
            self.view = Some((**view).clone());
        }
    }

    fn act(&mut self) -> Action {
        let Some(view) = self.view.clone() else {
            return Action::Pass;
        };
        match view.phase {
            Phase::Night => self.night_action(&view),
            Phase::DayDiscussion => self.discussion_action(&view),
            Phase::Defense => Action::Speak {
                content: "I am innocent! You are making a mistake.".to_string(),
            },
            Phase::FinalVote => self.final_vote(&view),
            Phase::Voting | Phase::GameOver => Action::Pass,
        }
    }

    fn reset(&mut self) {
        self.view = None;
        self.speaks_today = 0;
        self.last_day = None;
    }
}
