use crate::agents::Agent;
use crate::engine::config::Config;
use crate::engine::moderator::Moderator;
use crate::game::state::GameSummary;
use std::collections::BTreeMap;

/// Runs one game to completion: poll the moderator for pending actors, show
/// each their observation, apply the reply, and advance the phase whenever
/// nobody is pending. Bounded by a step budget so no agent can hang a batch.
pub struct Driver {
    moderator: Moderator,
    agents: BTreeMap<String, Box<dyn Agent>>,
    max_steps: usize,
}

impl Driver {
    pub fn new(config: Config, agents: BTreeMap<String, Box<dyn Agent>>) -> anyhow::Result<Self> {
        let max_steps = config.max_steps;
        let moderator = Moderator::new(config)?;
        Ok(Self {
            moderator,
            agents,
            max_steps,
        })
    }

    pub fn moderator(&self) -> &Moderator {
        &self.moderator
    }

    pub fn run(&mut self) -> GameSummary {
        let mut steps = 0;
        while !self.moderator.game_over() && steps < self.max_steps {
            steps += 1;
            let actors = self.moderator.pending_actors();
            if actors.is_empty() {
                self.moderator.step_phase();
                continue;
            }
            for name in actors {
                if self.moderator.game_over() {
                    break;
                }
                let Some(agent) = self.agents.get_mut(&name) else {
                    log::warn!("[driver] no agent seated for {}", name);
                    continue;
                };
                agent.observe(&self.moderator.observe(&name));
                let action = agent.act();
                log::debug!("[driver] {} -> {:?}", name, action);
                self.moderator.apply(&name, action);
            }
        }
        if !self.moderator.game_over() {
            log::warn!(
                "[driver] game {} hit the step budget without a winner",
                self.moderator.state().game_id
            );
        }
        self.moderator.summary()
    }
}
