use super::Agent;
use crate::game::action::Action;
use crate::game::observation::Observation;
use std::collections::VecDeque;

/// Replays a fixed action sequence, then passes forever. The workhorse of
/// deterministic integration tests.
pub struct ScriptedAgent {
    script: VecDeque<Action>,
}

impl ScriptedAgent {
    pub fn new(script: impl IntoIterator<Item = Action>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl Agent for ScriptedAgent {
    fn observe(&mut self, _observation: &Observation) {}

    fn act(&mut self) -> Action {
        self.script.pop_front().unwrap_or(Action::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_script_then_passes() {
        let mut agent = ScriptedAgent::new([Action::Speak {
            content: "hello".into(),
        }]);
        assert_eq!(agent.act(), Action::Speak { content: "hello".into() });
        assert_eq!(agent.act(), Action::Pass);
        assert_eq!(agent.act(), Action::Pass);
    }
}
