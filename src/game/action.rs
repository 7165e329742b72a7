use serde::Deserialize;
use serde::Serialize;

/// Everything an agent can submit, tagged by `"action"` on the wire.
///
/// The schema is deliberately tolerant of the verbs LLM-backed agents tend
/// to emit: night actions accept the role verb (`kill`, `investigate`,
/// `protect`, `roleblock`, `peek`) as aliases for `night_action`, since the
/// actor's role determines the effect anyway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Speak {
        content: String,
    },
    Accuse {
        target: String,
    },
    /// Day vote (target) or final trial vote (vote_type), per phase.
    Vote {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vote_type: Option<Ballot>,
    },
    Question {
        target: String,
        content: String,
    },
    Whisper {
        target: String,
        content: String,
    },
    Predict {
        target: String,
        #[serde(alias = "prediction")]
        predicted_role: String,
    },
    #[serde(
        rename = "night_action",
        alias = "kill",
        alias = "investigate",
        alias = "protect",
        alias = "roleblock",
        alias = "peek"
    )]
    Night {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    Pass,
    Skip,
}

impl Action {
    /// Parse an agent-produced JSON action. Malformed output degrades to
    /// `None`; the caller decides the safe default (conventionally `pass`).
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Final-trial ballot. Abstentions are recorded but excluded from the
/// majority denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ballot {
    #[serde(rename = "final_guilty", alias = "guilty")]
    Guilty,
    #[serde(rename = "final_innocent", alias = "innocent")]
    Innocent,
    #[serde(rename = "abstain")]
    Abstain,
}

impl std::fmt::Display for Ballot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Guilty => write!(f, "GUILTY"),
            Self::Innocent => write!(f, "INNOCENT"),
            Self::Abstain => write!(f, "ABSTAIN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_actions() {
        let action = Action::from_json(r#"{"action": "accuse", "target": "Bob"}"#);
        assert_eq!(action, Some(Action::Accuse { target: "Bob".into() }));
        let action = Action::from_json(r#"{"action": "pass"}"#);
        assert_eq!(action, Some(Action::Pass));
    }

    #[test]
    fn parses_night_role_verbs() {
        for verb in ["kill", "investigate", "protect", "roleblock", "night_action"] {
            let raw = format!(r#"{{"action": "{}", "target": "Bob"}}"#, verb);
            assert_eq!(
                Action::from_json(&raw),
                Some(Action::Night { target: Some("Bob".into()) }),
                "verb {}",
                verb
            );
        }
    }

    #[test]
    fn parses_final_vote_types() {
        let action = Action::from_json(r#"{"action": "vote", "vote_type": "final_guilty"}"#);
        assert_eq!(
            action,
            Some(Action::Vote { target: None, vote_type: Some(Ballot::Guilty) })
        );
        let action = Action::from_json(r#"{"action": "vote", "target": "Bob"}"#);
        assert_eq!(
            action,
            Some(Action::Vote { target: Some("Bob".into()), vote_type: None })
        );
    }

    #[test]
    fn parses_predicted_role_alias() {
        let action = Action::from_json(r#"{"action": "predict", "target": "Bob", "prediction": "Cop"}"#);
        assert_eq!(
            action,
            Some(Action::Predict { target: "Bob".into(), predicted_role: "Cop".into() })
        );
    }

    #[test]
    fn malformed_output_degrades_to_none() {
        assert_eq!(Action::from_json("I think Bob is suspicious"), None);
        assert_eq!(Action::from_json(r#"{"action": "moonwalk"}"#), None);
    }
}
