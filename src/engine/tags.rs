use regex::Regex;
use std::sync::LazyLock;

static ACCUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*accuse\s*>(.*?)<\s*/\s*accuse\s*>").expect("valid regex")
});
static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*question\s*>(.*?)<\s*/\s*question\s*>").expect("valid regex")
});
static CLAIM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*claim\s*>(.*?)<\s*/\s*claim\s*>").expect("valid regex")
});
static PREDICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*predict\s*>(.*?)<\s*/\s*predict\s*>").expect("valid regex")
});
/// Structured directives embedded in free-form speech. Tag names are
/// case-insensitive and bodies may span lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechTags {
    /// Accused player names, in order of appearance.
    pub accuse: Vec<String>,
    /// Question bodies; the target is named inside the body.
    pub question: Vec<String>,
    /// Role claims.
    pub claim: Vec<String>,
    /// Role predictions, conventionally "Name: Role".
    pub predict: Vec<String>,
}

impl SpeechTags {
    pub fn parse(content: &str) -> Self {
        let capture = |re: &Regex| {
            re.captures_iter(content)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            accuse: capture(&ACCUSE_RE),
            question: capture(&QUESTION_RE),
            claim: capture(&CLAIM_RE),
            predict: capture(&PREDICT_RE),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accuse.is_empty()
            && self.question.is_empty()
            && self.claim.is_empty()
            && self.predict.is_empty()
    }
}

/// Remove whole tag blocks from speech, leaving only the prose the table
/// should hear. Collapses leftover runs of blank space.
pub fn strip(content: &str) -> String {
    let mut stripped = content.to_string();
    for re in [&*ACCUSE_RE, &*QUESTION_RE, &*CLAIM_RE, &*PREDICT_RE] {
        stripped = re.replace_all(&stripped, "").into_owned();
    }
    let mut out = String::with_capacity(stripped.len());
    let mut last_blank = false;
    for line in stripped.lines() {
        let blank = line.trim().is_empty();
        if blank && last_blank {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_end());
        last_blank = blank;
    }
    out.trim().to_string()
}

/// Parse a "Name: Role" prediction body.
pub fn parse_prediction(body: &str) -> Option<(String, String)> {
    let (name, role) = body.split_once(':')?;
    let name = name.trim();
    let role = role.trim();
    if name.is_empty() || role.is_empty() {
        return None;
    }
    Some((name.to_string(), role.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tags_case_insensitively() {
        let speech = "I don't trust him. <ACCUSE>Bob</ACCUSE> <claim>Villager</claim>";
        let tags = SpeechTags::parse(speech);
        assert_eq!(tags.accuse, vec!["Bob"]);
        assert_eq!(tags.claim, vec!["Villager"]);
        assert!(tags.question.is_empty());
    }

    #[test]
    fn repeated_tags_collect_in_order() {
        let speech = "<accuse>Bob</accuse> and honestly <accuse>Eve</accuse> too";
        let tags = SpeechTags::parse(speech);
        assert_eq!(tags.accuse, vec!["Bob", "Eve"]);
    }

    #[test]
    fn bodies_may_span_lines() {
        let speech = "<question>Carol, where\nwere you last night?</question>";
        let tags = SpeechTags::parse(speech);
        assert_eq!(tags.question.len(), 1);
        assert!(tags.question[0].contains("last night"));
    }

    #[test]
    fn strip_removes_whole_blocks() {
        let speech = "Something is off. <accuse>Bob</accuse> Anyway.";
        assert_eq!(strip(speech), "Something is off.  Anyway.");
        assert!(SpeechTags::parse(&strip(speech)).is_empty());
    }

    #[test]
    fn untagged_speech_passes_through() {
        let speech = "No tags here, just talk.";
        assert!(SpeechTags::parse(speech).is_empty());
        assert_eq!(strip(speech), speech);
    }

    #[test]
    fn prediction_body_splits_on_colon() {
        assert_eq!(
            parse_prediction("Bob: Godfather"),
            Some(("Bob".to_string(), "Godfather".to_string()))
        );
        assert_eq!(parse_prediction("just a guess"), None);
    }
}
