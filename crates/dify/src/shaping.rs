use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

/// Administrator-configurable response shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    /// Cap applied when the inbound message is a short greeting. A wall of
    /// text in reply to "hi" reads as broken, so greetings get a tighter
    /// budget.
    pub simple_greeting_max_len: usize,
    /// Hard cap on any forwarded answer.
    pub max_response_len: usize,
    /// Appended when the hard cap truncates an answer.
    pub truncation_notice: String,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            simple_greeting_max_len: 200,
            max_response_len: 4000,
            truncation_notice: "\n\n[message truncated]".into(),
        }
    }
}

const GREETING_WORDS: &[&str] = &["hi", "hello", "hey", "yo", "sup", "hola", "ciao"];

/// Short-greeting heuristic: fewer than 20 chars and at least one greeting
/// word.
pub fn is_simple_greeting(text: &str) -> bool {
    if text.len() >= 20 {
        return false;
    }
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETING_WORDS.contains(&word))
}

/// Truncate to at most `max` bytes without splitting a char.
fn truncate_at(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Extract the answer text from the raw payload, working around the
/// array-answer quirk some app configurations produce.
fn answer_text(raw: &serde_json::Value) -> String {
    match raw {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => {
            warn!(len = items.len(), "answer arrived as an array; using first element");
            match items.first() {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            }
        },
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Shape a raw answer for forwarding.
///
/// The greeting cap applies first, then the hard cap — always in that
/// order, so an over-long greeting reply can never exceed the hard cap
/// either.
pub fn shape_answer(config: &ShapingConfig, inbound_text: &str, raw: &serde_json::Value) -> String {
    let mut answer = answer_text(raw);

    if is_simple_greeting(inbound_text) && answer.len() > config.simple_greeting_max_len {
        warn!(
            len = answer.len(),
            cap = config.simple_greeting_max_len,
            "capping over-long reply to a simple greeting"
        );
        answer = format!(
            "{}...",
            truncate_at(&answer, config.simple_greeting_max_len)
        );
    }

    if answer.len() > config.max_response_len {
        warn!(
            len = answer.len(),
            cap = config.max_response_len,
            "truncating over-long answer"
        );
        answer = format!(
            "{}{}",
            truncate_at(&answer, config.max_response_len),
            config.truncation_notice
        );
    }

    answer
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::bare("hi", true)]
    #[case::cased("Hello!", true)]
    #[case::phrase("hey there", true)]
    #[case::question("what is my invoice status", false)]
    #[case::long_greeting("hello, I have a question about my last order", false)]
    #[case::substring_not_word("history", false)]
    fn greeting_heuristic(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_simple_greeting(text), expected);
    }

    #[test]
    fn greeting_reply_capped() {
        let config = ShapingConfig {
            simple_greeting_max_len: 200,
            ..Default::default()
        };
        let raw = serde_json::json!("a".repeat(300));
        let shaped = shape_answer(&config, "hi", &raw);
        assert_eq!(shaped.len(), 200 + 3);
        assert!(shaped.ends_with("..."));
    }

    #[test]
    fn hard_cap_appends_notice() {
        let config = ShapingConfig {
            max_response_len: 1000,
            ..Default::default()
        };
        let raw = serde_json::json!("b".repeat(1500));
        let shaped = shape_answer(&config, "what happened to my order", &raw);
        assert_eq!(shaped.len(), 1000 + config.truncation_notice.len());
        assert!(shaped.ends_with(&config.truncation_notice));
    }

    #[test]
    fn short_answer_passes_through() {
        let config = ShapingConfig::default();
        let raw = serde_json::json!("all good");
        assert_eq!(shape_answer(&config, "status?", &raw), "all good");
    }

    #[test]
    fn array_answer_uses_first_element() {
        let config = ShapingConfig::default();
        let raw = serde_json::json!(["first part", "second part"]);
        assert_eq!(shape_answer(&config, "status?", &raw), "first part");
    }

    #[test]
    fn empty_array_answer_is_empty() {
        let config = ShapingConfig::default();
        let raw = serde_json::json!([]);
        assert_eq!(shape_answer(&config, "status?", &raw), "");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let config = ShapingConfig {
            max_response_len: 5,
            truncation_notice: "!".into(),
            ..Default::default()
        };
        // Each 'é' is two bytes; a naive slice at 5 would split one.
        let raw = serde_json::json!("ééééé");
        let shaped = shape_answer(&config, "question long enough", &raw);
        assert!(shaped.ends_with('!'));
        assert!(shaped.starts_with("éé"));
    }

    #[test]
    fn greeting_cap_then_hard_cap() {
        let config = ShapingConfig {
            simple_greeting_max_len: 50,
            max_response_len: 30,
            truncation_notice: "[cut]".into(),
        };
        let raw = serde_json::json!("c".repeat(100));
        let shaped = shape_answer(&config, "hi", &raw);
        // Greeting cap produces 53 chars; the hard cap then trims to 30.
        assert_eq!(shaped.len(), 30 + "[cut]".len());
    }
}
