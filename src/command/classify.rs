//! Intent classification via one LLM completion.
//!
//! The model is not trusted to emit pure JSON, so parsing is two-tier: a
//! strict parse of the whole completion, then a brace-matching scan that
//! pulls the first balanced object out of surrounding prose. A single
//! malformed response is a permanent fallback to `unknown` for that call;
//! there is no retry.

use super::intent::Classification;
use crate::llm::LlmClient;

const CLASSIFY_PROMPT: &str = "\
You are a photo library assistant that interprets natural-language commands.
Classify each command into exactly one of these intents:
1. search - find images
2. create_album - create an album
3. edit - edit images
4. filter - filter images
5. sort - sort images
6. unknown - anything you cannot recognize

Also extract the key parameters mentioned in the command, such as:
- search criteria (time, location, person, object, scene)
- the album name
- the edit operation
- filter criteria
- sort criteria

Respond with a JSON object containing \"intent\" and \"parameters\" fields.";

/// Classifies command text. Implementations never fail: every internal
/// error degrades to `Classification::unknown()`.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Classification;
}

/// Production classifier backed by the configured completion provider.
pub struct LlmIntentClassifier {
    client: LlmClient,
}

impl LlmIntentClassifier {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

impl IntentClassifier for LlmIntentClassifier {
    fn classify(&self, text: &str) -> Classification {
        let completion = match self.client.complete(CLASSIFY_PROMPT, text) {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!(error = %e, "intent classification request failed");
                return Classification::unknown();
            }
        };

        match parse_classification(&completion) {
            Some(classification) => classification,
            None => {
                tracing::warn!(
                    completion = %completion,
                    "could not parse classification from completion"
                );
                Classification::unknown()
            }
        }
    }
}

/// Strict parse first; on failure, retry on the first balanced object span.
fn parse_classification(completion: &str) -> Option<Classification> {
    if let Ok(classification) = serde_json::from_str::<Classification>(completion) {
        return Some(classification);
    }

    let span = extract_object_span(completion)?;
    serde_json::from_str::<Classification>(span).ok()
}

/// Find the first balanced `{...}` span in `content`. The scan tracks brace
/// depth and skips over string literals (including escaped quotes) so braces
/// inside parameter values do not unbalance it.
fn extract_object_span(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let bytes = content.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::intent::Intent;
    use crate::llm::provider::CompletionProvider;
    use anyhow::anyhow;

    /// Provider stub returning a canned completion (or a canned failure).
    struct CannedProvider(Result<String, String>);

    impl CompletionProvider for CannedProvider {
        fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(anyhow!("{}", message)),
            }
        }

        fn provider_name(&self) -> &'static str {
            "canned"
        }
    }

    fn classifier_with(completion: Result<String, String>) -> LlmIntentClassifier {
        LlmIntentClassifier::new(LlmClient::from_provider(Box::new(CannedProvider(completion))))
    }

    #[test]
    fn strict_json_completion_parses() {
        let classifier = classifier_with(Ok(
            r#"{"intent": "search", "parameters": {"query": "beach"}}"#.to_string(),
        ));
        let classification = classifier.classify("find beach photos");
        assert_eq!(classification.intent, Intent::Search);
        assert_eq!(
            classification.parameters.get("query").and_then(|v| v.as_str()),
            Some("beach")
        );
    }

    #[test]
    fn fenced_json_is_extracted_from_prose() {
        let classifier = classifier_with(Ok(
            "Sure! ```json\n{\"intent\":\"search\",\"parameters\":{\"query\":\"beach\"}}\n```"
                .to_string(),
        ));
        let classification = classifier.classify("find beach photos");
        assert_eq!(classification.intent, Intent::Search);
        assert_eq!(
            classification.parameters.get("query").and_then(|v| v.as_str()),
            Some("beach")
        );
    }

    #[test]
    fn plain_prose_falls_back_to_unknown() {
        let classifier = classifier_with(Ok(
            "I think you want to search for beach photos.".to_string(),
        ));
        let classification = classifier.classify("find beach photos");
        assert_eq!(classification.intent, Intent::Unknown);
        assert!(classification.parameters.is_empty());
    }

    #[test]
    fn provider_failure_falls_back_to_unknown() {
        let classifier = classifier_with(Err("connection timed out".to_string()));
        let classification = classifier.classify("find beach photos");
        assert_eq!(classification.intent, Intent::Unknown);
    }

    #[test]
    fn object_span_handles_nested_objects_and_strings() {
        let content = r#"Here you go: {"intent":"search","parameters":{"query":"curly {braces}"}} done"#;
        let span = extract_object_span(content).unwrap();
        assert_eq!(
            span,
            r#"{"intent":"search","parameters":{"query":"curly {braces}"}}"#
        );
    }

    #[test]
    fn unterminated_object_yields_nothing() {
        assert!(extract_object_span(r#"{"intent": "search""#).is_none());
        assert!(extract_object_span("no braces here").is_none());
    }
}
