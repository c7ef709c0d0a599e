//! Intent classification
//!
//! Cheap phrase rules first, then a single LLM call for everything the
//! rules do not catch. Anything the model says that is not a known label
//! routes to `rag_query`.

use tracing::debug;

use crate::errors::Result;
use crate::llm::{GenerateOptions, LlmRouter};
use crate::types::{Intent, ModelChoice};
use crate::workflow::RequestScope;

const SYSTEM_PROMPT: &str = "You are an intent classification expert. Classify the user's input into one of the following categories: \
'greeting', 'comparison', 'summarization', 'training_generation', or 'rag_query'.\n\
- 'greeting': For simple social greetings.\n\
- 'comparison': For requests to compare, contrast, or find differences.\n\
- 'summarization': For requests to summarize a topic or document.\n\
- 'training_generation': For requests to create training materials like quizzes or lesson plans.\n\
- 'rag_query': For all other questions seeking information.\n\
Respond with only the category name.";

/// Phrase lists for the rule-based pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRules {
    /// Whole-question matches
    pub greetings: Vec<String>,
    pub comparison_starters: Vec<String>,
    pub summarization_starters: Vec<String>,
    pub training_starters: Vec<String>,
}

impl Default for IntentRules {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            greetings: owned(&[
                "hello",
                "hi",
                "hey",
                "bye",
                "good morning",
                "good afternoon",
                "good evening",
            ]),
            comparison_starters: owned(&["compare", "what are the differences", "contrast"]),
            summarization_starters: owned(&["summarize", "give me a summary", "tell me about"]),
            training_starters: owned(&["create a quiz", "generate training", "make a lesson plan"]),
        }
    }
}

impl IntentRules {
    /// Rule-based classification of an already normalized question
    pub fn matches(&self, normalized: &str) -> Option<Intent> {
        let starts_with_any =
            |starters: &[String]| starters.iter().any(|s| normalized.starts_with(s.as_str()));

        if self.greetings.iter().any(|g| g == normalized) {
            Some(Intent::Greeting)
        } else if starts_with_any(&self.comparison_starters) {
            Some(Intent::Comparison)
        } else if starts_with_any(&self.summarization_starters) {
            Some(Intent::Summarization)
        } else if starts_with_any(&self.training_starters) {
            Some(Intent::TrainingGeneration)
        } else {
            None
        }
    }
}

/// Lowercase and trim; the form both the rules and the model see
pub fn normalize_question(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Decides which pipeline a request takes
#[derive(Clone)]
pub struct IntentClassifier {
    llm: LlmRouter,
    rules: IntentRules,
}

impl IntentClassifier {
    pub fn new(llm: LlmRouter) -> Self {
        Self::with_rules(llm, IntentRules::default())
    }

    pub fn with_rules(llm: LlmRouter, rules: IntentRules) -> Self {
        Self { llm, rules }
    }

    pub fn rules(&self) -> &IntentRules {
        &self.rules
    }

    /// Classify `question`. Never fails except on cancellation.
    pub async fn classify(
        &self,
        scope: &RequestScope,
        question: &str,
        choice: ModelChoice,
    ) -> Result<Intent> {
        let normalized = normalize_question(question);

        if let Some(intent) = self.rules.matches(&normalized) {
            debug!(intent = %intent, "classified by rule");
            return Ok(intent);
        }

        let user_prompt = format!("User input: '{}'", normalized);
        let reply = self
            .llm
            .generate(scope, "classify", choice, SYSTEM_PROMPT, &user_prompt, GenerateOptions::new())
            .await?;

        Ok(parse_intent(&reply))
    }
}

/// Map a model reply to an intent; unrecognized text is a plain query
pub fn parse_intent(reply: &str) -> Intent {
    Intent::from_label(reply).unwrap_or(Intent::RagQuery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{router, ScriptedModel};

    #[test]
    fn test_rules() {
        let rules = IntentRules::default();
        assert_eq!(rules.matches("hello"), Some(Intent::Greeting));
        assert_eq!(rules.matches("good evening"), Some(Intent::Greeting));
        assert_eq!(rules.matches("hello there"), None);
        assert_eq!(
            rules.matches("compare the 2017 and 2021 reports"),
            Some(Intent::Comparison)
        );
        assert_eq!(rules.matches("summarize the audit guide"), Some(Intent::Summarization));
        assert_eq!(rules.matches("tell me about licensing"), Some(Intent::Summarization));
        assert_eq!(
            rules.matches("make a lesson plan for officers"),
            Some(Intent::TrainingGeneration)
        );
        assert_eq!(rules.matches("what is the licensing fee?"), None);
    }

    #[test]
    fn test_parse_intent_defaults_to_rag_query() {
        assert_eq!(parse_intent(" Comparison \n"), Intent::Comparison);
        assert_eq!(parse_intent("greeting"), Intent::Greeting);
        assert_eq!(parse_intent("rag_query"), Intent::RagQuery);
        assert_eq!(parse_intent(""), Intent::RagQuery);
        assert_eq!(parse_intent("I think this is a comparison"), Intent::RagQuery);
        assert_eq!(
            parse_intent("Error: Could not connect to the language model."),
            Intent::RagQuery
        );
    }

    #[tokio::test]
    async fn test_greeting_skips_model() {
        let model = ScriptedModel::new(&["comparison"]);
        let classifier = IntentClassifier::new(router(model.clone()));
        let scope = RequestScope::default();

        let intent = classifier
            .classify(&scope, "  Hello ", ModelChoice::Primary)
            .await
            .unwrap();

        assert_eq!(intent, Intent::Greeting);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_model() {
        let model = ScriptedModel::new(&["summarization"]);
        let classifier = IntentClassifier::new(router(model.clone()));
        let scope = RequestScope::default();

        let intent = classifier
            .classify(&scope, "Could you give an overview of Chapter 3?", ModelChoice::Primary)
            .await
            .unwrap();

        assert_eq!(intent, Intent::Summarization);
        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].user, "User input: 'could you give an overview of chapter 3?'");
    }
}
