//! Two-tier intent classification
//!
//! Tier 1 is the ordered regex table: instant and free, covering the
//! common phrasings. Tier 2 falls back to a temperature-0 LLM prompt. The
//! classifier always returns a valid [`IntentType`]; every LLM-tier failure
//! is absorbed and converted to `Unknown`.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::prompts::{build_intent_prompt, compiled_patterns};
use super::IntentType;
use crate::gemini::LlmGateway;

pub struct IntentClassifier {
    gateway: Arc<dyn LlmGateway>,
}

impl IntentClassifier {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Classify a message. Never fails: the worst case is `Unknown`.
    pub async fn classify(&self, message: &str) -> IntentType {
        let normalized = normalize_message(message);

        if let Some(intent) = classify_by_rules(&normalized) {
            debug!(intent = %intent, "intent matched by pattern tier");
            return intent;
        }

        self.classify_by_llm(message).await
    }

    async fn classify_by_llm(&self, message: &str) -> IntentType {
        let prompt = build_intent_prompt(message);

        let content = match self.gateway.complete(&prompt, 500, 0.0).await {
            Ok(content) => content,
            Err(e) => {
                error!("LLM intent classification error: {}", e);
                return IntentType::Unknown;
            }
        };

        let parsed: Value = match serde_json::from_str(content.trim()) {
            Ok(v) => v,
            Err(e) => {
                error!("failed to parse intent response as JSON: {}", e);
                return IntentType::Unknown;
            }
        };

        match parsed.get("intent").and_then(Value::as_str) {
            Some(label) => IntentType::parse(label).unwrap_or_else(|| {
                warn!("LLM returned invalid intent: {}", label);
                IntentType::Unknown
            }),
            None => {
                warn!("LLM intent response missing `intent` key");
                IntentType::Unknown
            }
        }
    }
}

/// Lowercase, trim, collapse whitespace.
fn normalize_message(message: &str) -> String {
    message
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tier 1: first pattern match wins, in declaration order.
fn classify_by_rules(normalized: &str) -> Option<IntentType> {
    compiled_patterns()
        .iter()
        .find(|(regex, _)| regex.is_match(normalized))
        .map(|(_, intent)| *intent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::testing::ScriptedGateway;

    #[tokio::test]
    async fn expense_phrase_hits_pattern_tier_without_llm() {
        let gateway = Arc::new(ScriptedGateway::failing());
        let classifier = IntentClassifier::new(gateway.clone());

        let intent = classifier.classify("Spent 250 on Domino's yesterday").await;
        assert_eq!(intent, IntentType::LogExpense);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn common_phrasings_match_expected_patterns() {
        let cases = [
            ("show my expenses for this month", IntentType::ViewExpenses),
            ("remind me to pay rent", IntentType::SetReminder),
            ("show my reminders", IntentType::ViewReminders),
            ("set a budget for food", IntentType::SetBudget),
            ("create a goal please", IntentType::SetGoal),
            ("/help", IntentType::Help),
            ("/list", IntentType::ViewExpenses),
            ("wrong category, fix it", IntentType::CorrectExpense),
        ];

        let gateway = Arc::new(ScriptedGateway::failing());
        let classifier = IntentClassifier::new(gateway.clone());
        for (message, expected) in cases {
            assert_eq!(classifier.classify(message).await, expected, "{}", message);
        }
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn llm_fallback_parses_intent() {
        let gateway = Arc::new(ScriptedGateway::replying(r#"{"intent": "view_budget"}"#));
        let classifier = IntentClassifier::new(gateway.clone());

        let intent = classifier.classify("where does my money situation stand").await;
        assert_eq!(intent, IntentType::ViewBudget);
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn invalid_llm_label_maps_to_unknown() {
        let gateway = Arc::new(ScriptedGateway::replying(r#"{"intent": "order_pizza"}"#));
        let classifier = IntentClassifier::new(gateway);
        assert_eq!(classifier.classify("do the thing").await, IntentType::Unknown);
    }

    #[tokio::test]
    async fn unparseable_llm_output_maps_to_unknown() {
        let gateway = Arc::new(ScriptedGateway::replying("sure, happy to help!"));
        let classifier = IntentClassifier::new(gateway);
        assert_eq!(classifier.classify("do the thing").await, IntentType::Unknown);
    }

    #[tokio::test]
    async fn gateway_failure_maps_to_unknown() {
        let gateway = Arc::new(ScriptedGateway::failing());
        let classifier = IntentClassifier::new(gateway);
        assert_eq!(classifier.classify("mystery text").await, IntentType::Unknown);
    }
}
