//! Message agent: the end-to-end interpretation pipeline
//!
//! classify → extract → enrich (categorize or query-filter) → route. The
//! agent owns the error policy at the surface: unknown intents get a playful
//! fallback, validation failures become clarification requests, transient
//! LLM failures become a soft apology, and configuration errors propagate
//! because they are bugs, not user input.

use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{MemoryTtlCache, TtlCache};
use crate::categorize::query_filter::QueryFilterClassifier;
use crate::categorize::CategoryClassifier;
use crate::extract::{ExtractedDto, Extractor};
use crate::gemini::{GeminiClient, LlmGateway};
use crate::intent::{IntentClassifier, IntentType};
use crate::responses;
use crate::router::handlers::{
    BudgetHandlers, ExpenseHandlers, GoalHandlers, HelpHandlers, ReminderHandlers,
};
use crate::router::{HandlerRegistry, InterpretedRequest};
use crate::store::{FinanceStore, InMemoryStore};
use crate::Result;

pub struct MessageAgent {
    intents: IntentClassifier,
    extractor: Extractor,
    categorizer: Arc<CategoryClassifier>,
    query_filters: QueryFilterClassifier,
    registry: HandlerRegistry,
}

impl MessageAgent {
    /// Wire the full pipeline over one gateway, cache and store. Fails only
    /// on routing configuration defects.
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        cache: Arc<dyn TtlCache>,
        store: Arc<dyn FinanceStore>,
    ) -> Result<Self> {
        let categorizer = Arc::new(CategoryClassifier::new(cache, gateway.clone()));

        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(ExpenseHandlers::new(
            store.clone(),
            categorizer.clone(),
        )))?;
        registry.register(Arc::new(BudgetHandlers::new(store.clone())))?;
        registry.register(Arc::new(GoalHandlers::new(store.clone())))?;
        registry.register(Arc::new(ReminderHandlers::new(store)))?;
        registry.register(Arc::new(HelpHandlers))?;

        Ok(Self {
            intents: IntentClassifier::new(gateway.clone()),
            extractor: Extractor::new(gateway.clone()),
            categorizer,
            query_filters: QueryFilterClassifier::new(gateway),
            registry,
        })
    }

    /// Default wiring: Gemini from the environment, in-memory cache and
    /// store.
    pub fn from_env() -> Result<Self> {
        Self::new(
            Arc::new(GeminiClient::from_env()),
            Arc::new(MemoryTtlCache::default()),
            Arc::new(InMemoryStore::new()),
        )
    }

    /// Interpret one user message and produce the reply text.
    pub async fn handle_message(&self, user_id: i64, message: &str) -> Result<String> {
        let intent = self.intents.classify(message).await;
        info!(user_id, intent = %intent, "message classified");

        if intent == IntentType::Unknown {
            return Ok(responses::unknown_reply());
        }

        // Help carries no DTO; it goes straight to its handler.
        if intent == IntentType::Help {
            let request = InterpretedRequest {
                user_id,
                message: message.to_string(),
                intent,
                dto: None,
                classification: None,
                query_filter: None,
            };
            return self.registry.dispatch(&request).await;
        }

        let dto = match self.extractor.extract(message, intent, user_id).await {
            Ok(dto) => dto,
            Err(e) if e.needs_clarification() => {
                warn!(user_id, intent = %intent, "extraction needs clarification: {}", e);
                let crate::error::AgentError::ExtractionValidation { issues, .. } = e else {
                    unreachable!("needs_clarification is only true for validation errors");
                };
                return Ok(responses::clarification_reply(&issues));
            }
            Err(crate::error::AgentError::Llm(e)) => {
                warn!(user_id, "extraction service failure: {}", e);
                return Ok(responses::friendly_error_reply());
            }
            Err(crate::error::AgentError::Serialization(e)) => {
                warn!(user_id, "extraction returned non-JSON content: {}", e);
                return Ok(responses::friendly_error_reply());
            }
            Err(e) => return Err(e),
        };

        let mut request = InterpretedRequest {
            user_id,
            message: message.to_string(),
            intent,
            dto: Some(dto),
            classification: None,
            query_filter: None,
        };

        match &request.dto {
            Some(ExtractedDto::LogExpense(expense)) => {
                let classification = self
                    .categorizer
                    .classify(
                        message,
                        expense.vendor.as_deref(),
                        expense.note.as_deref(),
                        Some(expense.amount),
                        user_id,
                    )
                    .await;
                request.classification = Some(classification);
            }
            Some(ExtractedDto::ViewExpenses(query)) if query.category_name.is_none() => {
                let filter = self
                    .query_filters
                    .classify(message, query.vendor.as_deref())
                    .await;
                request.query_filter = Some(filter);
            }
            _ => {}
        }

        self.registry.dispatch(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTtlCache;
    use crate::error::AgentError;
    use crate::gemini::testing::ScriptedGateway;

    fn agent_with(gateway: Arc<ScriptedGateway>) -> MessageAgent {
        MessageAgent::new(
            gateway,
            Arc::new(MemoryTtlCache::default()),
            Arc::new(InMemoryStore::new()),
        )
        .expect("registry wiring")
    }

    #[tokio::test]
    async fn known_merchant_expense_flows_end_to_end() {
        // The pattern tier classifies, so the single scripted response feeds
        // extraction; categorization hits the known-merchant table.
        let gateway = Arc::new(ScriptedGateway::replying(
            r#"{"amount": 250, "vendor": "Domino's", "timestamp": "2025-08-23T00:00:00"}"#,
        ));
        let agent = agent_with(gateway.clone());

        let reply = agent
            .handle_message(7, "Spent 250 on Domino's yesterday")
            .await
            .unwrap();
        assert!(reply.contains("\u{20B9}250"), "{}", reply);
        assert!(reply.contains("Food & Dining > Fast Food"), "{}", reply);
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_message_gets_a_fallback_without_extraction() {
        let gateway = Arc::new(ScriptedGateway::replying(r#"{"intent": "unknown"}"#));
        let agent = agent_with(gateway.clone());

        let reply = agent
            .handle_message(7, "what's the meaning of life")
            .await
            .unwrap();
        assert!(!reply.is_empty());
        // One LLM call for classification, none for extraction.
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_amount_asks_for_clarification() {
        // No digits in the message, so intent needs the LLM tier too.
        // Extraction then returns no amount; validation collects the miss and
        // the agent answers with a question instead of an error.
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(r#"{"intent": "log_expense"}"#.to_string()),
            Ok(r#"{"vendor": "KFC"}"#.to_string()),
        ]));
        let agent = agent_with(gateway);

        let reply = agent.handle_message(7, "I bought something at KFC").await.unwrap();
        assert!(reply.contains("amount"), "{}", reply);
    }

    #[tokio::test]
    async fn grocery_query_uses_alias_filter_without_llm() {
        // Intent via pattern tier, filter via alias tier: extraction is the
        // only LLM call.
        let gateway = Arc::new(ScriptedGateway::replying(r#"{}"#));
        let agent = agent_with(gateway.clone());

        let reply = agent
            .handle_message(7, "show my grocery expenses this month")
            .await
            .unwrap();
        assert!(reply.contains("No expenses found on Groceries"), "{}", reply);
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn extraction_service_failure_is_a_soft_reply() {
        let gateway = Arc::new(ScriptedGateway::failing());
        let agent = agent_with(gateway);

        let reply = agent.handle_message(7, "spent 100 on coffee").await.unwrap();
        assert_eq!(reply, responses::friendly_error_reply());
    }

    #[tokio::test]
    async fn help_short_circuits_before_extraction() {
        let gateway = Arc::new(ScriptedGateway::failing());
        let agent = agent_with(gateway.clone());

        let reply = agent.handle_message(7, "/help").await.unwrap();
        assert!(reply.contains("Log an expense"));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn correction_round_trip_teaches_the_classifier() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            // 1: extraction for the correction message.
            Ok(r#"{"vendor": "The Corner Shop", "new_category": "Business"}"#.to_string()),
            // 2: extraction for the follow-up expense.
            Ok(r#"{"amount": 300, "vendor": "The Corner Shop"}"#.to_string()),
        ]));
        let agent = agent_with(gateway.clone());

        let reply = agent
            .handle_message(7, "wrong category for the corner shop, fix it")
            .await
            .unwrap();
        assert!(reply.contains("remember"), "{}", reply);

        // The learned pattern now classifies without the LLM.
        let reply = agent
            .handle_message(7, "spent 300 at The Corner Shop")
            .await
            .unwrap();
        assert!(reply.contains("Business > Office Supplies"), "{}", reply);
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn classification_llm_failure_still_logs_the_expense() {
        // Unknown vendor and an exhausted gateway after extraction: the
        // expense lands in the fallback category with a confirmation nudge.
        let gateway = Arc::new(ScriptedGateway::replying(
            r#"{"amount": 75, "vendor": "Mystery Stall"}"#,
        ));
        let agent = agent_with(gateway);

        let reply = agent.handle_message(7, "paid 75 at mystery stall").await.unwrap();
        assert!(reply.contains("Other > Miscellaneous"), "{}", reply);
        assert!(reply.contains("wasn't too sure"), "{}", reply);
    }

    #[tokio::test]
    async fn config_errors_propagate_instead_of_soft_replies() {
        let err = AgentError::RoutingConfig("x".to_string());
        assert!(!err.needs_clarification());
    }
}
