//! Default handler providers
//!
//! One provider per domain area, each with an explicit registration table.
//! Handlers consume the interpreted request and return the reply text.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{unknown_method, wrong_dto, HandlerProvider, InterpretedRequest};
use crate::categorize::{CategoryClassifier, ClassificationMethod, ClassificationResult};
use crate::extract::ExtractedDto;
use crate::intent::IntentType;
use crate::responses;
use crate::store::FinanceStore;
use crate::taxonomy;
use crate::Result;

/// Expense logging, querying and correction.
pub struct ExpenseHandlers {
    store: Arc<dyn FinanceStore>,
    classifier: Arc<CategoryClassifier>,
}

impl ExpenseHandlers {
    pub fn new(store: Arc<dyn FinanceStore>, classifier: Arc<CategoryClassifier>) -> Self {
        Self { store, classifier }
    }

    async fn log_expense(&self, request: &InterpretedRequest) -> Result<String> {
        let Some(ExtractedDto::LogExpense(dto)) = &request.dto else {
            return Err(wrong_dto(self.owner(), "log_expense"));
        };

        let classification = request.classification.clone().unwrap_or(ClassificationResult {
            category: taxonomy::FALLBACK_CATEGORY.to_string(),
            subcategory: taxonomy::FALLBACK_SUBCATEGORY.to_string(),
            confidence: 0.3,
            method: ClassificationMethod::Default,
            reasoning: None,
        });

        let mut dto = dto.clone();
        dto.category_name = Some(classification.category.clone());
        dto.subcategory_name = Some(classification.subcategory.clone());

        let record = self.store.add_expense(&dto).await;
        info!(
            user_id = record.user_id,
            amount = record.amount,
            category = %record.category_name,
            "expense logged"
        );
        Ok(responses::expense_logged_reply(&record, &classification))
    }

    async fn view_expenses(&self, request: &InterpretedRequest) -> Result<String> {
        let Some(ExtractedDto::ViewExpenses(query)) = &request.dto else {
            return Err(wrong_dto(self.owner(), "view_expenses"));
        };

        let mut query = query.clone();
        if let Some(filter) = &request.query_filter {
            if query.category_name.is_none() {
                query.category_name = filter.category_name.clone();
            }
            if query.subcategory_name.is_none() {
                query.subcategory_name = filter.subcategory_name.clone();
            }
        }

        let outcome = self.store.query_expenses(&query).await;
        Ok(responses::query_reply(&outcome, request.query_filter.as_ref()))
    }

    async fn correct_expense(&self, request: &InterpretedRequest) -> Result<String> {
        let Some(ExtractedDto::CorrectExpense(dto)) = &request.dto else {
            return Err(wrong_dto(self.owner(), "correct_expense"));
        };

        // Repair the corrected pair against the taxonomy before persisting.
        let (category, subcategory) = if taxonomy::is_known_category(&dto.new_category) {
            let sub = dto
                .new_subcategory
                .as_deref()
                .filter(|s| taxonomy::is_valid_pair(&dto.new_category, s))
                .or_else(|| taxonomy::first_subcategory(&dto.new_category))
                .unwrap_or(taxonomy::FALLBACK_SUBCATEGORY);
            (dto.new_category.as_str(), sub)
        } else {
            (taxonomy::FALLBACK_CATEGORY, taxonomy::FALLBACK_SUBCATEGORY)
        };

        self.classifier
            .learn_from_correction(
                dto.user_id,
                dto.vendor.as_deref(),
                dto.note.as_deref(),
                category,
                subcategory,
            )
            .await;

        let updated = self
            .store
            .recategorize_latest(
                dto.user_id,
                dto.vendor.as_deref(),
                dto.note.as_deref(),
                category,
                subcategory,
            )
            .await;

        info!(user_id = dto.user_id, category = category, "correction applied");
        Ok(responses::correction_reply(updated.as_ref()))
    }
}

#[async_trait]
impl HandlerProvider for ExpenseHandlers {
    fn owner(&self) -> &'static str {
        "expenses"
    }

    fn registrations(&self) -> &'static [(IntentType, &'static str)] {
        &[
            (IntentType::LogExpense, "log_expense"),
            (IntentType::ViewExpenses, "view_expenses"),
            (IntentType::CorrectExpense, "correct_expense"),
        ]
    }

    async fn invoke(&self, method: &str, request: &InterpretedRequest) -> Result<String> {
        match method {
            "log_expense" => self.log_expense(request).await,
            "view_expenses" => self.view_expenses(request).await,
            "correct_expense" => self.correct_expense(request).await,
            other => Err(unknown_method(self.owner(), other)),
        }
    }
}

pub struct BudgetHandlers {
    store: Arc<dyn FinanceStore>,
}

impl BudgetHandlers {
    pub fn new(store: Arc<dyn FinanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HandlerProvider for BudgetHandlers {
    fn owner(&self) -> &'static str {
        "budgets"
    }

    fn registrations(&self) -> &'static [(IntentType, &'static str)] {
        &[
            (IntentType::SetBudget, "set_budget"),
            (IntentType::ViewBudget, "view_budget"),
        ]
    }

    async fn invoke(&self, method: &str, request: &InterpretedRequest) -> Result<String> {
        match method {
            "set_budget" => {
                let Some(ExtractedDto::SetBudget(dto)) = &request.dto else {
                    return Err(wrong_dto(self.owner(), method));
                };
                let record = self.store.set_budget(dto).await;
                Ok(responses::budget_set_reply(&record))
            }
            "view_budget" => {
                let Some(ExtractedDto::ViewBudget(dto)) = &request.dto else {
                    return Err(wrong_dto(self.owner(), method));
                };
                let budgets = self
                    .store
                    .budgets(dto.user_id, dto.category_name.as_deref())
                    .await;
                Ok(responses::budgets_reply(&budgets))
            }
            other => Err(unknown_method(self.owner(), other)),
        }
    }
}

pub struct GoalHandlers {
    store: Arc<dyn FinanceStore>,
}

impl GoalHandlers {
    pub fn new(store: Arc<dyn FinanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HandlerProvider for GoalHandlers {
    fn owner(&self) -> &'static str {
        "goals"
    }

    fn registrations(&self) -> &'static [(IntentType, &'static str)] {
        &[
            (IntentType::SetGoal, "set_goal"),
            (IntentType::ViewGoals, "view_goals"),
        ]
    }

    async fn invoke(&self, method: &str, request: &InterpretedRequest) -> Result<String> {
        match method {
            "set_goal" => {
                let Some(ExtractedDto::SetGoal(dto)) = &request.dto else {
                    return Err(wrong_dto(self.owner(), method));
                };
                let record = self.store.add_goal(dto).await;
                Ok(responses::goal_set_reply(&record))
            }
            "view_goals" => {
                let Some(ExtractedDto::ViewGoals(dto)) = &request.dto else {
                    return Err(wrong_dto(self.owner(), method));
                };
                let goals = self.store.goals(dto.user_id).await;
                Ok(responses::goals_reply(&goals))
            }
            other => Err(unknown_method(self.owner(), other)),
        }
    }
}

pub struct ReminderHandlers {
    store: Arc<dyn FinanceStore>,
}

impl ReminderHandlers {
    pub fn new(store: Arc<dyn FinanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HandlerProvider for ReminderHandlers {
    fn owner(&self) -> &'static str {
        "reminders"
    }

    fn registrations(&self) -> &'static [(IntentType, &'static str)] {
        &[
            (IntentType::SetReminder, "set_reminder"),
            (IntentType::ViewReminders, "view_reminders"),
        ]
    }

    async fn invoke(&self, method: &str, request: &InterpretedRequest) -> Result<String> {
        match method {
            "set_reminder" => {
                let Some(ExtractedDto::SetReminder(dto)) = &request.dto else {
                    return Err(wrong_dto(self.owner(), method));
                };
                let record = self.store.add_reminder(dto).await;
                Ok(responses::reminder_set_reply(&record))
            }
            "view_reminders" => {
                let Some(ExtractedDto::ViewReminders(dto)) = &request.dto else {
                    return Err(wrong_dto(self.owner(), method));
                };
                let reminders = self.store.reminders(dto.user_id).await;
                Ok(responses::reminders_reply(&reminders))
            }
            other => Err(unknown_method(self.owner(), other)),
        }
    }
}

/// Help has no DTO; it only formats the capability list.
pub struct HelpHandlers;

#[async_trait]
impl HandlerProvider for HelpHandlers {
    fn owner(&self) -> &'static str {
        "help"
    }

    fn registrations(&self) -> &'static [(IntentType, &'static str)] {
        &[(IntentType::Help, "help")]
    }

    async fn invoke(&self, method: &str, _request: &InterpretedRequest) -> Result<String> {
        match method {
            "help" => Ok(responses::help_reply()),
            other => Err(unknown_method(self.owner(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTtlCache;
    use crate::extract::{CreateExpense, ExpenseQuery};
    use crate::gemini::testing::ScriptedGateway;
    use crate::router::HandlerRegistry;
    use crate::store::InMemoryStore;

    fn classifier() -> Arc<CategoryClassifier> {
        Arc::new(CategoryClassifier::new(
            Arc::new(MemoryTtlCache::default()),
            Arc::new(ScriptedGateway::failing()),
        ))
    }

    fn full_registry(store: Arc<InMemoryStore>) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Arc::new(ExpenseHandlers::new(store.clone(), classifier())))
            .unwrap();
        registry.register(Arc::new(BudgetHandlers::new(store.clone()))).unwrap();
        registry.register(Arc::new(GoalHandlers::new(store.clone()))).unwrap();
        registry.register(Arc::new(ReminderHandlers::new(store))).unwrap();
        registry.register(Arc::new(HelpHandlers)).unwrap();
        registry
    }

    fn expense_request(dto: ExtractedDto, classification: Option<ClassificationResult>) -> InterpretedRequest {
        InterpretedRequest {
            user_id: 1,
            message: String::new(),
            intent: dto.intent(),
            dto: Some(dto),
            classification,
            query_filter: None,
        }
    }

    #[tokio::test]
    async fn every_actionable_intent_has_a_handler() {
        let registry = full_registry(Arc::new(InMemoryStore::new()));
        for intent in IntentType::ALL {
            if *intent == IntentType::Unknown {
                assert!(!registry.handles(*intent));
            } else {
                assert!(registry.handles(*intent), "no handler for {}", intent);
            }
        }
    }

    #[tokio::test]
    async fn log_expense_applies_the_classification() {
        let store = Arc::new(InMemoryStore::new());
        let registry = full_registry(store.clone());

        let dto = ExtractedDto::LogExpense(CreateExpense {
            user_id: 1,
            amount: 250.0,
            vendor: Some("Starbucks".to_string()),
            note: None,
            timestamp: None,
            category_name: None,
            subcategory_name: None,
            source_message_id: None,
        });
        let classification = ClassificationResult {
            category: "Food & Dining".to_string(),
            subcategory: "Cafe/Coffee".to_string(),
            confidence: 0.99,
            method: ClassificationMethod::KnownMerchant,
            reasoning: None,
        };

        let reply = registry
            .dispatch(&expense_request(dto, Some(classification)))
            .await
            .unwrap();
        assert!(reply.contains("Food & Dining > Cafe/Coffee"), "{}", reply);

        let outcome = store
            .query_expenses(&ExpenseQuery {
                user_id: 1,
                category_name: Some("Food & Dining".to_string()),
                subcategory_name: None,
                vendor: None,
                start_date: None,
                end_date: None,
                start_amount: None,
                end_amount: None,
                aggregation: None,
            })
            .await;
        let crate::store::QueryOutcome::Rows(rows) = outcome else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn correction_repairs_invalid_subcategory() {
        let store = Arc::new(InMemoryStore::new());
        let registry = full_registry(store.clone());

        store
            .add_expense(&CreateExpense {
                user_id: 1,
                amount: 500.0,
                vendor: Some("Starbucks".to_string()),
                note: None,
                timestamp: None,
                category_name: Some("Food & Dining".to_string()),
                subcategory_name: Some("Cafe/Coffee".to_string()),
                source_message_id: None,
            })
            .await;

        let dto = ExtractedDto::CorrectExpense(crate::extract::CorrectExpense {
            user_id: 1,
            vendor: Some("Starbucks".to_string()),
            note: None,
            new_category: "Business".to_string(),
            new_subcategory: Some("Lattes".to_string()),
        });

        let reply = registry.dispatch(&expense_request(dto, None)).await.unwrap();
        // "Lattes" is not a Business subcategory; the first one stands in.
        assert!(reply.contains("Business > Office Supplies"), "{}", reply);
    }

    #[tokio::test]
    async fn wrong_dto_variant_is_a_config_error() {
        let registry = full_registry(Arc::new(InMemoryStore::new()));
        let dto = ExtractedDto::ViewGoals(crate::extract::GoalQuery { user_id: 1 });
        let request = InterpretedRequest {
            user_id: 1,
            message: String::new(),
            intent: IntentType::LogExpense,
            dto: Some(dto),
            classification: None,
            query_filter: None,
        };
        let err = registry.dispatch(&request).await.unwrap_err();
        assert!(matches!(err, crate::error::AgentError::RoutingConfig(_)));
    }

    #[tokio::test]
    async fn help_needs_no_dto() {
        let registry = full_registry(Arc::new(InMemoryStore::new()));
        let request = InterpretedRequest {
            user_id: 1,
            message: "/help".to_string(),
            intent: IntentType::Help,
            dto: None,
            classification: None,
            query_filter: None,
        };
        let reply = registry.dispatch(&request).await.unwrap();
        assert!(reply.contains("Log an expense"));
    }
}
