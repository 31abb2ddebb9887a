//! Persistence seam for expenses, budgets, goals and reminders
//!
//! The trait is the contract the handlers program against; the in-memory
//! implementation backs tests and local runs. A database-backed store plugs
//! in behind the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::extract::{Aggregation, CreateExpense, CreateGoal, CreateReminder, ExpenseQuery, SetBudget};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: Uuid,
    pub user_id: i64,
    pub amount: f64,
    pub vendor: Option<String>,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub category_name: String,
    pub subcategory_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub user_id: i64,
    pub category_name: Option<String>,
    pub amount: f64,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub user_id: i64,
    pub name: String,
    pub target_amount: f64,
    pub target_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub user_id: i64,
    pub message: String,
    pub due_at: DateTime<Utc>,
}

/// Result of an expense query: either matching rows or one aggregate value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Vec<ExpenseRecord>),
    Aggregate { label: &'static str, value: f64 },
}

#[async_trait]
pub trait FinanceStore: Send + Sync {
    async fn add_expense(&self, dto: &CreateExpense) -> ExpenseRecord;
    async fn query_expenses(&self, query: &ExpenseQuery) -> QueryOutcome;
    /// Recategorize the most recent expense matching the vendor or note.
    /// Returns the updated record when one matched.
    async fn recategorize_latest(
        &self,
        user_id: i64,
        vendor: Option<&str>,
        note: Option<&str>,
        category: &str,
        subcategory: &str,
    ) -> Option<ExpenseRecord>;

    async fn set_budget(&self, dto: &SetBudget) -> BudgetRecord;
    async fn budgets(&self, user_id: i64, category: Option<&str>) -> Vec<BudgetRecord>;

    async fn add_goal(&self, dto: &CreateGoal) -> GoalRecord;
    async fn goals(&self, user_id: i64) -> Vec<GoalRecord>;

    async fn add_reminder(&self, dto: &CreateReminder) -> ReminderRecord;
    async fn reminders(&self, user_id: i64) -> Vec<ReminderRecord>;
}

#[derive(Default)]
struct Tables {
    expenses: Vec<ExpenseRecord>,
    budgets: Vec<BudgetRecord>,
    goals: Vec<GoalRecord>,
    reminders: Vec<ReminderRecord>,
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_query(record: &ExpenseRecord, query: &ExpenseQuery) -> bool {
    if record.user_id != query.user_id {
        return false;
    }
    if let Some(cat) = &query.category_name {
        if &record.category_name != cat {
            return false;
        }
    }
    if let Some(sub) = &query.subcategory_name {
        if &record.subcategory_name != sub {
            return false;
        }
    }
    if let Some(vendor) = &query.vendor {
        let normalized = crate::taxonomy::normalize_vendor(vendor);
        match &record.vendor {
            Some(v) if crate::taxonomy::normalize_vendor(v) == normalized => {}
            _ => return false,
        }
    }
    if let Some(start) = query.start_date {
        if record.timestamp < start {
            return false;
        }
    }
    if let Some(end) = query.end_date {
        if record.timestamp > end {
            return false;
        }
    }
    if let Some(min) = query.start_amount {
        if record.amount < min {
            return false;
        }
    }
    if let Some(max) = query.end_amount {
        if record.amount > max {
            return false;
        }
    }
    true
}

fn aggregate(rows: &[ExpenseRecord], aggregation: Aggregation) -> QueryOutcome {
    let amounts: Vec<f64> = rows.iter().map(|r| r.amount).collect();
    let (label, value) = match aggregation {
        Aggregation::Sum => ("total", amounts.iter().sum()),
        Aggregation::Count => ("count", amounts.len() as f64),
        Aggregation::Avg => (
            "average",
            if amounts.is_empty() {
                0.0
            } else {
                amounts.iter().sum::<f64>() / amounts.len() as f64
            },
        ),
        Aggregation::Min => ("minimum", amounts.iter().copied().fold(f64::INFINITY, f64::min)),
        Aggregation::Max => ("maximum", amounts.iter().copied().fold(0.0, f64::max)),
    };
    let value = if value.is_finite() { value } else { 0.0 };
    QueryOutcome::Aggregate { label, value }
}

#[async_trait]
impl FinanceStore for InMemoryStore {
    async fn add_expense(&self, dto: &CreateExpense) -> ExpenseRecord {
        let record = ExpenseRecord {
            id: Uuid::new_v4(),
            user_id: dto.user_id,
            amount: dto.amount,
            vendor: dto.vendor.clone(),
            note: dto.note.clone(),
            timestamp: dto.timestamp.unwrap_or_else(Utc::now),
            category_name: dto
                .category_name
                .clone()
                .unwrap_or_else(|| crate::taxonomy::FALLBACK_CATEGORY.to_string()),
            subcategory_name: dto
                .subcategory_name
                .clone()
                .unwrap_or_else(|| crate::taxonomy::FALLBACK_SUBCATEGORY.to_string()),
        };
        self.tables.write().await.expenses.push(record.clone());
        record
    }

    async fn query_expenses(&self, query: &ExpenseQuery) -> QueryOutcome {
        let tables = self.tables.read().await;
        let mut rows: Vec<ExpenseRecord> = tables
            .expenses
            .iter()
            .filter(|r| matches_query(r, query))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        match query.aggregation {
            Some(aggregation) => aggregate(&rows, aggregation),
            None => QueryOutcome::Rows(rows),
        }
    }

    async fn recategorize_latest(
        &self,
        user_id: i64,
        vendor: Option<&str>,
        note: Option<&str>,
        category: &str,
        subcategory: &str,
    ) -> Option<ExpenseRecord> {
        let mut tables = self.tables.write().await;
        let normalized_vendor = vendor.map(crate::taxonomy::normalize_vendor);
        let note_lower = note.map(str::to_lowercase);

        let target = tables
            .expenses
            .iter_mut()
            .filter(|r| r.user_id == user_id)
            .filter(|r| match (&normalized_vendor, &r.vendor) {
                (Some(wanted), Some(have)) => &crate::taxonomy::normalize_vendor(have) == wanted,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|r| match (&note_lower, &r.note) {
                (Some(wanted), Some(have)) => have.to_lowercase().contains(wanted),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .max_by_key(|r| r.timestamp)?;

        target.category_name = category.to_string();
        target.subcategory_name = subcategory.to_string();
        Some(target.clone())
    }

    async fn set_budget(&self, dto: &SetBudget) -> BudgetRecord {
        let record = BudgetRecord {
            user_id: dto.user_id,
            category_name: dto.category_name.clone(),
            amount: dto.amount,
            period: dto.period.clone().unwrap_or_else(|| "monthly".to_string()),
        };
        let mut tables = self.tables.write().await;
        // One budget per (user, category): replace on repeat.
        tables
            .budgets
            .retain(|b| !(b.user_id == record.user_id && b.category_name == record.category_name));
        tables.budgets.push(record.clone());
        record
    }

    async fn budgets(&self, user_id: i64, category: Option<&str>) -> Vec<BudgetRecord> {
        self.tables
            .read()
            .await
            .budgets
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter(|b| category.map_or(true, |c| b.category_name.as_deref() == Some(c)))
            .cloned()
            .collect()
    }

    async fn add_goal(&self, dto: &CreateGoal) -> GoalRecord {
        let record = GoalRecord {
            user_id: dto.user_id,
            name: dto.name.clone(),
            target_amount: dto.target_amount,
            target_date: dto.target_date,
        };
        self.tables.write().await.goals.push(record.clone());
        record
    }

    async fn goals(&self, user_id: i64) -> Vec<GoalRecord> {
        self.tables
            .read()
            .await
            .goals
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn add_reminder(&self, dto: &CreateReminder) -> ReminderRecord {
        let record = ReminderRecord {
            user_id: dto.user_id,
            message: dto.message.clone(),
            due_at: dto.due_at,
        };
        self.tables.write().await.reminders.push(record.clone());
        record
    }

    async fn reminders(&self, user_id: i64) -> Vec<ReminderRecord> {
        let mut rows: Vec<ReminderRecord> = self
            .tables
            .read()
            .await
            .reminders
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.due_at);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn expense(user_id: i64, amount: f64, vendor: &str, day: u32) -> CreateExpense {
        CreateExpense {
            user_id,
            amount,
            vendor: Some(vendor.to_string()),
            note: None,
            timestamp: Some(Utc.with_ymd_and_hms(2025, 8, day, 12, 0, 0).unwrap()),
            category_name: Some("Food & Dining".to_string()),
            subcategory_name: Some("Restaurants".to_string()),
            source_message_id: None,
        }
    }

    fn query(user_id: i64) -> ExpenseQuery {
        ExpenseQuery {
            user_id,
            category_name: None,
            subcategory_name: None,
            vendor: None,
            start_date: None,
            end_date: None,
            start_amount: None,
            end_amount: None,
            aggregation: None,
        }
    }

    #[tokio::test]
    async fn query_filters_by_user_and_vendor() {
        let store = InMemoryStore::new();
        store.add_expense(&expense(1, 100.0, "Cafe A", 1)).await;
        store.add_expense(&expense(1, 200.0, "Cafe B", 2)).await;
        store.add_expense(&expense(2, 300.0, "Cafe A", 3)).await;

        let mut q = query(1);
        q.vendor = Some("cafe a".to_string());
        let QueryOutcome::Rows(rows) = store.query_expenses(&q).await else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 100.0);
    }

    #[tokio::test]
    async fn sum_aggregation_totals_matching_rows() {
        let store = InMemoryStore::new();
        store.add_expense(&expense(1, 100.0, "A", 1)).await;
        store.add_expense(&expense(1, 250.0, "B", 2)).await;

        let mut q = query(1);
        q.aggregation = Some(Aggregation::Sum);
        let QueryOutcome::Aggregate { label, value } = store.query_expenses(&q).await else {
            panic!("expected aggregate");
        };
        assert_eq!(label, "total");
        assert_eq!(value, 350.0);
    }

    #[tokio::test]
    async fn aggregate_over_empty_set_is_zero() {
        let store = InMemoryStore::new();
        let mut q = query(1);
        q.aggregation = Some(Aggregation::Min);
        let QueryOutcome::Aggregate { value, .. } = store.query_expenses(&q).await else {
            panic!("expected aggregate");
        };
        assert_eq!(value, 0.0);
    }

    #[tokio::test]
    async fn recategorize_targets_the_latest_matching_expense() {
        let store = InMemoryStore::new();
        store.add_expense(&expense(1, 100.0, "Starbucks", 1)).await;
        store.add_expense(&expense(1, 200.0, "Starbucks", 5)).await;

        let updated = store
            .recategorize_latest(1, Some("starbucks"), None, "Business", "Client Entertainment")
            .await
            .expect("match");
        assert_eq!(updated.amount, 200.0);
        assert_eq!(updated.category_name, "Business");

        let QueryOutcome::Rows(rows) = store.query_expenses(&query(1)).await else {
            panic!("expected rows");
        };
        // Newest first; only the newest was recategorized.
        assert_eq!(rows[0].category_name, "Business");
        assert_eq!(rows[1].category_name, "Food & Dining");
    }

    #[tokio::test]
    async fn recategorize_without_match_returns_none() {
        let store = InMemoryStore::new();
        let updated = store
            .recategorize_latest(1, Some("nowhere"), None, "Other", "Miscellaneous")
            .await;
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn repeated_budget_replaces_previous() {
        let store = InMemoryStore::new();
        let dto = SetBudget {
            user_id: 1,
            amount: 5000.0,
            category_name: Some("Food & Dining".to_string()),
            period: Some("monthly".to_string()),
        };
        store.set_budget(&dto).await;
        let dto2 = SetBudget { amount: 6000.0, ..dto };
        store.set_budget(&dto2).await;

        let budgets = store.budgets(1, Some("Food & Dining")).await;
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].amount, 6000.0);
    }

    #[tokio::test]
    async fn reminders_sort_by_due_date() {
        let store = InMemoryStore::new();
        let later = CreateReminder {
            user_id: 1,
            message: "later".to_string(),
            due_at: Utc.with_ymd_and_hms(2025, 9, 10, 9, 0, 0).unwrap(),
        };
        let sooner = CreateReminder {
            user_id: 1,
            message: "sooner".to_string(),
            due_at: Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap(),
        };
        store.add_reminder(&later).await;
        store.add_reminder(&sooner).await;

        let reminders = store.reminders(1).await;
        assert_eq!(reminders[0].message, "sooner");
        assert_eq!(reminders[1].message, "later");
    }
}
