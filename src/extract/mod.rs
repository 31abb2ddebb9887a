//! Schema-driven structured extraction
//!
//! Each actionable intent owns a typed DTO and a static field schema. The
//! extractor embeds the schema in a temperature-0 prompt, parses the model's
//! JSON, force-injects caller context (`user_id`), and constructs the DTO
//! through a strict validated builder: unknown keys are rejected, all missing
//! required fields are reported together, and type mismatches are typed
//! errors, never silently coerced.

pub mod prompts;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::error::AgentError;
use crate::gemini::LlmGateway;
use crate::intent::IntentType;
use crate::Result;

// ================= DTO types =================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateExpense {
    pub user_id: i64,
    pub amount: f64,
    pub vendor: Option<String>,
    pub note: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub category_name: Option<String>,
    pub subcategory_name: Option<String>,
    pub source_message_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    pub const LABELS: &'static [&'static str] = &["sum", "count", "avg", "min", "max"];

    fn parse(label: &str) -> Option<Self> {
        match label {
            "sum" => Some(Aggregation::Sum),
            "count" => Some(Aggregation::Count),
            "avg" => Some(Aggregation::Avg),
            "min" => Some(Aggregation::Min),
            "max" => Some(Aggregation::Max),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseQuery {
    pub user_id: i64,
    pub category_name: Option<String>,
    pub subcategory_name: Option<String>,
    pub vendor: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub start_amount: Option<f64>,
    pub end_amount: Option<f64>,
    pub aggregation: Option<Aggregation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectExpense {
    pub user_id: i64,
    pub vendor: Option<String>,
    pub note: Option<String>,
    pub new_category: String,
    pub new_subcategory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetBudget {
    pub user_id: i64,
    pub amount: f64,
    pub category_name: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetQuery {
    pub user_id: i64,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateGoal {
    pub user_id: i64,
    pub name: String,
    pub target_amount: f64,
    pub target_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalQuery {
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateReminder {
    pub user_id: i64,
    pub message: String,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderQuery {
    pub user_id: i64,
}

/// Tagged union of all per-intent DTOs. Exhaustive matching means adding an
/// intent forces every call site to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtractedDto {
    LogExpense(CreateExpense),
    ViewExpenses(ExpenseQuery),
    CorrectExpense(CorrectExpense),
    SetBudget(SetBudget),
    ViewBudget(BudgetQuery),
    SetGoal(CreateGoal),
    ViewGoals(GoalQuery),
    SetReminder(CreateReminder),
    ViewReminders(ReminderQuery),
}

impl ExtractedDto {
    pub fn intent(&self) -> IntentType {
        match self {
            ExtractedDto::LogExpense(_) => IntentType::LogExpense,
            ExtractedDto::ViewExpenses(_) => IntentType::ViewExpenses,
            ExtractedDto::CorrectExpense(_) => IntentType::CorrectExpense,
            ExtractedDto::SetBudget(_) => IntentType::SetBudget,
            ExtractedDto::ViewBudget(_) => IntentType::ViewBudget,
            ExtractedDto::SetGoal(_) => IntentType::SetGoal,
            ExtractedDto::ViewGoals(_) => IntentType::ViewGoals,
            ExtractedDto::SetReminder(_) => IntentType::SetReminder,
            ExtractedDto::ViewReminders(_) => IntentType::ViewReminders,
        }
    }
}

// ================= Schema registry =================

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    DateTime,
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Static schema for one intent's DTO: the prompt contract and the
/// validation contract come from the same place.
#[derive(Debug, Clone, Copy)]
pub struct DtoSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    /// (message, expected JSON) worked examples embedded in the prompt.
    pub examples: &'static [(&'static str, &'static str)],
}

const CREATE_EXPENSE_SCHEMA: DtoSchema = DtoSchema {
    name: "CreateExpense",
    fields: &[
        FieldSpec { name: "user_id", kind: FieldKind::Integer, required: true },
        FieldSpec { name: "amount", kind: FieldKind::Number, required: true },
        FieldSpec { name: "vendor", kind: FieldKind::Text, required: false },
        FieldSpec { name: "note", kind: FieldKind::Text, required: false },
        FieldSpec { name: "timestamp", kind: FieldKind::DateTime, required: false },
    ],
    examples: &[(
        "Spent 250 on Domino's yesterday",
        r#"{"amount": 250, "vendor": "Domino's", "timestamp": "2025-08-23T00:00:00"}"#,
    )],
};

const EXPENSE_QUERY_SCHEMA: DtoSchema = DtoSchema {
    name: "ExpenseQuery",
    fields: &[
        FieldSpec { name: "user_id", kind: FieldKind::Integer, required: true },
        FieldSpec { name: "vendor", kind: FieldKind::Text, required: false },
        FieldSpec { name: "start_date", kind: FieldKind::DateTime, required: false },
        FieldSpec { name: "end_date", kind: FieldKind::DateTime, required: false },
        FieldSpec { name: "start_amount", kind: FieldKind::Number, required: false },
        FieldSpec { name: "end_amount", kind: FieldKind::Number, required: false },
        FieldSpec {
            name: "aggregation",
            kind: FieldKind::Enum(Aggregation::LABELS),
            required: false,
        },
    ],
    examples: &[(
        "how much did I spend at Starbucks last week",
        r#"{"vendor": "Starbucks", "start_date": "2025-08-18T00:00:00", "end_date": "2025-08-24T23:59:59", "aggregation": "sum"}"#,
    )],
};

const CORRECT_EXPENSE_SCHEMA: DtoSchema = DtoSchema {
    name: "CorrectExpense",
    fields: &[
        FieldSpec { name: "user_id", kind: FieldKind::Integer, required: true },
        FieldSpec { name: "vendor", kind: FieldKind::Text, required: false },
        FieldSpec { name: "note", kind: FieldKind::Text, required: false },
        FieldSpec { name: "new_category", kind: FieldKind::Text, required: true },
        FieldSpec { name: "new_subcategory", kind: FieldKind::Text, required: false },
    ],
    examples: &[(
        "the Starbucks charge should be Business, not Food",
        r#"{"vendor": "Starbucks", "new_category": "Business"}"#,
    )],
};

const SET_BUDGET_SCHEMA: DtoSchema = DtoSchema {
    name: "SetBudget",
    fields: &[
        FieldSpec { name: "user_id", kind: FieldKind::Integer, required: true },
        FieldSpec { name: "amount", kind: FieldKind::Number, required: true },
        FieldSpec { name: "category_name", kind: FieldKind::Text, required: false },
        FieldSpec {
            name: "period",
            kind: FieldKind::Enum(&["weekly", "monthly", "yearly"]),
            required: false,
        },
    ],
    examples: &[(
        "set a 5000 monthly budget for dining",
        r#"{"amount": 5000, "category_name": "Food & Dining", "period": "monthly"}"#,
    )],
};

const BUDGET_QUERY_SCHEMA: DtoSchema = DtoSchema {
    name: "BudgetQuery",
    fields: &[
        FieldSpec { name: "user_id", kind: FieldKind::Integer, required: true },
        FieldSpec { name: "category_name", kind: FieldKind::Text, required: false },
    ],
    examples: &[],
};

const CREATE_GOAL_SCHEMA: DtoSchema = DtoSchema {
    name: "CreateGoal",
    fields: &[
        FieldSpec { name: "user_id", kind: FieldKind::Integer, required: true },
        FieldSpec { name: "name", kind: FieldKind::Text, required: true },
        FieldSpec { name: "target_amount", kind: FieldKind::Number, required: true },
        FieldSpec { name: "target_date", kind: FieldKind::DateTime, required: false },
    ],
    examples: &[(
        "set a goal to save 10000 by December",
        r#"{"name": "save 10000", "target_amount": 10000, "target_date": "2025-12-31T00:00:00"}"#,
    )],
};

const GOAL_QUERY_SCHEMA: DtoSchema = DtoSchema {
    name: "GoalQuery",
    fields: &[FieldSpec { name: "user_id", kind: FieldKind::Integer, required: true }],
    examples: &[],
};

const CREATE_REMINDER_SCHEMA: DtoSchema = DtoSchema {
    name: "CreateReminder",
    fields: &[
        FieldSpec { name: "user_id", kind: FieldKind::Integer, required: true },
        FieldSpec { name: "message", kind: FieldKind::Text, required: true },
        FieldSpec { name: "due_at", kind: FieldKind::DateTime, required: true },
    ],
    examples: &[(
        "remind me to pay rent on the 1st",
        r#"{"message": "pay rent", "due_at": "2025-09-01T09:00:00"}"#,
    )],
};

const REMINDER_QUERY_SCHEMA: DtoSchema = DtoSchema {
    name: "ReminderQuery",
    fields: &[FieldSpec { name: "user_id", kind: FieldKind::Integer, required: true }],
    examples: &[],
};

/// Resolve the DTO schema for an intent. `Unknown` has no schema.
pub fn schema_for(intent: IntentType) -> Option<&'static DtoSchema> {
    match intent {
        IntentType::LogExpense => Some(&CREATE_EXPENSE_SCHEMA),
        IntentType::ViewExpenses => Some(&EXPENSE_QUERY_SCHEMA),
        IntentType::CorrectExpense => Some(&CORRECT_EXPENSE_SCHEMA),
        IntentType::SetBudget => Some(&SET_BUDGET_SCHEMA),
        IntentType::ViewBudget => Some(&BUDGET_QUERY_SCHEMA),
        IntentType::SetGoal => Some(&CREATE_GOAL_SCHEMA),
        IntentType::ViewGoals => Some(&GOAL_QUERY_SCHEMA),
        IntentType::SetReminder => Some(&CREATE_REMINDER_SCHEMA),
        IntentType::ViewReminders => Some(&REMINDER_QUERY_SCHEMA),
        IntentType::Help | IntentType::Unknown => None,
    }
}

// ================= Validated builder =================

/// Field reader that validates against a schema while collecting every issue,
/// so a clarification prompt can name all problems at once.
struct FieldReader {
    schema: &'static DtoSchema,
    object: Map<String, Value>,
    issues: Vec<String>,
}

impl FieldReader {
    fn new(schema: &'static DtoSchema, value: Value) -> Result<Self> {
        let object = match value {
            Value::Object(map) => map,
            other => {
                return Err(AgentError::ExtractionValidation {
                    dto: schema.name,
                    issues: vec![format!("expected a JSON object, got {}", type_name(&other))],
                })
            }
        };

        let mut reader = Self {
            schema,
            object,
            issues: Vec::new(),
        };
        reader.reject_unknown_keys();
        Ok(reader)
    }

    fn reject_unknown_keys(&mut self) {
        for key in self.object.keys() {
            if !self.schema.fields.iter().any(|f| f.name == key) {
                self.issues.push(format!("unknown field `{}`", key));
            }
        }
    }

    fn spec(&self, name: &str) -> FieldSpec {
        *self
            .schema
            .fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("field `{}` missing from schema {}", name, self.schema.name))
    }

    fn raw(&mut self, name: &str) -> Option<Value> {
        match self.object.remove(name) {
            Some(Value::Null) | None => {
                if self.spec(name).required {
                    self.issues.push(format!("missing required field `{}`", name));
                }
                None
            }
            Some(v) => Some(v),
        }
    }

    fn string(&mut self, name: &str) -> Option<String> {
        let value = self.raw(name)?;
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::String(_) => {
                if self.spec(name).required {
                    self.issues.push(format!("missing required field `{}`", name));
                }
                None
            }
            other => {
                self.issues
                    .push(format!("field `{}` must be text, got {}", name, type_name(&other)));
                None
            }
        }
    }

    fn number(&mut self, name: &str) -> Option<f64> {
        let value = self.raw(name)?;
        match value.as_f64() {
            Some(n) => Some(n),
            None => {
                self.issues
                    .push(format!("field `{}` must be a number, got {}", name, type_name(&value)));
                None
            }
        }
    }

    fn integer(&mut self, name: &str) -> Option<i64> {
        let value = self.raw(name)?;
        match value.as_i64() {
            Some(n) => Some(n),
            None => {
                self.issues
                    .push(format!("field `{}` must be an integer, got {}", name, type_name(&value)));
                None
            }
        }
    }

    fn datetime(&mut self, name: &str) -> Option<DateTime<Utc>> {
        let value = self.raw(name)?;
        let Value::String(s) = &value else {
            self.issues
                .push(format!("field `{}` must be an ISO 8601 datetime", name));
            return None;
        };
        match parse_datetime(s) {
            Some(dt) => Some(dt),
            None => {
                self.issues
                    .push(format!("field `{}` is not a valid ISO 8601 datetime: {}", name, s));
                None
            }
        }
    }

    fn enum_label(&mut self, name: &str) -> Option<String> {
        let spec = self.spec(name);
        let FieldKind::Enum(allowed) = spec.kind else {
            panic!("field `{}` is not enum-constrained", name);
        };
        let label = self.string(name)?.to_lowercase();
        if allowed.contains(&label.as_str()) {
            Some(label)
        } else {
            self.issues.push(format!(
                "field `{}` must be one of [{}], got `{}`",
                name,
                allowed.join(", "),
                label
            ));
            None
        }
    }

    fn finish(self) -> Result<()> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(AgentError::ExtractionValidation {
                dto: self.schema.name,
                issues: self.issues,
            })
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accept RFC 3339 or a naive `YYYY-MM-DDTHH:MM:SS` timestamp (treated as
/// UTC, since models routinely omit the offset).
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Construct the intent's DTO from parsed JSON via strict field mapping.
pub fn build_dto(intent: IntentType, value: Value) -> Result<ExtractedDto> {
    let schema = schema_for(intent).ok_or_else(|| {
        AgentError::RoutingConfig(format!("no DTO schema registered for intent `{}`", intent))
    })?;

    let mut r = FieldReader::new(schema, value)?;

    let dto = match intent {
        IntentType::LogExpense => {
            let dto = CreateExpense {
                user_id: r.integer("user_id").unwrap_or_default(),
                amount: r.number("amount").unwrap_or_default(),
                vendor: r.string("vendor"),
                note: r.string("note"),
                timestamp: r.datetime("timestamp"),
                category_name: None,
                subcategory_name: None,
                source_message_id: None,
            };
            ExtractedDto::LogExpense(dto)
        }
        IntentType::ViewExpenses => ExtractedDto::ViewExpenses(ExpenseQuery {
            user_id: r.integer("user_id").unwrap_or_default(),
            category_name: None,
            subcategory_name: None,
            vendor: r.string("vendor"),
            start_date: r.datetime("start_date"),
            end_date: r.datetime("end_date"),
            start_amount: r.number("start_amount"),
            end_amount: r.number("end_amount"),
            aggregation: r.enum_label("aggregation").and_then(|l| Aggregation::parse(&l)),
        }),
        IntentType::CorrectExpense => ExtractedDto::CorrectExpense(CorrectExpense {
            user_id: r.integer("user_id").unwrap_or_default(),
            vendor: r.string("vendor"),
            note: r.string("note"),
            new_category: r.string("new_category").unwrap_or_default(),
            new_subcategory: r.string("new_subcategory"),
        }),
        IntentType::SetBudget => ExtractedDto::SetBudget(SetBudget {
            user_id: r.integer("user_id").unwrap_or_default(),
            amount: r.number("amount").unwrap_or_default(),
            category_name: r.string("category_name"),
            period: r.enum_label("period"),
        }),
        IntentType::ViewBudget => ExtractedDto::ViewBudget(BudgetQuery {
            user_id: r.integer("user_id").unwrap_or_default(),
            category_name: r.string("category_name"),
        }),
        IntentType::SetGoal => ExtractedDto::SetGoal(CreateGoal {
            user_id: r.integer("user_id").unwrap_or_default(),
            name: r.string("name").unwrap_or_default(),
            target_amount: r.number("target_amount").unwrap_or_default(),
            target_date: r.datetime("target_date"),
        }),
        IntentType::ViewGoals => ExtractedDto::ViewGoals(GoalQuery {
            user_id: r.integer("user_id").unwrap_or_default(),
        }),
        IntentType::SetReminder => ExtractedDto::SetReminder(CreateReminder {
            user_id: r.integer("user_id").unwrap_or_default(),
            message: r.string("message").unwrap_or_default(),
            due_at: r.datetime("due_at").unwrap_or_default(),
        }),
        IntentType::ViewReminders => ExtractedDto::ViewReminders(ReminderQuery {
            user_id: r.integer("user_id").unwrap_or_default(),
        }),
        IntentType::Help | IntentType::Unknown => unreachable!("no schema for {}", intent),
    };

    r.finish()?;
    Ok(dto)
}

// ================= Extractor =================

pub struct Extractor {
    gateway: Arc<dyn LlmGateway>,
}

impl Extractor {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Extract the intent's DTO from the message.
    ///
    /// Gateway failures propagate as service errors; schema violations
    /// propagate as `ExtractionValidation` so the caller can ask the user
    /// for the missing pieces.
    pub async fn extract(
        &self,
        message: &str,
        intent: IntentType,
        user_id: i64,
    ) -> Result<ExtractedDto> {
        let schema = schema_for(intent).ok_or_else(|| {
            AgentError::RoutingConfig(format!("no DTO schema registered for intent `{}`", intent))
        })?;

        let prompt = prompts::build_dto_prompt(message, intent, user_id, schema, Utc::now());
        let content = self.gateway.complete(&prompt, 500, 0.0).await?;

        let mut parsed: Value = serde_json::from_str(content.trim())?;

        // Caller-supplied context always wins over whatever the model said.
        if let Some(object) = parsed.as_object_mut() {
            object.insert("user_id".to_string(), Value::from(user_id));
        }

        debug!(intent = %intent, "extracted DTO payload");
        build_dto(intent, parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::testing::ScriptedGateway;
    use serde_json::json;

    #[test]
    fn builds_expense_from_valid_payload() {
        let dto = build_dto(
            IntentType::LogExpense,
            json!({
                "user_id": 7,
                "amount": 250.0,
                "vendor": "Domino's",
                "timestamp": "2025-08-23T00:00:00"
            }),
        )
        .unwrap();

        let ExtractedDto::LogExpense(expense) = dto else {
            panic!("wrong variant");
        };
        assert_eq!(expense.user_id, 7);
        assert_eq!(expense.amount, 250.0);
        assert_eq!(expense.vendor.as_deref(), Some("Domino's"));
        assert!(expense.timestamp.is_some());
    }

    #[test]
    fn missing_required_fields_are_reported_together() {
        let err = build_dto(IntentType::SetReminder, json!({"user_id": 1})).unwrap_err();
        let AgentError::ExtractionValidation { dto, issues } = err else {
            panic!("wrong error type");
        };
        assert_eq!(dto, "CreateReminder");
        assert!(issues.iter().any(|i| i.contains("`message`")));
        assert!(issues.iter().any(|i| i.contains("`due_at`")));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = build_dto(
            IntentType::LogExpense,
            json!({"user_id": 1, "amount": 10, "color": "red"}),
        )
        .unwrap_err();
        let AgentError::ExtractionValidation { issues, .. } = err else {
            panic!("wrong error type");
        };
        assert!(issues.iter().any(|i| i.contains("unknown field `color`")));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let err = build_dto(
            IntentType::LogExpense,
            json!({"user_id": 1, "amount": "two hundred"}),
        )
        .unwrap_err();
        let AgentError::ExtractionValidation { issues, .. } = err else {
            panic!("wrong error type");
        };
        assert!(issues.iter().any(|i| i.contains("`amount`")));
    }

    #[test]
    fn enum_constraint_is_enforced() {
        let err = build_dto(
            IntentType::ViewExpenses,
            json!({"user_id": 1, "aggregation": "median"}),
        )
        .unwrap_err();
        let AgentError::ExtractionValidation { issues, .. } = err else {
            panic!("wrong error type");
        };
        assert!(issues.iter().any(|i| i.contains("`aggregation`")));
    }

    #[test]
    fn aggregation_labels_parse() {
        let dto = build_dto(
            IntentType::ViewExpenses,
            json!({"user_id": 1, "aggregation": "sum"}),
        )
        .unwrap();
        let ExtractedDto::ViewExpenses(query) = dto else {
            panic!("wrong variant");
        };
        assert_eq!(query.aggregation, Some(Aggregation::Sum));
    }

    #[test]
    fn naive_datetime_is_treated_as_utc() {
        assert!(parse_datetime("2025-08-24T00:00:00").is_some());
        assert!(parse_datetime("2025-08-24 10:30:00").is_some());
        assert!(parse_datetime("2025-08-24T00:00:00+05:30").is_some());
        assert!(parse_datetime("next tuesday").is_none());
    }

    #[tokio::test]
    async fn extractor_injects_user_id_even_when_model_omits_it() {
        let gateway = Arc::new(ScriptedGateway::replying(r#"{"amount": 42.5}"#));
        let extractor = Extractor::new(gateway);

        let dto = extractor.extract("spent 42.5", IntentType::LogExpense, 99).await.unwrap();
        let ExtractedDto::LogExpense(expense) = dto else {
            panic!("wrong variant");
        };
        assert_eq!(expense.user_id, 99);
        assert_eq!(expense.amount, 42.5);
    }

    #[tokio::test]
    async fn extractor_overrides_model_supplied_user_id() {
        let gateway = Arc::new(ScriptedGateway::replying(r#"{"user_id": 1, "amount": 5}"#));
        let extractor = Extractor::new(gateway);

        let dto = extractor.extract("spent 5", IntentType::LogExpense, 42).await.unwrap();
        let ExtractedDto::LogExpense(expense) = dto else {
            panic!("wrong variant");
        };
        assert_eq!(expense.user_id, 42);
    }

    #[tokio::test]
    async fn gateway_failure_propagates_as_service_error() {
        let gateway = Arc::new(ScriptedGateway::failing());
        let extractor = Extractor::new(gateway);

        let err = extractor.extract("spent 5", IntentType::LogExpense, 1).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }

    #[tokio::test]
    async fn unknown_intent_has_no_schema() {
        let gateway = Arc::new(ScriptedGateway::failing());
        let extractor = Extractor::new(gateway);

        let err = extractor.extract("??", IntentType::Unknown, 1).await.unwrap_err();
        assert!(matches!(err, AgentError::RoutingConfig(_)));
    }
}
