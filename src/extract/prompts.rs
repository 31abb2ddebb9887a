//! Prompt construction for schema-driven extraction

use chrono::{DateTime, Utc};

use super::{DtoSchema, FieldKind};
use crate::intent::IntentType;

fn kind_label(kind: FieldKind) -> String {
    match kind {
        FieldKind::Text => "text".to_string(),
        FieldKind::Number => "number".to_string(),
        FieldKind::Integer => "integer".to_string(),
        FieldKind::DateTime => "ISO 8601 datetime".to_string(),
        FieldKind::Enum(allowed) => format!("one of [{}]", allowed.join(", ")),
    }
}

/// Build the extraction prompt for one intent.
///
/// The current timestamp is spelled out in full so relative dates
/// ("yesterday", "last week") resolve to concrete ISO 8601 values.
pub fn build_dto_prompt(
    message: &str,
    intent: IntentType,
    user_id: i64,
    schema: &DtoSchema,
    now: DateTime<Utc>,
) -> String {
    let field_lines = schema
        .fields
        .iter()
        .map(|f| {
            format!(
                "- {} ({}{})",
                f.name,
                kind_label(f.kind),
                if f.required { ", required" } else { ", optional" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let examples = if schema.examples.is_empty() {
        String::new()
    } else {
        let rows = schema
            .examples
            .iter()
            .map(|(msg, json)| format!("\"{}\" -> {}", msg, json))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\nExamples:\n{}\n", rows)
    };

    format!(
        r#"You are a precise data extraction assistant. The user's request was classified as "{intent}".
Extract the fields for a {dto} object from the message below.

Current date and time: {now}

Fields:
{field_lines}

Rules:
- Return ONLY a JSON object with the fields above. Omit optional fields you cannot find.
- All datetimes must be ISO 8601 (e.g. 2025-08-24T18:30:00). Resolve relative dates ("yesterday", "last week") against the current date and time.
- Do NOT categorize the expense. Categories are assigned elsewhere.
- user_id is {user_id}.
{examples}
User message:
{message}
"#,
        intent = intent,
        dto = schema.name,
        now = now.format("%A, %B %d, %Y at %I:%M %p UTC"),
        field_lines = field_lines,
        user_id = user_id,
        examples = examples,
        message = message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::schema_for;
    use chrono::TimeZone;

    #[test]
    fn prompt_names_every_schema_field() {
        let schema = schema_for(IntentType::LogExpense).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 8, 24, 10, 30, 0).unwrap();
        let prompt = build_dto_prompt("spent 250", IntentType::LogExpense, 7, schema, now);

        for field in schema.fields {
            assert!(prompt.contains(field.name), "missing field {}", field.name);
        }
        assert!(prompt.contains("Sunday, August 24, 2025"));
        assert!(prompt.contains("user_id is 7"));
        assert!(prompt.contains("spent 250"));
    }

    #[test]
    fn enum_fields_spell_out_allowed_values() {
        let schema = schema_for(IntentType::ViewExpenses).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 8, 24, 10, 30, 0).unwrap();
        let prompt = build_dto_prompt("total spend", IntentType::ViewExpenses, 1, schema, now);
        assert!(prompt.contains("one of [sum, count, avg, min, max]"));
    }
}
