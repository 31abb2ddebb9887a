//! Tier-1 pattern table and tier-2 prompt for intent classification

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use super::IntentType;

/// Ordered (pattern, intent label) pairs. Declaration order is evaluation
/// order and the first match wins, so the more specific patterns sit first.
/// Labels are plain strings: an invalid label is skipped with a warning at
/// table-compile time rather than taking the process down.
const INTENT_PATTERNS: &[(&str, &str)] = &[
    // Expense logging, most common, both token orders
    (
        r"(\b(spent|paid|bought|cost|purchase|expense|bill)\b.*\d+|\d+.*\b(spent|paid|bought|cost|purchase|expense|bill)\b)",
        "log_expense",
    ),
    // Expense correction, before generic expense queries
    (r"\b(change|correct|fix|update|wrong)\b.*\bcategor", "correct_expense"),
    (r"\b(should\s+be|actually|that'?s?\s+wrong)\b.*\bcategor", "correct_expense"),
    // Reminders, more specific than general view queries
    (r"\b(show|list|view|display|get|check|see)\b.*(my\s+)?reminders?\b", "view_reminders"),
    (r"\bremind\s+me\b", "set_reminder"),
    // Queries, second most common
    (r"\b(how much|total|show|list|view|display)\b.*(expense|spending|spent)", "view_expenses"),
    (r"\b(spending|spent).*\b(this|last|current)\s+(week|month|year)", "view_expenses"),
    // Budgets
    (r"\b(set|create)\s+(a\s+)?budget\b", "set_budget"),
    (r"\b(view|show|check)\s+(my\s+)?budgets?\b", "view_budget"),
    // Goals
    (r"\b(set|create)\s+(a\s+)?goal\b", "set_goal"),
    (r"\b(view|show|check)\s+(my\s+)?goals?\b", "view_goals"),
    // Commands, instant classification
    (r"^/help", "help"),
    (r"^/list", "view_expenses"),
];

lazy_static! {
    /// Compiled pattern table. Invalid regexes or labels are dropped with a
    /// warning so one bad row never disables the tier.
    static ref COMPILED_PATTERNS: Vec<(Regex, IntentType)> = INTENT_PATTERNS
        .iter()
        .filter_map(|(pattern, label)| {
            let regex = match Regex::new(pattern) {
                Ok(r) => r,
                Err(e) => {
                    warn!("invalid intent pattern `{}`: {}", pattern, e);
                    return None;
                }
            };
            match IntentType::parse(label) {
                Some(intent) => Some((regex, intent)),
                None => {
                    warn!("invalid intent label in pattern table: {}", label);
                    None
                }
            }
        })
        .collect();
}

pub(crate) fn compiled_patterns() -> &'static [(Regex, IntentType)] {
    &COMPILED_PATTERNS
}

/// Build the tier-2 classification prompt enumerating all valid intents.
pub fn build_intent_prompt(message: &str) -> String {
    let intents = IntentType::ALL
        .iter()
        .map(|i| i.as_str())
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"You are an expert assistant that classifies user requests into one of the following intents:
{intents}

Rules:
- Always return a JSON object with exactly one key: "intent".
- Pick the **closest matching intent**. Do not use "unknown" unless the message is clearly unrelated (e.g., casual chat).
- Do not infer parameters, only the intent.

Examples:
"I spent 500 on groceries today." -> {{"intent": "log_expense"}}
"Show me my expenses for last week." -> {{"intent": "view_expenses"}}
"No, that's wrong. The category should be Entertainment" -> {{"intent": "correct_expense"}}
"Remind me to pay rent on 1st." -> {{"intent": "set_reminder"}}
"Show me all my reminders." -> {{"intent": "view_reminders"}}

User message:
{message}
"#
    )
}
