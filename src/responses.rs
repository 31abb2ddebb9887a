//! Human-readable reply formatting
//!
//! Every pipeline outcome ends as one short chat message. The unknown-intent
//! replies are intentionally cheeky and picked at random; everything else is
//! plain and factual.

use rand::seq::SliceRandom;

use crate::categorize::query_filter::QueryFilterResult;
use crate::categorize::ClassificationResult;
use crate::store::{BudgetRecord, ExpenseRecord, GoalRecord, QueryOutcome, ReminderRecord};

const UNKNOWN_REPLIES: &[&str] = &[
    "I track money, not mysteries. Try something like \"spent 250 on lunch\".",
    "That one's beyond my pay grade. I do expenses, budgets, goals and reminders.",
    "No idea what that was, but it didn't cost you anything. Want to log an expense?",
    "I'm a finance bot, not a mind reader. \"/help\" shows what I can do.",
    "Hmm, nothing in my ledger for that. Ask me about your spending instead.",
];

/// Random fallback for unclassifiable messages.
pub fn unknown_reply() -> String {
    UNKNOWN_REPLIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(UNKNOWN_REPLIES[0])
        .to_string()
}

/// Format an amount in rupees, dropping trailing zero paise.
pub fn format_amount(amount: f64) -> String {
    if amount.fract().abs() < f64::EPSILON {
        format!("\u{20B9}{:.0}", amount)
    } else {
        format!("\u{20B9}{:.2}", amount)
    }
}

/// Ask the user for the fields extraction could not settle.
pub fn clarification_reply(issues: &[String]) -> String {
    format!(
        "I almost got that, but I need a bit more: {}. Could you rephrase with those details?",
        issues.join("; ")
    )
}

pub fn expense_logged_reply(
    record: &ExpenseRecord,
    classification: &ClassificationResult,
) -> String {
    let vendor = record
        .vendor
        .as_deref()
        .map(|v| format!(" at {}", v))
        .unwrap_or_default();
    let mut reply = format!(
        "Logged {}{} under {} > {}.",
        format_amount(record.amount),
        vendor,
        record.category_name,
        record.subcategory_name
    );
    if classification.is_low_confidence() {
        reply.push_str(" I wasn't too sure about the category, tell me if it's wrong.");
    }
    reply
}

pub fn query_reply(outcome: &QueryOutcome, filter: Option<&QueryFilterResult>) -> String {
    let scope = filter
        .and_then(|f| {
            f.subcategory_name
                .clone()
                .or_else(|| f.category_name.clone())
        })
        .map(|name| format!(" on {}", name))
        .unwrap_or_default();

    match outcome {
        QueryOutcome::Aggregate { label, value } => {
            if *label == "count" {
                format!("You have {} matching expenses{}.", *value as i64, scope)
            } else {
                format!("Your {} spend{} is {}.", label, scope, format_amount(*value))
            }
        }
        QueryOutcome::Rows(rows) if rows.is_empty() => {
            format!("No expenses found{}.", scope)
        }
        QueryOutcome::Rows(rows) => {
            let mut lines = vec![format!("Found {} expenses{}:", rows.len(), scope)];
            for record in rows.iter().take(10) {
                let vendor = record.vendor.as_deref().unwrap_or("unknown");
                lines.push(format!(
                    "- {} at {} ({}, {})",
                    format_amount(record.amount),
                    vendor,
                    record.category_name,
                    record.timestamp.format("%b %d")
                ));
            }
            if rows.len() > 10 {
                lines.push(format!("...and {} more.", rows.len() - 10));
            }
            lines.join("\n")
        }
    }
}

pub fn correction_reply(updated: Option<&ExpenseRecord>) -> String {
    match updated {
        Some(record) => format!(
            "Got it, moved that {} expense to {} > {}. I'll remember that.",
            record
                .vendor
                .as_deref()
                .unwrap_or("recent"),
            record.category_name,
            record.subcategory_name
        ),
        None => "I couldn't find a matching expense to correct, but I'll remember the category for next time.".to_string(),
    }
}

pub fn budget_set_reply(record: &BudgetRecord) -> String {
    let scope = record
        .category_name
        .as_deref()
        .map(|c| format!(" for {}", c))
        .unwrap_or_else(|| " overall".to_string());
    format!(
        "Budget set: {} {}{}.",
        format_amount(record.amount),
        record.period,
        scope
    )
}

pub fn budgets_reply(budgets: &[BudgetRecord]) -> String {
    if budgets.is_empty() {
        return "You haven't set any budgets yet. Try \"set a budget of 5000 for food\".".to_string();
    }
    let mut lines = vec!["Your budgets:".to_string()];
    for b in budgets {
        let scope = b.category_name.as_deref().unwrap_or("overall");
        lines.push(format!("- {}: {} {}", scope, format_amount(b.amount), b.period));
    }
    lines.join("\n")
}

pub fn goal_set_reply(record: &GoalRecord) -> String {
    let deadline = record
        .target_date
        .map(|d| format!(" by {}", d.format("%b %d, %Y")))
        .unwrap_or_default();
    format!(
        "Goal \"{}\" created: {}{}.",
        record.name,
        format_amount(record.target_amount),
        deadline
    )
}

pub fn goals_reply(goals: &[GoalRecord]) -> String {
    if goals.is_empty() {
        return "No goals yet. Try \"set a goal to save 10000 by December\".".to_string();
    }
    let mut lines = vec!["Your goals:".to_string()];
    for g in goals {
        lines.push(format!("- {}: {}", g.name, format_amount(g.target_amount)));
    }
    lines.join("\n")
}

pub fn reminder_set_reply(record: &ReminderRecord) -> String {
    format!(
        "Reminder set: \"{}\" on {}.",
        record.message,
        record.due_at.format("%b %d at %I:%M %p")
    )
}

pub fn reminders_reply(reminders: &[ReminderRecord]) -> String {
    if reminders.is_empty() {
        return "No reminders scheduled.".to_string();
    }
    let mut lines = vec!["Your reminders:".to_string()];
    for r in reminders {
        lines.push(format!("- {} ({})", r.message, r.due_at.format("%b %d, %I:%M %p")));
    }
    lines.join("\n")
}

pub fn help_reply() -> String {
    [
        "Here's what I can do:",
        "- Log an expense: \"spent 250 on lunch at KFC\"",
        "- Show spending: \"how much did I spend on groceries this month\"",
        "- Fix a category: \"that Starbucks charge should be Business\"",
        "- Budgets: \"set a budget of 5000 for food\", \"show my budgets\"",
        "- Goals: \"set a goal to save 10000\", \"show my goals\"",
        "- Reminders: \"remind me to pay rent on the 1st\", \"show my reminders\"",
    ]
    .join("\n")
}

/// Soft error for transient service failures.
pub fn friendly_error_reply() -> String {
    "Something hiccuped on my end. Give me a second and try that again.".to_string()
}
