//! Intent types and the two-tier intent classifier

pub mod classifier;
pub mod prompts;

pub use classifier::IntentClassifier;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed enumeration of canonical request categories.
///
/// `Unknown` is the universal safe terminal value: every failure mode in
/// classification collapses to it instead of raising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    LogExpense,
    ViewExpenses,
    CorrectExpense,
    SetBudget,
    ViewBudget,
    SetGoal,
    ViewGoals,
    SetReminder,
    ViewReminders,
    Help,
    Unknown,
}

impl IntentType {
    pub const ALL: &'static [IntentType] = &[
        IntentType::LogExpense,
        IntentType::ViewExpenses,
        IntentType::CorrectExpense,
        IntentType::SetBudget,
        IntentType::ViewBudget,
        IntentType::SetGoal,
        IntentType::ViewGoals,
        IntentType::SetReminder,
        IntentType::ViewReminders,
        IntentType::Help,
        IntentType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::LogExpense => "log_expense",
            IntentType::ViewExpenses => "view_expenses",
            IntentType::CorrectExpense => "correct_expense",
            IntentType::SetBudget => "set_budget",
            IntentType::ViewBudget => "view_budget",
            IntentType::SetGoal => "set_goal",
            IntentType::ViewGoals => "view_goals",
            IntentType::SetReminder => "set_reminder",
            IntentType::ViewReminders => "view_reminders",
            IntentType::Help => "help",
            IntentType::Unknown => "unknown",
        }
    }

    /// Parse a canonical label. Returns `None` for anything unrecognized;
    /// callers decide whether that means "skip" or "Unknown".
    pub fn parse(label: &str) -> Option<IntentType> {
        IntentType::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == label.trim().to_lowercase())
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for intent in IntentType::ALL {
            assert_eq!(IntentType::parse(intent.as_str()), Some(*intent));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(IntentType::parse(" LOG_EXPENSE "), Some(IntentType::LogExpense));
        assert_eq!(IntentType::parse("gibberish"), None);
    }
}
