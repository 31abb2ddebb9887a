//! Expense Copilot: natural-language request interpretation for a
//! conversational finance assistant.
//!
//! A free-text message goes through a fixed pipeline: intent classification
//! (pattern tier, then LLM fallback), schema-driven extraction into a typed
//! DTO, enrichment (category classification for expense logging, query-filter
//! classification for expense search), and declarative routing to the handler
//! registered for the intent. Every LLM-backed step degrades gracefully;
//! configuration mistakes fail at startup.

pub mod agent;
pub mod alias;
pub mod cache;
pub mod categorize;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod intent;
pub mod responses;
pub mod router;
pub mod store;
pub mod taxonomy;

pub use agent::MessageAgent;
pub use error::{AgentError, Result};
pub use intent::IntentType;
