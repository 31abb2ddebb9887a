//! Error types for the message interpretation pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    // =============================
    // Core Pipeline Errors
    // =============================

    /// LLM gateway / network / malformed-response failure. Absorbed inside
    /// the classifiers; propagated from the extractor.
    #[error("LLM service error: {0}")]
    Llm(String),

    /// The extracted payload did not satisfy the intent's DTO schema.
    /// All issues for one message are reported together.
    #[error("extraction for `{dto}` failed: {}", issues.join("; "))]
    ExtractionValidation {
        dto: &'static str,
        issues: Vec<String>,
    },

    /// A handler owner, method, or intent registration is missing.
    /// This is a configuration defect and fails fast.
    #[error("routing configuration error: {0}")]
    RoutingConfig(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AgentError {
    /// True when the error should surface to the user as a clarification
    /// request rather than a generic failure message.
    pub fn needs_clarification(&self) -> bool {
        matches!(self, AgentError::ExtractionValidation { .. })
    }
}
