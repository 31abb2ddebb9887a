//! Declarative intent routing
//!
//! Handlers are grouped into providers. Each provider declares its owner
//! name and an explicit table of (intent, method name) registrations; the
//! registry is assembled once at startup and rejects bad configuration
//! immediately instead of failing on the first live message. Dispatch is a
//! table lookup followed by a string-keyed invoke on the owning provider.

pub mod handlers;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::categorize::query_filter::QueryFilterResult;
use crate::categorize::ClassificationResult;
use crate::error::AgentError;
use crate::extract::ExtractedDto;
use crate::intent::IntentType;
use crate::Result;

/// Everything the pipeline learned about one message, handed to the handler.
#[derive(Debug, Clone)]
pub struct InterpretedRequest {
    pub user_id: i64,
    pub message: String,
    pub intent: IntentType,
    pub dto: Option<ExtractedDto>,
    pub classification: Option<ClassificationResult>,
    pub query_filter: Option<QueryFilterResult>,
}

/// A group of related intent handlers.
#[async_trait]
pub trait HandlerProvider: Send + Sync {
    /// Stable owner name, used in routing diagnostics.
    fn owner(&self) -> &'static str;

    /// Explicit registration table. Every intent this provider handles maps
    /// to the method name `invoke` understands.
    fn registrations(&self) -> &'static [(IntentType, &'static str)];

    /// Run one registered method. An unregistered method name is a
    /// configuration error, not a user error.
    async fn invoke(&self, method: &str, request: &InterpretedRequest) -> Result<String>;
}

struct Route {
    provider: Arc<dyn HandlerProvider>,
    method: &'static str,
}

/// Intent → handler table, built once at startup.
#[derive(Default)]
pub struct HandlerRegistry {
    routes: HashMap<IntentType, Route>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every (intent, method) pair a provider declares.
    ///
    /// A duplicate intent registration is a startup error: silently shadowing
    /// an earlier handler would make routing depend on registration order.
    pub fn register(&mut self, provider: Arc<dyn HandlerProvider>) -> Result<()> {
        for (intent, method) in provider.registrations() {
            if let Some(existing) = self.routes.get(intent) {
                return Err(AgentError::RoutingConfig(format!(
                    "intent `{}` registered by both `{}` and `{}`",
                    intent,
                    existing.provider.owner(),
                    provider.owner()
                )));
            }
            self.routes.insert(
                *intent,
                Route {
                    provider: provider.clone(),
                    method,
                },
            );
        }
        Ok(())
    }

    /// True when the intent has a registered handler.
    pub fn handles(&self, intent: IntentType) -> bool {
        self.routes.contains_key(&intent)
    }

    /// Dispatch an interpreted request to its handler.
    pub async fn dispatch(&self, request: &InterpretedRequest) -> Result<String> {
        let route = self.routes.get(&request.intent).ok_or_else(|| {
            AgentError::RoutingConfig(format!(
                "no handler registered for intent `{}`",
                request.intent
            ))
        })?;

        debug!(
            intent = %request.intent,
            owner = route.provider.owner(),
            method = route.method,
            "dispatching request"
        );
        route.provider.invoke(route.method, request).await
    }
}

/// Shorthand for the configuration error every provider raises on a method
/// name it never registered.
pub(crate) fn unknown_method(owner: &'static str, method: &str) -> AgentError {
    AgentError::RoutingConfig(format!("provider `{}` has no method `{}`", owner, method))
}

/// Error for a dispatch that reached a handler with the wrong DTO variant.
pub(crate) fn wrong_dto(owner: &'static str, method: &str) -> AgentError {
    AgentError::RoutingConfig(format!(
        "method `{}::{}` invoked without its expected payload",
        owner, method
    ))
}
