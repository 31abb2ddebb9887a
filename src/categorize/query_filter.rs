//! Query-filter classification
//!
//! Maps a free-text spending query onto an optional category/subcategory
//! filter. Deterministic alias matching runs first, subcategory aliases
//! under a stricter threshold than category aliases so broad words ("food")
//! never narrow a query to one subcategory. Vendor-filtered queries skip the
//! LLM entirely: the vendor already narrows the search, and a null category
//! filter is the correct answer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use super::prompts;
use crate::alias::{normalize_query_text, AliasGroups, AliasIndex};
use crate::gemini::LlmGateway;
use crate::taxonomy;

pub const CATEGORY_CONFIDENCE_THRESHOLD: f64 = 0.78;
pub const SUBCATEGORY_CONFIDENCE_THRESHOLD: f64 = 0.86;

/// Which layer produced the filter. `None` on the result means no filter was
/// applied at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLayer {
    Alias,
    Llm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilterResult {
    pub category_name: Option<String>,
    pub subcategory_name: Option<String>,
    pub confidence: f64,
    pub match_layer: Option<MatchLayer>,
    pub alias_score: f64,
    pub matched_alias: Option<String>,
    pub llm_used: bool,
    pub null_fallback_used: bool,
    pub reasoning: String,
}

impl QueryFilterResult {
    fn unfiltered(alias_score: f64, reasoning: &str) -> Self {
        Self {
            category_name: None,
            subcategory_name: None,
            confidence: 0.0,
            match_layer: None,
            alias_score,
            matched_alias: None,
            llm_used: false,
            null_fallback_used: false,
            reasoning: reasoning.to_string(),
        }
    }
}

/// Broad category aliases.
const CATEGORY_ALIASES: AliasGroups = &[
    ("Food & Dining", &["food", "foods", "eat", "eating", "meal", "meals", "dining"]),
    ("Transportation", &["transport", "travel commute", "commute", "rides", "ride"]),
    ("Shopping", &["shopping", "purchase", "purchases", "bought", "buying"]),
    ("Bills & Utilities", &["bills", "utilities", "bill payment", "monthly bills"]),
    ("Entertainment", &["entertainment", "fun", "leisure", "movies and shows"]),
    ("Healthcare", &["healthcare", "medical", "doctor", "medicine"]),
    ("Education", &["education", "learning", "study", "courses"]),
    ("Travel", &["trip", "travel", "vacation", "holiday"]),
    ("Personal Care", &["personal care", "self care", "grooming"]),
    ("Business", &["business", "work expenses", "office spending"]),
    ("Investments", &["investment", "investments", "investing"]),
    ("Gifts & Donations", &["gifts", "gift", "charity", "donation", "donations"]),
    ("Other", &["other", "misc", "miscellaneous"]),
];

/// Explicit subcategory aliases. Only the subcategories people actually name
/// in queries carry aliases.
const SUBCATEGORY_ALIASES: AliasGroups = &[
    ("Groceries", &["grocery", "groceries", "supermarket", "grocery store"]),
    ("Restaurants", &["restaurant", "restaurants", "dining out", "dinner out", "eating out"]),
    ("Cafe/Coffee", &["coffee", "cafe", "cafes", "tea", "coffee shop"]),
    ("Food Delivery", &["delivery", "food delivery", "ordered in", "swiggy", "zomato"]),
    ("Ride Share", &["uber", "ola", "lyft", "rideshare", "ride share", "cab"]),
    ("Fuel", &["fuel", "petrol", "gas", "diesel"]),
    ("Public Transit", &["metro", "bus", "train", "public transit"]),
    ("Online Shopping", &["online shopping", "online order", "amazon", "flipkart"]),
    ("Rent/Mortgage", &["rent", "mortgage", "house rent"]),
    ("Internet", &["internet", "wifi", "broadband"]),
    ("Phone", &["phone bill", "mobile bill", "recharge"]),
    ("Streaming", &["streaming", "netflix", "prime video", "hotstar", "spotify"]),
];

/// Deterministic alias resolution, pure and synchronous.
///
/// Subcategory hits also set the parent category; a subcategory whose parent
/// cannot be validated against the taxonomy is ignored rather than repaired.
pub fn resolve_aliases(message: &str) -> QueryFilterResult {
    let normalized = normalize_query_text(message);
    if normalized.is_empty() {
        return QueryFilterResult::unfiltered(0.0, "empty query text");
    }

    let sub_index = AliasIndex::new(SUBCATEGORY_ALIASES);
    let cat_index = AliasIndex::new(CATEGORY_ALIASES);

    let sub_hit = sub_index.best_match(&normalized);
    if let Some(hit) = sub_hit {
        if clears_subcategory_bar(hit.score) {
            if let Some(parent) = taxonomy::category_for_subcategory(hit.target) {
                return QueryFilterResult {
                    category_name: Some(parent.to_string()),
                    subcategory_name: Some(hit.target.to_string()),
                    confidence: hit.score,
                    match_layer: Some(MatchLayer::Alias),
                    alias_score: hit.score,
                    matched_alias: Some(hit.alias.to_string()),
                    llm_used: false,
                    null_fallback_used: false,
                    reasoning: format!("matched explicit subcategory alias '{}'", hit.alias),
                };
            }
        }
    }

    let cat_hit = cat_index.best_match(&normalized);
    if let Some(hit) = cat_hit {
        if clears_category_bar(hit.score) {
            return QueryFilterResult {
                category_name: Some(hit.target.to_string()),
                subcategory_name: None,
                confidence: hit.score,
                match_layer: Some(MatchLayer::Alias),
                alias_score: hit.score,
                matched_alias: Some(hit.alias.to_string()),
                llm_used: false,
                null_fallback_used: false,
                reasoning: "matched broad category alias".to_string(),
            };
        }
    }

    let best_score = cat_hit
        .map(|h| h.score)
        .unwrap_or(0.0)
        .max(sub_hit.map(|h| h.score).unwrap_or(0.0));
    QueryFilterResult::unfiltered(best_score, "no deterministic alias matched threshold")
}

/// Both bars are inclusive: a score exactly at the threshold qualifies.
fn clears_subcategory_bar(score: f64) -> bool {
    score >= SUBCATEGORY_CONFIDENCE_THRESHOLD
}

fn clears_category_bar(score: f64) -> bool {
    score >= CATEGORY_CONFIDENCE_THRESHOLD
}

/// Re-apply the alias thresholds to an LLM answer.
///
/// The model's confidences are not trusted past the same bars the alias
/// layer must clear: a category below its bar nulls both fields, a
/// subcategory needs a valid parent pair and its own bar.
fn apply_llm_thresholds(
    category: Option<&str>,
    subcategory: Option<&str>,
    category_confidence: f64,
    subcategory_confidence: f64,
) -> (Option<String>, Option<String>) {
    let category = category.filter(|c| taxonomy::is_known_category(c));
    let Some(cat) = category.filter(|_| clears_category_bar(category_confidence)) else {
        return (None, None);
    };

    let sub = subcategory
        .filter(|s| taxonomy::is_valid_pair(cat, s))
        .filter(|_| clears_subcategory_bar(subcategory_confidence));
    (Some(cat.to_string()), sub.map(str::to_string))
}

pub struct QueryFilterClassifier {
    gateway: Arc<dyn LlmGateway>,
}

impl QueryFilterClassifier {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Classify a query into an optional category filter.
    ///
    /// Never fails: every LLM-path failure degrades to the unfiltered
    /// result, which simply means "search everything".
    pub async fn classify(&self, message: &str, vendor_filter: Option<&str>) -> QueryFilterResult {
        let alias_result = resolve_aliases(message);
        if alias_result.match_layer.is_some() {
            debug!(
                category = ?alias_result.category_name,
                subcategory = ?alias_result.subcategory_name,
                "query filter resolved by alias"
            );
            return alias_result;
        }

        // A vendor filter already narrows the query. Guessing a category on
        // top of it narrows twice and hides results.
        if vendor_filter.is_some() {
            let mut result = alias_result;
            result.null_fallback_used = true;
            result.reasoning = "vendor filter present, category left open".to_string();
            return result;
        }

        self.classify_by_llm(message, alias_result.alias_score).await
    }

    async fn classify_by_llm(&self, message: &str, alias_score: f64) -> QueryFilterResult {
        let prompt = prompts::build_query_filter_prompt(message);

        let content = match self.gateway.complete(&prompt, 500, 0.0).await {
            Ok(content) => content,
            Err(e) => {
                error!("LLM query-filter error: {}", e);
                let mut result =
                    QueryFilterResult::unfiltered(alias_score, "query-filter service error");
                result.llm_used = true;
                return result;
            }
        };

        let parsed: Value = match serde_json::from_str(content.trim()) {
            Ok(v) => v,
            Err(e) => {
                error!("failed to parse query-filter response: {}", e);
                let mut result =
                    QueryFilterResult::unfiltered(alias_score, "unparseable query-filter response");
                result.llm_used = true;
                return result;
            }
        };

        let category_confidence = parsed
            .get("category_confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let subcategory_confidence = parsed
            .get("subcategory_confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let reasoning = parsed
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or("query filter from LLM")
            .to_string();

        let (category_name, subcategory_name) = apply_llm_thresholds(
            parsed.get("category_name").and_then(Value::as_str),
            parsed.get("subcategory_name").and_then(Value::as_str),
            category_confidence,
            subcategory_confidence,
        );

        let match_layer = category_name.as_ref().map(|_| MatchLayer::Llm);
        QueryFilterResult {
            category_name,
            subcategory_name,
            confidence: category_confidence,
            match_layer,
            alias_score,
            matched_alias: None,
            llm_used: true,
            null_fallback_used: false,
            reasoning,
        }
    }
}
