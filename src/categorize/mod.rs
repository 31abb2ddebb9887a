//! Layered category classification
//!
//! Four tracks, cheapest first: known-merchant table, per-user learned
//! patterns, the global vendor cache, then the LLM. Classification never
//! fails: every error path degrades to the fallback pair with a low
//! confidence and the `Default` method so the caller can tell.

pub mod prompts;
pub mod query_filter;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::cache::TtlCache;
use crate::gemini::LlmGateway;
use crate::taxonomy::{self, FALLBACK_CATEGORY, FALLBACK_SUBCATEGORY};

/// Results below this confidence should prompt the user to confirm.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Confidence assigned to known-merchant table hits.
const KNOWN_MERCHANT_CONFIDENCE: f64 = 0.99;

/// Confidence assigned when the LLM path errors out entirely.
const ERROR_FALLBACK_CONFIDENCE: f64 = 0.3;

/// TTLs per pattern kind. User corrections outlive observed vendor patterns;
/// the weakened global copy of a correction decays fastest.
const VENDOR_PATTERN_TTL: Duration = Duration::from_secs(90 * 24 * 60 * 60);
const USER_CORRECTION_TTL: Duration = Duration::from_secs(180 * 24 * 60 * 60);
const WEAKENED_GLOBAL_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const NOTE_PATTERN_TTL: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Confidence of the weakened global copy written on user correction.
const WEAKENED_GLOBAL_CONFIDENCE: f64 = 0.85;

/// Which track produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    KnownMerchant,
    Cache,
    Llm,
    UserPattern,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: String,
    pub subcategory: String,
    pub confidence: f64,
    pub method: ClassificationMethod,
    pub reasoning: Option<String>,
}

impl ClassificationResult {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE_THRESHOLD
    }

    fn fallback(reasoning: &str) -> Self {
        Self {
            category: FALLBACK_CATEGORY.to_string(),
            subcategory: FALLBACK_SUBCATEGORY.to_string(),
            confidence: ERROR_FALLBACK_CONFIDENCE,
            method: ClassificationMethod::Default,
            reasoning: Some(reasoning.to_string()),
        }
    }
}

/// Wire format for cached classifications.
#[derive(Debug, Serialize, Deserialize)]
struct CacheableClassification {
    category: String,
    subcategory: String,
    confidence: f64,
}

fn user_pattern_key(user_id: i64, vendor: &str) -> String {
    format!("user_merchant:{}:{}", user_id, taxonomy::normalize_vendor(vendor))
}

fn user_note_key(user_id: i64, note: &str) -> String {
    format!("user_note:{}:{}", user_id, taxonomy::normalize_vendor(note))
}

fn global_vendor_key(vendor: &str) -> String {
    let digest = Sha256::digest(taxonomy::normalize_vendor(vendor).as_bytes());
    format!("merchant_cat:{}", hex::encode(digest))
}

pub struct CategoryClassifier {
    cache: Arc<dyn TtlCache>,
    gateway: Arc<dyn LlmGateway>,
}

impl CategoryClassifier {
    pub fn new(cache: Arc<dyn TtlCache>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self { cache, gateway }
    }

    /// Classify a transaction. Infallible by contract: worst case is the
    /// fallback pair at low confidence with method `Default`.
    pub async fn classify(
        &self,
        message: &str,
        vendor: Option<&str>,
        note: Option<&str>,
        amount: Option<f64>,
        user_id: i64,
    ) -> ClassificationResult {
        let result = self.classify_inner(message, vendor, note, amount, user_id).await;
        self.remember(vendor, &result).await;
        result
    }

    async fn classify_inner(
        &self,
        message: &str,
        vendor: Option<&str>,
        note: Option<&str>,
        amount: Option<f64>,
        user_id: i64,
    ) -> ClassificationResult {
        // Track 1: exact known-merchant lookup.
        if let Some(vendor) = vendor {
            if let Some((category, subcategory)) = taxonomy::known_merchant(vendor) {
                return ClassificationResult {
                    category: category.to_string(),
                    subcategory: subcategory.to_string(),
                    confidence: KNOWN_MERCHANT_CONFIDENCE,
                    method: ClassificationMethod::KnownMerchant,
                    reasoning: None,
                };
            }
        }

        // Track 2: per-user learned patterns, vendor first then note.
        if let Some(result) = self.user_pattern(vendor, note, user_id).await {
            return result;
        }

        // Track 3: global vendor cache.
        if let Some(vendor) = vendor {
            if let Some(cached) = self.read_cached(&global_vendor_key(vendor)).await {
                return ClassificationResult {
                    category: cached.category,
                    subcategory: cached.subcategory,
                    confidence: cached.confidence,
                    method: ClassificationMethod::Cache,
                    reasoning: None,
                };
            }
        }

        // Track 4: LLM.
        self.classify_by_llm(message, vendor, note, amount).await
    }

    /// Vendor-bearing results from any track refresh the global cache.
    async fn remember(&self, vendor: Option<&str>, result: &ClassificationResult) {
        if result.method == ClassificationMethod::Default {
            return;
        }
        if let Some(vendor) = vendor {
            self.write_cached(
                &global_vendor_key(vendor),
                result,
                result.confidence,
                VENDOR_PATTERN_TTL,
            )
            .await;
        }
    }

    async fn user_pattern(
        &self,
        vendor: Option<&str>,
        note: Option<&str>,
        user_id: i64,
    ) -> Option<ClassificationResult> {
        let cached = match vendor {
            Some(vendor) => self.read_cached(&user_pattern_key(user_id, vendor)).await,
            None => None,
        };
        let cached = match (cached, note) {
            (Some(hit), _) => Some(hit),
            (None, Some(note)) => self.read_cached(&user_note_key(user_id, note)).await,
            (None, None) => None,
        }?;

        Some(ClassificationResult {
            category: cached.category,
            subcategory: cached.subcategory,
            confidence: cached.confidence,
            method: ClassificationMethod::UserPattern,
            reasoning: None,
        })
    }

    async fn classify_by_llm(
        &self,
        message: &str,
        vendor: Option<&str>,
        note: Option<&str>,
        amount: Option<f64>,
    ) -> ClassificationResult {
        // The most specific text available drives the prompt.
        let text = vendor.or(note).filter(|t| !t.trim().is_empty()).unwrap_or(message);
        let prompt = prompts::build_classification_prompt(text, vendor, note, amount);

        let content = match self.gateway.complete(&prompt, 500, 0.0).await {
            Ok(content) => content,
            Err(e) => {
                error!("LLM classification error: {}", e);
                return ClassificationResult::fallback("classification service error");
            }
        };

        let parsed: Value = match serde_json::from_str(content.trim()) {
            Ok(v) => v,
            Err(e) => {
                error!("failed to parse classification response: {}", e);
                return ClassificationResult::fallback("unparseable classification response");
            }
        };

        let category = parsed.get("category").and_then(Value::as_str);
        let subcategory = parsed.get("subcategory").and_then(Value::as_str);
        let confidence = parsed.get("confidence").and_then(Value::as_f64).unwrap_or(0.5);
        let reasoning = parsed
            .get("reasoning")
            .and_then(Value::as_str)
            .map(str::to_string);
        // Keep a both-null answer distinguishable from an unknown vendor.
        let reasoning = if category.is_none() && subcategory.is_none() {
            reasoning
                .or_else(|| Some("model returned no category; text may not describe a transaction".to_string()))
        } else {
            reasoning
        };

        let (category, subcategory, confidence) =
            repair_taxonomy(category, subcategory, confidence);

        debug!(category = %category, subcategory = %subcategory, "LLM classification");
        ClassificationResult {
            category,
            subcategory,
            confidence,
            method: ClassificationMethod::Llm,
            reasoning,
        }
    }

    /// Record a user correction: a long-lived per-user pattern, a weakened
    /// global pattern, and a note pattern when a note is available.
    pub async fn learn_from_correction(
        &self,
        user_id: i64,
        vendor: Option<&str>,
        note: Option<&str>,
        category: &str,
        subcategory: &str,
    ) {
        let user_result = CacheableClassification {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            confidence: KNOWN_MERCHANT_CONFIDENCE,
        };

        if let Some(vendor) = vendor {
            self.write_raw(&user_pattern_key(user_id, vendor), &user_result, USER_CORRECTION_TTL)
                .await;

            let global = CacheableClassification {
                category: category.to_string(),
                subcategory: subcategory.to_string(),
                confidence: WEAKENED_GLOBAL_CONFIDENCE,
            };
            self.write_raw(&global_vendor_key(vendor), &global, WEAKENED_GLOBAL_TTL).await;
        }

        if let Some(note) = note {
            self.write_raw(&user_note_key(user_id, note), &user_result, NOTE_PATTERN_TTL).await;
        }
    }

    async fn read_cached(&self, key: &str) -> Option<CacheableClassification> {
        let raw = self.cache.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("discarding malformed cache entry at {}: {}", key, e);
                None
            }
        }
    }

    async fn write_cached(
        &self,
        key: &str,
        result: &ClassificationResult,
        confidence: f64,
        ttl: Duration,
    ) {
        let entry = CacheableClassification {
            category: result.category.clone(),
            subcategory: result.subcategory.clone(),
            confidence,
        };
        self.write_raw(key, &entry, ttl).await;
    }

    async fn write_raw(&self, key: &str, entry: &CacheableClassification, ttl: Duration) {
        match serde_json::to_string(entry) {
            Ok(json) => {
                if !self.cache.set(key, &json, ttl).await {
                    warn!("cache write failed for {}", key);
                }
            }
            Err(e) => warn!("failed to serialize cache entry: {}", e),
        }
    }
}

/// Force an LLM answer back inside the taxonomy.
///
/// Unknown category drops to the fallback pair at 0.5. A subcategory outside
/// the chosen category is repaired to that category's first subcategory with
/// confidence capped at 0.7.
fn repair_taxonomy(
    category: Option<&str>,
    subcategory: Option<&str>,
    confidence: f64,
) -> (String, String, f64) {
    let Some(category) = category.filter(|c| taxonomy::is_known_category(c)) else {
        return (FALLBACK_CATEGORY.to_string(), FALLBACK_SUBCATEGORY.to_string(), 0.5);
    };

    match subcategory.filter(|s| taxonomy::is_valid_pair(category, s)) {
        Some(subcategory) => (category.to_string(), subcategory.to_string(), confidence),
        None => {
            let repaired = taxonomy::first_subcategory(category).unwrap_or(FALLBACK_SUBCATEGORY);
            (category.to_string(), repaired.to_string(), confidence.min(0.7))
        }
    }
}
