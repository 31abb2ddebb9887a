//! Prompt construction for LLM category classification

use crate::taxonomy;

/// Build the classification prompt: taxonomy block, transaction context,
/// strict JSON contract with reasoning.
pub fn build_classification_prompt(
    text: &str,
    vendor: Option<&str>,
    note: Option<&str>,
    amount: Option<f64>,
) -> String {
    let mut context = Vec::new();
    if let Some(v) = vendor {
        context.push(format!("Vendor: {}", v));
    }
    if let Some(n) = note {
        context.push(format!("Note: {}", n));
    }
    if let Some(a) = amount {
        context.push(format!("Amount: {}", a));
    }
    let context = if context.is_empty() {
        String::new()
    } else {
        format!("\nTransaction context:\n{}\n", context.join("\n"))
    };

    format!(
        r#"You are an expert expense categorization assistant. Classify the transaction below into exactly one category and subcategory from this taxonomy:

{taxonomy}

Rules:
- The subcategory MUST belong to the chosen category.
- Prefer the vendor name over the free-text description when they disagree.
- Food bought at a grocery store is "Groceries" even when described as a meal.
- If nothing fits, use "Other" > "Miscellaneous".
- Return ONLY a JSON object: {{"category": "...", "subcategory": "...", "confidence": 0.0-1.0, "reasoning": "one short sentence"}}
{context}
Transaction text:
{text}
"#,
        taxonomy = taxonomy::prompt_block(),
        context = context,
        text = text,
    )
}

/// Build the query-filter prompt: map a free-text query onto an optional
/// category/subcategory filter, where null is a legitimate answer.
pub fn build_query_filter_prompt(text: &str) -> String {
    format!(
        r#"You are mapping a spending query onto an optional category filter. The taxonomy:

{taxonomy}

Rules:
- If the query clearly names a subcategory, return its category and subcategory.
- If it only names a category, return the category and null subcategory.
- If it is a general query ("how much did I spend last week"), return null for BOTH. Null is a correct answer, do not force a match.
- Return ONLY a JSON object: {{"category_name": "..." or null, "subcategory_name": "..." or null, "category_confidence": 0.0-1.0, "subcategory_confidence": 0.0-1.0, "reasoning": "one short sentence"}}

Query:
{text}
"#,
        taxonomy = taxonomy::prompt_block(),
        text = text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_prompt_includes_taxonomy_and_context() {
        let prompt =
            build_classification_prompt("coffee run", Some("Starbucks"), None, Some(250.0));
        assert!(prompt.contains("Food & Dining"));
        assert!(prompt.contains("Vendor: Starbucks"));
        assert!(prompt.contains("Amount: 250"));
        assert!(prompt.contains("coffee run"));
    }

    #[test]
    fn query_filter_prompt_allows_null() {
        let prompt = build_query_filter_prompt("total spend last week");
        assert!(prompt.contains("null for BOTH"));
        assert!(prompt.contains("total spend last week"));
    }
}
