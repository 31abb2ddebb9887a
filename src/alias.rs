//! Alias index and fuzzy matcher
//!
//! Pure text-matching utility: maps free-text phrases onto canonical targets
//! through a static alias table. Exact padded-substring matches score 1.0;
//! everything else is scored by sliding token windows against the alias and
//! taking the best matching-blocks similarity ratio. Single-word aliases are
//! additionally gated by a plausibility guard so "business" can never fuzz
//! into "bus".

/// Guard for single-token fuzzy comparisons.
///
/// A candidate token is only compared against a single-word alias when it
/// shares the leading character and its length differs by at most
/// `max_len_delta`. The constants are tuned heuristics, kept configurable.
#[derive(Debug, Clone, Copy)]
pub struct TokenGuard {
    pub max_len_delta: usize,
}

impl Default for TokenGuard {
    fn default() -> Self {
        Self { max_len_delta: 2 }
    }
}

impl TokenGuard {
    pub fn plausible(&self, alias_token: &str, candidate_token: &str) -> bool {
        if alias_token == candidate_token {
            return true;
        }
        if alias_token.is_empty() || candidate_token.is_empty() {
            return false;
        }
        if alias_token.chars().next() != candidate_token.chars().next() {
            return false;
        }
        let delta = alias_token.len().abs_diff(candidate_token.len());
        delta <= self.max_len_delta
    }
}

/// Best alias hit inside one alias group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AliasMatch {
    pub target: &'static str,
    pub alias: &'static str,
    pub score: f64,
}

/// Static alias table: canonical target → alias phrases.
pub type AliasGroups = &'static [(&'static str, &'static [&'static str])];

/// Alias index over one static alias table.
pub struct AliasIndex {
    groups: AliasGroups,
    guard: TokenGuard,
}

impl AliasIndex {
    pub fn new(groups: AliasGroups) -> Self {
        Self {
            groups,
            guard: TokenGuard::default(),
        }
    }

    pub fn with_guard(mut self, guard: TokenGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Best (target, alias, score) across the whole table for already
    /// normalized text.
    ///
    /// Ties break deterministically: the longer alias wins, then the
    /// lexicographically smaller one, so identical input always yields an
    /// identical result.
    pub fn best_match(&self, normalized_text: &str) -> Option<AliasMatch> {
        let mut best: Option<AliasMatch> = None;

        for (target, aliases) in self.groups {
            for alias in *aliases {
                let score = best_match_score(normalized_text, alias, &self.guard);
                match &best {
                    None => {
                        best = Some(AliasMatch { target, alias, score });
                    }
                    Some(current) => {
                        let wins = score > current.score
                            || (score == current.score
                                && (alias.len() > current.alias.len()
                                    || (alias.len() == current.alias.len()
                                        && *alias < current.alias)));
                        if wins {
                            best = Some(AliasMatch { target, alias, score });
                        }
                    }
                }
            }
        }

        best.filter(|m| m.score > 0.0)
    }
}

/// Score one alias against normalized text.
///
/// Exact padded-substring match wins outright. Otherwise token windows of
/// sizes {len-1, len, len+1} (clamped; {1} for single-word aliases) slide
/// across the text and the best similarity ratio is kept.
pub fn best_match_score(normalized_text: &str, alias: &str, guard: &TokenGuard) -> f64 {
    let padded_text = format!(" {} ", normalized_text);
    let padded_alias = format!(" {} ", alias);
    if padded_text.contains(&padded_alias) {
        return 1.0;
    }

    let text_tokens: Vec<&str> = normalized_text.split_whitespace().collect();
    let alias_tokens: Vec<&str> = alias.split_whitespace().collect();
    if text_tokens.is_empty() || alias_tokens.is_empty() {
        return 0.0;
    }

    let alias_len = alias_tokens.len();
    let window_sizes: Vec<usize> = if alias_len == 1 {
        vec![1]
    } else {
        let mut sizes = vec![alias_len - 1, alias_len, alias_len + 1];
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    };

    let mut best = 0.0f64;
    for size in window_sizes {
        if size > text_tokens.len() {
            continue;
        }
        for window in text_tokens.windows(size) {
            if alias_len == 1 && !guard.plausible(alias_tokens[0], window[0]) {
                continue;
            }
            let candidate = window.join(" ");
            best = best.max(similarity_ratio(alias, &candidate));
        }
    }

    best
}

/// Similarity of two strings: twice the matched character count over the
/// combined length. Matched characters come from the longest common block,
/// then recursively from the unmatched pieces on either side of it.
///
/// Prefix-weighted metrics inflate short pairs like "cab"/"cable" past the
/// matching thresholds; this ratio keeps them apart while near-identical
/// tokens ("groceris"/"groceries") still score high.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_common_block(a, b);
    if size == 0 {
        return 0;
    }
    size + matched_chars(&a[..i], &b[..j]) + matched_chars(&a[i + size..], &b[j + size..])
}

/// Longest common contiguous block as (start_a, start_b, len). Ties go to
/// the earliest start in `a`, then in `b`.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut row = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                let size = prev[j] + 1;
                row[j + 1] = size;
                if size > best.2 {
                    best = (i + 1 - size, j + 1 - size, size);
                }
            }
        }
        prev = row;
    }
    best
}

/// Normalize query text for alias matching: lowercase, keep only
/// `[a-z0-9 /&]`, collapse whitespace.
pub fn normalize_query_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let filtered: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '/' || c == '&' {
                c
            } else {
                ' '
            }
        })
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUARD: TokenGuard = TokenGuard { max_len_delta: 2 };

    #[test]
    fn exact_phrase_scores_one() {
        assert_eq!(best_match_score("show grocery expenses", "grocery", &GUARD), 1.0);
        assert_eq!(best_match_score("food delivery this week", "food delivery", &GUARD), 1.0);
    }

    #[test]
    fn guard_blocks_business_vs_bus() {
        // "bus" and "business" share a leading char but differ by 5 chars.
        assert!(!GUARD.plausible("bus", "business"));
        assert_eq!(best_match_score("business lunch", "bus", &GUARD), 0.0);
    }

    #[test]
    fn guard_allows_close_tokens() {
        assert!(GUARD.plausible("grocery", "groceries"));
        assert!(best_match_score("bought groceris", "groceries", &GUARD) > 0.86);
    }

    #[test]
    fn guard_rejects_different_leading_char() {
        assert!(!GUARD.plausible("cab", "tab"));
    }

    #[test]
    fn ratio_counts_matching_blocks_over_combined_length() {
        assert_eq!(similarity_ratio("grocery", "groceries"), 12.0 / 16.0);
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn short_prefix_pairs_stay_below_the_bars() {
        // These pass the guard (same leading char, small delta) but must not
        // score like near-duplicates: "cable" is not a cab, "busy" is not a
        // bus.
        let cab = best_match_score("show my cable bill expenses", "cab", &GUARD);
        assert!(cab < 0.78, "cab scored {}", cab);

        let bus = best_match_score("too busy to check", "bus", &GUARD);
        assert!(bus < 0.86, "bus scored {}", bus);
    }

    #[test]
    fn multi_word_alias_uses_windows() {
        let score = best_match_score("my grocery store run", "grocery stores", &GUARD);
        assert!(score > 0.9, "score was {}", score);
    }

    #[test]
    fn empty_text_scores_zero() {
        assert_eq!(best_match_score("", "food", &GUARD), 0.0);
    }

    #[test]
    fn normalization_keeps_slash_and_ampersand() {
        assert_eq!(normalize_query_text("Cafe/Coffee & tea!!"), "cafe/coffee & tea");
        assert_eq!(normalize_query_text("  Show   me... FOOD "), "show me food");
    }

    static TIE_GROUPS: AliasGroups = &[
        ("Alpha", &["meal"]),
        ("Beta", &["meals"]),
    ];

    #[test]
    fn tie_break_prefers_longer_then_lexicographic() {
        let index = AliasIndex::new(TIE_GROUPS);
        // Both aliases hit exactly (score 1.0), so the longer alias wins.
        let m = index.best_match("meal meals").expect("match");
        assert_eq!(m.target, "Beta");
        assert_eq!(m.alias, "meals");
        assert_eq!(m.score, 1.0);

        // Repeated calls stay identical.
        for _ in 0..10 {
            assert_eq!(index.best_match("meal meals"), Some(m));
        }
    }

    static LEX_GROUPS: AliasGroups = &[
        ("Zulu", &["zeal"]),
        ("Acre", &["arch"]),
    ];

    #[test]
    fn equal_length_tie_breaks_lexicographically() {
        let index = AliasIndex::new(LEX_GROUPS);
        // Both score 1.0 at equal alias length; "arch" < "zeal".
        let m = index.best_match("zeal arch").expect("match");
        assert_eq!(m.target, "Acre");
        assert_eq!(m.alias, "arch");
    }

    #[test]
    fn no_signal_returns_none() {
        let index = AliasIndex::new(TIE_GROUPS);
        assert_eq!(index.best_match("xyzzy"), None);
    }
}
