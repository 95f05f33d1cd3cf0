//! Keyword relevance scoring shared by the stores.
//!
//! A record's score is the fraction of distinct query keywords it contains,
//! plus a small density term (keyword occurrences per 100 characters) that
//! separates records with equal coverage. Records matching no keyword are
//! not returned.

use opentwin_core::MemoryRecord;

/// Words too common to say anything about relevance.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "who", "did", "yes", "she", "him", "let",
    "too", "use", "that", "with", "have", "this", "will", "your", "from", "they", "what", "when",
    "which", "there", "their", "about", "would", "these", "into", "than", "then", "them", "were",
];

/// Lowercased distinct keywords of a query, in first-seen order.
pub fn keywords(query: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in query
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(&w.as_str()))
    {
        if !out.contains(&word) {
            out.push(word);
        }
    }
    out
}

/// Score `content` against pre-computed keywords. Zero means no match.
pub fn score(content: &str, keywords: &[String]) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }

    let lower = content.to_lowercase();
    let mut matched = 0usize;
    let mut occurrences = 0usize;
    for keyword in keywords {
        let count = lower.matches(keyword.as_str()).count();
        if count > 0 {
            matched += 1;
            occurrences += count;
        }
    }

    if matched == 0 {
        return 0.0;
    }

    let coverage = matched as f32 / keywords.len() as f32;
    let density = occurrences as f32 / (lower.chars().count() as f32 / 100.0).max(1.0);
    coverage + density.min(10.0) * 0.01
}

/// Rank `records` for `query`: matching records only, highest score first,
/// at most `k`. The sort is stable so equal scores keep insertion order.
pub fn rank<'a, I>(records: I, query: &str, k: usize) -> Vec<MemoryRecord>
where
    I: IntoIterator<Item = &'a MemoryRecord>,
{
    if k == 0 {
        return Vec::new();
    }

    let keywords = keywords(query);
    let mut results: Vec<MemoryRecord> = records
        .into_iter()
        .filter_map(|record| {
            let s = score(&record.content, &keywords);
            (s > 0.0).then(|| {
                let mut hit = record.clone();
                hit.relevance_score = s;
                hit
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn density_counts_chars_not_bytes() {
        let kw = keywords("inflation");
        let accented = format!("inflation {}", "é".repeat(300));
        let plain = format!("inflation {}", "e".repeat(300));
        assert_eq!(score(&accented, &kw), score(&plain, &kw));
    }

    fn record(id: &str, content: &str) -> MemoryRecord {
        MemoryRecord::new(id, content, "test", BTreeMap::new())
    }

    #[test]
    fn keywords_drop_short_and_stop_words() {
        assert_eq!(
            keywords("What is the outlook for inflation? Inflation!"),
            vec!["outlook", "inflation"]
        );
        assert!(keywords("is it a").is_empty());
    }

    #[test]
    fn full_coverage_beats_partial() {
        let kw = keywords("inflation labor market");
        let full = score("Inflation is easing while the labor market stays tight", &kw);
        let partial = score("Inflation is easing", &kw);
        assert!(full > partial);
        assert!(partial > 0.0);
        assert_eq!(score("Nothing relevant here", &kw), 0.0);
    }

    #[test]
    fn rank_orders_and_truncates() {
        let records = vec![
            record("a", "rates"),
            record("b", "rates and inflation"),
            record("c", "weather"),
            record("d", "inflation"),
        ];
        let ranked = rank(&records, "inflation rates", 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "b");
        assert!(ranked[0].relevance_score >= ranked[1].relevance_score);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let records = vec![record("first", "policy"), record("second", "policy")];
        let ranked = rank(&records, "policy", 5);
        assert_eq!(ranked[0].id, "first");
        assert_eq!(ranked[1].id, "second");
    }

    #[test]
    fn zero_k_returns_nothing() {
        let records = vec![record("a", "policy")];
        assert!(rank(&records, "policy", 0).is_empty());
    }
}
