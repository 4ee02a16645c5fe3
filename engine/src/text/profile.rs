//! Text profiler

use super::document::TextDocument;
use super::language::{detect_language, word_regex};
use sdk::TextProfile;
use std::collections::HashMap;

const TOP_TOKENS: usize = 10;

/// Profile a raw document
pub fn profile_text(doc: &TextDocument) -> TextProfile {
    let words: Vec<&str> = word_regex()
        .find_iter(&doc.text)
        .map(|m| m.as_str())
        .collect();

    let avg_word_len = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64
    };

    let language = if words.is_empty() {
        "unknown".to_string()
    } else {
        detect_language(&doc.text)
    };

    TextProfile {
        chars: doc.text.chars().count(),
        words: words.len(),
        avg_word_len,
        language,
        top_tokens: top_tokens(&words),
        boilerplate_ratio: boilerplate_ratio(&doc.lines),
    }
}

/// Most frequent lowercased words; equal counts keep first-seen order
fn top_tokens(words: &[&str]) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for word in words {
        let lower = word.to_lowercase();
        match index.get(&lower) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(lower.clone(), order.len());
                order.push((lower, 1));
            }
        }
    }

    // Stable sort keeps insertion order among ties
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order.truncate(TOP_TOKENS);
    order
}

/// Share of lines that belong to a group of identical lines
fn boilerplate_ratio(lines: &[String]) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for line in lines {
        *counts.entry(line.as_str()).or_insert(0) += 1;
    }

    let repeated: usize = counts.values().filter(|&&c| c > 1).sum();
    repeated as f64 / lines.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_counts() {
        let doc = TextDocument::from_text("The cat and the hat.");
        let profile = profile_text(&doc);

        assert_eq!(profile.chars, 20);
        assert_eq!(profile.words, 5);
        assert!((profile.avg_word_len - 3.0).abs() < 1e-9);
        assert_eq!(profile.language, "en");
        assert_eq!(profile.top_tokens[0], ("the".to_string(), 2));
        assert_eq!(profile.top_tokens[1], ("cat".to_string(), 1));
    }

    #[test]
    fn test_top_tokens_ties_keep_first_occurrence() {
        let tokens = top_tokens(&["b", "a", "c", "a", "b"]);
        assert_eq!(
            tokens,
            vec![("b".to_string(), 2), ("a".to_string(), 2), ("c".to_string(), 1)]
        );
    }

    #[test]
    fn test_boilerplate_ratio() {
        let doc = TextDocument::from_text("header\nbody one\nheader\nbody two");
        let profile = profile_text(&doc);
        assert!((profile.boilerplate_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_document() {
        let profile = profile_text(&TextDocument::from_text(""));
        assert_eq!(profile.words, 0);
        assert_eq!(profile.avg_word_len, 0.0);
        assert_eq!(profile.language, "unknown");
        assert!(profile.top_tokens.is_empty());
        assert_eq!(profile.boilerplate_ratio, 0.0);
    }
}
