//! Language detection by function-word scoring

use regex::Regex;
use std::sync::OnceLock;

/// Characters of input considered
const DETECT_WINDOW: usize = 10_000;

const PROFILES: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "and", "of", "to", "is", "in", "that", "it", "was", "for", "with", "are",
            "this", "be", "on", "not", "have",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "de", "que", "y", "en", "los", "las", "del", "por", "con", "una", "para",
            "es", "se", "no", "su",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "de", "des", "et", "est", "une", "un", "du", "que", "pour", "dans",
            "pas", "qui", "sur", "au",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "zu", "den", "mit", "sich",
            "des", "von", "auf", "dem", "auch",
        ],
    ),
    (
        "it",
        &[
            "il", "di", "che", "e", "la", "per", "un", "una", "non", "sono", "del", "della", "con",
            "gli", "le", "nel", "anche",
        ],
    ),
    (
        "pt",
        &[
            "o", "a", "de", "que", "e", "do", "da", "em", "um", "uma", "para", "com", "não", "os",
            "as", "dos", "se",
        ],
    ),
    (
        "nl",
        &[
            "de", "het", "een", "en", "van", "is", "dat", "niet", "op", "te", "zijn", "met",
            "voor", "die", "er", "ook", "maar",
        ],
    ),
];

pub(crate) fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").expect("Invalid word pattern"))
}

/// ISO-639-1 code of the best scoring language, or "unknown"
pub fn detect_language(text: &str) -> String {
    let window: String = text.chars().take(DETECT_WINDOW).collect();
    let words: Vec<String> = word_regex()
        .find_iter(&window)
        .map(|m| m.as_str().to_lowercase())
        .collect();

    let mut best: Option<(&str, usize)> = None;
    for (code, function_words) in PROFILES {
        let score = words
            .iter()
            .filter(|w| function_words.contains(&w.as_str()))
            .count();
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((code, score));
        }
    }

    best.map_or_else(|| "unknown".to_string(), |(code, _)| code.to_string())
}
