//! Text operation library
//!
//! Ops act on a [`TextState`]: the current text plus an optional token
//! sequence. Token handling is declared per op through [`TokenUsage`] and
//! enforced by [`TextHandler`], so the token sequence is always derived from
//! the most recently written text.

use super::lemmatizer::lemmatize;
use super::stopwords::stopwords_for;
use crate::executor::{Execution, Operation, PlanExecutor, StepHandler};
use regex::Regex;
use sdk::{ExecutionLogEntry, OpSpec, Plan, StepError};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TextOp {
    RemoveBoilerplate,
    Lowercase,
    RemovePunctuation,
    RemoveStopwords {
        #[serde(default = "default_language")]
        language: String,
    },
    NormalizeWhitespace,
    Tokenize,
    Lemmatize,
}

fn default_language() -> String {
    "en".to_string()
}

impl Operation for TextOp {
    const VOCABULARY: &'static [&'static str] = &[
        "remove_boilerplate",
        "lowercase",
        "remove_punctuation",
        "remove_stopwords",
        "normalize_whitespace",
        "tokenize",
        "lemmatize",
    ];
}

/// How an op interacts with the token sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    /// Reads stored tokens when present
    pub consumes: bool,
    /// Leaves a fresh token sequence behind
    pub produces: bool,
    /// Rewrites the text without producing tokens
    pub invalidates: bool,
}

impl TextOp {
    pub fn name(&self) -> &'static str {
        match self {
            TextOp::RemoveBoilerplate => "remove_boilerplate",
            TextOp::Lowercase => "lowercase",
            TextOp::RemovePunctuation => "remove_punctuation",
            TextOp::RemoveStopwords { .. } => "remove_stopwords",
            TextOp::NormalizeWhitespace => "normalize_whitespace",
            TextOp::Tokenize => "tokenize",
            TextOp::Lemmatize => "lemmatize",
        }
    }

    pub fn token_usage(&self) -> TokenUsage {
        match self {
            TextOp::RemoveStopwords { .. } | TextOp::Lemmatize => TokenUsage {
                consumes: true,
                produces: true,
                invalidates: false,
            },
            TextOp::Tokenize => TokenUsage {
                consumes: false,
                produces: true,
                invalidates: false,
            },
            _ => TokenUsage {
                consumes: false,
                produces: false,
                invalidates: true,
            },
        }
    }
}

/// Text plus the token sequence threaded between steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextState {
    pub text: String,
    pub tokens: Option<Vec<String>>,
}

impl TextState {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens: None,
        }
    }

    /// Stored tokens, or a whitespace split of the current text
    fn take_tokens(&mut self) -> Vec<String> {
        match self.tokens.take() {
            Some(tokens) => tokens,
            None => whitespace_tokens(&self.text),
        }
    }
}

fn whitespace_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Keep only lines whose exact text occurs once
pub fn remove_boilerplate(text: &str) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for line in text.lines() {
        *counts.entry(line).or_insert(0) += 1;
    }

    text.lines()
        .filter(|line| counts.get(line) == Some(&1))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn remove_punctuation(text: &str) -> String {
    static PUNCT: OnceLock<Regex> = OnceLock::new();
    PUNCT
        .get_or_init(|| Regex::new(r"[^\w\s]").expect("Invalid punctuation pattern"))
        .replace_all(text, " ")
        .into_owned()
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Step handler for the text vocabulary
#[derive(Debug, Default)]
pub struct TextHandler;

impl StepHandler for TextHandler {
    type State = TextState;
    type Op = TextOp;

    fn apply(
        &mut self,
        state: &mut TextState,
        op: TextOp,
        _spec: &OpSpec,
    ) -> Result<Vec<ExecutionLogEntry>, StepError> {
        let usage = op.token_usage();
        let name = op.name();

        match op {
            TextOp::RemoveBoilerplate => state.text = remove_boilerplate(&state.text),
            TextOp::Lowercase => state.text = state.text.to_lowercase(),
            TextOp::RemovePunctuation => state.text = remove_punctuation(&state.text),
            TextOp::NormalizeWhitespace => state.text = normalize_whitespace(&state.text),
            TextOp::RemoveStopwords { language } => {
                let stopwords = stopwords_for(&language)?;
                let tokens: Vec<String> = state
                    .take_tokens()
                    .into_iter()
                    .filter(|t| !stopwords.contains(t.to_lowercase().as_str()))
                    .collect();
                state.text = tokens.join(" ");
                state.tokens = Some(tokens);
            }
            TextOp::Tokenize => state.tokens = Some(whitespace_tokens(&state.text)),
            TextOp::Lemmatize => {
                let tokens: Vec<String> = state
                    .take_tokens()
                    .iter()
                    .map(|t| lemmatize(t))
                    .collect();
                state.text = tokens.join(" ");
                state.tokens = Some(tokens);
            }
        }

        if usage.invalidates {
            state.tokens = None;
        }

        let mut entry = ExecutionLogEntry::ok(name);
        if let Some(tokens) = state.tokens.as_ref().filter(|_| usage.produces) {
            entry = entry.with("tokens", tokens.len());
        }
        Ok(vec![entry])
    }
}

/// Apply a text plan to raw text
pub fn apply_text_plan(text: &str, plan: &Plan) -> Execution<TextState> {
    PlanExecutor::new(TextHandler).run(plan, TextState::new(text))
}
