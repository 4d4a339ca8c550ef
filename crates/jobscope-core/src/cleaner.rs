//! Text cleaning stages and the ordered chain that composes them.
//!
//! Every stage is a standalone [`TextCleaner`]: total on any input and
//! idempotent on its own output. A [`CleanerChain`] runs stages in the order
//! given by configuration, feeding each stage the previous stage's output.
//!
//! ```
//! use jobscope_core::cleaner::CleanerChain;
//! use jobscope_core::traits::TextCleaner;
//!
//! let chain = CleanerChain::storage_default();
//! assert_eq!(chain.clean("<b>Rust</b> and Go 🚀"), "Rust Go");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::traits::TextCleaner;

/// Stopwords dropped by the default storage chain.
pub const DEFAULT_STOPWORDS: &[&str] = &["and", "or", "the", "a", "to", "for", "with"];

static MARKUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("markup pattern is valid"));

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || c == '-'
}

fn is_basic_punctuation(c: char) -> bool {
    matches!(c, ',' | '.' | '!' | '?')
}

/// Removes the shortest `<...>` spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupStrip;

impl TextCleaner for MarkupStrip {
    fn clean(&self, text: &str) -> String {
        MARKUP_REGEX.replace_all(text, "").trim().to_string()
    }
}

/// Deletes everything but letters, digits, whitespace, `-` and `,.!?`.
///
/// Whitespace between words is kept, so deletion never glues two words.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmojiStrip;

impl TextCleaner for EmojiStrip {
    fn clean(&self, text: &str) -> String {
        text.chars()
            .filter(|&c| is_word_char(c) || is_basic_punctuation(c))
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// Replaces everything but letters, digits, whitespace and `-` with a space.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolStrip;

impl TextCleaner for SymbolStrip {
    fn clean(&self, text: &str) -> String {
        text.chars()
            .map(|c| if is_word_char(c) { c } else { ' ' })
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// Drops whitespace-separated tokens found in a stopword set (case-insensitive).
#[derive(Debug, Clone)]
pub struct StopwordStrip {
    stopwords: HashSet<String>,
}

impl StopwordStrip {
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(&token.to_lowercase())
    }
}

impl Default for StopwordStrip {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS)
    }
}

impl TextCleaner for StopwordStrip {
    fn clean(&self, text: &str) -> String {
        text.split_whitespace()
            .filter(|token| !self.is_stopword(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Trims leading and trailing whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trim;

impl TextCleaner for Trim {
    fn clean(&self, text: &str) -> String {
        text.trim().to_string()
    }
}

/// Combining dot above, left behind when `İ` lower-cases to `i`.
const COMBINING_DOT_ABOVE: char = '\u{0307}';

/// Lower-cases text. Analyzer pre-processing only; storage keeps casing.
///
/// The dotted capital `İ` becomes a plain `i`, so `İLETİŞİM` and `iletişim`
/// read the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lowercase;

impl TextCleaner for Lowercase {
    fn clean(&self, text: &str) -> String {
        let lower = text.trim().to_lowercase();
        if !lower.contains(COMBINING_DOT_ABOVE) {
            return lower;
        }

        let mut out = String::with_capacity(lower.len());
        let mut prev = None;
        for c in lower.chars() {
            if !(c == COMBINING_DOT_ABOVE && prev == Some('i')) {
                out.push(c);
            }
            prev = Some(c);
        }
        out
    }
}

/// Configurable name of a cleaning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Markup,
    Emoji,
    Symbol,
    Stopword,
    Trim,
    Lowercase,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Markup => "markup",
            StageKind::Emoji => "emoji",
            StageKind::Symbol => "symbol",
            StageKind::Stopword => "stopword",
            StageKind::Trim => "trim",
            StageKind::Lowercase => "lowercase",
        }
    }

    /// Default storage order: markup, emoji, stopword.
    pub fn storage_default() -> Vec<StageKind> {
        vec![StageKind::Markup, StageKind::Emoji, StageKind::Stopword]
    }

    /// Parse a comma-separated list such as `"markup,emoji,stopword"`.
    pub fn parse_list(list: &str) -> Result<Vec<StageKind>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(StageKind::from_str)
            .collect()
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markup" | "html" => Ok(StageKind::Markup),
            "emoji" => Ok(StageKind::Emoji),
            "symbol" => Ok(StageKind::Symbol),
            "stopword" | "stopwords" => Ok(StageKind::Stopword),
            "trim" => Ok(StageKind::Trim),
            "lowercase" => Ok(StageKind::Lowercase),
            _ => Err(format!("Unknown cleaning stage: {}", s)),
        }
    }
}

/// A concrete stage held by a chain.
#[derive(Debug, Clone)]
pub enum Stage {
    Markup(MarkupStrip),
    Emoji(EmojiStrip),
    Symbol(SymbolStrip),
    Stopword(StopwordStrip),
    Trim(Trim),
    Lowercase(Lowercase),
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Markup(_) => StageKind::Markup,
            Stage::Emoji(_) => StageKind::Emoji,
            Stage::Symbol(_) => StageKind::Symbol,
            Stage::Stopword(_) => StageKind::Stopword,
            Stage::Trim(_) => StageKind::Trim,
            Stage::Lowercase(_) => StageKind::Lowercase,
        }
    }
}

impl TextCleaner for Stage {
    fn clean(&self, text: &str) -> String {
        match self {
            Stage::Markup(s) => s.clean(text),
            Stage::Emoji(s) => s.clean(text),
            Stage::Symbol(s) => s.clean(text),
            Stage::Stopword(s) => s.clean(text),
            Stage::Trim(s) => s.clean(text),
            Stage::Lowercase(s) => s.clean(text),
        }
    }
}

/// Ordered composition of cleaning stages.
#[derive(Debug, Clone)]
pub struct CleanerChain {
    stages: Vec<Stage>,
}

impl CleanerChain {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Build a chain from stage names; `stopwords` feeds any stopword stage.
    pub fn from_kinds<S: AsRef<str>>(kinds: &[StageKind], stopwords: &[S]) -> Self {
        let stages = kinds
            .iter()
            .map(|kind| match kind {
                StageKind::Markup => Stage::Markup(MarkupStrip),
                StageKind::Emoji => Stage::Emoji(EmojiStrip),
                StageKind::Symbol => Stage::Symbol(SymbolStrip),
                StageKind::Stopword => Stage::Stopword(StopwordStrip::new(stopwords)),
                StageKind::Trim => Stage::Trim(Trim),
                StageKind::Lowercase => Stage::Lowercase(Lowercase),
            })
            .collect();
        Self { stages }
    }

    /// markup → emoji → stopword with [`DEFAULT_STOPWORDS`].
    pub fn storage_default() -> Self {
        Self::from_kinds(&StageKind::storage_default(), DEFAULT_STOPWORDS)
    }

    /// lowercase → symbol: the analyzer's matching-safe form.
    pub fn matching() -> Self {
        Self::new(vec![Stage::Lowercase(Lowercase), Stage::Symbol(SymbolStrip)])
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for CleanerChain {
    fn default() -> Self {
        Self::storage_default()
    }
}

impl TextCleaner for CleanerChain {
    fn clean(&self, text: &str) -> String {
        let mut current = text.trim().to_string();
        for stage in &self.stages {
            current = stage.clean(&current);
        }
        current
    }
}
