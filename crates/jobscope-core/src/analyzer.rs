//! Skill keyword presence counting over a posting corpus.
//!
//! Each posting is reduced to a matching-safe form (lower-case, symbols
//! replaced by spaces, whitespace collapsed). A skill matches when its name or
//! any synonym appears there as a whole word or phrase. A posting adds at most
//! one to a skill no matter how many of its terms match.

use std::collections::{BTreeSet, HashSet};

use regex::Regex;

use crate::cleaner::CleanerChain;
use crate::error::AppError;
use crate::models::{PostingText, SkillCategory, SkillCount, SkillKeyword};
use crate::traits::TextCleaner;

/// Key under which category totals are serialized; not usable as a skill name.
pub const CATEGORY_COUNTS_KEY: &str = "category_counts";

#[derive(Debug, Clone)]
struct SkillMatcher {
    name: String,
    category: SkillCategory,
    pattern: Regex,
}

/// Counts skill presence across postings.
///
/// Immutable once built, so one instance can serve concurrent analyses.
#[derive(Debug, Clone)]
pub struct SkillAnalyzer {
    matchers: Vec<SkillMatcher>,
    categories: BTreeSet<SkillCategory>,
    cleaner: CleanerChain,
}

impl SkillAnalyzer {
    /// Compile the keyword configuration.
    ///
    /// Fails on empty or duplicate skill names, on the reserved
    /// `category_counts` name, and on any term that cleans to nothing.
    pub fn new(keywords: &[SkillKeyword]) -> Result<Self, AppError> {
        let cleaner = CleanerChain::matching();
        let mut names = HashSet::new();
        let mut matchers = Vec::with_capacity(keywords.len());

        for keyword in keywords {
            let name = keyword.name.trim();
            if name.is_empty() {
                return Err(AppError::ConfigError("skill name must not be empty".into()));
            }
            if name == CATEGORY_COUNTS_KEY {
                return Err(AppError::ConfigError(format!(
                    "'{CATEGORY_COUNTS_KEY}' is reserved and cannot be a skill name"
                )));
            }
            if !names.insert(name.to_string()) {
                return Err(AppError::ConfigError(format!("duplicate skill '{name}'")));
            }

            let mut terms = BTreeSet::new();
            for term in keyword.terms() {
                let form = matching_form(&cleaner, term);
                if form.is_empty() {
                    return Err(AppError::ConfigError(format!(
                        "skill '{name}' has term '{term}' with no letters or digits"
                    )));
                }
                terms.insert(form);
            }

            matchers.push(SkillMatcher {
                name: name.to_string(),
                category: keyword.category,
                pattern: term_pattern(&terms)?,
            });
        }

        let categories = keywords.iter().map(|k| k.category).collect();

        Ok(Self {
            matchers,
            categories,
            cleaner,
        })
    }

    /// title + company + description in matching-safe form.
    pub fn matching_text<P: PostingText + ?Sized>(&self, posting: &P) -> String {
        let combined = format!(
            "{} {} {}",
            posting.title(),
            posting.company(),
            posting.description()
        );
        matching_form(&self.cleaner, &combined)
    }

    /// Names of the skills present in one posting.
    pub fn matched_skills<P: PostingText + ?Sized>(&self, posting: &P) -> Vec<&str> {
        let text = self.matching_text(posting);
        self.matchers
            .iter()
            .filter(|m| m.pattern.is_match(&text))
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Count skill presence over a corpus.
    ///
    /// Every configured skill and category appears in the result, zero when
    /// nothing matched; no other category is introduced.
    pub fn count_skills<'a, P, I>(&self, corpus: I) -> SkillCount
    where
        P: PostingText + ?Sized + 'a,
        I: IntoIterator<Item = &'a P>,
    {
        let mut result = SkillCount::default();
        for matcher in &self.matchers {
            result.skills.insert(matcher.name.clone(), 0);
        }
        for category in &self.categories {
            result.category_counts.insert(*category, 0);
        }

        let mut postings = 0usize;
        for posting in corpus {
            postings += 1;
            let text = self.matching_text(posting);
            for matcher in self.matchers.iter().filter(|m| m.pattern.is_match(&text)) {
                *result.skills.entry(matcher.name.clone()).or_default() += 1;
                *result.category_counts.entry(matcher.category).or_default() += 1;
            }
        }

        tracing::debug!(postings, skills = self.matchers.len(), "Skill analysis complete");
        result
    }
}

fn matching_form(cleaner: &CleanerChain, text: &str) -> String {
    cleaner
        .clean(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `\b(?:term|term two|...)\b`: boundaries anchor each alternative at both
/// ends; inner spaces of a phrase are literal.
fn term_pattern(terms: &BTreeSet<String>) -> Result<Regex, AppError> {
    let alternatives = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternatives})\b"))
        .map_err(|e| AppError::ConfigError(format!("invalid keyword pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_keywords;
    use crate::models::{NormalizedPosting, RawPosting};

    fn posting(text: &str) -> NormalizedPosting {
        NormalizedPosting {
            title: String::new(),
            company: String::new(),
            description: text.to_string(),
            link: "https://x/1".to_string(),
        }
    }

    fn java_and_javascript() -> SkillAnalyzer {
        SkillAnalyzer::new(&[
            SkillKeyword::new("java", &[], SkillCategory::Technical),
            SkillKeyword::new("javascript", &["js"], SkillCategory::Technical),
        ])
        .unwrap()
    }

    #[test]
    fn test_substring_does_not_match() {
        let analyzer = java_and_javascript();
        let counts = analyzer.count_skills(&[posting("javascript is great")]);

        assert_eq!(counts.skill("java"), 0);
        assert_eq!(counts.skill("javascript"), 1);
    }

    #[test]
    fn test_both_whole_words_match_once() {
        let analyzer = java_and_javascript();
        let counts = analyzer.count_skills(&[posting("java and javascript")]);

        assert_eq!(counts.skill("java"), 1);
        assert_eq!(counts.skill("javascript"), 1);
        assert_eq!(counts.category(SkillCategory::Technical), 2);
    }

    #[test]
    fn test_synonyms_count_once_per_posting() {
        let analyzer = SkillAnalyzer::new(&default_keywords()).unwrap();
        let counts = analyzer.count_skills(&[posting("python3 or py, python python")]);

        assert_eq!(counts.skill("python"), 1);
        assert_eq!(counts.category(SkillCategory::Technical), 1);
    }

    #[test]
    fn test_counts_accumulate_across_postings() {
        let analyzer = SkillAnalyzer::new(&default_keywords()).unwrap();
        let corpus = vec![
            posting("python and docker"),
            posting("Postgres + Node.js"),
            posting("great teamwork and critical thinking"),
        ];
        let counts = analyzer.count_skills(&corpus);

        assert_eq!(counts.skill("python"), 1);
        assert_eq!(counts.skill("docker"), 1);
        assert_eq!(counts.skill("sql"), 1);
        assert_eq!(counts.skill("javascript"), 1);
        assert_eq!(counts.skill("communication"), 1);
        assert_eq!(counts.skill("problem solving"), 1);
        assert_eq!(counts.category(SkillCategory::Technical), 4);
        assert_eq!(counts.category(SkillCategory::Soft), 2);
    }

    #[test]
    fn test_multi_word_phrase_matches_across_extra_whitespace() {
        let analyzer = SkillAnalyzer::new(&default_keywords()).unwrap();
        let counts = analyzer.count_skills(&[posting("Strong PROBLEM\n  solving skills")]);
        assert_eq!(counts.skill("problem solving"), 1);

        let counts = analyzer.count_skills(&[posting("problem-solving")]);
        assert_eq!(counts.skill("problem solving"), 0);
    }

    #[test]
    fn test_accented_synonym_matches() {
        let analyzer = SkillAnalyzer::new(&default_keywords()).unwrap();
        let counts = analyzer.count_skills(&[posting("güçlü iletişim becerileri")]);
        assert_eq!(counts.skill("communication"), 1);
    }

    #[test]
    fn test_dotted_capital_i_matches_lowercase_synonym() {
        let analyzer = SkillAnalyzer::new(&default_keywords()).unwrap();

        let sentence = posting("İletişim becerileri güçlü");
        assert_eq!(
            analyzer.matching_text(&sentence),
            "iletişim becerileri güçlü"
        );
        assert_eq!(analyzer.count_skills(&[sentence]).skill("communication"), 1);

        let shouted = posting("İLETİŞİM");
        assert_eq!(analyzer.matching_text(&shouted), "iletişim");
        assert_eq!(analyzer.count_skills(&[shouted]).skill("communication"), 1);
    }

    #[test]
    fn test_all_fields_are_scanned() {
        let analyzer = SkillAnalyzer::new(&default_keywords()).unwrap();
        let raw = RawPosting {
            title: Some("Docker engineer".into()),
            company: Some("SQL Labs".into()),
            description: None,
            link: None,
        };
        let mut matched = analyzer.matched_skills(&raw);
        matched.sort_unstable();
        assert_eq!(matched, vec!["docker", "sql"]);
    }

    #[test]
    fn test_only_configured_categories_present() {
        let analyzer = SkillAnalyzer::new(&[SkillKeyword::new(
            "rust",
            &["cargo"],
            SkillCategory::Technical,
        )])
        .unwrap();
        let counts = analyzer.count_skills(&Vec::<NormalizedPosting>::new());

        assert_eq!(counts.skills.len(), 1);
        assert_eq!(counts.skill("rust"), 0);
        assert_eq!(counts.category_counts.len(), 1);
        assert!(!counts.category_counts.contains_key(&SkillCategory::Soft));
    }

    #[test]
    fn test_result_independent_of_corpus_order() {
        let analyzer = SkillAnalyzer::new(&default_keywords()).unwrap();
        let mut corpus = vec![
            posting("python sql"),
            posting("js and docker"),
            posting("communication"),
        ];
        let forward = analyzer.count_skills(&corpus);
        corpus.reverse();
        let backward = analyzer.count_skills(&corpus);

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_symbolic_keyword_terms_are_normalized() {
        let analyzer = SkillAnalyzer::new(&[SkillKeyword::new(
            "nodejs",
            &["Node.js"],
            SkillCategory::Technical,
        )])
        .unwrap();
        let counts = analyzer.count_skills(&[posting("backend in node.js")]);
        assert_eq!(counts.skill("nodejs"), 1);
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        let dup = SkillAnalyzer::new(&[
            SkillKeyword::new("sql", &[], SkillCategory::Technical),
            SkillKeyword::new("sql", &["mysql"], SkillCategory::Technical),
        ]);
        assert!(matches!(dup, Err(AppError::ConfigError(_))));

        let reserved = SkillAnalyzer::new(&[SkillKeyword::new(
            CATEGORY_COUNTS_KEY,
            &[],
            SkillCategory::Soft,
        )]);
        assert!(matches!(reserved, Err(AppError::ConfigError(_))));

        let unusable = SkillAnalyzer::new(&[SkillKeyword::new("++", &["#"], SkillCategory::Soft)]);
        assert!(matches!(unusable, Err(AppError::ConfigError(_))));

        let symbol_synonym =
            SkillAnalyzer::new(&[SkillKeyword::new("rust", &["++"], SkillCategory::Technical)]);
        match symbol_synonym {
            Err(AppError::ConfigError(msg)) => assert!(msg.contains("'++'"), "{msg}"),
            other => panic!("expected config error, got {other:?}"),
        }

        let blank_synonym = SkillAnalyzer::new(&[SkillKeyword::new(
            "rust",
            &["cargo", "  "],
            SkillCategory::Technical,
        )]);
        assert!(matches!(blank_synonym, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_analyzer_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SkillAnalyzer>();
    }
}
