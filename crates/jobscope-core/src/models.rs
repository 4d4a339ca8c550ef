use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A posting exactly as the listing source delivered it.
///
/// Every field may be missing; the link may be relative to the page it was
/// found on. Field aliases accept the `job_title` / `company_name` /
/// `summary_description` / `ad_link` naming used by older exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPosting {
    #[serde(default, alias = "job_title")]
    pub title: Option<String>,
    #[serde(default, alias = "company_name")]
    pub company: Option<String>,
    #[serde(default, alias = "summary_description")]
    pub description: Option<String>,
    #[serde(default, alias = "ad_link")]
    pub link: Option<String>,
}

impl RawPosting {
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        description: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            company: Some(company.into()),
            description: Some(description.into()),
            link: Some(link.into()),
        }
    }
}

/// A cleaned posting whose `link` is absolute and canonical.
///
/// Only the [`Normalizer`](crate::normalizer::Normalizer) creates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPosting {
    pub title: String,
    pub company: String,
    pub description: String,
    pub link: String,
}

/// A posting read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredPosting {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub description: String,
    pub link: String,
    pub scraped_at: DateTime<Utc>,
}

impl StoredPosting {
    /// Wrap a normalized posting with a fresh id and the current timestamp.
    pub fn from_normalized(posting: NormalizedPosting) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: posting.title,
            company: posting.company,
            description: posting.description,
            link: posting.link,
            scraped_at: Utc::now(),
        }
    }
}

/// Read access to the text fields the skill analyzer scans.
///
/// Implemented for raw, normalized and stored postings so analysis stays
/// decoupled from where the corpus comes from.
pub trait PostingText {
    fn title(&self) -> &str;
    fn company(&self) -> &str;
    fn description(&self) -> &str;
}

impl PostingText for RawPosting {
    fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    fn company(&self) -> &str {
        self.company.as_deref().unwrap_or_default()
    }

    fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

impl PostingText for NormalizedPosting {
    fn title(&self) -> &str {
        &self.title
    }

    fn company(&self) -> &str {
        &self.company
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl PostingText for StoredPosting {
    fn title(&self) -> &str {
        &self.title
    }

    fn company(&self) -> &str {
        &self.company
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// One page of listing results.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// URL the page was fetched from; base for relative posting links.
    pub url: String,
    pub postings: Vec<RawPosting>,
    /// Reference to the following page, possibly relative. `None` ends the crawl.
    pub next_page: Option<String>,
}

/// Skill category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Technical,
    Soft,
}

impl SkillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Technical => "technical",
            SkillCategory::Soft => "soft",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SkillCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "technical" => Ok(SkillCategory::Technical),
            "soft" => Ok(SkillCategory::Soft),
            _ => Err(format!("Unknown skill category: {}", s)),
        }
    }
}

/// A named skill, its synonym variants and its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillKeyword {
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub category: SkillCategory,
}

impl SkillKeyword {
    pub fn new(name: impl Into<String>, synonyms: &[&str], category: SkillCategory) -> Self {
        Self {
            name: name.into(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            category,
        }
    }

    /// The name followed by every synonym.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}

/// Result of one analysis run.
///
/// Serializes flat, e.g. `{"python": 1, "sql": 1, "category_counts": {"technical": 2}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    #[serde(flatten)]
    pub skills: BTreeMap<String, u64>,
    pub category_counts: BTreeMap<SkillCategory, u64>,
}

impl SkillCount {
    /// Count for a skill, zero if it was not configured.
    pub fn skill(&self, name: &str) -> u64 {
        self.skills.get(name).copied().unwrap_or(0)
    }

    pub fn category(&self, category: SkillCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Skills ordered by descending count, ties broken by name.
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<_> = self.skills.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}
