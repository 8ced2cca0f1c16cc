//! Lead scoring and call-list prioritization

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{Business, FilingStatus, RegistryRecord};

/// Workflow status given to every row of a fresh call list
pub const NEW_LEAD: &str = "New";

/// Weights used to rank leads. Loadable from JSON; omitted keys keep the
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub category_scores: HashMap<String, i64>,
    pub default_category_score: i64,
    /// Matched against whole words of the business name, ignoring dots
    pub name_keywords: HashMap<String, i64>,
    /// Matched against the address; entries with punctuation or a leading
    /// space match as substrings, the rest as whole words
    pub address_keywords: HashMap<String, i64>,
    pub national_chains: Vec<String>,
    pub owner_found_score: i64,
    pub inactive_penalty: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        let category_scores = [
            ("Accountants", 30),
            ("Financial Advisors", 30),
            ("Bookkeeping Services", 25),
            ("Tax Return Preparation", 25),
            ("Lawyers", 20),
            ("Plumbers", 10),
            ("Electricians", 10),
            ("Contractors", 10),
            ("Landscaping", 10),
            ("Restaurants", -20),
            ("Pizza", -25),
            ("Hair Salons", -10),
            ("Nail Salons", -10),
        ];
        let name_keywords = [
            ("inc", 15),
            ("llc", 15),
            ("p.a.", 15),
            ("pa", 15),
            ("group", 15),
            ("associates", 15),
            ("company", 10),
            ("corp", 15),
        ];
        let address_keywords = [("suite", 10), ("ste", 10), ("floor", 10), ("#", 5), (" bldg", 10)];
        let national_chains = [
            "h&r block",
            "jackson hewitt",
            "edward jones",
            "morgan stanley",
            "wells fargo",
            "raymond james",
            "ameriprise",
            "regions financial",
            "rbc wealth",
            "subway",
            "mcdonald's",
            "starbucks",
        ];

        Self {
            category_scores: to_weights(&category_scores),
            default_category_score: 0,
            name_keywords: to_weights(&name_keywords),
            address_keywords: to_weights(&address_keywords),
            national_chains: national_chains.iter().map(|c| (*c).to_string()).collect(),
            owner_found_score: 40,
            inactive_penalty: -1000,
        }
    }
}

fn to_weights(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
    pairs
        .iter()
        .map(|(key, weight)| ((*key).to_string(), *weight))
        .collect()
}

impl ScoringWeights {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Could not read weights file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid weights file {}", path.display()))
    }

    pub fn is_chain(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.national_chains
            .iter()
            .any(|chain| name.contains(&chain.to_lowercase()))
    }

    /// Score from the row alone, before any registry lookup
    pub fn base_score(&self, business: &Business) -> i64 {
        let category = self
            .category_scores
            .get(business.category.trim())
            .copied()
            .unwrap_or(self.default_category_score);

        category
            + keyword_score(&business.name, &self.name_keywords)
            + keyword_score(&business.address, &self.address_keywords)
    }
}

/// Sums the weights of matching keywords. Keywords that are words once dots
/// are dropped (`p.a.`) match whole words of the text compared the same way;
/// anything else matches as a substring. Keywords that collapse to the same
/// word count once, at their highest weight.
fn keyword_score(text: &str, keywords: &HashMap<String, i64>) -> i64 {
    let lower = text.to_lowercase();
    let words: HashSet<String> = lower
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(normalize_word)
        .filter(|word| !word.is_empty())
        .collect();

    let mut matched: HashMap<String, i64> = HashMap::new();

    for (keyword, weight) in keywords {
        let keyword = keyword.to_lowercase();
        let word = keyword.replace('.', "");

        let key = if is_word(&word) {
            words.contains(&word).then_some(word)
        } else {
            lower.contains(&keyword).then_some(keyword)
        };

        if let Some(key) = key {
            matched
                .entry(key)
                .and_modify(|best| *best = (*best).max(*weight))
                .or_insert(*weight);
        }
    }

    matched.values().sum()
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .replace('.', "")
}

fn is_word(keyword: &str) -> bool {
    !keyword.is_empty() && keyword.chars().all(char::is_alphanumeric)
}

/// Scores a row and records the registry outcome on it.
///
/// `record` is `None` for national chains, which are never looked up.
pub fn apply_score(
    business: &mut Business,
    weights: &ScoringWeights,
    record: Option<&RegistryRecord>,
) {
    let mut score = weights.base_score(business);

    match record {
        None => {
            score += weights.inactive_penalty;
            business.is_chain = Some(true);
            business.registry_status = Some(FilingStatus::Chain);
            business.owner_name = None;
        }
        Some(record) => {
            if !record.officers.is_empty() {
                score += weights.owner_found_score;
            }
            if record.status == FilingStatus::Inactive {
                score += weights.inactive_penalty;
            }
            business.is_chain = Some(false);
            business.registry_status = Some(record.status.clone());
            business.owner_name =
                Some(record.officers.join(", ")).filter(|names| !names.is_empty());
        }
    }

    business.score = Some(score);
}

/// Orders rows best-first and splits them into daily call batches.
pub fn prioritize(rows: &mut [Business], calls_per_day: usize) {
    let calls_per_day = calls_per_day.max(1);

    rows.sort_by_key(|row| std::cmp::Reverse(row.score.unwrap_or(i64::MIN)));

    for (index, row) in rows.iter_mut().enumerate() {
        row.call_day = u32::try_from(index / calls_per_day + 1).ok();
        row.status = Some(NEW_LEAD.to_string());
        row.notes = None;
    }
}
