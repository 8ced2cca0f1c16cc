//! Data models for lead rows, registry lookups and website profiles

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marks a field that was looked up but had nothing to report.
pub const NOT_FOUND: &str = "N/A";

/// One row of the lead table passed between pipeline stages.
///
/// Columns a stage has not filled in yet are `None` and serialize as empty
/// cells, so every stage reads and writes the same header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Business {
    pub call_day: Option<u32>,
    pub score: Option<i64>,
    pub registry_status: Option<FilingStatus>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub name: String,
    pub owner_name: Option<String>,
    pub phone: String,
    pub category: String,
    pub address: String,
    pub locality: String,
    pub is_chain: Option<bool>,
    pub listing_url: Option<String>,
    pub website: Option<String>,
    pub emails: Option<String>,
    pub tech_stack: Option<String>,
    pub social_links: Option<String>,
    pub contacts: Option<String>,
}

impl Business {
    /// The website URL, if one was found and it looks fetchable.
    pub fn fetchable_website(&self) -> Option<&str> {
        self.website
            .as_deref()
            .map(str::trim)
            .filter(|url| url.starts_with("http"))
    }

    /// Scored with a registry outcome worth keeping. Failed lookups are retried.
    pub fn is_scored(&self) -> bool {
        self.score.is_some()
            && self
                .registry_status
                .as_ref()
                .is_some_and(|status| *status != FilingStatus::Error)
    }

    pub fn is_analyzed(&self) -> bool {
        self.emails.is_some()
    }
}

/// Filing status reported by the corporation registry, plus the outcomes of
/// lookups that never reached a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilingStatus {
    Active,
    Inactive,
    /// Any other status text the registry shows (e.g. "DISSOLVED")
    Other(String),
    NoResults,
    Chain,
    Unknown,
    Error,
}

impl FilingStatus {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let upper = text.to_uppercase();

        match upper.as_str() {
            "ACTIVE" => Self::Active,
            "NO RESULTS FOUND" => Self::NoResults,
            "N/A (CHAIN)" => Self::Chain,
            "UNKNOWN" => Self::Unknown,
            "SCRAPE ERROR" => Self::Error,
            "" => Self::Unknown,
            _ if upper.starts_with("INACT") => Self::Inactive,
            _ => Self::Other(text.to_string()),
        }
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("ACTIVE"),
            Self::Inactive => f.write_str("INACTIVE"),
            Self::Other(text) => f.write_str(text),
            Self::NoResults => f.write_str("No Results Found"),
            Self::Chain => f.write_str("N/A (Chain)"),
            Self::Unknown => f.write_str("Unknown"),
            Self::Error => f.write_str("Scrape Error"),
        }
    }
}

impl From<String> for FilingStatus {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<FilingStatus> for String {
    fn from(status: FilingStatus) -> Self {
        status.to_string()
    }
}

/// Result of looking a business up in the corporation registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub status: FilingStatus,
    pub officers: Vec<String>,
}

impl RegistryRecord {
    pub fn new(status: FilingStatus) -> Self {
        Self {
            status,
            officers: Vec::new(),
        }
    }
}

/// Everything the website analyzer extracts from a business website
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub emails: Vec<String>,
    pub tech_stack: Vec<String>,
    pub social_links: Vec<String>,
    pub contacts: Vec<String>,
}

impl SiteProfile {
    /// Writes the profile into the row's analysis columns.
    pub fn apply_to(&self, business: &mut Business) {
        business.emails = Some(join_or_not_found(&self.emails, ", "));
        business.tech_stack = Some(join_or_not_found(&self.tech_stack, ", "));
        business.social_links = Some(join_or_not_found(&self.social_links, ", "));
        business.contacts = Some(join_or_not_found(&self.contacts, " | "));
    }
}

fn join_or_not_found(values: &[String], separator: &str) -> String {
    if values.is_empty() {
        NOT_FOUND.to_string()
    } else {
        values.join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filing_status_parses_registry_text() {
        assert_eq!(FilingStatus::parse("ACTIVE"), FilingStatus::Active);
        assert_eq!(FilingStatus::parse(" Active "), FilingStatus::Active);
        assert_eq!(FilingStatus::parse("INACT"), FilingStatus::Inactive);
        assert_eq!(FilingStatus::parse("INACT/UA"), FilingStatus::Inactive);
        assert_eq!(FilingStatus::parse("No Results Found"), FilingStatus::NoResults);
        assert_eq!(FilingStatus::parse("Scrape Error"), FilingStatus::Error);
        assert_eq!(
            FilingStatus::parse("DISSOLVED"),
            FilingStatus::Other("DISSOLVED".to_string())
        );
    }

    #[test]
    fn filing_status_display_matches_parse() {
        for status in [
            FilingStatus::Active,
            FilingStatus::Inactive,
            FilingStatus::NoResults,
            FilingStatus::Chain,
            FilingStatus::Unknown,
            FilingStatus::Error,
        ] {
            assert_eq!(FilingStatus::parse(&status.to_string()), status);
        }
    }

    #[test]
    fn empty_profile_marks_every_column_not_found() {
        let mut business = Business::default();
        SiteProfile::default().apply_to(&mut business);

        assert_eq!(business.emails.as_deref(), Some(NOT_FOUND));
        assert_eq!(business.contacts.as_deref(), Some(NOT_FOUND));
        assert!(business.is_analyzed());
    }

    #[test]
    fn profile_contacts_use_pipe_separator() {
        let profile = SiteProfile {
            emails: vec!["a@x.com".into(), "b@x.com".into()],
            contacts: vec!["Owner: Jane Doe".into(), "Founder: Bob Roe".into()],
            ..SiteProfile::default()
        };
        let mut business = Business::default();
        profile.apply_to(&mut business);

        assert_eq!(business.emails.as_deref(), Some("a@x.com, b@x.com"));
        assert_eq!(
            business.contacts.as_deref(),
            Some("Owner: Jane Doe | Founder: Bob Roe")
        );
    }

    #[test]
    fn scrape_errors_do_not_count_as_scored() {
        let mut business = Business {
            score: Some(30),
            registry_status: Some(FilingStatus::Error),
            ..Business::default()
        };
        assert!(!business.is_scored());

        business.registry_status = Some(FilingStatus::NoResults);
        assert!(business.is_scored());

        business.score = None;
        assert!(!business.is_scored());
    }

    #[test]
    fn fetchable_website_requires_http_scheme() {
        let mut business = Business {
            website: Some(NOT_FOUND.to_string()),
            ..Business::default()
        };
        assert_eq!(business.fetchable_website(), None);

        business.website = Some(" https://example.com ".to_string());
        assert_eq!(business.fetchable_website(), Some("https://example.com"));
    }
}
