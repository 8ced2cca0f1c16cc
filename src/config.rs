//! Environment-driven configuration
//!
//! Values come from `.env`, when present, and the process environment.
//! Every setting has a default so a bare checkout can run each stage.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

const DEFAULT_CATEGORIES: &[&str] = &[
    "Accountants",
    "Financial Advisors",
    "Bookkeeping Services",
    "Tax Return Preparation",
    "Lawyers",
    "Insurance",
    "Real Estate Agents",
    "Mortgage Brokers",
    "Marketing Agencies",
    "IT Services",
    "Web Designers",
    "Graphic Designers",
    "Printing Services",
    "Architects",
    "Engineers",
    "Contractors",
    "Electricians",
    "Plumbers",
    "HVAC",
    "Roofing Contractors",
    "Landscaping",
    "Cleaning Services",
    "Security Services",
    "Business Consultants",
    "Photographers",
];

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the business directory site
    pub directory_base_url: String,
    /// Geographic search term sent along with each category
    pub location: String,
    pub categories: Vec<String>,
    pub pages_per_category: u32,
    /// Listings whose phone lacks this text are dropped
    pub area_code_filter: String,
    /// Registry name search with a `{query}` placeholder
    pub registry_search_url: String,
    pub calls_per_day: usize,
    pub request_delay: Duration,
    pub page_delay: Duration,
    pub page_load_timeout: Duration,
    pub max_subpages: usize,
    pub database_url: String,
    pub webdriver_url: String,
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory_base_url: "https://www.yellowpages.com".to_string(),
            location: "Pinellas County, FL".to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| (*c).to_string()).collect(),
            pages_per_category: 10,
            area_code_filter: "(727)".to_string(),
            registry_search_url: "https://search.sunbiz.org/Inquiry/CorporationRegistration/SearchResults?inquiryType=EntityName&searchNameOrder=&searchTerm={query}".to_string(),
            calls_per_day: 50,
            request_delay: Duration::from_millis(1000),
            page_delay: Duration::from_millis(3000),
            page_load_timeout: Duration::from_secs(15),
            max_subpages: 2,
            database_url: "sqlite:data/lead_cache.db".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let categories = match env::var("CATEGORIES") {
            Ok(raw) => parse_list(&raw),
            Err(_) => defaults.categories,
        };

        let calls_per_day: usize = env_or("CALLS_PER_DAY", defaults.calls_per_day)?;
        if calls_per_day == 0 {
            return Err(anyhow!("CALLS_PER_DAY must be at least 1"));
        }

        Ok(Self {
            directory_base_url: env_or("DIRECTORY_BASE_URL", defaults.directory_base_url)?
                .trim_end_matches('/')
                .to_string(),
            location: env_or("DIRECTORY_LOCATION", defaults.location)?,
            categories,
            pages_per_category: env_or("PAGES_PER_CATEGORY", defaults.pages_per_category)?,
            area_code_filter: env_or("AREA_CODE_FILTER", defaults.area_code_filter)?,
            registry_search_url: env_or("REGISTRY_SEARCH_URL", defaults.registry_search_url)?,
            calls_per_day,
            request_delay: Duration::from_millis(env_or("REQUEST_DELAY_MS", 1000)?),
            page_delay: Duration::from_millis(env_or("PAGE_DELAY_MS", 3000)?),
            page_load_timeout: Duration::from_secs(env_or("PAGE_LOAD_TIMEOUT_SECS", 15)?),
            max_subpages: env_or("MAX_SUBPAGES", defaults.max_subpages)?,
            database_url: env_or("DATABASE_URL", defaults.database_url)?,
            webdriver_url: env_or("WEBDRIVER_URL", defaults.webdriver_url)?,
            headless: env_or("HEADLESS", defaults.headless)?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_list_ignores_blank_entries() {
        assert_eq!(
            parse_list(" Lawyers, ,Plumbers ,"),
            vec!["Lawyers".to_string(), "Plumbers".to_string()]
        );
    }

    #[test]
    fn registry_url_has_query_placeholder() {
        assert!(Config::default().registry_search_url.contains("{query}"));
    }

    #[test]
    fn invalid_number_names_the_variable() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { env::set_var("PAGES_PER_CATEGORY", "ten") };
        let result = Config::from_env();
        unsafe { env::remove_var("PAGES_PER_CATEGORY") };

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("PAGES_PER_CATEGORY"), "{message}");
        assert!(message.contains("\"ten\""), "{message}");
    }

    #[test]
    fn invalid_bool_names_the_variable() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { env::set_var("LEAD_FINDER_TEST_BAD_BOOL", "maybe") };
        let result: Result<bool> = env_or("LEAD_FINDER_TEST_BAD_BOOL", true);
        unsafe { env::remove_var("LEAD_FINDER_TEST_BAD_BOOL") };

        assert!(result.unwrap_err().to_string().contains("LEAD_FINDER_TEST_BAD_BOOL"));
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        let value: u32 = env_or("LEAD_FINDER_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}
