//! Traits and interfaces for site-agnostic fetching and directory scraping

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Business;

/// A fetched page: the URL it ended up at after redirects, and its HTML.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub html: String,
}

/// Anything that can turn a URL into page source
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page>;

    /// Releases the underlying session, if any.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Configuration for a business directory scraper
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Display name for the directory
    pub name: String,
    /// Base URL for the directory
    pub base_url: String,
    /// Search URL pattern with {query} and {location} placeholders
    pub search_url_pattern: String,
    /// Geographic search term
    pub location: String,
    /// CSS selectors for extracting data
    pub selectors: DirectorySelectors,
    /// Categories to search for
    pub categories: Vec<String>,
    /// Pages followed per category
    pub max_pages: u32,
    /// Phone numbers must contain this to be kept
    pub area_code_filter: String,
}

/// CSS selectors for the parts of a directory listing
#[derive(Debug, Clone)]
pub struct DirectorySelectors {
    /// Container selector for individual listings
    pub listing_container: String,
    /// Business name link within a listing
    pub name: String,
    pub phone: String,
    pub street: String,
    pub locality: String,
    /// Category tags within a listing
    pub categories: String,
    /// Next page link
    pub pagination_next: String,
    /// First listing link on a targeted search results page
    pub search_result_link: String,
    /// Website link on a listing detail page
    pub website_link: String,
}

/// Trait for directory-specific scrapers
#[async_trait]
pub trait BusinessDirectory: Send + Sync {
    /// Get the configuration for this directory
    fn config(&self) -> &DirectoryConfig;

    /// Collect every listing for one category, following pagination
    async fn scrape_category(&self, category: &str) -> Result<Vec<Business>>;

    /// Find the website a listing links to
    ///
    /// # Returns
    /// * `Result<Option<String>>` - The website URL, `None` when the listing has none
    async fn find_website(&self, business: &Business) -> Result<Option<String>>;

    /// Extract the next page URL from a results page
    ///
    /// # Arguments
    /// * `document` - The parsed HTML document
    /// * `page_url` - URL the document was fetched from
    fn extract_next_page_url(&self, document: &scraper::Html, page_url: &str) -> Option<String>;

    /// Build the search URL for a term in the configured location
    fn build_search_url(&self, term: &str, location: &str) -> String {
        self.config()
            .search_url_pattern
            .replace("{query}", &urlencoding::encode(term))
            .replace("{location}", &urlencoding::encode(location))
    }
}
