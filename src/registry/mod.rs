//! Florida Division of Corporations (Sunbiz) lookups
//!
//! A lookup runs a name search, opens the first matching filing and reads its
//! status and the officer/director names. Inactive filings are recognised from
//! the results table so the detail page is only opened for live businesses.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use scraper::{ElementRef, Html};
use tracing::debug;

use crate::html::{absolute_url, element_text, selector, text_lines, title_case};
use crate::models::{FilingStatus, RegistryRecord};
use crate::traits::PageFetcher;

const OFFICER_SECTION_HEADING: &str = "Officer/Director Detail";

pub struct Sunbiz {
    fetcher: Arc<dyn PageFetcher>,
    search_url_pattern: String,
}

/// What the name-search results page says
#[derive(Debug, PartialEq, Eq)]
enum SearchOutcome {
    Inactive,
    NoResults,
    Detail(String),
}

impl Sunbiz {
    pub fn new(fetcher: Arc<dyn PageFetcher>, search_url_pattern: &str) -> Self {
        Self {
            fetcher,
            search_url_pattern: search_url_pattern.to_string(),
        }
    }

    fn build_search_url(&self, business_name: &str) -> String {
        self.search_url_pattern
            .replace("{query}", &urlencoding::encode(business_name.trim()))
    }

    pub async fn lookup(&self, business_name: &str) -> Result<RegistryRecord> {
        let search_url = self.build_search_url(business_name);
        let results = self
            .fetcher
            .fetch(&search_url)
            .await
            .context("registry search failed")?;

        let detail_url = match parse_search_results(&results.html, &results.url)? {
            SearchOutcome::Inactive => return Ok(RegistryRecord::new(FilingStatus::Inactive)),
            SearchOutcome::NoResults => return Ok(RegistryRecord::new(FilingStatus::NoResults)),
            SearchOutcome::Detail(url) => url,
        };

        debug!("Opening filing {} for {}", detail_url, business_name);
        let detail = self
            .fetcher
            .fetch(&detail_url)
            .await
            .context("registry detail page failed")?;

        parse_detail_page(&detail.html)
    }
}

fn parse_search_results(html: &str, page_url: &str) -> Result<SearchOutcome> {
    let status_cell = selector("#search-results tbody tr:first-child td:nth-child(3)")?;
    let detail_link = selector("td > a")?;

    let document = Html::parse_document(html);

    if let Some(cell) = document.select(&status_cell).next()
        && element_text(cell).to_uppercase().contains("INACT")
    {
        return Ok(SearchOutcome::Inactive);
    }

    Ok(document
        .select(&detail_link)
        .find_map(|link| link.value().attr("href"))
        .and_then(|href| absolute_url(page_url, href))
        .map_or(SearchOutcome::NoResults, SearchOutcome::Detail))
}

fn parse_detail_page(html: &str) -> Result<RegistryRecord> {
    let corporation_name = selector("div.corporationName")?;
    let label = selector("label")?;
    let detail_section = selector("div.detailSection")?;

    let document = Html::parse_document(html);

    if document.select(&corporation_name).next().is_none() {
        bail!("filing detail page has no corporation name");
    }

    let status = document
        .select(&label)
        .filter(|label| element_text(*label).contains("Status"))
        .find_map(following_span)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .map_or(FilingStatus::Unknown, |text| FilingStatus::parse(&text));

    let officers = document
        .select(&detail_section)
        .find(|section| element_text(*section).contains(OFFICER_SECTION_HEADING))
        .map(|section| officers_from_lines(&text_lines(section)))
        .unwrap_or_default();

    Ok(RegistryRecord { status, officers })
}

fn following_span(label: ElementRef<'_>) -> Option<ElementRef<'_>> {
    label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "span")
}

/// Officer names follow "Title ..." lines, written as "LAST, FIRST".
fn officers_from_lines(lines: &[String]) -> Vec<String> {
    lines
        .windows(2)
        .filter(|pair| pair[0].starts_with("Title"))
        .map(|pair| pair[1].as_str())
        .filter(|candidate| is_upper(candidate) && candidate.contains(','))
        .map(title_case)
        .collect()
}

/// True when the text has cased letters and none of them are lowercase.
fn is_upper(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}
