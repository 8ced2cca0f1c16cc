//! Yellow Pages directory scraper

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::Html;
use tracing::{info, warn};

use crate::config::Config;
use crate::html::{absolute_url, first_attr, first_text, selector};
use crate::models::Business;
use crate::traits::{BusinessDirectory, DirectoryConfig, DirectorySelectors, PageFetcher};

/// Listings extracted from one results page
#[derive(Debug, Default)]
struct ResultsPage {
    /// Listing cards on the page, before any filtering
    cards: usize,
    listings: Vec<Business>,
    next_page_url: Option<String>,
}

/// Scraper implementation for yellowpages.com
pub struct YellowPages {
    fetcher: Arc<dyn PageFetcher>,
    config: DirectoryConfig,
    page_delay: Duration,
}

impl YellowPages {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &Config) -> Self {
        let base_url = config.directory_base_url.clone();

        let directory = DirectoryConfig {
            name: "Yellow Pages".to_string(),
            search_url_pattern: format!(
                "{base_url}/search?search_terms={{query}}&geo_location_terms={{location}}"
            ),
            base_url,
            location: config.location.clone(),
            selectors: DirectorySelectors {
                listing_container: "div.v-card".to_string(),
                name: "a.business-name".to_string(),
                phone: "div.phones.phone.primary".to_string(),
                street: "div.street-address".to_string(),
                locality: "div.locality".to_string(),
                categories: "div.categories a".to_string(),
                pagination_next: "a.next.ajax-page".to_string(),
                search_result_link: "div.result a.business-name".to_string(),
                website_link: "a.track-visit-website".to_string(),
            },
            categories: config.categories.clone(),
            max_pages: config.pages_per_category,
            area_code_filter: config.area_code_filter.clone(),
        };

        Self {
            fetcher,
            config: directory,
            page_delay: config.page_delay,
        }
    }

    fn parse_results_page(
        &self,
        html: &str,
        page_url: &str,
        category: &str,
    ) -> Result<ResultsPage> {
        let selectors = &self.config.selectors;
        let card_selector = selector(&selectors.listing_container)?;
        let name_selector = selector(&selectors.name)?;
        let phone_selector = selector(&selectors.phone)?;
        let street_selector = selector(&selectors.street)?;
        let locality_selector = selector(&selectors.locality)?;
        let category_selector = selector(&selectors.categories)?;

        let document = Html::parse_document(html);
        let mut page = ResultsPage {
            next_page_url: self.extract_next_page_url(&document, page_url),
            ..ResultsPage::default()
        };

        for card in document.select(&card_selector) {
            page.cards += 1;

            // Cards missing a name or phone are ads or placeholders
            let Some(name) = first_text(card, &name_selector) else {
                continue;
            };
            let Some(phone) = first_text(card, &phone_selector) else {
                continue;
            };

            if !phone.contains(&self.config.area_code_filter) {
                continue;
            }

            let street = first_text(card, &street_selector);
            let locality = first_text(card, &locality_selector).unwrap_or_default();
            let address = match street {
                Some(street) if !locality.is_empty() => format!("{street}, {locality}"),
                Some(street) => street,
                None => locality.clone(),
            };

            let category = first_text(card, &category_selector)
                .unwrap_or_else(|| category.to_string());

            let listing_url = first_attr(card, &name_selector, "href")
                .and_then(|href| absolute_url(page_url, &href));

            page.listings.push(Business {
                name,
                phone,
                category,
                address,
                locality,
                listing_url,
                ..Business::default()
            });
        }

        Ok(page)
    }

    fn first_search_result(&self, html: &str, page_url: &str) -> Result<Option<String>> {
        let link_selector = selector(&self.config.selectors.search_result_link)?;
        let document = Html::parse_document(html);

        Ok(document
            .select(&link_selector)
            .find_map(|link| link.value().attr("href"))
            .and_then(|href| absolute_url(page_url, href)))
    }

    fn website_from_detail(&self, html: &str, page_url: &str) -> Result<Option<String>> {
        let website_selector = selector(&self.config.selectors.website_link)?;
        let document = Html::parse_document(html);

        Ok(document
            .select(&website_selector)
            .find_map(|link| link.value().attr("href"))
            .and_then(|href| absolute_url(page_url, href)))
    }
}

#[async_trait]
impl BusinessDirectory for YellowPages {
    fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    async fn scrape_category(&self, category: &str) -> Result<Vec<Business>> {
        let mut current_url = self.build_search_url(category, &self.config.location);
        let mut listings = Vec::new();

        for page_num in 1..=self.config.max_pages {
            info!(
                "Fetching page {}/{} for {} on {}",
                page_num, self.config.max_pages, category, self.config.name
            );

            let page = match self.fetcher.fetch(&current_url).await {
                Ok(page) => page,
                Err(e) if page_num == 1 => {
                    return Err(e.context(format!("Could not load results for {category}")));
                }
                Err(e) => {
                    warn!("Could not load page {} for {}: {}", page_num, category, e);
                    break;
                }
            };

            let results = self.parse_results_page(&page.html, &page.url, category)?;

            if results.cards == 0 {
                info!("No listings on page {} for {}, moving on", page_num, category);
                break;
            }

            info!(
                "Kept {} of {} listings on page {} for {}",
                results.listings.len(),
                results.cards,
                page_num,
                category
            );
            listings.extend(results.listings);

            match results.next_page_url {
                Some(next_url) if next_url != current_url && page_num < self.config.max_pages => {
                    current_url = next_url;
                    tokio::time::sleep(self.page_delay).await;
                }
                Some(_) if page_num < self.config.max_pages => {
                    info!("Next page URL repeats the current one, stopping {}", category);
                    break;
                }
                Some(_) => {}
                None => {
                    info!("End of results for {} after {} pages", category, page_num);
                    break;
                }
            }
        }

        Ok(listings)
    }

    async fn find_website(&self, business: &Business) -> Result<Option<String>> {
        let detail_url = if let Some(url) = &business.listing_url {
            url.clone()
        } else {
            let search_url = self.build_search_url(&business.name, &business.locality);
            let page = self.fetcher.fetch(&search_url).await?;

            match self.first_search_result(&page.html, &page.url)? {
                Some(url) => url,
                None => return Ok(None),
            }
        };

        let page = self
            .fetcher
            .fetch(&detail_url)
            .await
            .with_context(|| format!("Could not open listing {detail_url}"))?;

        self.website_from_detail(&page.html, &page.url)
    }

    fn extract_next_page_url(&self, document: &Html, page_url: &str) -> Option<String> {
        let next_selector = selector(&self.config.selectors.pagination_next).ok()?;
        let href = document
            .select(&next_selector)
            .find_map(|link| link.value().attr("href"))?;

        absolute_url(page_url, href)
    }
}
