use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::analyzer::SiteAnalyzer;
use crate::config::Config;
use crate::database::Database;
use crate::directories::YellowPages;
use crate::models::{Business, FilingStatus, NOT_FOUND, RegistryRecord, SiteProfile};
use crate::registry::Sunbiz;
use crate::scoring::{ScoringWeights, apply_score, prioritize};
use crate::traits::{BusinessDirectory, PageFetcher};

/// Runs the network-bound enrichment stages over a lead table.
///
/// Rows that already carry a stage's output are left alone and successful
/// lookups are cached, unless `fresh` is set.
pub struct LeadPipeline {
    config: Config,
    fetcher: Arc<dyn PageFetcher>,
    database: Database,
    fresh: bool,
}

impl LeadPipeline {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        database: Database,
        fresh: bool,
    ) -> Self {
        Self {
            config,
            fetcher,
            database,
            fresh,
        }
    }

    pub async fn scrape_listings(&self) -> Result<Vec<Business>> {
        let directory = YellowPages::new(self.fetcher.clone(), &self.config);
        let source = directory.config();

        info!(
            "Scraping {} categories from {} ({})",
            source.categories.len(),
            source.name,
            source.base_url
        );

        let mut businesses = Vec::new();

        for category in &source.categories {
            info!("--- Scraping category: {} ---", category);

            match directory.scrape_category(category).await {
                Ok(found) => {
                    businesses.extend(found);
                    info!("Total so far: {}", businesses.len());
                }
                Err(e) => error!("Skipping {}: {:#}", category, e),
            }
        }

        if businesses.is_empty() {
            warn!("Scraping complete. No businesses were found.");
        } else {
            info!("Scraping complete. Found {} businesses", businesses.len());
        }

        Ok(businesses)
    }

    /// Looks every row up in the registry, scores it and orders the call list.
    pub async fn score_businesses(
        &self,
        mut rows: Vec<Business>,
        weights: &ScoringWeights,
    ) -> Result<Vec<Business>> {
        let registry = Sunbiz::new(self.fetcher.clone(), &self.config.registry_search_url);
        let total = rows.len();

        info!("Starting enrichment of {} businesses", total);

        for (index, row) in rows.iter_mut().enumerate() {
            if !self.fresh && row.is_scored() {
                info!("{}/{}: {} already scored, skipping", index + 1, total, row.name);
                continue;
            }

            let owners = if weights.is_chain(&row.name) {
                apply_score(row, weights, None);
                0
            } else {
                let record = self.registry_record(&registry, &row.name).await;
                apply_score(row, weights, Some(&record));
                record.officers.len()
            };

            info!(
                "{}/{}: {:<30} | Status: {:<10} | Owner(s): {}",
                index + 1,
                total,
                row.name.chars().take(30).collect::<String>(),
                row.registry_status
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                owners
            );
        }

        prioritize(&mut rows, self.config.calls_per_day);
        info!("Enrichment complete");

        Ok(rows)
    }

    async fn registry_record(&self, registry: &Sunbiz, name: &str) -> RegistryRecord {
        if !self.fresh {
            match self.database.get_registry_record(name).await {
                Ok(Some(record)) => return record,
                Ok(None) => {}
                Err(e) => warn!("Lookup cache unavailable for {}: {:#}", name, e),
            }
        }

        let record = match registry.lookup(name).await {
            Ok(record) => {
                if let Err(e) = self.database.save_registry_record(name, &record).await {
                    warn!("Could not cache registry result for {}: {:#}", name, e);
                }
                record
            }
            Err(e) => {
                warn!("Registry lookup failed for {}: {:#}", name, e);
                RegistryRecord::new(FilingStatus::Error)
            }
        };

        self.pause().await;
        record
    }

    /// Fills in each row's website from its directory listing.
    pub async fn find_websites(&self, rows: &mut [Business]) -> Result<()> {
        let directory = YellowPages::new(self.fetcher.clone(), &self.config);
        let total = rows.len();

        info!("Starting website lookup for {} businesses", total);

        for (index, row) in rows.iter_mut().enumerate() {
            info!("Processing ({}/{}): {}...", index + 1, total, row.name);

            if !self.fresh {
                if row.website.is_some() {
                    info!(" - Website already looked up, skipping");
                    continue;
                }

                match self.database.get_website(&row.name, &row.locality).await {
                    Ok(Some(cached)) => {
                        row.website = Some(cached.unwrap_or_else(|| NOT_FOUND.to_string()));
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Lookup cache unavailable for {}: {:#}", row.name, e),
                }
            }

            match directory.find_website(row).await {
                Ok(website) => {
                    match &website {
                        Some(url) => info!(" - Found website: {}", url),
                        None => info!(" - Listing has no website"),
                    }
                    if let Err(e) = self
                        .database
                        .save_website(&row.name, &row.locality, website.as_deref())
                        .await
                    {
                        warn!("Could not cache website for {}: {:#}", row.name, e);
                    }
                    row.website = Some(website.unwrap_or_else(|| NOT_FOUND.to_string()));
                }
                Err(e) => {
                    warn!(" - Could not find website for {}: {:#}", row.name, e);
                    row.website = Some(NOT_FOUND.to_string());
                }
            }

            self.pause().await;
        }

        info!("Website lookup complete");
        Ok(())
    }

    /// Analyzes each row's website for contacts, emails and technology.
    pub async fn analyze_websites(&self, rows: &mut [Business]) -> Result<()> {
        let analyzer = SiteAnalyzer::new(self.fetcher.clone(), self.config.max_subpages);
        let total = rows.len();

        for (index, row) in rows.iter_mut().enumerate() {
            info!("Processing ({}/{}): {}", index + 1, total, row.name);

            if !self.fresh && row.is_analyzed() {
                info!(" - Already analyzed, skipping");
                continue;
            }

            let Some(url) = row.fetchable_website().map(ToString::to_string) else {
                info!(" - Skipping due to invalid or missing website URL.");
                SiteProfile::default().apply_to(row);
                continue;
            };

            if !self.fresh {
                match self.database.get_site_profile(&url).await {
                    Ok(Some(profile)) => {
                        profile.apply_to(row);
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Lookup cache unavailable for {}: {:#}", url, e),
                }
            }

            match analyzer.analyze(&url).await {
                Ok(profile) => {
                    if let Err(e) = self.database.save_site_profile(&url, &profile).await {
                        warn!("Could not cache analysis of {}: {:#}", url, e);
                    }
                    profile.apply_to(row);
                }
                Err(e) => {
                    warn!(" - Analysis failed for {}: {:#}", url, e);
                    SiteProfile::default().apply_to(row);
                }
            }

            self.pause().await;
        }

        info!("Website analysis complete");
        Ok(())
    }

    async fn pause(&self) {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }
}
