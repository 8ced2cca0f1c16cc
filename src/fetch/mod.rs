//! Page fetching clients
//!
//! Every stage talks to the web through [`PageFetcher`], so the same lookup
//! code runs over plain HTTP or, with the `browser` feature, a WebDriver
//! session.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::traits::{Page, PageFetcher};

#[cfg(feature = "browser")]
mod browser;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Plain HTTP fetcher backed by a shared `reqwest` client
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.page_load_timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to fetch {}: {}", url, response.status()));
        }

        let final_url = response.url().to_string();
        let html = response.text().await?;

        Ok(Page {
            url: final_url,
            html,
        })
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory fetcher serving canned pages to unit tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;

    use crate::traits::{Page, PageFetcher};

    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        /// URLs requested so far, in order
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Page> {
            self.requests.lock().unwrap().push(url.to_string());

            self.pages
                .get(url)
                .map(|html| Page {
                    url: url.to_string(),
                    html: html.clone(),
                })
                .ok_or_else(|| anyhow!("no canned page for {url}"))
        }
    }
}
