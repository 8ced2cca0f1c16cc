//! WebDriver-backed fetcher for sites that only render in a real browser

use anyhow::Result;
use async_trait::async_trait;
use thirtyfour::prelude::*;
use tracing::{debug, info};

use crate::config::Config;
use crate::traits::{Page, PageFetcher};

/// Drives a Chrome session through a running chromedriver.
pub struct BrowserFetcher {
    driver: WebDriver,
}

impl BrowserFetcher {
    pub async fn launch(config: &Config) -> Result<Self> {
        info!("Starting browser session via {}", config.webdriver_url);

        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.set_headless()?;
        }
        caps.add_arg("--disable-gpu")?;
        caps.add_arg("--no-sandbox")?;

        let driver = WebDriver::new(config.webdriver_url.as_str(), caps).await?;
        driver
            .set_page_load_timeout(config.page_load_timeout)
            .await?;

        Ok(Self { driver })
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        debug!("Navigating to {}", url);

        self.driver.goto(url).await?;
        let html = self.driver.source().await?;
        let current_url = self.driver.current_url().await?;

        Ok(Page {
            url: current_url.to_string(),
            html,
        })
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Closing browser session");
        self.driver.clone().quit().await?;
        Ok(())
    }
}
