//! SQLite lookup cache
//!
//! Registry lookups, website lookups and site analyses are slow, so their
//! successful results are kept between runs. A re-run after an interruption
//! picks up where the previous one stopped.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
#[cfg(test)]
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::info;

use crate::models::{FilingStatus, RegistryRecord, SiteProfile};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        if let Some(path) = db_url
            .strip_prefix("sqlite:")
            .map(|p| p.trim_start_matches("//"))
            .filter(|p| !p.starts_with(':'))
            && let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        // Create database file if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database file");
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePool::connect(db_url).await?;
        Self::migrate(pool).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        // A single connection, since every in-memory connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn get_registry_record(
        &self,
        business_name: &str,
    ) -> Result<Option<RegistryRecord>> {
        let row = sqlx::query("SELECT status, officers FROM registry_lookups WHERE id = ?")
            .bind(registry_key(business_name))
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<RegistryRecord> {
            let status: String = row.get("status");
            let officers: String = row.get("officers");
            Ok(RegistryRecord {
                status: FilingStatus::parse(&status),
                officers: serde_json::from_str(&officers)?,
            })
        })
        .transpose()
    }

    pub async fn save_registry_record(
        &self,
        business_name: &str,
        record: &RegistryRecord,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO registry_lookups (id, business_name, status, officers, looked_up_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(registry_key(business_name))
        .bind(business_name)
        .bind(record.status.to_string())
        .bind(serde_json::to_string(&record.officers)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// `Some(None)` means the listing was checked and has no website.
    pub async fn get_website(
        &self,
        business_name: &str,
        locality: &str,
    ) -> Result<Option<Option<String>>> {
        let row = sqlx::query("SELECT website FROM website_lookups WHERE id = ?")
            .bind(website_key(business_name, locality))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<Option<String>, _>("website")))
    }

    pub async fn save_website(
        &self,
        business_name: &str,
        locality: &str,
        website: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO website_lookups (id, business_name, locality, website, looked_up_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(website_key(business_name, locality))
        .bind(business_name)
        .bind(locality)
        .bind(website)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_site_profile(&self, url: &str) -> Result<Option<SiteProfile>> {
        let row = sqlx::query("SELECT profile FROM site_profiles WHERE id = ?")
            .bind(url_key(url))
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<SiteProfile> {
            Ok(serde_json::from_str(&row.get::<String, _>("profile"))?)
        })
        .transpose()
    }

    pub async fn save_site_profile(&self, url: &str, profile: &SiteProfile) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO site_profiles (id, url, profile, analyzed_at)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(url_key(url))
        .bind(url)
        .bind(serde_json::to_string(profile)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn registry_key(business_name: &str) -> String {
    let normalized = business_name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    format!("{:x}", md5::compute(normalized))
}

fn website_key(business_name: &str, locality: &str) -> String {
    let normalized = format!("{}|{}", business_name.trim(), locality.trim()).to_lowercase();
    format!("{:x}", md5::compute(normalized))
}

fn url_key(url: &str) -> String {
    format!("{:x}", md5::compute(url.trim()))
}
