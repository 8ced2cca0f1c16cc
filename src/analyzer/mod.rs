//! Business website analysis
//!
//! Visits a business homepage plus a couple of its "about"/"contact" style
//! pages and extracts contact emails, technology fingerprints, social profile
//! links and sentences that name an owner or principal.
//!
//! Old sites built from `<frameset>` pages have no body of their own; each
//! frame is fetched and analyzed as part of the homepage.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result, bail};
use regex::Regex;
use scraper::Html;
use tracing::{info, warn};
use url::Url;

use crate::html::{absolute_url, collapse_whitespace, selector, text_lines, title_case};
use crate::models::SiteProfile;
use crate::traits::PageFetcher;

const TECH_SIGNATURES: &[(&str, &[&str])] = &[
    ("WordPress", &["/wp-content/", "/wp-includes/"]),
    ("Shopify", &["cdn.shopify.com", "myshopify.com"]),
    ("Squarespace", &["squarespace.com"]),
    ("Wix", &["wix.com"]),
    ("HubSpot", &["hs-scripts.com", "forms.hsforms.com"]),
    ("Google Analytics", &["google-analytics.com/ga.js", "gtag("]),
];

const SUBPAGE_KEYWORDS: &[&str] = &["about", "contact", "team", "staff", "service"];

const CONTACT_KEYWORDS: &[&str] = &["owner", "founder", "ceo", "manager", "president", "principal"];

const JUNK_KEYWORDS: &[&str] = &["entity", "subsidiary", "third-party", "ownership", "affiliate"];

/// File extensions that show up in `name@2x.png` style asset names
const ASSET_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".css", ".js"];

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("email pattern is valid"));

static SOCIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://(?:www\.)?(?:linkedin\.com/company|facebook\.com|twitter\.com)/[^"'\s<>]+"#)
        .expect("social pattern is valid")
});

/// The parts of one fetched page the analyzer cares about
#[derive(Debug, Default)]
struct PageView {
    frames: Vec<String>,
    text: String,
    links: Vec<String>,
}

/// Source and visible text gathered across every page visited for a site
#[derive(Debug, Default)]
struct Aggregate {
    source: String,
    text: String,
}

impl Aggregate {
    fn push(&mut self, html: &str, text: &str) {
        self.source.push_str(html);
        self.source.push('\n');
        self.text.push_str(text);
        self.text.push('\n');
    }
}

pub struct SiteAnalyzer {
    fetcher: Arc<dyn PageFetcher>,
    max_subpages: usize,
}

impl SiteAnalyzer {
    pub fn new(fetcher: Arc<dyn PageFetcher>, max_subpages: usize) -> Self {
        Self {
            fetcher,
            max_subpages,
        }
    }

    pub async fn analyze(&self, url: &str) -> Result<SiteProfile> {
        info!(" - Navigating to homepage: {}", url);

        let home = self
            .fetcher
            .fetch(url)
            .await
            .with_context(|| format!("Could not navigate to {url}"))?;
        let home_view = view_page(&home.html, &home.url)?;

        let mut aggregate = Aggregate::default();
        let mut links = Vec::new();

        if home_view.frames.is_empty() {
            aggregate.push(&home.html, &home_view.text);
            links = home_view.links;
        } else {
            info!("   - Legacy frameset detected. Analyzing {} frames.", home_view.frames.len());

            for frame_url in &home_view.frames {
                match self.fetcher.fetch(frame_url).await {
                    Ok(frame) => {
                        let frame_view = view_page(&frame.html, &frame.url)?;
                        aggregate.push(&frame.html, &frame_view.text);
                        links.extend(frame_view.links);
                    }
                    Err(e) => warn!("     - Could not analyze frame {}: {}", frame_url, e),
                }
            }
        }

        if aggregate.source.trim().is_empty() {
            bail!("Could not retrieve any content from {url}");
        }

        let subpages = internal_links(&home.url, &links, self.max_subpages);
        info!(" - Found {} key internal pages to analyze.", subpages.len());

        for link in subpages {
            info!(" - Analyzing sub-page: {}", link);
            match self.fetcher.fetch(&link).await {
                Ok(page) => {
                    let view = view_page(&page.html, &page.url)?;
                    aggregate.push(&page.html, &view.text);
                }
                Err(e) => warn!("   - Could not load sub-page {}: {}", link, e),
            }
        }

        Ok(analyze_content(&aggregate.source, &aggregate.text))
    }
}

fn view_page(html: &str, page_url: &str) -> Result<PageView> {
    let frame_selector = selector("frame[src]")?;
    let body_selector = selector("body")?;
    let link_selector = selector("a[href]")?;

    let document = Html::parse_document(html);

    let frames = document
        .select(&frame_selector)
        .filter_map(|frame| frame.value().attr("src"))
        .filter_map(|src| absolute_url(page_url, src))
        .collect();

    let text = document
        .select(&body_selector)
        .next()
        .map(|body| text_lines(body).join("\n"))
        .unwrap_or_default();

    let links = document
        .select(&link_selector)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| absolute_url(page_url, href))
        .collect();

    Ok(PageView {
        frames,
        text,
        links,
    })
}

/// Same-host links that look like about/contact/team pages, sorted, capped.
fn internal_links(base_url: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let Some(base_host) = Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(ToString::to_string))
    else {
        return Vec::new();
    };

    candidates
        .iter()
        .filter(|link| link.as_str() != base_url)
        .filter(|link| {
            Url::parse(link)
                .ok()
                .is_some_and(|url| url.host_str() == Some(base_host.as_str()))
        })
        .filter(|link| {
            let lower = link.to_lowercase();
            SUBPAGE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(limit)
        .collect()
}

/// Runs every extractor over the aggregated page source and visible text.
pub fn analyze_content(source: &str, text: &str) -> SiteProfile {
    SiteProfile {
        emails: extract_emails(source),
        tech_stack: detect_tech(source),
        social_links: extract_social_links(source),
        contacts: extract_contacts(text),
    }
}

fn extract_emails(source: &str) -> Vec<String> {
    EMAIL_PATTERN
        .find_iter(source)
        .map(|m| m.as_str().to_lowercase())
        .filter(|email| !ASSET_EXTENSIONS.iter().any(|ext| email.ends_with(ext)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn detect_tech(source: &str) -> Vec<String> {
    let mut found: Vec<String> = TECH_SIGNATURES
        .iter()
        .filter(|(_, signatures)| signatures.iter().any(|sig| source.contains(sig)))
        .map(|(name, _)| (*name).to_string())
        .collect();
    found.sort();
    found
}

fn extract_social_links(source: &str) -> Vec<String> {
    SOCIAL_PATTERN
        .find_iter(source)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sentences mentioning an owner-like role next to what looks like a name.
fn extract_contacts(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut contacts = Vec::new();

    for sentence in text.split(['\n', '.', '!', '?']) {
        let sentence_lower = sentence.to_lowercase();

        for keyword in CONTACT_KEYWORDS {
            if !sentence_lower.contains(keyword) {
                continue;
            }

            let clean = collapse_whitespace(sentence);
            let length = clean.chars().count();
            if !(5 < length && length < 300) {
                continue;
            }

            let clean_lower = clean.to_lowercase();
            if JUNK_KEYWORDS.iter().any(|junk| clean_lower.contains(junk)) {
                continue;
            }

            let names_someone = clean
                .split_whitespace()
                .any(|word| is_title_word(word) && word.to_lowercase() != *keyword);

            if names_someone {
                let entry = format!("{}: {}", title_case(keyword), clean);
                if seen.insert(entry.clone()) {
                    contacts.push(entry);
                }
            }
        }
    }

    contacts
}

/// "Jane" or "O'Neil" style words: uppercase only after uncased characters,
/// lowercase only after cased ones.
fn is_title_word(word: &str) -> bool {
    let mut has_cased = false;
    let mut previous_cased = false;

    for c in word.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            has_cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            has_cased = true;
        } else {
            previous_cased = false;
        }
    }

    has_cased
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    #[test]
    fn emails_are_lowercased_deduplicated_and_skip_assets() {
        let source = r#"<a href="mailto:INFO@SmithCPA.com">INFO@SmithCPA.com</a>
            <p>info@smithcpa.com or jane.doe@smith-cpa.com</p>
            <img src="/img/logo@2x.png">"#;

        assert_eq!(
            extract_emails(source),
            vec!["info@smithcpa.com", "jane.doe@smith-cpa.com"]
        );
    }

    #[test]
    fn tech_fingerprints_are_sorted() {
        let source = r#"<link href="/wp-content/themes/x.css"><script>gtag('js', new Date());</script>"#;
        assert_eq!(detect_tech(source), vec!["Google Analytics", "WordPress"]);
        assert!(detect_tech("<p>plain</p>").is_empty());
    }

    #[test]
    fn social_links_cover_each_network() {
        let source = r#"
            <a href="https://www.facebook.com/smithcpa">fb</a>
            <a href='https://twitter.com/smithcpa'>tw</a>
            <a href="https://www.linkedin.com/company/smith-cpa/">li</a>
            <a href="https://www.linkedin.com/in/jane-doe">profile</a>
            <a href="https://www.facebook.com/smithcpa">fb again</a>"#;

        assert_eq!(
            extract_social_links(source),
            vec![
                "https://twitter.com/smithcpa",
                "https://www.facebook.com/smithcpa",
                "https://www.linkedin.com/company/smith-cpa/",
            ]
        );
    }

    #[test]
    fn contacts_need_a_name_and_no_junk() {
        let text = "Meet our team\n\
            Jane Doe is the Owner and lead accountant.\n\
            The firm is a subsidiary of Big Owner Holdings.\n\
            manager on duty\n\
            Jane Doe is the Owner and lead accountant!";

        assert_eq!(
            extract_contacts(text),
            vec!["Owner: Jane Doe is the Owner and lead accountant"]
        );
    }

    #[test]
    fn title_words_follow_casing_rules() {
        assert!(is_title_word("Jane"));
        assert!(is_title_word("O'Neil,"));
        assert!(!is_title_word("JANE"));
        assert!(!is_title_word("jane"));
        assert!(!is_title_word("2024"));
    }

    #[test]
    fn internal_links_stay_on_host_and_respect_limit() {
        let links = vec![
            "https://site.test/services".to_string(),
            "https://site.test/about-us".to_string(),
            "https://site.test/about-us".to_string(),
            "https://site.test/blog".to_string(),
            "https://other.test/contact".to_string(),
            "https://site.test/contact".to_string(),
        ];

        assert_eq!(
            internal_links("https://site.test/", &links, 2),
            vec!["https://site.test/about-us", "https://site.test/contact"]
        );
    }

    #[tokio::test]
    async fn frameset_sites_are_analyzed_frame_by_frame() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_page(
                    "https://site.test/",
                    r#"<html><frameset rows="20%,80%">
                        <frame src="top.html"><frame src="main.html">
                    </frameset></html>"#,
                )
                .with_page(
                    "https://site.test/top.html",
                    r#"<html><body><p>Founder Robert Smith opened the office in 1982.</p>
                       <a href="/about.html">About</a><a href="https://elsewhere.test/contact">x</a></body></html>"#,
                )
                .with_page(
                    "https://site.test/about.html",
                    r#"<html><body><p>Write to office@smithcpa.com</p></body></html>"#,
                ),
        );
        let analyzer = SiteAnalyzer::new(fetcher.clone(), 2);

        let profile = analyzer.analyze("https://site.test/").await.unwrap();

        assert_eq!(profile.emails, vec!["office@smithcpa.com"]);
        assert_eq!(
            profile.contacts,
            vec!["Founder: Founder Robert Smith opened the office in 1982"]
        );
        assert_eq!(
            fetcher.requests(),
            vec![
                "https://site.test/",
                "https://site.test/top.html",
                "https://site.test/main.html",
                "https://site.test/about.html",
            ]
        );
    }

    #[tokio::test]
    async fn failed_subpage_is_skipped() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_page(
                    "https://site.test/",
                    r#"<html><body><p>Smith CPA</p>
                       <a href="/about">About</a><a href="/contact">Contact</a></body></html>"#,
                )
                .with_page(
                    "https://site.test/contact",
                    r#"<html><body><p>Call or write hello@smithcpa.com</p></body></html>"#,
                ),
        );
        let analyzer = SiteAnalyzer::new(fetcher.clone(), 2);

        let profile = analyzer.analyze("https://site.test/").await.unwrap();

        assert_eq!(profile.emails, vec!["hello@smithcpa.com"]);
        assert_eq!(
            fetcher.requests(),
            vec![
                "https://site.test/",
                "https://site.test/about",
                "https://site.test/contact",
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_homepage_is_an_error() {
        let analyzer = SiteAnalyzer::new(Arc::new(StaticFetcher::new()), 2);
        assert!(analyzer.analyze("https://down.test/").await.is_err());
    }
}
