use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{StatusCode, Url};
use tracing::{debug, info, warn};

use crate::catalog::{self, PoemLink};
use crate::output::Poem;
use crate::parser::{self, page::Page};
use crate::settings::Settings;

/// Outcome of a single HTTP attempt.
enum Attempt {
    Done(String),
    Retry(String),
    Fail(anyhow::Error),
}

/// HTTP client with retry and exponential backoff.
pub struct Fetcher {
    client: reqwest::Client,
    max_retries: u32,
    base_backoff_ms: u64,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Fetcher {
            client,
            max_retries: settings.max_retries,
            base_backoff_ms: settings.base_backoff_ms,
        })
    }

    /// GET `url` and return the body, retrying rate limits, server errors
    /// and transport failures.
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                Attempt::Done(body) => return Ok(body),
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(reason) if attempt < self.max_retries => {
                    let wait = backoff(self.base_backoff_ms, attempt);
                    warn!(
                        "{} on {} (attempt {}/{}), backing off {:.1}s",
                        reason,
                        url,
                        attempt + 1,
                        self.max_retries,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Attempt::Retry(reason) => {
                    return Err(anyhow!("{} on {} after {} retries", reason, url, self.max_retries));
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) if e.is_builder() => return Attempt::Fail(e.into()),
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let status = response.status();
        if should_retry(status) {
            return Attempt::Retry(format!("HTTP {}", status));
        }
        if !status.is_success() {
            return Attempt::Fail(anyhow!("HTTP {} for {}", status, url));
        }

        match response.text().await {
            Ok(body) => Attempt::Done(body),
            Err(e) => Attempt::Retry(e.to_string()),
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(attempt)))
}

/// Joined content of one paginated poem.
pub struct Paged {
    pub content: String,
    pub total_pages: usize,
}

/// Totals for a range run.
#[derive(Debug, Default)]
pub struct CrawlStats {
    pub collections: usize,
    pub failed_collections: usize,
    pub poems: usize,
    pub failed_poems: usize,
}

pub struct Crawler {
    fetcher: Fetcher,
    settings: Settings,
}

impl Crawler {
    pub fn new(settings: Settings) -> Result<Self> {
        let fetcher = Fetcher::new(&settings)?;
        Ok(Crawler { fetcher, settings })
    }

    /// Follow "next page" links from `start`, extracting every page.
    pub async fn scrape_pages(&self, start: &str) -> Result<Paged> {
        let mut pages: Vec<String> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        // parsed once so visited entries and next links share one spelling
        let mut current = Url::parse(start.trim())
            .with_context(|| format!("Invalid poem URL: {}", start))?;
        let mut total_pages = 0usize;

        loop {
            total_pages += 1;
            visited.insert(current.to_string());
            debug!("  page {}: {}", total_pages, current);

            let html = match self.fetcher.fetch_html(current.as_str()).await {
                Ok(html) => html,
                Err(e) if total_pages > 1 => {
                    warn!("Could not fetch page {} of {}: {}", total_pages, start, e);
                    total_pages -= 1;
                    break;
                }
                Err(e) => return Err(e),
            };

            let (content, next_href) = {
                let page = Page::parse(&html);
                (parser::process_page(&page), page.next_page_href())
            };
            if !content.is_empty() {
                pages.push(content);
            }

            match next_page(&current, next_href.as_deref(), &visited) {
                Some(next) => {
                    current = next;
                    tokio::time::sleep(Duration::from_millis(self.settings.page_delay_ms)).await;
                }
                None => break,
            }
        }

        Ok(Paged {
            content: pages.join("\n"),
            total_pages,
        })
    }

    pub async fn scrape_poem(&self, link: &PoemLink) -> Result<Poem> {
        let paged = self.scrape_pages(&link.url).await?;
        debug!("{}: {} page(s)", link.title, paged.total_pages);
        Ok(Poem {
            title: link.title.clone(),
            url: link.url.clone(),
            collection_id: link.collection_id,
            content: paged.content,
            total_pages: paged.total_pages,
            scraped_at: Utc::now(),
        })
    }

    /// Scrape every poem of one collection. Poems that fail or come back
    /// empty are skipped.
    pub async fn scrape_collection(&self, subcatid: u32) -> Result<(Vec<Poem>, usize)> {
        let links = catalog::fetch_collection(&self.fetcher, &self.settings, subcatid).await?;

        let pb = ProgressBar::new(links.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );

        let mut poems = Vec::new();
        let mut failed = 0usize;
        for (i, link) in links.iter().enumerate() {
            pb.set_message(link.title.clone());
            match self.scrape_poem(link).await {
                Ok(poem) if !poem.content.is_empty() => poems.push(poem),
                Ok(_) => debug!("No poem content at {}", link.url),
                Err(e) => {
                    failed += 1;
                    warn!("Error scraping poem {}: {:#}", link.title, e);
                }
            }
            pb.inc(1);
            if i + 1 < links.len() {
                tokio::time::sleep(Duration::from_millis(self.settings.poem_delay_ms)).await;
            }
        }

        pb.finish_and_clear();
        info!(
            "Scraped {} poems from collection {} ({} errors)",
            poems.len(),
            subcatid,
            failed
        );
        Ok((poems, failed))
    }

    /// Scrape every collection in `from..=to`.
    pub async fn scrape_range(&self, from: u32, to: u32) -> (Vec<Poem>, CrawlStats) {
        let mut all = Vec::new();
        let mut stats = CrawlStats::default();

        for subcatid in from..=to {
            info!("--- Processing collection {} ---", subcatid);
            match self.scrape_collection(subcatid).await {
                Ok((poems, failed)) => {
                    stats.collections += 1;
                    stats.poems += poems.len();
                    stats.failed_poems += failed;
                    all.extend(poems);
                }
                Err(e) => {
                    stats.failed_collections += 1;
                    warn!("Error processing collection {}: {:#}", subcatid, e);
                }
            }
            if subcatid < to {
                tokio::time::sleep(Duration::from_millis(self.settings.collection_delay_ms))
                    .await;
            }
        }

        (all, stats)
    }
}

/// Next page resolved against the page that links to it, unless
/// pagination ends or loops.
fn next_page(current: &Url, href: Option<&str>, visited: &HashSet<String>) -> Option<Url> {
    let next = current.join(href?.trim()).ok()?;
    if next == *current || visited.contains(next.as_str()) {
        return None;
    }
    Some(next)
}
