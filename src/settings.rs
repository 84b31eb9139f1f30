use anyhow::{Context, Result};
use serde::Deserialize;

const ENV_PREFIX: &str = "KOBITA";

/// Run settings. Every field can be overridden with `KOBITA_<FIELD>`,
/// e.g. `KOBITA_PAGE_DELAY_MS=1000`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub page_delay_ms: u64,
    pub poem_delay_ms: u64,
    pub collection_delay_ms: u64,
    /// `catId` of the poetry catalog on the archive.
    pub catalog_id: u32,
    pub output_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://rabindra-rachanabali.nltr.org".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
            base_backoff_ms: 2000,
            page_delay_ms: 500,
            poem_delay_ms: 1000,
            collection_delay_ms: 2000,
            catalog_id: 7,
            output_dir: "output".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read KOBITA_* environment")?
            .try_deserialize()
            .context("Invalid KOBITA_* settings")
    }

    pub fn collection_url(&self, subcatid: u32) -> String {
        format!(
            "{}/node/4?subcatid={}&catId={}",
            self.base_url.trim_end_matches('/'),
            subcatid,
            self.catalog_id
        )
    }
}
