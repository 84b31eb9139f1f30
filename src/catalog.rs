use std::sync::LazyLock;

use anyhow::{Context, Result};
use reqwest::Url;
use scraper::{ElementRef, Selector};
use tracing::info;

use crate::crawler::Fetcher;
use crate::parser::page::{text_content, Page};
use crate::settings::Settings;

static LIST_TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.list").unwrap());
static CONTENT_ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[class*="content"] a[href]"#).unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const POEM_PATH_MARKER: &str = "/node/";

/// A poem listed in a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoemLink {
    pub title: String,
    pub url: String,
    pub collection_id: u32,
}

/// Fetch one collection listing and return its poem links.
pub async fn fetch_collection(
    fetcher: &Fetcher,
    settings: &Settings,
    subcatid: u32,
) -> Result<Vec<PoemLink>> {
    let url = settings.collection_url(subcatid);
    let base = Url::parse(&settings.base_url).context("Invalid base_url")?;

    info!("Fetching collection {}: {}", subcatid, url);
    let html = fetcher
        .fetch_html(&url)
        .await
        .with_context(|| format!("Failed to fetch collection {}", subcatid))?;

    let links = parse_poem_links(&Page::parse(&html), &base, subcatid);
    info!("Found {} poems in collection {}", links.len(), subcatid);
    Ok(links)
}

/// Anchors of the `table.list` listing, or of any content div when the
/// table is missing. Only `/node/` links with a visible title are kept.
pub fn parse_poem_links(page: &Page, base: &Url, collection_id: u32) -> Vec<PoemLink> {
    let anchors: Vec<ElementRef<'_>> = match page.html().select(&LIST_TABLE_SEL).next() {
        Some(table) => table.select(&ANCHOR_SEL).collect(),
        None => page.html().select(&CONTENT_ANCHOR_SEL).collect(),
    };

    anchors
        .into_iter()
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let title = text_content(a).trim().to_string();
            if title.is_empty() || !href.contains(POEM_PATH_MARKER) {
                return None;
            }
            Some(PoemLink {
                title,
                url: resolve_url(base, href)?,
                collection_id,
            })
        })
        .collect()
}

/// Absolute form of `href` relative to `base`.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://rabindra-rachanabali.nltr.org").unwrap()
    }

    #[test]
    fn links_from_list_table() {
        let page = Page::parse(
            r#"<div class="content">
                 <a href="/node/99">বাইরের লিংক</a>
                 <table class="list">
                   <tr><td><a href="/node/101"> সোনার তরী </a></td></tr>
                   <tr><td><a href="/node/102"><span>নিরুদ্দেশ যাত্রা</span></a></td></tr>
                   <tr><td><a href="/about">পরিচিতি</a></td></tr>
                   <tr><td><a href="/node/103"></a></td></tr>
                 </table>
               </div>"#,
        );
        let links = parse_poem_links(&page, &base(), 3);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "সোনার তরী");
        assert_eq!(links[0].url, "https://rabindra-rachanabali.nltr.org/node/101");
        assert_eq!(links[0].collection_id, 3);
        assert_eq!(links[1].title, "নিরুদ্দেশ যাত্রা");
    }

    #[test]
    fn falls_back_to_content_div() {
        let page = Page::parse(
            r#"<div class="main-content"><a href="/node/7">মানসী</a></div>
               <div class="sidebar"><a href="/node/8">অন্য</a></div>"#,
        );
        let links = parse_poem_links(&page, &base(), 1);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://rabindra-rachanabali.nltr.org/node/7");
    }

    #[test]
    fn listing_order_is_kept() {
        let page = Page::parse(
            r#"<table class="list"><tr><td><a href="/node/3">গ</a></td><td><a href="/node/1">ক</a></td><td><a href="/node/2">খ</a></td></tr></table>"#,
        );
        let titles: Vec<String> = parse_poem_links(&page, &base(), 1)
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(titles, vec!["গ", "ক", "খ"]);
    }

    #[test]
    fn resolves_absolute_and_relative() {
        assert_eq!(
            resolve_url(&base(), "https://other.org/node/1").as_deref(),
            Some("https://other.org/node/1")
        );
        assert_eq!(
            resolve_url(&base(), "/node/5?page=1").as_deref(),
            Some("https://rabindra-rachanabali.nltr.org/node/5?page=1")
        );
    }
}
