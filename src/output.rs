use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::parser::stanza::collapse_stanza_markers;

/// One scraped poem, all pages joined.
#[derive(Debug, Clone)]
pub struct Poem {
    pub title: String,
    pub url: String,
    pub collection_id: u32,
    /// Tagged lines of every page joined with `\n`, markers not yet collapsed.
    pub content: String,
    pub total_pages: usize,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct PoemRecord<'a> {
    title: &'a str,
    url: &'a str,
    collection_id: u32,
    content: String,
    total_pages: usize,
    scraped_at: DateTime<Utc>,
}

impl<'a> From<&'a Poem> for PoemRecord<'a> {
    fn from(p: &'a Poem) -> Self {
        PoemRecord {
            title: &p.title,
            url: &p.url,
            collection_id: p.collection_id,
            content: collapse_stanza_markers(&p.content),
            total_pages: p.total_pages,
            scraped_at: p.scraped_at,
        }
    }
}

pub fn render_json(poems: &[Poem]) -> Result<String> {
    let records: Vec<PoemRecord<'_>> = poems.iter().map(PoemRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn render_text(poems: &[Poem]) -> String {
    let mut out = String::new();
    for poem in poems {
        out.push_str(&format!("Title: {}\n", poem.title));
        out.push_str(&format!("Collection ID: {}\n", poem.collection_id));
        out.push_str(&format!("URL: {}\n", poem.url));
        out.push_str(&"-".repeat(50));
        out.push('\n');
        out.push_str(&collapse_stanza_markers(&poem.content));
        out.push('\n');
        out.push_str(&"=".repeat(80));
        out.push_str("\n\n");
    }
    out
}

fn write_file(path: &Path, body: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write `<stem>.json` and `<stem>.txt` under `dir`.
pub fn save_poems(poems: &[Poem], dir: &Path, stem: &str) -> Result<(PathBuf, PathBuf)> {
    let json_path = dir.join(format!("{}.json", stem));
    let text_path = dir.join(format!("{}.txt", stem));

    write_file(&json_path, &render_json(poems)?)?;
    write_file(&text_path, &render_text(poems))?;

    info!(
        "Saved {} poems to {} and {}",
        poems.len(),
        json_path.display(),
        text_path.display()
    );
    Ok((json_path, text_path))
}
