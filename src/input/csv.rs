//! CSV readers: analytics exports, redirect maps, plain URL lists.
//!
//! Column detection is deliberately sloppy about naming: exports from
//! different tools label the same columns differently, so headers are
//! matched case-insensitively against known variants.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Old-URL string to new-URL string, compared pre-normalization.
pub type RedirectMap = HashMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEntry {
    pub url: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

impl AnalyticsEntry {
    /// Ranking weight for traffic-based URL prioritization.
    pub fn traffic_weight(&self) -> u64 {
        self.clicks + self.impressions
    }
}

const URL_COLUMNS: &[&str] = &["url", "page"];
const CLICKS_COLUMNS: &[&str] = &["clicks"];
const IMPRESSIONS_COLUMNS: &[&str] = &["impressions"];
const CTR_COLUMNS: &[&str] = &["ctr"];
const POSITION_COLUMNS: &[&str] = &["position", "avg. position"];

const REDIRECT_SOURCE_COLUMNS: &[&str] = &["oldurl", "old url", "old_url", "from"];
const REDIRECT_TARGET_COLUMNS: &[&str] = &["newurl", "new url", "new_url", "to"];

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| candidates.contains(&header.trim().to_lowercase().as_str()))
}

/// Parse a numeric cell, tolerating `%` suffixes and thousands separators.
/// Missing or malformed values default to zero.
fn parse_number(record: &csv::StringRecord, index: Option<usize>) -> f64 {
    index
        .and_then(|i| record.get(i))
        .map(|raw| raw.trim().trim_end_matches('%').replace(',', ""))
        .and_then(|cleaned| cleaned.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Read a search-analytics export. Duplicate URLs keep the first row.
pub fn read_analytics(path: &Path) -> Result<Vec<AnalyticsEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open analytics CSV {}", path.display()))?;
    let headers = reader
        .headers()
        .context("Failed to read analytics CSV headers")?
        .clone();

    let url_col = find_column(&headers, URL_COLUMNS).ok_or_else(|| {
        AppError::input_format(format!(
            "Analytics CSV has no URL column (looked for {:?})",
            URL_COLUMNS
        ))
    })?;
    let clicks_col = find_column(&headers, CLICKS_COLUMNS);
    let impressions_col = find_column(&headers, IMPRESSIONS_COLUMNS);
    let ctr_col = find_column(&headers, CTR_COLUMNS);
    let position_col = find_column(&headers, POSITION_COLUMNS);

    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!("[CSV] Skipping malformed analytics row: {}", e);
                continue;
            }
        };

        let Some(url) = record.get(url_col).map(str::trim).filter(|u| !u.is_empty()) else {
            continue;
        };
        if !seen.insert(url.to_string()) {
            continue;
        }

        entries.push(AnalyticsEntry {
            url: url.to_string(),
            clicks: parse_number(&record, clicks_col) as u64,
            impressions: parse_number(&record, impressions_col) as u64,
            ctr: parse_number(&record, ctr_col),
            position: parse_number(&record, position_col),
        });
    }

    log::info!("[CSV] {} analytics entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Read a redirect map. Duplicate sources keep the last row.
pub fn read_redirect_map(path: &Path) -> Result<RedirectMap> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open redirect CSV {}", path.display()))?;
    let headers = reader
        .headers()
        .context("Failed to read redirect CSV headers")?
        .clone();

    let source_col = find_column(&headers, REDIRECT_SOURCE_COLUMNS).ok_or_else(|| {
        AppError::input_format(format!(
            "Redirect CSV has no source column (looked for {:?})",
            REDIRECT_SOURCE_COLUMNS
        ))
    })?;
    let target_col = find_column(&headers, REDIRECT_TARGET_COLUMNS).ok_or_else(|| {
        AppError::input_format(format!(
            "Redirect CSV has no target column (looked for {:?})",
            REDIRECT_TARGET_COLUMNS
        ))
    })?;

    let mut map = RedirectMap::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!("[CSV] Skipping malformed redirect row: {}", e);
                continue;
            }
        };

        let source = record.get(source_col).map(str::trim).unwrap_or_default();
        let target = record.get(target_col).map(str::trim).unwrap_or_default();
        if source.is_empty() || target.is_empty() {
            continue;
        }
        map.insert(source.to_string(), target.to_string());
    }

    log::info!("[CSV] {} redirect mappings from {}", map.len(), path.display());
    Ok(map)
}

/// Extract URLs from a plain CSV list: per row, the first cell that parses
/// as an absolute http(s) URL; the rest of the row is ignored.
pub fn extract_url_list(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open URL list {}", path.display()))?;

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!("[CSV] Skipping malformed URL-list row: {}", e);
                continue;
            }
        };

        let found = record.iter().map(str::trim).find(|cell| {
            matches!(Url::parse(cell), Ok(u) if u.scheme() == "http" || u.scheme() == "https")
        });
        if let Some(url) = found {
            urls.push(url.to_string());
        }
    }

    Ok(urls)
}
