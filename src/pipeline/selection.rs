//! URL-pair selection for the expensive headless stages.
//!
//! Priority order: the site roots first, then pairs with analytics traffic
//! (heaviest first), then whatever remains in iteration order, truncated to
//! the stage budget.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::input::AnalyticsEntry;
use crate::matching::{CorrespondenceReport, MatchType, MatchedUrl};

/// A fetchable old/new URL pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPair {
    pub old_url: String,
    pub new_url: String,
}

/// All matched and redirected pairs with the new side resolved to an
/// actually fetchable URL on the new site.
///
/// Direct matches carry the old URL as the new-side reference, so their
/// path is grafted onto the new base; mapped redirects already name a real
/// target.
pub fn fetchable_pairs(report: &CorrespondenceReport, new_base_url: &str) -> Vec<UrlPair> {
    report
        .matched
        .iter()
        .chain(report.redirected.iter())
        .map(|entry| to_pair(entry, new_base_url))
        .collect()
}

fn to_pair(entry: &MatchedUrl, new_base_url: &str) -> UrlPair {
    let new_url = match entry.match_type {
        MatchType::Mapped => entry.new_url.clone(),
        MatchType::Direct => rebase(&entry.new_url, new_base_url),
    };
    UrlPair {
        old_url: entry.old_url.clone(),
        new_url,
    }
}

/// Graft a URL's path and query onto another base.
fn rebase(url: &str, new_base_url: &str) -> String {
    let (Ok(base), Ok(parsed)) = (Url::parse(new_base_url), Url::parse(url)) else {
        return url.to_string();
    };

    let path_and_query = match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    };
    base.join(&path_and_query)
        .map(|joined| joined.to_string())
        .unwrap_or_else(|_| url.to_string())
}

fn is_root(url: &str) -> bool {
    matches!(Url::parse(url), Ok(parsed) if parsed.path() == "/")
}

/// Pick up to `budget` pairs for a headless stage.
pub fn select_audit_pairs(
    pairs: &[UrlPair],
    analytics: &[AnalyticsEntry],
    budget: usize,
) -> Vec<UrlPair> {
    let weights: HashMap<&str, u64> = analytics
        .iter()
        .map(|entry| (entry.url.as_str(), entry.traffic_weight()))
        .collect();

    let mut selected: Vec<UrlPair> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    // 1. The site roots
    for pair in pairs {
        if (is_root(&pair.old_url) || is_root(&pair.new_url)) && seen.insert(&pair.old_url) {
            selected.push(pair.clone());
        }
    }

    // 2. Traffic-weighted pairs, heaviest first
    let mut weighted: Vec<(&UrlPair, u64)> = pairs
        .iter()
        .filter(|pair| !seen.contains(pair.old_url.as_str()))
        .filter_map(|pair| weights.get(pair.old_url.as_str()).map(|w| (pair, *w)))
        .collect();
    weighted.sort_by(|a, b| b.1.cmp(&a.1));
    for (pair, _) in weighted {
        if seen.insert(&pair.old_url) {
            selected.push(pair.clone());
        }
    }

    // 3. Fill with the rest in iteration order
    for pair in pairs {
        if seen.insert(&pair.old_url) {
            selected.push(pair.clone());
        }
    }

    selected.truncate(budget);
    selected
}
