//! Old-to-new URL correspondence classification.
//!
//! Old and new sites live on different origins, so equality is decided on
//! the normalized URL's path; `normalize` has already folded host case,
//! `www.`, trailing slashes, query strings and fragments.
//!
//! A redirect-map entry whose target exists on the new site wins over a
//! direct path match for the same old URL.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use url::Url;

use super::normalize::normalize;
use super::similarity::path_similarity;

/// How an old URL was connected to the new site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Same path exists on the new site
    Direct,
    /// Connected through the uploaded redirect map
    Mapped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedUrl {
    pub old_url: String,
    pub new_url: String,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingUrl {
    pub old_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOnlyUrl {
    pub new_url: String,
    #[serde(rename = "type")]
    pub kind: NewUrlKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewUrlKind {
    NewContent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrespondenceSummary {
    pub total_old_urls: usize,
    pub total_new_urls: usize,
    pub matched: usize,
    pub redirected: usize,
    pub missing: usize,
    pub new_only: usize,
    /// Percentage of old URLs reachable on the new site, rounded to two
    /// decimals. Zero old URLs yields 0.
    pub match_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrespondenceReport {
    pub matched: Vec<MatchedUrl>,
    pub redirected: Vec<MatchedUrl>,
    pub missing: Vec<MissingUrl>,
    pub new_only: Vec<NewOnlyUrl>,
    pub summary: CorrespondenceSummary,
}

/// Suggestions below this path similarity are suppressed.
const SUGGESTION_THRESHOLD: f64 = 0.5;

/// Comparison key for cross-origin equality: the path of the normalized URL.
fn comparison_key(url: &str) -> String {
    let normalized = normalize(url);
    match Url::parse(&normalized) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => normalized,
    }
}

/// Classify every old URL against the new URL set and the redirect map.
pub fn resolve_correspondence(
    old_urls: &[String],
    new_urls: &[String],
    redirect_map: &HashMap<String, String>,
) -> CorrespondenceReport {
    let new_keys: HashSet<String> = new_urls.iter().map(|u| comparison_key(u)).collect();
    let old_keys: HashSet<String> = old_urls.iter().map(|u| comparison_key(u)).collect();

    let mut report = CorrespondenceReport::default();

    for old_url in old_urls {
        let key = comparison_key(old_url);

        // Mapped redirects take precedence over a same-path match: the
        // migration explicitly declared where this page went.
        if let Some(target) = redirect_map.get(old_url) {
            if new_keys.contains(&comparison_key(target)) {
                report.redirected.push(MatchedUrl {
                    old_url: old_url.clone(),
                    new_url: target.clone(),
                    match_type: MatchType::Mapped,
                });
                continue;
            }
        }

        if new_keys.contains(&key) {
            report.matched.push(MatchedUrl {
                old_url: old_url.clone(),
                new_url: old_url.clone(),
                match_type: MatchType::Direct,
            });
            continue;
        }

        report.missing.push(MissingUrl {
            old_url: old_url.clone(),
            suggestion: suggest_replacement(old_url, new_urls),
        });
    }

    let redirect_target_keys: HashSet<String> = redirect_map
        .values()
        .map(|target| comparison_key(target))
        .collect();

    for new_url in new_urls {
        let key = comparison_key(new_url);
        if !old_keys.contains(&key) && !redirect_target_keys.contains(&key) {
            report.new_only.push(NewOnlyUrl {
                new_url: new_url.clone(),
                kind: NewUrlKind::NewContent,
            });
        }
    }

    report.summary = summarize(&report, old_urls.len(), new_urls.len());

    log::info!(
        "[MATCH] {} matched, {} redirected, {} missing, {} new-only ({}% match rate)",
        report.summary.matched,
        report.summary.redirected,
        report.summary.missing,
        report.summary.new_only,
        report.summary.match_rate
    );

    report
}

/// Closest new URL by path similarity, if convincing enough.
fn suggest_replacement(old_url: &str, new_urls: &[String]) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for candidate in new_urls {
        let score = path_similarity(old_url, candidate);
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((candidate, score));
        }
    }
    best.filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .map(|(url, _)| url.clone())
}

fn summarize(
    report: &CorrespondenceReport,
    total_old: usize,
    total_new: usize,
) -> CorrespondenceSummary {
    let reachable = report.matched.len() + report.redirected.len();
    let match_rate = if total_old == 0 {
        0.0
    } else {
        (reachable as f64 / total_old as f64 * 10_000.0).round() / 100.0
    };

    CorrespondenceSummary {
        total_old_urls: total_old,
        total_new_urls: total_new,
        matched: report.matched.len(),
        redirected: report.redirected.len(),
        missing: report.missing.len(),
        new_only: report.new_only.len(),
        match_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn buckets_partition_old_urls() {
        let old = urls(&[
            "https://old.site/",
            "https://old.site/a",
            "https://old.site/gone",
        ]);
        let new = urls(&["https://new.site/", "https://new.site/a"]);
        let report = resolve_correspondence(&old, &new, &HashMap::new());

        assert_eq!(
            report.matched.len() + report.redirected.len() + report.missing.len(),
            old.len()
        );
        for entry in report.matched.iter().chain(report.redirected.iter()) {
            assert!(old.contains(&entry.old_url));
        }
    }

    #[test]
    fn empty_old_list_yields_zero_rate() {
        let report = resolve_correspondence(&[], &urls(&["https://new.site/"]), &HashMap::new());
        assert_eq!(report.summary.matched, 0);
        assert_eq!(report.summary.missing, 0);
        assert_eq!(report.summary.match_rate, 0.0);
    }

    #[test]
    fn mixed_site_scenario() {
        // Trailing slashes and hosts are folded; /b's redirect target does
        // not exist on the new site so it stays missing.
        let old = urls(&[
            "https://old.site/",
            "https://old.site/a",
            "https://old.site/b/",
        ]);
        let new = urls(&["https://new.site/", "https://new.site/a"]);
        let mut redirects = HashMap::new();
        redirects.insert(
            "https://old.site/b/".to_string(),
            "https://new.site/b".to_string(),
        );

        let report = resolve_correspondence(&old, &new, &redirects);

        assert_eq!(report.summary.matched, 2);
        assert_eq!(report.summary.redirected, 0);
        assert_eq!(report.summary.missing, 1);
        assert_eq!(report.missing[0].old_url, "https://old.site/b/");
        // sim("/b", "/a") == 0.5 is not above the threshold
        assert_eq!(report.missing[0].suggestion, None);
        assert_eq!(report.summary.new_only, 0);
        assert!((report.summary.match_rate - 66.67).abs() < 1e-9);
    }

    #[test]
    fn redirect_map_with_existing_target() {
        let old = urls(&["https://old.site/legacy"]);
        let new = urls(&["https://new.site/shiny"]);
        let mut redirects = HashMap::new();
        redirects.insert(
            "https://old.site/legacy".to_string(),
            "https://new.site/shiny".to_string(),
        );

        let report = resolve_correspondence(&old, &new, &redirects);

        assert_eq!(report.summary.redirected, 1);
        assert_eq!(report.summary.matched, 0);
        assert_eq!(report.summary.missing, 0);
        assert_eq!(report.redirected[0].new_url, "https://new.site/shiny");
        assert_eq!(report.redirected[0].match_type, MatchType::Mapped);
        assert!((report.summary.match_rate - 100.0).abs() < 1e-9);
    }

    #[test]
    fn redirect_wins_over_direct_match() {
        // The page exists at the same path AND has a mapped target; the
        // explicit mapping is authoritative.
        let old = urls(&["https://old.site/page"]);
        let new = urls(&["https://new.site/page", "https://new.site/landing"]);
        let mut redirects = HashMap::new();
        redirects.insert(
            "https://old.site/page".to_string(),
            "https://new.site/landing".to_string(),
        );

        let report = resolve_correspondence(&old, &new, &redirects);
        assert_eq!(report.summary.redirected, 1);
        assert_eq!(report.summary.matched, 0);
    }

    #[test]
    fn suggestion_picks_closest_path() {
        let old = urls(&["https://old.site/products/blue-widget"]);
        let new = urls(&[
            "https://new.site/products/blue-widgets",
            "https://new.site/contact",
        ]);
        let report = resolve_correspondence(&old, &new, &HashMap::new());

        assert_eq!(report.missing.len(), 1);
        assert_eq!(
            report.missing[0].suggestion.as_deref(),
            Some("https://new.site/products/blue-widgets")
        );
    }

    #[test]
    fn new_only_excludes_redirect_targets() {
        let old = urls(&["https://old.site/legacy"]);
        let new = urls(&["https://new.site/shiny", "https://new.site/brand-new"]);
        let mut redirects = HashMap::new();
        redirects.insert(
            "https://old.site/legacy".to_string(),
            "https://new.site/shiny".to_string(),
        );

        let report = resolve_correspondence(&old, &new, &redirects);
        assert_eq!(report.new_only.len(), 1);
        assert_eq!(report.new_only[0].new_url, "https://new.site/brand-new");
    }
}
