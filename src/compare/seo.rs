//! SEO metadata comparison between an old page and its new counterpart.
//!
//! Titles and descriptions are compared case-insensitively by Levenshtein
//! ratio; H1s are validated per side and compared by the same rule;
//! canonicals must point at the page's own URL. The weighted match score
//! is out of 100: title 30, description 25, H1 25, canonical 20.

use serde::{Deserialize, Serialize};

use crate::matching::similarity;
use crate::probe::PageContent;

const MATCH_THRESHOLD: f64 = 0.8;
const SIGNIFICANT_CHANGE_THRESHOLD: f64 = 0.5;
const TITLE_LENGTH_DELTA: usize = 20;
const DESCRIPTION_LENGTH_DELTA: usize = 30;

const TITLE_WEIGHT: f64 = 30.0;
const DESCRIPTION_WEIGHT: f64 = 25.0;
const H1_WEIGHT: f64 = 25.0;
const CANONICAL_WEIGHT: f64 = 20.0;

const PERFECT_MATCH_THRESHOLD: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Minor,
    Moderate,
    Major,
}

impl Severity {
    fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Severity::None
        } else if score >= 75.0 {
            Severity::Minor
        } else if score >= 50.0 {
            Severity::Moderate
        } else {
            Severity::Major
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldComparison {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    pub matches: bool,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalComparison {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    pub matches: bool,
    pub canonical_matches_url: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoComparison {
    pub new_url: String,
    pub title: FieldComparison,
    pub description: FieldComparison,
    pub h1: FieldComparison,
    pub canonical: CanonicalComparison,
    pub match_score: f64,
    pub severity: Severity,
    pub issues: Vec<String>,
}

impl SeoComparison {
    pub fn is_perfect_match(&self) -> bool {
        self.match_score >= PERFECT_MATCH_THRESHOLD
    }
}

/// Compare the SEO metadata of a page pair.
pub fn compare_seo(old: &PageContent, new: &PageContent, new_url: &str) -> SeoComparison {
    let mut issues = Vec::new();

    let title = compare_text_field(
        old.title.as_deref(),
        new.title.as_deref(),
        "title",
        "Title",
        TITLE_LENGTH_DELTA,
        &mut issues,
    );
    let description = compare_text_field(
        old.description.as_deref(),
        new.description.as_deref(),
        "description",
        "Description",
        DESCRIPTION_LENGTH_DELTA,
        &mut issues,
    );
    let (h1, h1_score) = compare_h1(old, new, &mut issues);
    let canonical = compare_canonical(old, new, new_url, &mut issues);

    let score = title.similarity * TITLE_WEIGHT
        + description.similarity * DESCRIPTION_WEIGHT
        + h1_score
        + if canonical.canonical_matches_url {
            CANONICAL_WEIGHT
        } else {
            0.0
        };
    let match_score = (score * 100.0).round() / 100.0;

    SeoComparison {
        new_url: new_url.to_string(),
        title,
        description,
        h1,
        canonical,
        match_score,
        severity: Severity::from_score(match_score),
        issues,
    }
}

fn compare_text_field(
    old: Option<&str>,
    new: Option<&str>,
    field: &str,
    label: &str,
    length_delta: usize,
    issues: &mut Vec<String>,
) -> FieldComparison {
    match (old, new) {
        (Some(old), Some(new)) => {
            let score = similarity(&old.to_lowercase(), &new.to_lowercase());

            if old.len().abs_diff(new.len()) > length_delta {
                issues.push(format!("{label} length differs significantly"));
            }
            if score < SIGNIFICANT_CHANGE_THRESHOLD {
                issues.push(format!("{label} significantly changed"));
            } else if score < MATCH_THRESHOLD {
                issues.push(format!("{label} partially changed"));
            }

            FieldComparison {
                old_value: Some(old.to_string()),
                new_value: Some(new.to_string()),
                matches: score >= MATCH_THRESHOLD,
                similarity: score,
            }
        }
        (old, new) => {
            if old.is_none() {
                issues.push(format!("Old page missing {field}"));
            }
            if new.is_none() {
                issues.push(format!("New page missing {field}"));
            }
            FieldComparison {
                old_value: old.map(str::to_string),
                new_value: new.map(str::to_string),
                matches: false,
                similarity: 0.0,
            }
        }
    }
}

fn compare_h1(
    old: &PageContent,
    new: &PageContent,
    issues: &mut Vec<String>,
) -> (FieldComparison, f64) {
    validate_h1(old, "Old", issues);
    validate_h1(new, "New", issues);

    let old_valid = old.headings.h1_count >= 1;
    let new_valid = new.headings.h1_count >= 1;
    let old_h1 = old.headings.h1_text.first().map(String::as_str);
    let new_h1 = new.headings.h1_text.first().map(String::as_str);

    match (old_valid, new_valid) {
        (true, true) => {
            let score = similarity(
                &old_h1.unwrap_or_default().to_lowercase(),
                &new_h1.unwrap_or_default().to_lowercase(),
            );
            if score < SIGNIFICANT_CHANGE_THRESHOLD {
                issues.push("H1 significantly changed".to_string());
            } else if score < MATCH_THRESHOLD {
                issues.push("H1 partially changed".to_string());
            }
            (
                FieldComparison {
                    old_value: old_h1.map(str::to_string),
                    new_value: new_h1.map(str::to_string),
                    matches: score >= MATCH_THRESHOLD,
                    similarity: score,
                },
                score * H1_WEIGHT,
            )
        }
        (false, false) => (
            FieldComparison {
                old_value: None,
                new_value: None,
                matches: false,
                similarity: 0.0,
            },
            0.0,
        ),
        _ => (
            FieldComparison {
                old_value: old_h1.map(str::to_string),
                new_value: new_h1.map(str::to_string),
                matches: false,
                similarity: 0.0,
            },
            H1_WEIGHT / 2.0,
        ),
    }
}

fn validate_h1(page: &PageContent, side: &str, issues: &mut Vec<String>) {
    match page.headings.h1_count {
        0 => issues.push(format!("{side} page missing H1 tag")),
        1 => {}
        n => issues.push(format!("{side} page has multiple H1 tags ({n})")),
    }
}

fn compare_canonical(
    old: &PageContent,
    new: &PageContent,
    new_url: &str,
    issues: &mut Vec<String>,
) -> CanonicalComparison {
    if old.canonical_url.is_none() {
        issues.push("Old page missing canonical URL".to_string());
    }
    if new.canonical_url.is_none() {
        issues.push("New page missing canonical URL".to_string());
    }

    let canonical_matches_url = new
        .canonical_url
        .as_deref()
        .map(|canonical| {
            canonical.trim_end_matches('/') == new_url.trim_end_matches('/')
        })
        .unwrap_or(false);

    CanonicalComparison {
        old_value: old.canonical_url.clone(),
        new_value: new.canonical_url.clone(),
        matches: canonical_matches_url,
        canonical_matches_url,
    }
}

// ============================================================================
// BATCH SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoPairComparison {
    pub old_url: String,
    pub new_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<SeoComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    pub none: usize,
    pub minor: usize,
    pub moderate: usize,
    pub major: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoSummary {
    pub total_pairs: usize,
    pub compared: usize,
    pub perfect_matches: usize,
    pub average_score: f64,
    pub severity_counts: SeverityCounts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoValidationReport {
    pub comparisons: Vec<SeoPairComparison>,
    pub summary: SeoSummary,
}

pub fn summarize_seo(comparisons: &[SeoPairComparison]) -> SeoSummary {
    let mut summary = SeoSummary {
        total_pairs: comparisons.len(),
        ..SeoSummary::default()
    };

    let mut score_sum = 0.0;
    for pair in comparisons {
        let Some(comparison) = &pair.comparison else {
            continue;
        };
        summary.compared += 1;
        score_sum += comparison.match_score;
        if comparison.is_perfect_match() {
            summary.perfect_matches += 1;
        }
        match comparison.severity {
            Severity::None => summary.severity_counts.none += 1,
            Severity::Minor => summary.severity_counts.minor += 1,
            Severity::Moderate => summary.severity_counts.moderate += 1,
            Severity::Major => summary.severity_counts.major += 1,
        }
    }

    if summary.compared > 0 {
        summary.average_score =
            ((score_sum / summary.compared as f64) * 100.0).round() / 100.0;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{HeadingSummary, PageContent};

    fn page(title: &str, description: &str, h1: &str, canonical: &str) -> PageContent {
        PageContent {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            canonical_url: Some(canonical.to_string()),
            headings: HeadingSummary {
                h1_count: 1,
                h1_text: vec![h1.to_string()],
                ..HeadingSummary::default()
            },
            ..PageContent::default()
        }
    }

    #[test]
    fn identical_pages_score_one_hundred() {
        let old = page("Home", "Welcome home", "Home", "https://new.site/");
        let new = page("Home", "Welcome home", "Home", "https://new.site/");

        let result = compare_seo(&old, &new, "https://new.site/");
        assert_eq!(result.match_score, 100.0);
        assert_eq!(result.severity, Severity::None);
        assert!(result.is_perfect_match());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn changed_title_drops_into_minor() {
        // "About Us" vs "About Our Company": similarity 7/17, everything
        // else identical and canonical matching
        let old = page("About Us", "Who we are", "About", "https://new.site/about");
        let new = page(
            "About Our Company",
            "Who we are",
            "About",
            "https://new.site/about",
        );

        let result = compare_seo(&old, &new, "https://new.site/about");
        assert!(!result.title.matches);
        assert!(result
            .issues
            .contains(&"Title significantly changed".to_string()));

        let expected: f64 = 30.0 * (7.0 / 17.0) + 25.0 + 25.0 + 20.0;
        assert!((result.match_score - (expected * 100.0).round() / 100.0).abs() < 1e-9);
        assert_eq!(result.severity, Severity::Minor);
    }

    #[test]
    fn missing_title_on_either_side_is_flagged() {
        let mut old = page("T", "D", "H", "https://new.site/x");
        old.title = None;
        let new = page("T", "D", "H", "https://new.site/x");

        let result = compare_seo(&old, &new, "https://new.site/x");
        assert_eq!(result.title.similarity, 0.0);
        assert!(!result.title.matches);
        assert!(result.issues.contains(&"Old page missing title".to_string()));
    }

    #[test]
    fn title_length_delta_is_flagged() {
        let old = page("Short", "D", "H", "https://new.site/x");
        let new = page(
            "Short title that became very much longer after migration",
            "D",
            "H",
            "https://new.site/x",
        );

        let result = compare_seo(&old, &new, "https://new.site/x");
        assert!(result
            .issues
            .contains(&"Title length differs significantly".to_string()));
    }

    #[test]
    fn multiple_h1_and_missing_h1_are_flagged() {
        let mut old = page("T", "D", "H", "https://new.site/x");
        old.headings.h1_count = 0;
        old.headings.h1_text.clear();
        let mut new = page("T", "D", "H", "https://new.site/x");
        new.headings.h1_count = 3;

        let result = compare_seo(&old, &new, "https://new.site/x");
        assert!(result.issues.contains(&"Old page missing H1 tag".to_string()));
        assert!(result
            .issues
            .contains(&"New page has multiple H1 tags (3)".to_string()));
        // only one side has a valid H1: half credit
        let h1_part = 25.0 / 2.0;
        let expected = 30.0 + 25.0 + h1_part + 20.0;
        assert!((result.match_score - expected).abs() < 1e-9);
    }

    #[test]
    fn canonical_mismatch_loses_all_canonical_credit() {
        let old = page("T", "D", "H", "https://old.site/x");
        let new = page("T", "D", "H", "https://new.site/other");

        let result = compare_seo(&old, &new, "https://new.site/x");
        assert!(!result.canonical.canonical_matches_url);
        assert_eq!(result.match_score, 80.0);
        assert_eq!(result.severity, Severity::Minor);
    }

    #[test]
    fn canonical_comparison_ignores_trailing_slash() {
        let old = page("T", "D", "H", "https://new.site/x");
        let new = page("T", "D", "H", "https://new.site/x/");

        let result = compare_seo(&old, &new, "https://new.site/x");
        assert!(result.canonical.canonical_matches_url);
    }

    #[test]
    fn score_stays_in_bounds_and_severity_is_consistent() {
        let empty = PageContent::default();
        let full = page("T", "D", "H", "https://new.site/x");

        for (old, new) in [(&empty, &empty), (&empty, &full), (&full, &empty)] {
            let result = compare_seo(old, new, "https://new.site/x");
            assert!((0.0..=100.0).contains(&result.match_score));
            let expected = Severity::from_score(result.match_score);
            assert_eq!(result.severity, expected);
        }
    }

    #[test]
    fn summary_counts_severities_and_perfect_matches() {
        let perfect = page("T", "D", "H", "https://new.site/x");
        let comparisons = vec![
            SeoPairComparison {
                old_url: "https://old.site/x".into(),
                new_url: "https://new.site/x".into(),
                comparison: Some(compare_seo(&perfect, &perfect, "https://new.site/x")),
                error: None,
            },
            SeoPairComparison {
                old_url: "https://old.site/broken".into(),
                new_url: "https://new.site/broken".into(),
                comparison: None,
                error: Some("fetch failed".into()),
            },
        ];

        let summary = summarize_seo(&comparisons);
        assert_eq!(summary.total_pairs, 2);
        assert_eq!(summary.compared, 1);
        assert_eq!(summary.perfect_matches, 1);
        assert_eq!(summary.severity_counts.none, 1);
        assert_eq!(summary.average_score, 100.0);
    }
}
