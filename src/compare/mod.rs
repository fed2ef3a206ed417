//! Old-vs-new comparison: SEO metadata, rendering performance, and mobile
//! layout health.

mod mobile;
mod performance;
mod seo;

pub use mobile::{
    compare_mobile_batches, ChangeDirection, MobilePairComparison, MobileReport, MobileSummary,
};
pub use performance::{
    classify_improvement, compare_performance_batches, compare_performance_pair, ChangeClass,
    CwvImprovement, MetricDelta, PerformancePairComparison, PerformanceReport, PerformanceSummary,
};
pub use seo::{
    compare_seo, summarize_seo, CanonicalComparison, FieldComparison, SeoComparison,
    SeoPairComparison, SeoSummary, SeoValidationReport, Severity, SeverityCounts,
};

use url::Url;

/// Pairing key for cross-site comparison: path plus query, host and scheme
/// ignored.
pub(crate) fn path_and_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

/// Pairing key for mobile comparison: path only.
pub(crate) fn path_only(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_ignores_host_and_scheme() {
        assert_eq!(
            path_and_query("https://old.site/pricing?tier=pro"),
            path_and_query("http://new.site/pricing?tier=pro")
        );
        assert_eq!(path_only("https://old.site/a"), path_only("https://new.site/a"));
    }

    #[test]
    fn query_distinguishes_performance_pairs() {
        assert_ne!(
            path_and_query("https://a/search?q=1"),
            path_and_query("https://a/search?q=2")
        );
        assert_eq!(path_only("https://a/search?q=1"), path_only("https://a/search?q=2"));
    }
}
