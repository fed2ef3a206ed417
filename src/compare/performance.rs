//! Performance comparison: per-metric deltas with a direction-aware sign
//! convention, classification bands, and batch roll-up.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::path_and_query;
use crate::headless::{PerfMetrics, PerformanceAudit};

/// Score deltas beyond this magnitude count as improved/regressed in the
/// batch summary.
const SCORE_DELTA_BAND: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeClass {
    SignificantImprovement,
    ModerateImprovement,
    MinimalChange,
    ModerateRegression,
    SignificantRegression,
}

/// Band an improvement percentage.
pub fn classify_improvement(improvement_pct: f64) -> ChangeClass {
    if improvement_pct >= 10.0 {
        ChangeClass::SignificantImprovement
    } else if improvement_pct >= 5.0 {
        ChangeClass::ModerateImprovement
    } else if improvement_pct > -5.0 {
        ChangeClass::MinimalChange
    } else if improvement_pct > -10.0 {
        ChangeClass::ModerateRegression
    } else {
        ChangeClass::SignificantRegression
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDelta {
    pub metric: String,
    pub old_value: f64,
    pub new_value: f64,
    pub delta: f64,
    /// Positive means the new site is better, for every metric
    pub improvement_pct: f64,
    pub classification: ChangeClass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePairComparison {
    pub path: String,
    pub old_url: String,
    pub new_url: String,
    pub old_score: f64,
    pub new_score: f64,
    pub score_delta: f64,
    pub improved: bool,
    pub metrics: Vec<MetricDelta>,
}

/// The lower-is-better metrics compared per pair.
fn metric_values(metrics: &PerfMetrics) -> [(&'static str, f64); 8] {
    [
        ("lcp", metrics.lcp),
        ("cls", metrics.cls),
        ("inp", metrics.inp),
        ("fcp", metrics.fcp),
        ("ttfb", metrics.ttfb),
        ("tti", metrics.tti),
        ("tbt", metrics.tbt),
        ("speedIndex", metrics.speed_index),
    ]
}

/// Compare one URL pair's metrics.
pub fn compare_performance_pair(
    old_url: &str,
    new_url: &str,
    old: &PerfMetrics,
    new: &PerfMetrics,
) -> PerformancePairComparison {
    let old_values = metric_values(old);
    let new_values = metric_values(new);

    let metrics = old_values
        .iter()
        .zip(new_values.iter())
        .map(|((name, old_value), (_, new_value))| {
            let delta = new_value - old_value;
            // Lower is better: a drop is a positive improvement
            let improvement_pct = if *old_value != 0.0 {
                -(delta / old_value) * 100.0
            } else {
                0.0
            };
            MetricDelta {
                metric: name.to_string(),
                old_value: *old_value,
                new_value: *new_value,
                delta,
                improvement_pct,
                classification: classify_improvement(improvement_pct),
            }
        })
        .collect();

    let score_delta = new.performance_score - old.performance_score;

    PerformancePairComparison {
        path: path_and_query(old_url),
        old_url: old_url.to_string(),
        new_url: new_url.to_string(),
        old_score: old.performance_score,
        new_score: new.performance_score,
        score_delta,
        improved: score_delta > 0.0,
        metrics,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CwvImprovement {
    pub improved: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub total_pairs: usize,
    pub improved: usize,
    pub regressed: usize,
    pub unchanged: usize,
    pub average_old_score: f64,
    pub average_new_score: f64,
    pub average_score_delta: f64,
    /// Per-vital improved counts keyed by metric name
    pub cwv_improvements: HashMap<String, CwvImprovement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub pairs: Vec<PerformancePairComparison>,
    pub summary: PerformanceSummary,
    /// URLs whose audit failed on either side
    pub unpaired: Vec<String>,
}

/// Pair old and new audits by path + query and compare each pair.
pub fn compare_performance_batches(
    old_audits: &[PerformanceAudit],
    new_audits: &[PerformanceAudit],
) -> PerformanceReport {
    let new_by_path: HashMap<String, &PerformanceAudit> = new_audits
        .iter()
        .map(|audit| (path_and_query(&audit.url), audit))
        .collect();

    let mut pairs = Vec::new();
    let mut unpaired = Vec::new();

    for old_audit in old_audits {
        let path = path_and_query(&old_audit.url);
        let paired = new_by_path.get(&path).and_then(|new_audit| {
            let old_metrics = old_audit.metrics.as_ref()?;
            let new_metrics = new_audit.metrics.as_ref()?;
            Some(compare_performance_pair(
                &old_audit.url,
                &new_audit.url,
                old_metrics,
                new_metrics,
            ))
        });

        match paired {
            Some(pair) => pairs.push(pair),
            None => unpaired.push(old_audit.url.clone()),
        }
    }

    let summary = summarize(&pairs);
    PerformanceReport {
        pairs,
        summary,
        unpaired,
    }
}

fn summarize(pairs: &[PerformancePairComparison]) -> PerformanceSummary {
    let mut summary = PerformanceSummary {
        total_pairs: pairs.len(),
        ..PerformanceSummary::default()
    };
    if pairs.is_empty() {
        return summary;
    }

    let mut old_sum = 0.0;
    let mut new_sum = 0.0;
    let mut delta_sum = 0.0;

    for pair in pairs {
        old_sum += pair.old_score;
        new_sum += pair.new_score;
        delta_sum += pair.score_delta;

        if pair.score_delta > SCORE_DELTA_BAND {
            summary.improved += 1;
        } else if pair.score_delta < -SCORE_DELTA_BAND {
            summary.regressed += 1;
        } else {
            summary.unchanged += 1;
        }

        for metric in &pair.metrics {
            if !matches!(metric.metric.as_str(), "lcp" | "cls" | "inp") {
                continue;
            }
            let entry = summary
                .cwv_improvements
                .entry(metric.metric.clone())
                .or_default();
            entry.total += 1;
            if metric.improvement_pct > 0.0 {
                entry.improved += 1;
            }
        }
    }

    let count = pairs.len() as f64;
    summary.average_old_score = (old_sum / count * 100.0).round() / 100.0;
    summary.average_new_score = (new_sum / count * 100.0).round() / 100.0;
    summary.average_score_delta = (delta_sum / count * 100.0).round() / 100.0;

    for improvement in summary.cwv_improvements.values_mut() {
        improvement.percentage =
            (improvement.improved as f64 / improvement.total as f64 * 10_000.0).round() / 100.0;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(score: f64, lcp: f64, cls: f64, inp: f64) -> PerfMetrics {
        PerfMetrics {
            performance_score: score,
            lcp,
            cls,
            inp,
            ..PerfMetrics::default()
        }
    }

    #[test]
    fn classification_bands() {
        assert_eq!(classify_improvement(25.0), ChangeClass::SignificantImprovement);
        assert_eq!(classify_improvement(10.0), ChangeClass::SignificantImprovement);
        assert_eq!(classify_improvement(7.0), ChangeClass::ModerateImprovement);
        assert_eq!(classify_improvement(0.0), ChangeClass::MinimalChange);
        assert_eq!(classify_improvement(-4.9), ChangeClass::MinimalChange);
        assert_eq!(classify_improvement(-7.0), ChangeClass::ModerateRegression);
        assert_eq!(classify_improvement(-15.0), ChangeClass::SignificantRegression);
    }

    #[test]
    fn faster_site_comparison() {
        // old score 60, new 75; LCP 3200 -> 2400, CLS 0.20 -> 0.05,
        // INP 300 -> 150
        let old = metrics(60.0, 3200.0, 0.20, 300.0);
        let new = metrics(75.0, 2400.0, 0.05, 150.0);

        let pair = compare_performance_pair(
            "https://old.site/p",
            "https://new.site/p",
            &old,
            &new,
        );

        assert_eq!(pair.score_delta, 15.0);
        assert!(pair.improved);

        let lcp = pair.metrics.iter().find(|m| m.metric == "lcp").unwrap();
        assert!((lcp.improvement_pct - 25.0).abs() < 1e-9);
        assert_eq!(lcp.classification, ChangeClass::SignificantImprovement);

        let cls = pair.metrics.iter().find(|m| m.metric == "cls").unwrap();
        assert!((cls.improvement_pct - 75.0).abs() < 1e-9);
        assert_eq!(cls.classification, ChangeClass::SignificantImprovement);

        let inp = pair.metrics.iter().find(|m| m.metric == "inp").unwrap();
        assert!((inp.improvement_pct - 50.0).abs() < 1e-9);
        assert_eq!(inp.classification, ChangeClass::SignificantImprovement);
    }

    #[test]
    fn improvement_sign_tracks_direction_for_lower_is_better() {
        let old = metrics(50.0, 2000.0, 0.1, 100.0);
        let faster = metrics(50.0, 1000.0, 0.1, 100.0);
        let slower = metrics(50.0, 4000.0, 0.1, 100.0);

        let improved = compare_performance_pair("https://o/a", "https://n/a", &old, &faster);
        let regressed = compare_performance_pair("https://o/a", "https://n/a", &old, &slower);

        let lcp_up = improved.metrics.iter().find(|m| m.metric == "lcp").unwrap();
        let lcp_down = regressed.metrics.iter().find(|m| m.metric == "lcp").unwrap();
        assert!(lcp_up.improvement_pct > 0.0);
        assert!(lcp_down.improvement_pct < 0.0);
    }

    #[test]
    fn zero_old_value_does_not_divide() {
        let old = metrics(50.0, 0.0, 0.0, 0.0);
        let new = metrics(50.0, 1000.0, 0.1, 50.0);
        let pair = compare_performance_pair("https://o/a", "https://n/a", &old, &new);
        for metric in &pair.metrics {
            assert!(metric.improvement_pct.is_finite());
        }
    }

    #[test]
    fn batch_pairs_by_path_and_summarizes() {
        let old_audits = vec![
            PerformanceAudit::success("https://old.site/a", metrics(60.0, 3000.0, 0.2, 300.0)),
            PerformanceAudit::success("https://old.site/b", metrics(80.0, 2000.0, 0.05, 100.0)),
            PerformanceAudit::failure("https://old.site/broken", "render crash"),
        ];
        let new_audits = vec![
            PerformanceAudit::success("https://new.site/a", metrics(75.0, 2400.0, 0.05, 150.0)),
            PerformanceAudit::success("https://new.site/b", metrics(70.0, 2600.0, 0.15, 250.0)),
            PerformanceAudit::success("https://new.site/broken", metrics(90.0, 1000.0, 0.0, 10.0)),
        ];

        let report = compare_performance_batches(&old_audits, &new_audits);

        assert_eq!(report.pairs.len(), 2);
        assert_eq!(report.unpaired, vec!["https://old.site/broken".to_string()]);
        assert_eq!(report.summary.improved, 1);
        assert_eq!(report.summary.regressed, 1);
        assert_eq!(report.summary.unchanged, 0);
        assert!((report.summary.average_old_score - 70.0).abs() < 1e-9);
        assert!((report.summary.average_new_score - 72.5).abs() < 1e-9);

        let lcp = &report.summary.cwv_improvements["lcp"];
        assert_eq!(lcp.total, 2);
        assert_eq!(lcp.improved, 1);
        assert!((lcp.percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn small_deltas_are_unchanged() {
        let old = vec![PerformanceAudit::success(
            "https://old.site/a",
            metrics(70.0, 2000.0, 0.1, 100.0),
        )];
        let new = vec![PerformanceAudit::success(
            "https://new.site/a",
            metrics(73.0, 2000.0, 0.1, 100.0),
        )];

        let report = compare_performance_batches(&old, &new);
        assert_eq!(report.summary.unchanged, 1);
        assert_eq!(report.summary.improved, 0);
    }
}
