//! Core Web Vitals collection and assessment.

use serde::{Deserialize, Serialize};

/// Rendering performance metrics for one page. Times in milliseconds,
/// CLS unitless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfMetrics {
    /// Aggregate score 0-100 derived from the individual vitals
    pub performance_score: f64,
    pub lcp: f64,
    pub cls: f64,
    pub inp: f64,
    pub fcp: f64,
    pub ttfb: f64,
    pub tti: f64,
    pub tbt: f64,
    pub speed_index: f64,
    pub total_bytes: u64,
    pub request_count: u64,
}

/// One audited URL: metrics or a render failure, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAudit {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PerfMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<VitalAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerformanceAudit {
    pub fn success(url: &str, metrics: PerfMetrics) -> Self {
        Self {
            url: url.to_string(),
            assessment: Some(VitalAssessment::from_metrics(&metrics)),
            metrics: Some(metrics),
            error: None,
        }
    }

    pub fn failure(url: &str, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            metrics: None,
            assessment: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalRating {
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "needs-improvement")]
    NeedsImprovement,
    #[serde(rename = "poor")]
    Poor,
}

/// The vitals with published assessment thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vital {
    Lcp,
    Inp,
    Cls,
    Fid,
}

/// Rate one vital against its good / needs-improvement boundaries.
pub fn rate_vital(vital: Vital, value: f64) -> VitalRating {
    let (good, acceptable) = match vital {
        Vital::Lcp => (2500.0, 4000.0),
        Vital::Inp => (200.0, 500.0),
        Vital::Cls => (0.10, 0.25),
        Vital::Fid => (100.0, 300.0),
    };

    if value <= good {
        VitalRating::Good
    } else if value <= acceptable {
        VitalRating::NeedsImprovement
    } else {
        VitalRating::Poor
    }
}

/// Independent per-vital ratings for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalAssessment {
    pub lcp: VitalRating,
    pub inp: VitalRating,
    pub cls: VitalRating,
}

impl VitalAssessment {
    pub fn from_metrics(metrics: &PerfMetrics) -> Self {
        Self {
            lcp: rate_vital(Vital::Lcp, metrics.lcp),
            inp: rate_vital(Vital::Inp, metrics.inp),
            cls: rate_vital(Vital::Cls, metrics.cls),
        }
    }
}

/// Raw numbers the in-page collector script reports.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CollectedMetrics {
    #[serde(default)]
    pub lcp: f64,
    #[serde(default)]
    pub cls: f64,
    #[serde(default)]
    pub inp: f64,
    #[serde(default)]
    pub fcp: f64,
    #[serde(default)]
    pub ttfb: f64,
    #[serde(default)]
    pub tti: f64,
    #[serde(default)]
    pub tbt: f64,
    #[serde(default)]
    pub speed_index: f64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub request_count: u64,
}

impl CollectedMetrics {
    pub fn into_metrics(self) -> PerfMetrics {
        let mut metrics = PerfMetrics {
            performance_score: 0.0,
            lcp: self.lcp,
            cls: self.cls,
            inp: self.inp,
            fcp: self.fcp,
            ttfb: self.ttfb,
            tti: self.tti,
            tbt: self.tbt,
            speed_index: self.speed_index,
            total_bytes: self.total_bytes,
            request_count: self.request_count,
        };
        metrics.performance_score = score_metrics(&metrics);
        metrics
    }
}

/// Aggregate score 0-100: each vital contributes a banded subscore,
/// weighted roughly the way field-performance tooling weights them.
pub(crate) fn score_metrics(metrics: &PerfMetrics) -> f64 {
    fn banded(value: f64, good: f64, acceptable: f64) -> f64 {
        if value <= good {
            100.0
        } else if value <= acceptable {
            // Linear falloff inside the needs-improvement band
            100.0 - 50.0 * (value - good) / (acceptable - good)
        } else {
            // Poor values approach zero past twice the acceptable bound
            (50.0 * (1.0 - (value - acceptable) / acceptable)).max(0.0)
        }
    }

    let lcp = banded(metrics.lcp, 2500.0, 4000.0);
    let cls = banded(metrics.cls, 0.10, 0.25);
    let fcp = banded(metrics.fcp, 1800.0, 3000.0);
    let tbt = banded(metrics.tbt, 200.0, 600.0);
    let ttfb = banded(metrics.ttfb, 800.0, 1800.0);

    let score = lcp * 0.30 + cls * 0.25 + fcp * 0.20 + tbt * 0.15 + ttfb * 0.10;
    (score * 100.0).round() / 100.0
}

/// In-page collector. Evaluated after network quiescence; buffered
/// performance observers pick up entries recorded during the load.
pub(crate) const COLLECTOR_JS: &str = r#"
(async () => {
  const observe = (type, reduce, initial) => new Promise((resolve) => {
    let value = initial;
    try {
      const po = new PerformanceObserver((list) => {
        for (const entry of list.getEntries()) value = reduce(value, entry);
      });
      po.observe({ type, buffered: true });
      setTimeout(() => { po.disconnect(); resolve(value); }, 200);
    } catch (e) {
      resolve(initial);
    }
  });

  const lcp = await observe('largest-contentful-paint', (_, e) => e.startTime, 0);
  const cls = await observe('layout-shift', (acc, e) => e.hadRecentInput ? acc : acc + e.value, 0);
  const tbt = await observe('longtask', (acc, e) => acc + Math.max(0, e.duration - 50), 0);
  const inp = await observe('event', (acc, e) => Math.max(acc, e.duration), 0);

  const nav = performance.getEntriesByType('navigation')[0] || {};
  const paint = performance.getEntriesByType('paint');
  const fcpEntry = paint.find((p) => p.name === 'first-contentful-paint');
  const resources = performance.getEntriesByType('resource');

  return {
    lcp,
    cls,
    inp,
    tbt,
    fcp: fcpEntry ? fcpEntry.startTime : 0,
    ttfb: nav.responseStart || 0,
    tti: nav.domInteractive || 0,
    speed_index: fcpEntry ? fcpEntry.startTime : 0,
    total_bytes: resources.reduce((acc, r) => acc + (r.transferSize || 0), nav.transferSize || 0),
    request_count: resources.length + 1,
  };
})()
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcp_thresholds() {
        assert_eq!(rate_vital(Vital::Lcp, 2500.0), VitalRating::Good);
        assert_eq!(rate_vital(Vital::Lcp, 3000.0), VitalRating::NeedsImprovement);
        assert_eq!(rate_vital(Vital::Lcp, 4001.0), VitalRating::Poor);
    }

    #[test]
    fn inp_thresholds() {
        assert_eq!(rate_vital(Vital::Inp, 150.0), VitalRating::Good);
        assert_eq!(rate_vital(Vital::Inp, 500.0), VitalRating::NeedsImprovement);
        assert_eq!(rate_vital(Vital::Inp, 501.0), VitalRating::Poor);
    }

    #[test]
    fn cls_thresholds() {
        assert_eq!(rate_vital(Vital::Cls, 0.05), VitalRating::Good);
        assert_eq!(rate_vital(Vital::Cls, 0.2), VitalRating::NeedsImprovement);
        assert_eq!(rate_vital(Vital::Cls, 0.3), VitalRating::Poor);
    }

    #[test]
    fn fid_thresholds() {
        assert_eq!(rate_vital(Vital::Fid, 80.0), VitalRating::Good);
        assert_eq!(rate_vital(Vital::Fid, 300.0), VitalRating::NeedsImprovement);
        assert_eq!(rate_vital(Vital::Fid, 350.0), VitalRating::Poor);
    }

    #[test]
    fn fast_page_scores_high() {
        let metrics = CollectedMetrics {
            lcp: 1200.0,
            cls: 0.02,
            fcp: 800.0,
            tbt: 50.0,
            ttfb: 200.0,
            ..CollectedMetrics::default()
        }
        .into_metrics();

        assert_eq!(metrics.performance_score, 100.0);
        let assessment = VitalAssessment::from_metrics(&metrics);
        assert_eq!(assessment.lcp, VitalRating::Good);
        assert_eq!(assessment.cls, VitalRating::Good);
    }

    #[test]
    fn slow_page_scores_low() {
        let metrics = CollectedMetrics {
            lcp: 9000.0,
            cls: 0.6,
            fcp: 7000.0,
            tbt: 2000.0,
            ttfb: 4000.0,
            ..CollectedMetrics::default()
        }
        .into_metrics();

        assert!(metrics.performance_score < 20.0);
        let assessment = VitalAssessment::from_metrics(&metrics);
        assert_eq!(assessment.lcp, VitalRating::Poor);
        assert_eq!(assessment.cls, VitalRating::Poor);
    }

    #[test]
    fn score_is_bounded() {
        for lcp in [0.0, 3000.0, 20_000.0] {
            let metrics = CollectedMetrics {
                lcp,
                cls: 0.5,
                ..CollectedMetrics::default()
            }
            .into_metrics();
            assert!((0.0..=100.0).contains(&metrics.performance_score));
        }
    }

    #[test]
    fn vital_rating_serializes_kebab_case() {
        let json = serde_json::to_string(&VitalRating::NeedsImprovement).unwrap();
        assert_eq!(json, "\"needs-improvement\"");
    }
}
