//! Mobile responsiveness comparison: per-pair issue-count direction and
//! the issues both sides share.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::path_only;
use crate::headless::MobileTestResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Improved,
    Regressed,
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobilePairComparison {
    pub path: String,
    pub old_url: String,
    pub new_url: String,
    pub old_issue_count: usize,
    pub new_issue_count: usize,
    pub direction: ChangeDirection,
    /// Issues present on both sides
    pub common_issues: Vec<String>,
    pub new_responsive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileSummary {
    pub total_pairs: usize,
    pub improved: usize,
    pub regressed: usize,
    pub unchanged: usize,
    pub new_responsive: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileReport {
    pub pairs: Vec<MobilePairComparison>,
    pub summary: MobileSummary,
    pub unpaired: Vec<String>,
}

/// Pair old and new mobile results by URL path and compare issue counts.
pub fn compare_mobile_batches(
    old_results: &[MobileTestResult],
    new_results: &[MobileTestResult],
) -> MobileReport {
    let new_by_path: HashMap<String, &MobileTestResult> = new_results
        .iter()
        .map(|result| (path_only(&result.url), result))
        .collect();

    let mut report = MobileReport::default();

    for old_result in old_results {
        let path = path_only(&old_result.url);
        let Some(new_result) = new_by_path.get(&path) else {
            report.unpaired.push(old_result.url.clone());
            continue;
        };

        let old_count = old_result.overall_issues.len();
        let new_count = new_result.overall_issues.len();
        let direction = if new_count < old_count {
            ChangeDirection::Improved
        } else if new_count > old_count {
            ChangeDirection::Regressed
        } else {
            ChangeDirection::Unchanged
        };

        let common_issues: Vec<String> = old_result
            .overall_issues
            .iter()
            .filter(|issue| new_result.overall_issues.contains(issue))
            .cloned()
            .collect();

        match direction {
            ChangeDirection::Improved => report.summary.improved += 1,
            ChangeDirection::Regressed => report.summary.regressed += 1,
            ChangeDirection::Unchanged => report.summary.unchanged += 1,
        }
        if new_result.responsive {
            report.summary.new_responsive += 1;
        }

        report.pairs.push(MobilePairComparison {
            path,
            old_url: old_result.url.clone(),
            new_url: new_result.url.clone(),
            old_issue_count: old_count,
            new_issue_count: new_count,
            direction,
            common_issues,
            new_responsive: new_result.responsive,
        });
    }

    report.summary.total_pairs = report.pairs.len();
    report
}
